/// Frame buffers for terminal rendering
/// Every buffer is a row-major grid with one entry per terminal cell
///
/// Memory layout:
/// - Hot metadata (width, height) stored first for bounds checking
/// - Each layer is its own grid so stages can borrow them independently
use crate::rendering::fragment::FragmentList;
use glam::Vec3;
use std::ops::{Index, IndexMut};

/// Row-major 2D buffer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Grid<T> {
    pub width: usize,
    pub height: usize,
    cells: Vec<T>,
}

/// Final linear RGB per cell.
pub type ColorBuffer = Grid<Vec3>;
/// Depth-sorted fragments per cell.
pub type FragmentBuffer = Grid<FragmentList>;
/// Optional HUD string per cell, may contain color escapes.
pub type HudBuffer = Grid<Option<String>>;
/// Optional overlay character per cell.
pub type DebugBuffer = Grid<Option<char>>;

impl<T: Clone> Grid<T> {
    pub fn new(width: usize, height: usize, value: T) -> Self {
        Self {
            width,
            height,
            cells: vec![value; width * height],
        }
    }

    /// Resize to `width` x `height` and set every cell to `value`.
    /// The allocation is reused when it is large enough.
    pub fn reset(&mut self, width: usize, height: usize, value: T) {
        self.width = width;
        self.height = height;
        self.cells.clear();
        self.cells.resize(width * height, value);
    }
}

impl<T> Grid<T> {
    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<&T> {
        if x < self.width && y < self.height {
            self.cells.get(y * self.width + x)
        } else {
            None
        }
    }

    #[inline]
    pub fn get_mut(&mut self, x: usize, y: usize) -> Option<&mut T> {
        if x < self.width && y < self.height {
            self.cells.get_mut(y * self.width + x)
        } else {
            None
        }
    }

    /// Overwrite one cell, ignoring out-of-range coordinates.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: T) {
        if let Some(cell) = self.get_mut(x, y) {
            *cell = value;
        }
    }

    #[inline]
    pub fn row(&self, y: usize) -> &[T] {
        let start = y * self.width;
        &self.cells[start..start + self.width]
    }

    #[inline]
    pub fn cells(&self) -> &[T] {
        &self.cells
    }

    #[inline]
    pub fn cells_mut(&mut self) -> &mut [T] {
        &mut self.cells
    }

    /// Split into horizontal stripes for multi-core rendering.
    /// Each stripe owns a disjoint subset of rows, so they can be processed in parallel.
    pub fn split_into_stripes(&mut self, stripes: usize) -> Vec<GridStripe<'_, T>> {
        let stripes = stripes.max(1);
        let width = self.width;
        let height = self.height;

        let mut slices = Vec::with_capacity(stripes);
        let mut remaining: &mut [T] = self.cells.as_mut_slice();

        let mut y0 = 0usize;
        let rows_per_stripe = height.div_ceil(stripes);

        for _ in 0..stripes {
            if y0 >= height {
                break;
            }
            let rows = (height - y0).min(rows_per_stripe);
            let (head, tail) = remaining.split_at_mut(rows * width);

            slices.push(GridStripe {
                width,
                y0,
                height: rows,
                cells: head,
            });

            remaining = tail;
            y0 += rows;
        }

        slices
    }
}

impl<T> Index<(usize, usize)> for Grid<T> {
    type Output = T;

    #[inline]
    fn index(&self, (x, y): (usize, usize)) -> &T {
        &self.cells[y * self.width + x]
    }
}

impl<T> IndexMut<(usize, usize)> for Grid<T> {
    #[inline]
    fn index_mut(&mut self, (x, y): (usize, usize)) -> &mut T {
        &mut self.cells[y * self.width + x]
    }
}

/// View into a contiguous set of rows of a [`Grid`].
/// Used for multi-core rasterization where each worker owns a disjoint stripe.
pub struct GridStripe<'a, T> {
    pub width: usize,
    /// First global row covered by this stripe.
    pub y0: usize,
    pub height: usize,
    pub cells: &'a mut [T],
}

impl<'a, T> GridStripe<'a, T> {
    /// Global row range `[y0, y1)` covered by this stripe.
    #[inline(always)]
    pub fn rows(&self) -> std::ops::Range<usize> {
        self.y0..self.y0 + self.height
    }

    /// Cell at global coordinates, or None when outside the stripe.
    #[inline]
    pub fn get_mut(&mut self, x: usize, y_global: usize) -> Option<&mut T> {
        if x >= self.width || y_global < self.y0 {
            return None;
        }
        let y_local = y_global - self.y0;
        if y_local >= self.height {
            return None;
        }
        self.cells.get_mut(y_local * self.width + x)
    }
}

/// All per-cell layers of one frame.
#[derive(Clone, Debug, Default)]
pub struct Framebuffer {
    pub width: usize,
    pub height: usize,
    pub color: ColorBuffer,
    pub fragments: FragmentBuffer,
    pub hud: HudBuffer,
    pub debug: DebugBuffer,
    // Snapshot of `color` read by the post pass
    pub(crate) scratch: ColorBuffer,
}

impl Framebuffer {
    pub fn new(width: usize, height: usize) -> Self {
        let mut fb = Self::default();
        fb.prepare(width, height, Vec3::ZERO);
        fb
    }

    /// Resize every layer and clear it for a new frame. Fragment lists are
    /// cleared in place so their allocations carry over between frames.
    pub fn prepare(&mut self, width: usize, height: usize, clear_color: Vec3) {
        if self.fragments.width == width && self.fragments.height == height {
            for list in self.fragments.cells_mut() {
                list.clear();
            }
        } else {
            self.fragments.reset(width, height, FragmentList::new());
        }

        self.width = width;
        self.height = height;
        self.color.reset(width, height, clear_color);
        self.hud.reset(width, height, None);
        self.debug.reset(width, height, None);
        self.scratch.reset(width, height, Vec3::ZERO);
    }

    /// Total fragments currently stored across all cells.
    pub fn fragment_count(&self) -> usize {
        self.fragments.cells().iter().map(FragmentList::len).sum()
    }
}

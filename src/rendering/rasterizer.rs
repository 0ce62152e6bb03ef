/// Software rasterization into per-pixel fragment lists
/// Triangles are binned into horizontal stripes and each stripe is filled by
/// one worker, so no two threads ever touch the same fragment list.
use crate::count_call;
use crate::meshing::{Triangle, TriangleId};
use crate::rendering::fragment::{Fragment, FragmentList};
use crate::rendering::framebuffer::{FragmentBuffer, GridStripe};
use crate::rendering::texture::TextureSampler;
use glam::{Vec2, Vec3};
use rayon::prelude::*;
use std::ops::Range;

/// Twice the signed area of triangle (a, b, p). Positive when `p` lies to
/// the right of `a -> b` in screen space (y down).
#[inline(always)]
pub fn edge_function(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

/// Tie-break for pixel centres lying exactly on an edge with direction `d`.
/// For any shared edge exactly one of the two triangles owns it, because
/// they traverse it in opposite directions.
#[inline(always)]
fn is_top_left(d: Vec2) -> bool {
    d.y < 0.0 || (d.y == 0.0 && d.x > 0.0)
}

/// Interpolated values at one pixel centre.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PixelSample {
    /// Screen-space-linear weights, in the triangle's vertex order.
    pub linear: Vec3,
    /// Perspective-corrected weights, in the triangle's vertex order.
    pub weights: Vec3,
    pub depth: f32,
    pub uv: Vec2,
}

/// Per-triangle constants for the pixel loop.
#[derive(Clone, Copy, Debug)]
pub struct TriangleSetup {
    // Screen positions wound so the signed area is positive
    screen: [Vec2; 3],
    // True when slots 1 and 2 were swapped to fix the winding
    swapped: bool,
    inv_area: f32,
    depth: Vec3,
    inv_w: Vec3,
    uv: [Vec2; 3],
    top_left: [bool; 3],
    pub x0: usize,
    pub y0: usize,
    pub x1: usize,
    pub y1: usize,
}

impl TriangleSetup {
    /// None for degenerate or non-finite triangles and for triangles whose
    /// bounding box misses the `width` x `height` buffer.
    pub fn new(tri: &Triangle, width: usize, height: usize) -> Option<Self> {
        let [a, b, c] = tri.vertices.map(|v| v.screen);
        let area = edge_function(a, b, c);
        if area == 0.0 || !area.is_finite() {
            return None;
        }

        let swapped = area < 0.0;
        let order = if swapped { [0, 2, 1] } else { [0, 1, 2] };
        let v = order.map(|i| tri.vertices[i]);
        let screen = v.map(|v| v.screen);

        let min = screen[0].min(screen[1]).min(screen[2]);
        let max = screen[0].max(screen[1]).max(screen[2]);

        // Clamped to the buffer by construction
        let x0 = min.x.floor().max(0.0) as usize;
        let y0 = min.y.floor().max(0.0) as usize;
        let x1 = (max.x.ceil().max(0.0) as usize).min(width);
        let y1 = (max.y.ceil().max(0.0) as usize).min(height);
        if x0 >= x1 || y0 >= y1 {
            return None;
        }

        Some(Self {
            screen,
            swapped,
            inv_area: 1.0 / area.abs(),
            depth: Vec3::new(v[0].pos.z, v[1].pos.z, v[2].pos.z),
            inv_w: Vec3::new(1.0 / v[0].pos.w, 1.0 / v[1].pos.w, 1.0 / v[2].pos.w),
            uv: [v[0].tex_coord, v[1].tex_coord, v[2].tex_coord],
            top_left: [
                is_top_left(screen[2] - screen[1]),
                is_top_left(screen[0] - screen[2]),
                is_top_left(screen[1] - screen[0]),
            ],
            x0,
            y0,
            x1,
            y1,
        })
    }

    #[inline]
    pub fn rows(&self) -> Range<usize> {
        self.y0..self.y1
    }

    #[inline]
    pub fn columns(&self) -> Range<usize> {
        self.x0..self.x1
    }

    /// Coverage test and interpolation at screen point `p`.
    #[inline]
    pub fn sample(&self, p: Vec2) -> Option<PixelSample> {
        let [a, b, c] = self.screen;
        let e = Vec3::new(edge_function(b, c, p), edge_function(c, a, p), edge_function(a, b, p));

        let inside = |i: usize| e[i] > 0.0 || (e[i] == 0.0 && self.top_left[i]);
        if !(inside(0) && inside(1) && inside(2)) {
            return None;
        }

        let linear = e * self.inv_area;
        let depth = linear.dot(self.depth);

        // Divide by w: weights are linear in screen space only for 1/w-scaled attributes
        let scaled = linear * self.inv_w;
        let weights = scaled / (scaled.x + scaled.y + scaled.z);
        let uv = self.uv[0] * weights.x + self.uv[1] * weights.y + self.uv[2] * weights.z;

        Some(PixelSample {
            linear: self.unswap(linear),
            weights: self.unswap(weights),
            depth,
            uv,
        })
    }

    #[inline(always)]
    fn unswap(&self, w: Vec3) -> Vec3 {
        if self.swapped {
            Vec3::new(w.x, w.z, w.y)
        } else {
            w
        }
    }
}

/// Stripe-binned rasterizer. Keeps its bins between frames.
#[derive(Default)]
pub struct Rasterizer {
    stripe_bins: Vec<Vec<u32>>,
}

impl Rasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rasterize every triangle into `fragments`. Fragment lists must be
    /// cleared beforehand. Returns the number of fragments inserted.
    pub fn rasterize(
        &mut self,
        triangles: &[Triangle],
        fragments: &mut FragmentBuffer,
        sampler: &dyn TextureSampler,
    ) -> usize {
        let width = fragments.width;
        let height = fragments.height;
        if width == 0 || height == 0 || triangles.is_empty() {
            return 0;
        }

        let setups: Vec<Option<TriangleSetup>> = triangles
            .par_iter()
            .map(|tri| TriangleSetup::new(tri, width, height))
            .collect();

        // --- STRIPE BINNING PASS ---
        let stripe_count = rayon::current_num_threads() * 4; // Over-subscribe for load balancing
        let stripe_h = height.div_ceil(stripe_count);

        // Resize and clear bins without deallocating inner Vec capacities
        if self.stripe_bins.len() < stripe_count {
            self.stripe_bins.resize(stripe_count, Vec::new());
        }
        for bin in self.stripe_bins.iter_mut() {
            bin.clear();
        }

        for (index, setup) in setups.iter().enumerate() {
            if let Some(setup) = setup {
                let start = (setup.y0 / stripe_h).min(stripe_count - 1);
                let end = ((setup.y1 - 1) / stripe_h).min(stripe_count - 1);
                for bin in &mut self.stripe_bins[start..=end] {
                    bin.push(index as u32);
                }
            }
        }

        // --- PARALLEL STRIPE RENDERING ---
        let stripes = fragments.split_into_stripes(stripe_count);
        stripes
            .into_par_iter()
            .zip(self.stripe_bins.par_iter())
            .filter(|(_, bin)| !bin.is_empty())
            .map(|(mut stripe, bin)| {
                let mut inserted = 0;
                // Bins hold indices in mesh order, so equal-depth ties
                // resolve identically every frame
                for &index in bin {
                    let i = index as usize;
                    if let Some(setup) = &setups[i] {
                        inserted += rasterize_triangle(
                            &mut stripe,
                            setup,
                            &triangles[i],
                            TriangleId(index),
                            sampler,
                        );
                    }
                }
                inserted
            })
            .sum()
    }
}

/// Fill the rows of `setup` that fall inside `stripe`.
pub fn rasterize_triangle(
    stripe: &mut GridStripe<'_, FragmentList>,
    setup: &TriangleSetup,
    triangle: &Triangle,
    id: TriangleId,
    sampler: &dyn TextureSampler,
) -> usize {
    let rows = stripe.rows();
    let y_start = setup.y0.max(rows.start);
    let y_end = setup.y1.min(rows.end);
    let transparent = triangle.is_transparent();
    let mut inserted = 0;

    for y in y_start..y_end {
        let py = y as f32 + 0.5;
        for x in setup.columns() {
            count_call!(crate::perf::FUNCTION_COUNTERS.pixels_tested);
            let Some(sample) = setup.sample(Vec2::new(x as f32 + 0.5, py)) else {
                continue;
            };
            if !(-1.0..=1.0).contains(&sample.depth) {
                continue;
            }

            let opacity = if transparent {
                sampler
                    .sample(triangle.block.block_type, triangle.side, sample.uv)
                    .w
                    .clamp(0.0, 1.0)
            } else {
                1.0
            };
            if opacity <= 0.0 {
                continue;
            }

            let Some(list) = stripe.get_mut(x, y) else {
                continue;
            };
            let fragment = Fragment {
                weights: sample.weights,
                uv: sample.uv,
                depth: sample.depth,
                opacity,
                triangle: id,
            };
            if list.insert(fragment) {
                count_call!(crate::perf::FUNCTION_COUNTERS.fragments_inserted);
                inserted += 1;
            } else {
                count_call!(crate::perf::FUNCTION_COUNTERS.fragments_occluded);
            }
        }
    }

    inserted
}

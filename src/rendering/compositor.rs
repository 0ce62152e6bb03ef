/// Fragment shading, alpha compositing and the post pass
use crate::count_add;
use crate::meshing::Triangle;
use crate::rendering::fragment::FragmentList;
use crate::rendering::framebuffer::{ColorBuffer, FragmentBuffer};
use crate::rendering::shading::{FragmentShader, PostShader};
use glam::{UVec2, Vec3};
use rayon::prelude::*;

/// Lighting inputs shared by every fragment of a frame.
#[derive(Clone, Copy, Debug)]
pub struct Lighting {
    /// Points towards the sun.
    pub sun_direction: Vec3,
    pub sky_brightness: f32,
    /// Background color of cells without fragments.
    pub sky: Vec3,
    pub time: f32,
}

/// Blend one pixel's fragments over `background`, farthest first.
#[inline]
pub fn composite_pixel(
    list: &FragmentList,
    background: Vec3,
    triangles: &[Triangle],
    shader: &dyn FragmentShader,
    lighting: &Lighting,
) -> Vec3 {
    list.iter().rev().fold(background, |color, fragment| {
        let triangle = &triangles[fragment.triangle.index()];
        let shaded = shader.shade(
            fragment,
            triangle,
            lighting.sun_direction,
            lighting.sky_brightness,
            lighting.time,
        );
        color.lerp(shaded, fragment.opacity)
    })
}

/// Shade and composite every cell of `fragments` into `color`.
/// `color` must already have the same dimensions.
pub fn composite(
    fragments: &FragmentBuffer,
    color: &mut ColorBuffer,
    triangles: &[Triangle],
    shader: &dyn FragmentShader,
    lighting: &Lighting,
) {
    let width = fragments.width;
    if width == 0 {
        return;
    }

    color
        .cells_mut()
        .par_chunks_mut(width)
        .zip(fragments.cells().par_chunks(width))
        .for_each(|(color_row, fragment_row)| {
            for (out, list) in color_row.iter_mut().zip(fragment_row) {
                count_add!(crate::perf::FUNCTION_COUNTERS.fragments_shaded, list.len() as u64);
                *out = composite_pixel(list, lighting.sky, triangles, shader, lighting);
            }
        });
}

/// Run `shader` over every cell. Reads come from `snapshot`, a copy of
/// `color` taken before the pass, so neighbour lookups never see
/// already-processed cells.
pub fn post_process(
    color: &mut ColorBuffer,
    snapshot: &mut ColorBuffer,
    shader: &dyn PostShader,
    time: f32,
) {
    let width = color.width;
    let height = color.height;
    if width == 0 || height == 0 {
        return;
    }

    snapshot.reset(width, height, Vec3::ZERO);
    snapshot.cells_mut().copy_from_slice(color.cells());

    let frame_size = UVec2::new(width as u32, height as u32);
    let snapshot = &*snapshot;
    color
        .cells_mut()
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, out) in row.iter_mut().enumerate() {
                *out = shader.post(snapshot, UVec2::new(x as u32, y as u32), frame_size, time);
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meshing::{Mesh, TriangleId};
    use crate::rendering::fragment::Fragment;
    use crate::rendering::framebuffer::Grid;
    use crate::rendering::shading::{IdentityPost, PostShader};
    use crate::voxel::{BlockType, Side};
    use glam::{IVec3, Vec2};

    fn lighting(sky: Vec3) -> Lighting {
        Lighting {
            sun_direction: Vec3::Y,
            sky_brightness: 1.0,
            sky,
            time: 0.0,
        }
    }

    fn frag(depth: f32, opacity: f32, id: u32) -> Fragment {
        Fragment {
            weights: Vec3::X,
            uv: Vec2::ZERO,
            depth,
            opacity,
            triangle: TriangleId(id),
        }
    }

    fn two_triangles() -> Vec<Triangle> {
        let mut mesh = Mesh::new();
        mesh.push_block_face(IVec3::ZERO, BlockType::Stone, Side::Top);
        mesh.triangles
    }

    // Triangle 0 is red, triangle 1 is green
    fn by_id(fragment: &Fragment, _: &Triangle, _: Vec3, _: f32, _: f32) -> Vec3 {
        if fragment.triangle.0 == 0 {
            Vec3::X
        } else {
            Vec3::Y
        }
    }

    #[test]
    fn empty_list_shows_background() {
        let sky = Vec3::new(0.2, 0.4, 0.6);
        let empty = FragmentList::new();
        let color = composite_pixel(&empty, sky, &two_triangles(), &by_id, &lighting(sky));
        assert_eq!(color, sky);
    }

    #[test]
    fn blends_back_to_front() {
        let sky = Vec3::Z;
        let mut list = FragmentList::new();
        list.insert(frag(0.2, 0.5, 0));
        list.insert(frag(0.6, 0.5, 1));

        let color = composite_pixel(&list, sky, &two_triangles(), &by_id, &lighting(sky));
        let expected = sky.lerp(Vec3::Y, 0.5).lerp(Vec3::X, 0.5);
        assert!(color.abs_diff_eq(expected, 1e-6));
    }

    #[test]
    fn composite_fills_every_cell() {
        let triangles = two_triangles();
        let mut fragments: FragmentBuffer = Grid::new(3, 2, FragmentList::new());
        fragments[(1, 1)].insert(frag(0.5, 1.0, 1));

        let sky = Vec3::splat(0.3);
        let mut color = Grid::new(3, 2, Vec3::ZERO);
        composite(&fragments, &mut color, &triangles, &by_id, &lighting(sky));

        assert_eq!(color[(1, 1)], Vec3::Y);
        assert_eq!(color[(0, 0)], sky);
        assert_eq!(color[(2, 1)], sky);
    }

    #[test]
    fn post_reads_unmodified_snapshot() {
        // Each cell takes its left neighbour; an in-place pass would smear
        // the first column across the whole row.
        let shift = |buffer: &ColorBuffer, coord: UVec2, _: UVec2, _: f32| {
            let x = coord.x.saturating_sub(1) as usize;
            buffer[(x, coord.y as usize)]
        };

        let mut color = Grid::new(3, 1, Vec3::ZERO);
        color[(0, 0)] = Vec3::splat(1.0);
        color[(1, 0)] = Vec3::splat(2.0);
        color[(2, 0)] = Vec3::splat(3.0);

        let mut snapshot = Grid::default();
        post_process(&mut color, &mut snapshot, &shift, 0.0);
        assert_eq!(color.cells(), &[Vec3::splat(1.0), Vec3::splat(1.0), Vec3::splat(2.0)]);
    }

    #[test]
    fn identity_post_keeps_colors() {
        let mut color = Grid::new(2, 2, Vec3::new(0.1, 0.2, 0.3));
        let before = color.clone();
        let mut snapshot = Grid::default();
        let shader: &dyn PostShader = &IdentityPost;
        post_process(&mut color, &mut snapshot, shader, 0.0);
        assert_eq!(color, before);
    }
}

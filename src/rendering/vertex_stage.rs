/// Vertex stage: shading, near-plane clipping, perspective divide,
/// culling and the screen transform, all in place on the frame's mesh.
use crate::count_call;
use crate::meshing::{Mesh, Triangle, Vertex};
use crate::rendering::shading::VertexShader;
use glam::{Mat4, Vec2, Vec4};
use rayon::prelude::*;

/// Vertices with a smaller clip-space `w` are behind the near plane.
pub const NEAR_W_EPS: f32 = 0.001;

/// Per-frame inputs of the vertex stage.
pub struct VertexStage<'a> {
    pub shader: &'a dyn VertexShader,
    pub view: Mat4,
    pub projection: Mat4,
    pub time: f32,
    /// Keep opaque triangles facing away from the camera.
    pub show_both_faces: bool,
    pub width: usize,
    pub height: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VertexStageStats {
    /// Triangles processed, including the extra halves produced by clipping.
    pub triangles: usize,
    /// Triangles left after culling.
    pub active_triangles: usize,
}

impl<'a> VertexStage<'a> {
    /// Run the stage over `mesh`. Dead triangles are removed; every survivor
    /// holds `(x/w, y/w, z/w, w)` positions and pixel-space `screen` coords.
    pub fn run(&self, mesh: &mut Mesh) -> VertexStageStats {
        let extra: Vec<Triangle> = mesh
            .triangles
            .par_iter_mut()
            .filter_map(|tri| {
                let mut second = self.shade_and_clip(tri);
                self.project(tri);
                if let Some(second) = second.as_mut() {
                    self.project(second);
                }
                second
            })
            .collect();

        let triangles = mesh.triangles.len() + extra.len();
        mesh.triangles.extend(extra);
        mesh.triangles.retain(|tri| !tri.marked_for_death);

        VertexStageStats {
            triangles,
            active_triangles: mesh.triangles.len(),
        }
    }

    /// World normal, vertex shader, then near-plane clip. Returns the second
    /// half when clipping turns the triangle into a quad.
    fn shade_and_clip(&self, tri: &mut Triangle) -> Option<Triangle> {
        tri.marked_for_death = false;
        tri.world_normal = tri.face_normal();

        for vertex in &mut tri.vertices {
            count_call!(crate::perf::FUNCTION_COUNTERS.vertex_shader_calls);
            self.shader
                .shade(vertex, &self.view, &self.projection, self.time);
        }

        clip_triangle_near(tri)
    }

    /// Perspective divide, view normal, culling and screen transform.
    fn project(&self, tri: &mut Triangle) {
        if tri.marked_for_death {
            return;
        }

        for vertex in &mut tri.vertices {
            vertex.pos = perspective_divide(vertex.pos);
        }
        tri.view_normal = tri.face_normal();

        if is_outside_frustum(tri) {
            count_call!(crate::perf::FUNCTION_COUNTERS.triangles_frustum_culled);
            tri.marked_for_death = true;
            return;
        }

        if is_backface(tri) && !tri.is_transparent() && !self.show_both_faces {
            count_call!(crate::perf::FUNCTION_COUNTERS.triangles_backface_culled);
            tri.marked_for_death = true;
            return;
        }

        let size = Vec2::new(self.width as f32, self.height as f32);
        for vertex in &mut tri.vertices {
            vertex.screen = ndc_to_screen(vertex.pos.truncate().truncate(), size);
        }
    }
}

/// `(x/w, y/w, z/w, w)`; the pre-division `w` is kept for
/// perspective-correct interpolation.
#[inline]
pub fn perspective_divide(clip: Vec4) -> Vec4 {
    let inv_w = 1.0 / clip.w;
    Vec4::new(clip.x * inv_w, clip.y * inv_w, clip.z * inv_w, clip.w)
}

/// Map NDC `[-1, 1]` to pixel coordinates `[0, size]`.
#[inline]
pub fn ndc_to_screen(ndc: Vec2, size: Vec2) -> Vec2 {
    (ndc * 0.5 + 0.5) * size
}

/// True when all three vertices lie beyond the same face of the
/// `[-1, 1]^3` cube, or when any position is not finite.
pub fn is_outside_frustum(tri: &Triangle) -> bool {
    let [a, b, c] = tri.vertices.map(|v| v.pos.truncate());
    if !(a.is_finite() && b.is_finite() && c.is_finite()) {
        return true;
    }

    let min = a.min(b).min(c);
    let max = a.max(b).max(c);
    max.x < -1.0 || max.y < -1.0 || max.z < -1.0 || min.x > 1.0 || min.y > 1.0 || min.z > 1.0
}

/// Facing away from the camera. Only meaningful after the perspective divide.
#[inline]
pub fn is_backface(tri: &Triangle) -> bool {
    tri.view_normal.z > 0.0
}

/// Clip against the plane `w = NEAR_W_EPS` in clip space.
///
/// Triangles fully behind are marked dead. A triangle with one vertex behind
/// becomes a quad: `tri` keeps the first half and the second is returned.
/// All vertex attributes are interpolated along the clipped edges and the
/// winding is preserved.
pub fn clip_triangle_near(tri: &mut Triangle) -> Option<Triangle> {
    let vertices = tri.vertices;
    let inside = vertices.map(|v| v.pos.w >= NEAR_W_EPS);

    if inside.iter().all(|&i| i) {
        return None;
    }
    if !inside.iter().any(|&i| i) {
        tri.marked_for_death = true;
        return None;
    }
    count_call!(crate::perf::FUNCTION_COUNTERS.triangles_near_clipped);

    let mut output = [vertices[0]; 4];
    let mut out_len = 0usize;

    let mut prev = vertices[2];
    let mut prev_inside = inside[2];

    for (&curr, &curr_inside) in vertices.iter().zip(inside.iter()) {
        match (prev_inside, curr_inside) {
            (true, true) => {
                output[out_len] = curr;
                out_len += 1;
            }
            (true, false) => {
                output[out_len] = intersect_near(&prev, &curr);
                out_len += 1;
            }
            (false, true) => {
                output[out_len] = intersect_near(&prev, &curr);
                out_len += 1;
                output[out_len] = curr;
                out_len += 1;
            }
            (false, false) => {}
        }

        prev = curr;
        prev_inside = curr_inside;
    }

    match out_len {
        3 => {
            tri.vertices = [output[0], output[1], output[2]];
            None
        }
        4 => {
            tri.vertices = [output[0], output[1], output[2]];
            let mut second = *tri;
            second.vertices = [output[0], output[2], output[3]];
            Some(second)
        }
        _ => {
            tri.marked_for_death = true;
            None
        }
    }
}

/// Point on edge AB where `w = NEAR_W_EPS`.
#[inline]
fn intersect_near(a: &Vertex, b: &Vertex) -> Vertex {
    let t = (NEAR_W_EPS - a.pos.w) / (b.pos.w - a.pos.w);
    a.lerp(b, t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voxel::{BlockRef, BlockType, Side};
    use glam::{IVec3, Vec3};

    fn clip_tri(ws: [f32; 3]) -> Triangle {
        let positions = [Vec3::ZERO, Vec3::X, Vec3::Y];
        let mut vertices = [Vertex::default(); 3];
        for i in 0..3 {
            vertices[i] = Vertex::new(positions[i], positions[i].truncate());
            vertices[i].pos.w = ws[i];
        }
        Triangle::new(vertices, BlockRef::new(BlockType::Stone, IVec3::ZERO), Side::Front)
    }

    #[test]
    fn fully_visible_triangle_is_untouched() {
        let mut tri = clip_tri([1.0, 2.0, 3.0]);
        let before = tri;
        assert!(clip_triangle_near(&mut tri).is_none());
        assert_eq!(tri, before);
    }

    #[test]
    fn fully_behind_triangle_dies() {
        let mut tri = clip_tri([-1.0, -2.0, 0.0]);
        assert!(clip_triangle_near(&mut tri).is_none());
        assert!(tri.marked_for_death);
    }

    #[test]
    fn two_vertices_behind_gives_one_triangle() {
        let mut tri = clip_tri([1.0, -1.0, -1.0]);
        assert!(clip_triangle_near(&mut tri).is_none());
        assert!(!tri.marked_for_death);
        for v in &tri.vertices {
            assert!(v.pos.w >= NEAR_W_EPS - 1e-6);
        }
    }

    #[test]
    fn one_vertex_behind_gives_two_triangles() {
        let mut tri = clip_tri([1.0, 1.0, -1.0]);
        let second = clip_triangle_near(&mut tri).expect("quad split");
        for v in tri.vertices.iter().chain(second.vertices.iter()) {
            assert!(v.pos.w >= NEAR_W_EPS - 1e-6);
        }
        assert_eq!(second.block, tri.block);
        assert_eq!(second.side, tri.side);

        // Winding is preserved: both halves face the same way as the source
        let source_normal = clip_tri([1.0, 1.0, -1.0]).face_normal();
        assert!(tri.face_normal().dot(source_normal) > 0.0);
        assert!(second.face_normal().dot(source_normal) > 0.0);
    }

    #[test]
    fn clipped_vertices_interpolate_attributes() {
        let mut tri = clip_tri([1.0, 1.0, -1.0]);
        tri.vertices[2].ao = 1.0;
        let second = clip_triangle_near(&mut tri).unwrap();
        let clipped: Vec<&Vertex> = tri
            .vertices
            .iter()
            .chain(second.vertices.iter())
            .filter(|v| (v.pos.w - NEAR_W_EPS).abs() < 1e-6)
            .collect();
        assert!(!clipped.is_empty());
        for v in clipped {
            // t = (eps - 1) / (-1 - 1) along an edge from ao 0 to ao 1
            let t = (1.0 - NEAR_W_EPS) / 2.0;
            assert!((v.ao - t).abs() < 1e-5);
            assert!((v.tex_coord - v.pos.truncate().truncate()).length() < 1e-5);
        }
    }

    #[test]
    fn frustum_rejects_only_shared_outside_face() {
        let mut tri = clip_tri([1.0; 3]);
        tri.vertices[0].pos = Vec4::new(2.0, 0.0, 0.0, 1.0);
        tri.vertices[1].pos = Vec4::new(3.0, 5.0, 0.0, 1.0);
        tri.vertices[2].pos = Vec4::new(1.5, -5.0, 0.0, 1.0);
        assert!(is_outside_frustum(&tri));

        // Spans the cube even though no vertex is inside it
        tri.vertices[0].pos = Vec4::new(-5.0, -5.0, 0.0, 1.0);
        tri.vertices[1].pos = Vec4::new(5.0, -5.0, 0.0, 1.0);
        tri.vertices[2].pos = Vec4::new(0.0, 5.0, 0.0, 1.0);
        assert!(!is_outside_frustum(&tri));

        tri.vertices[2].pos.x = f32::NAN;
        assert!(is_outside_frustum(&tri));
    }

    #[test]
    fn perspective_divide_keeps_w() {
        assert_eq!(
            perspective_divide(Vec4::new(2.0, 4.0, 1.0, 2.0)),
            Vec4::new(1.0, 2.0, 0.5, 2.0)
        );
    }

    #[test]
    fn screen_transform_maps_corners() {
        let size = Vec2::new(80.0, 24.0);
        assert_eq!(ndc_to_screen(Vec2::new(-1.0, -1.0), size), Vec2::ZERO);
        assert_eq!(ndc_to_screen(Vec2::new(1.0, 1.0), size), size);
        assert_eq!(ndc_to_screen(Vec2::ZERO, size), size * 0.5);
    }
}

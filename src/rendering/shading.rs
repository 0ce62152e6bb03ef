/// Pluggable shading strategies.
/// Kept separate from the rasterizer so lighting models
/// can evolve independently of the rasterization pipeline.
use crate::meshing::{Triangle, Vertex};
use crate::rendering::fragment::Fragment;
use crate::rendering::framebuffer::ColorBuffer;
use crate::rendering::texture::TextureSampler;
use glam::{Mat4, UVec2, Vec2, Vec3};
use std::ops::{Add, Mul};
use std::sync::Arc;

/// Per-vertex transform. Must leave `vertex.pos` in clip space.
pub trait VertexShader: Send + Sync {
    fn shade(&self, vertex: &mut Vertex, view: &Mat4, projection: &Mat4, time: f32);
}

/// Per-fragment color. `sun_direction` points towards the sun.
pub trait FragmentShader: Send + Sync {
    fn shade(
        &self,
        fragment: &Fragment,
        triangle: &Triangle,
        sun_direction: Vec3,
        sky_brightness: f32,
        time: f32,
    ) -> Vec3;
}

/// Screen-space pass over the composited frame. `buffer` is a stable
/// snapshot, so any cell may be read.
pub trait PostShader: Send + Sync {
    fn post(&self, buffer: &ColorBuffer, coord: UVec2, frame_size: UVec2, time: f32) -> Vec3;
}

impl<F> VertexShader for F
where
    F: Fn(&mut Vertex, &Mat4, &Mat4, f32) + Send + Sync,
{
    #[inline]
    fn shade(&self, vertex: &mut Vertex, view: &Mat4, projection: &Mat4, time: f32) {
        self(vertex, view, projection, time)
    }
}

impl<F> FragmentShader for F
where
    F: Fn(&Fragment, &Triangle, Vec3, f32, f32) -> Vec3 + Send + Sync,
{
    #[inline]
    fn shade(
        &self,
        fragment: &Fragment,
        triangle: &Triangle,
        sun_direction: Vec3,
        sky_brightness: f32,
        time: f32,
    ) -> Vec3 {
        self(fragment, triangle, sun_direction, sky_brightness, time)
    }
}

impl<F> PostShader for F
where
    F: Fn(&ColorBuffer, UVec2, UVec2, f32) -> Vec3 + Send + Sync,
{
    #[inline]
    fn post(&self, buffer: &ColorBuffer, coord: UVec2, frame_size: UVec2, time: f32) -> Vec3 {
        self(buffer, coord, frame_size, time)
    }
}

/// Smooth 0..1 ease, quadratic in and out.
#[inline]
pub fn square_interp(x: f32) -> f32 {
    if x < 0.5 {
        2.0 * x * x
    } else {
        let t = x - 1.0;
        1.0 - 2.0 * t * t
    }
}

/// Blend three per-vertex values with barycentric weights.
#[inline]
pub fn interpolate<T>(weights: Vec3, a: T, b: T, c: T) -> T
where
    T: Mul<f32, Output = T> + Add<Output = T>,
{
    a * weights.x + b * weights.y + c * weights.z
}

#[inline]
fn interpolate_attr(
    fragment: &Fragment,
    triangle: &Triangle,
    attr: impl Fn(&Vertex) -> f32,
) -> f32 {
    let [a, b, c] = &triangle.vertices;
    interpolate(fragment.weights, attr(a), attr(b), attr(c))
}

#[inline]
fn ao_factor(ao: f32) -> f32 {
    (1.0 - square_interp(ao.clamp(0.0, 1.0))) * 0.2 + 0.8
}

/// World space to clip space: `P * V * pos`. Stores the view distance
/// for fog.
#[derive(Clone, Copy, Debug, Default)]
pub struct ClipSpaceShader;

impl VertexShader for ClipSpaceShader {
    #[inline]
    fn shade(&self, vertex: &mut Vertex, view: &Mat4, projection: &Mat4, _time: f32) {
        let view_pos = *view * vertex.pos;
        vertex.distance = view_pos.truncate().length();
        vertex.pos = *projection * view_pos;
    }
}

/// Leaves positions untouched; for meshes already in clip space.
#[derive(Clone, Copy, Debug, Default)]
pub struct PassthroughShader;

impl VertexShader for PassthroughShader {
    #[inline]
    fn shade(&self, _vertex: &mut Vertex, _view: &Mat4, _projection: &Mat4, _time: f32) {}
}

/// Constant color regardless of lighting.
#[derive(Clone, Copy, Debug)]
pub struct FlatShader(pub Vec3);

impl FragmentShader for FlatShader {
    #[inline]
    fn shade(&self, _: &Fragment, _: &Triangle, _: Vec3, _: f32, _: f32) -> Vec3 {
        self.0
    }
}

/// Untextured directional + ambient lighting of the block color.
#[derive(Copy, Clone, Debug)]
pub struct LambertShader {
    /// Constant ambient term added to all fragments.
    pub ambient: f32,
    /// Strength of the directional (Lambert) term.
    pub diffuse: f32,
    /// If true, modulate lighting by the interpolated AO value.
    pub use_ao: bool,
}

impl Default for LambertShader {
    fn default() -> Self {
        Self {
            ambient: 0.35,
            diffuse: 0.65,
            use_ao: true,
        }
    }
}

impl FragmentShader for LambertShader {
    fn shade(
        &self,
        fragment: &Fragment,
        triangle: &Triangle,
        sun_direction: Vec3,
        sky_brightness: f32,
        _time: f32,
    ) -> Vec3 {
        let [r, g, b] = triangle.block.block_type.color();
        let base = Vec3::new(r as f32, g as f32, b as f32) / 255.0;

        let lambert = triangle
            .world_normal
            .normalize_or_zero()
            .dot(sun_direction.normalize_or_zero())
            .max(0.0);
        let mut light = (self.ambient + self.diffuse * lambert * sky_brightness).clamp(0.0, 1.0);
        if self.use_ao {
            light *= ao_factor(interpolate_attr(fragment, triangle, |v| v.ao));
        }
        base * light
    }
}

/// Textured block shading: texture color lit by the sun and sky,
/// darkened by AO, tinted when highlighted and fogged towards the sky.
#[derive(Clone)]
pub struct TexturedShader {
    pub sampler: Arc<dyn TextureSampler>,
    /// Daylight sky color the fog fades towards.
    pub sky_color: Vec3,
    pub render_distance: f32,
    /// Fog strength in [0, 1].
    pub fog: f32,
}

impl TexturedShader {
    pub fn new(
        sampler: Arc<dyn TextureSampler>,
        sky_color: Vec3,
        render_distance: f32,
        fog: f32,
    ) -> Self {
        Self {
            sampler,
            sky_color,
            render_distance,
            fog,
        }
    }
}

impl FragmentShader for TexturedShader {
    fn shade(
        &self,
        fragment: &Fragment,
        triangle: &Triangle,
        sun_direction: Vec3,
        sky_brightness: f32,
        _time: f32,
    ) -> Vec3 {
        let texel = self
            .sampler
            .sample(triangle.block.block_type, triangle.side, fragment.uv)
            .truncate();

        let diffuse = triangle
            .world_normal
            .normalize_or_zero()
            .dot(sun_direction.normalize_or_zero())
            * 0.5
            + 0.5;
        let daylight = 0.25 + (1.0 - 0.25) * sky_brightness.clamp(0.0, 1.0);
        let light = (diffuse * 0.4 + 0.6) * daylight;

        let ao = interpolate_attr(fragment, triangle, |v| v.ao);
        let mut color = texel * light * ao_factor(ao);

        if triangle.highlighted {
            color = color.lerp(Vec3::ONE, 0.3);
        }

        if self.fog > 0.0 && self.render_distance > 0.0 {
            let distance = interpolate_attr(fragment, triangle, |v| v.distance);
            let t = (distance / self.render_distance).clamp(0.0, 1.0);
            let amount = square_interp(t) * self.fog;
            color = color.lerp(self.sky_color * sky_brightness, amount);
        }
        color
    }
}

/// Returns the composited color unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityPost;

impl PostShader for IdentityPost {
    #[inline]
    fn post(&self, buffer: &ColorBuffer, coord: UVec2, _: UVec2, _: f32) -> Vec3 {
        buffer[(coord.x as usize, coord.y as usize)]
    }
}

/// Darkens cells towards the frame corners.
#[derive(Clone, Copy, Debug, Default)]
pub struct VignettePost;

impl PostShader for VignettePost {
    fn post(&self, buffer: &ColorBuffer, coord: UVec2, frame_size: UVec2, _: f32) -> Vec3 {
        let color = buffer[(coord.x as usize, coord.y as usize)];
        let norm: Vec2 = coord.as_vec2() * 2.0 / frame_size.max(UVec2::ONE).as_vec2() - Vec2::ONE;
        let fac = square_interp((norm.length() - 0.7).clamp(0.0, 1.0)) * 0.5;
        color * (1.0 - fac)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meshing::{Mesh, TriangleId};
    use crate::rendering::framebuffer::Grid;
    use crate::voxel::{BlockType, Side};
    use glam::{IVec3, Vec4};

    fn top_face(block: BlockType) -> Triangle {
        let mut mesh = Mesh::new();
        mesh.push_block_face(IVec3::ZERO, block, Side::Top);
        let mut tri = mesh.triangles[0];
        tri.world_normal = tri.face_normal();
        tri
    }

    fn fragment() -> Fragment {
        Fragment {
            weights: Vec3::splat(1.0 / 3.0),
            uv: Vec2::splat(0.5),
            depth: 0.5,
            opacity: 1.0,
            triangle: TriangleId(0),
        }
    }

    fn white_shader(fog: f32) -> TexturedShader {
        let sampler = |_: BlockType, _: Side, _: Vec2| Vec4::ONE;
        TexturedShader::new(Arc::new(sampler), Vec3::new(0.0, 0.0, 1.0), 10.0, fog)
    }

    #[test]
    fn square_interp_endpoints() {
        assert_eq!(square_interp(0.0), 0.0);
        assert_eq!(square_interp(0.5), 0.5);
        assert_eq!(square_interp(1.0), 1.0);
        assert!(square_interp(0.25) < 0.25);
        assert!(square_interp(0.75) > 0.75);
    }

    #[test]
    fn clip_space_shader_records_view_distance() {
        let mut v = Vertex::new(Vec3::new(0.0, 0.0, -5.0), Vec2::ZERO);
        let proj = Mat4::perspective_rh(1.0, 1.0, 0.1, 100.0);
        ClipSpaceShader.shade(&mut v, &Mat4::IDENTITY, &proj, 0.0);
        assert!((v.distance - 5.0).abs() < 1e-6);
        assert!((v.pos.w - 5.0).abs() < 1e-5);
    }

    #[test]
    fn sun_facing_surface_is_brighter() {
        let shader = white_shader(0.0);
        let tri = top_face(BlockType::Stone);
        let lit = shader.shade(&fragment(), &tri, Vec3::Y, 1.0, 0.0);
        let unlit = shader.shade(&fragment(), &tri, Vec3::NEG_Y, 1.0, 0.0);
        assert!((lit - Vec3::ONE).abs().max_element() < 1e-6);
        assert!(unlit.x < lit.x);
        assert!((unlit.x - 0.6).abs() < 1e-6);
    }

    #[test]
    fn night_dims_lighting() {
        let shader = white_shader(0.0);
        let tri = top_face(BlockType::Stone);
        let night = shader.shade(&fragment(), &tri, Vec3::Y, 0.0, 0.0);
        assert!((night.x - 0.25).abs() < 1e-6);
    }

    #[test]
    fn far_fragments_fade_into_sky() {
        let shader = white_shader(1.0);
        let mut tri = top_face(BlockType::Stone);
        for v in &mut tri.vertices {
            v.distance = 50.0;
        }
        let color = shader.shade(&fragment(), &tri, Vec3::Y, 1.0, 0.0);
        assert!(color.abs_diff_eq(Vec3::new(0.0, 0.0, 1.0), 1e-6));
    }

    #[test]
    fn highlight_tints_towards_white() {
        let sampler = |_: BlockType, _: Side, _: Vec2| Vec4::new(0.0, 0.0, 0.0, 1.0);
        let shader = TexturedShader::new(Arc::new(sampler), Vec3::ZERO, 10.0, 0.0);
        let mut tri = top_face(BlockType::Stone);
        tri.highlighted = true;
        let color = shader.shade(&fragment(), &tri, Vec3::Y, 1.0, 0.0);
        assert!(color.abs_diff_eq(Vec3::splat(0.3), 1e-6));
    }

    #[test]
    fn lambert_uses_block_color() {
        let tri = top_face(BlockType::Stone);
        let shader = LambertShader {
            use_ao: false,
            ..LambertShader::default()
        };
        let color = shader.shade(&fragment(), &tri, Vec3::Y, 1.0, 0.0);
        assert!(color.abs_diff_eq(Vec3::splat(128.0 / 255.0), 1e-6));
    }

    #[test]
    fn vignette_leaves_center_and_darkens_corners() {
        let buffer = Grid::new(10, 10, Vec3::ONE);
        let size = UVec2::new(10, 10);
        assert_eq!(VignettePost.post(&buffer, UVec2::new(5, 5), size, 0.0), Vec3::ONE);
        let corner = VignettePost.post(&buffer, UVec2::new(0, 0), size, 0.0);
        assert!(corner.x < 1.0 && corner.x >= 0.5);
    }

    #[test]
    fn closures_are_shaders() {
        let tri = top_face(BlockType::Dirt);
        let shader = |f: &Fragment, _: &Triangle, _: Vec3, _: f32, _: f32| Vec3::splat(f.depth);
        let dyn_shader: &dyn FragmentShader = &shader;
        assert_eq!(dyn_shader.shade(&fragment(), &tri, Vec3::Y, 1.0, 0.0), Vec3::splat(0.5));
    }
}

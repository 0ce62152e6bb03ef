/// Frame-scoped geometry consumed by the render pipeline
use crate::voxel::{BlockRef, BlockType, Side};
use glam::{IVec3, Vec2, Vec3, Vec4};

/// A single vertex as produced by the mesh builder and rewritten in place
/// by the vertex stage.
///
/// `pos` starts out in world space (w = 1). The vertex shader moves it to
/// clip space, the perspective divide turns it into `(x/w, y/w, z/w, w)`;
/// the pre-division `w` is kept for perspective-correct interpolation.
/// `screen` is only meaningful after the screen transform.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Vertex {
    pub pos: Vec4,
    pub screen: Vec2,
    pub tex_coord: Vec2,
    /// Ambient occlusion, 0 = unoccluded, 1 = fully occluded.
    pub ao: f32,
    /// Distance from the camera, written by the vertex shader for fog.
    pub distance: f32,
}

impl Default for Vertex {
    fn default() -> Self {
        Self {
            pos: Vec4::W,
            screen: Vec2::ZERO,
            tex_coord: Vec2::ZERO,
            ao: 0.0,
            distance: 0.0,
        }
    }
}

impl Vertex {
    #[inline]
    pub fn new(position: Vec3, tex_coord: Vec2) -> Self {
        Self {
            pos: position.extend(1.0),
            tex_coord,
            ..Self::default()
        }
    }

    #[inline]
    pub fn with_ao(mut self, ao: f32) -> Self {
        self.ao = ao;
        self
    }

    /// Linear blend of every attribute, used when clipping edges.
    #[inline]
    pub fn lerp(&self, other: &Vertex, t: f32) -> Vertex {
        Vertex {
            pos: self.pos.lerp(other.pos, t),
            screen: self.screen.lerp(other.screen, t),
            tex_coord: self.tex_coord.lerp(other.tex_coord, t),
            ao: self.ao + (other.ao - self.ao) * t,
            distance: self.distance + (other.distance - self.distance) * t,
        }
    }
}

/// Index of a triangle inside the current frame's triangle arena.
/// Only valid for the frame that produced it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TriangleId(pub u32);

impl TriangleId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Triangle {
    pub vertices: [Vertex; 3],
    /// Set by the vertex stage; dead triangles are dropped before rasterization.
    pub marked_for_death: bool,
    /// Face normal from world-space positions, recomputed every frame.
    pub world_normal: Vec3,
    /// Face normal from post-divide positions, recomputed every frame.
    pub view_normal: Vec3,
    pub block: BlockRef,
    pub side: Side,
    pub highlighted: bool,
}

impl Triangle {
    pub fn new(vertices: [Vertex; 3], block: BlockRef, side: Side) -> Self {
        Self {
            vertices,
            marked_for_death: false,
            world_normal: Vec3::ZERO,
            view_normal: Vec3::ZERO,
            block,
            side,
            highlighted: false,
        }
    }

    /// Unnormalized face normal of the current vertex positions,
    /// `(b - a) x (c - a)`.
    #[inline]
    pub fn face_normal(&self) -> Vec3 {
        let a = self.vertices[0].pos.truncate();
        let b = self.vertices[1].pos.truncate();
        let c = self.vertices[2].pos.truncate();
        (b - a).cross(c - a)
    }

    #[inline]
    pub fn is_transparent(&self) -> bool {
        self.block.is_transparent()
    }
}

/// Ordered triangle list for one frame.
#[derive(Clone, Debug, Default)]
pub struct Mesh {
    pub triangles: Vec<Triangle>,
}

// Per side: origin corner, u axis, v axis with u x v = outward normal.
const FACE_FRAMES: [(Vec3, Vec3, Vec3); 6] = [
    (Vec3::ZERO, Vec3::Z, Vec3::Y), // Left (-X)
    (Vec3::X, Vec3::Y, Vec3::Z),    // Right (+X)
    (Vec3::Y, Vec3::Z, Vec3::X),    // Top (+Y)
    (Vec3::ZERO, Vec3::X, Vec3::Z), // Bottom (-Y)
    (Vec3::Z, Vec3::X, Vec3::Y),    // Front (+Z)
    (Vec3::ZERO, Vec3::Y, Vec3::X), // Back (-Z)
];

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(triangles: usize) -> Self {
        Self {
            triangles: Vec::with_capacity(triangles),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    #[inline]
    pub fn get(&self, id: TriangleId) -> Option<&Triangle> {
        self.triangles.get(id.index())
    }

    #[inline]
    pub fn push(&mut self, triangle: Triangle) {
        self.triangles.push(triangle);
    }

    pub fn append(&mut self, mut other: Mesh) {
        self.triangles.append(&mut other.triangles);
    }

    /// Emit the two triangles of one unit-cube face of the block at `coord`.
    /// Faces are wound counter-clockwise when seen from outside the block.
    pub fn push_block_face(&mut self, coord: IVec3, block_type: BlockType, side: Side) {
        self.push_block_face_with_ao(coord, block_type, side, [0.0; 4]);
    }

    /// Like [`Mesh::push_block_face`] with per-corner ambient occlusion,
    /// corners ordered origin, +u, +u+v, +v.
    pub fn push_block_face_with_ao(
        &mut self,
        coord: IVec3,
        block_type: BlockType,
        side: Side,
        ao: [f32; 4],
    ) {
        let (origin, u, v) = FACE_FRAMES[side.index()];
        let base = coord.as_vec3() + origin;

        let corners = [
            Vertex::new(base, Vec2::new(0.0, 1.0)).with_ao(ao[0]),
            Vertex::new(base + u, Vec2::new(1.0, 1.0)).with_ao(ao[1]),
            Vertex::new(base + u + v, Vec2::new(1.0, 0.0)).with_ao(ao[2]),
            Vertex::new(base + v, Vec2::new(0.0, 0.0)).with_ao(ao[3]),
        ];

        let block = BlockRef::new(block_type, coord);
        self.triangles.push(Triangle::new(
            [corners[0], corners[1], corners[2]],
            block,
            side,
        ));
        self.triangles.push(Triangle::new(
            [corners[0], corners[2], corners[3]],
            block,
            side,
        ));
    }

    /// Mark the faces of the block at `coord` as highlighted and clear the
    /// mark everywhere else. Returns the number of highlighted triangles.
    pub fn highlight_block(&mut self, coord: Option<IVec3>) -> usize {
        let mut count = 0;
        for tri in &mut self.triangles {
            tri.highlighted = Some(tri.block.coord) == coord;
            count += tri.highlighted as usize;
        }
        count
    }

    /// All six faces of a block.
    pub fn push_block(&mut self, coord: IVec3, block_type: BlockType) {
        for side in Side::ALL {
            self.push_block_face(coord, block_type, side);
        }
    }
}

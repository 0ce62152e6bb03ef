/// Block materials and face identifiers shared by the mesh producer,
/// the texture sampling layer and the HUD
pub mod block_type;

pub use block_type::{BlockType, BLOCK_TYPE_COUNT};

use glam::IVec3;

/// Face of a block. The discriminant indexes the six textures of a
/// per-block texture set.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Side {
    Left = 0,
    Right = 1,
    #[default]
    Top = 2,
    Bottom = 3,
    Front = 4,
    Back = 5,
}

pub const SIDE_COUNT: usize = 6;

impl Side {
    pub const ALL: [Side; SIDE_COUNT] = [
        Side::Left,
        Side::Right,
        Side::Top,
        Side::Bottom,
        Side::Front,
        Side::Back,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Outward unit normal of this face in world space.
    #[inline]
    pub const fn normal(self) -> IVec3 {
        match self {
            Side::Left => IVec3::NEG_X,
            Side::Right => IVec3::X,
            Side::Top => IVec3::Y,
            Side::Bottom => IVec3::NEG_Y,
            Side::Front => IVec3::Z,
            Side::Back => IVec3::NEG_Z,
        }
    }
}

/// Provenance of a triangle: which world block produced it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct BlockRef {
    pub block_type: BlockType,
    pub coord: IVec3,
}

impl BlockRef {
    #[inline]
    pub const fn new(block_type: BlockType, coord: IVec3) -> Self {
        Self { block_type, coord }
    }

    #[inline]
    pub const fn is_transparent(&self) -> bool {
        self.block_type.is_transparent()
    }
}

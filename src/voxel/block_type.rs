/// Block type enumeration
/// Using u8 representation so a block reference stays small inside triangles

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum BlockType {
    #[default]
    Air = 0,
    Grass = 1,
    Dirt = 2,
    Stone = 3,
    Sand = 4,
    Wood = 5,
    Leaves = 6,
    Glass = 7,
    Water = 8,
}

pub const BLOCK_TYPE_COUNT: usize = 9;

// Lookup tables for block properties - eliminates branches in hot paths
const BLOCK_IS_TRANSPARENT_LUT: [bool; BLOCK_TYPE_COUNT] = [
    true,  // Air
    false, // Grass
    false, // Dirt
    false, // Stone
    false, // Sand
    false, // Wood
    true,  // Leaves
    true,  // Glass
    true,  // Water
];

const BLOCK_COLORS_LUT: [[u8; 3]; BLOCK_TYPE_COUNT] = [
    [0, 0, 0],       // Air
    [77, 153, 51],   // Grass
    [128, 102, 26],  // Dirt
    [128, 128, 128], // Stone
    [219, 203, 140], // Sand
    [110, 80, 45],   // Wood
    [46, 120, 38],   // Leaves
    [200, 230, 240], // Glass
    [40, 90, 200],   // Water
];

const BLOCK_GLYPH_LUT: [char; BLOCK_TYPE_COUNT] = [
    ' ', // Air
    'G', // Grass
    'D', // Dirt
    'S', // Stone
    's', // Sand
    'W', // Wood
    'L', // Leaves
    'g', // Glass
    '~', // Water
];

impl BlockType {
    pub const ALL: [BlockType; BLOCK_TYPE_COUNT] = [
        BlockType::Air,
        BlockType::Grass,
        BlockType::Dirt,
        BlockType::Stone,
        BlockType::Sand,
        BlockType::Wood,
        BlockType::Leaves,
        BlockType::Glass,
        BlockType::Water,
    ];

    /// Blocks shown in the HUD inventory bar, in slot order.
    pub const PLACEABLE: [BlockType; 7] = [
        BlockType::Grass,
        BlockType::Dirt,
        BlockType::Stone,
        BlockType::Sand,
        BlockType::Wood,
        BlockType::Leaves,
        BlockType::Glass,
    ];

    /// Transparent materials are rendered two-sided and composited by alpha.
    #[inline]
    pub const fn is_transparent(self) -> bool {
        BLOCK_IS_TRANSPARENT_LUT[self as usize]
    }

    #[inline]
    pub const fn is_air(self) -> bool {
        matches!(self, BlockType::Air)
    }

    /// Fast lookup-table based color retrieval - no branches
    #[inline]
    pub const fn color(self) -> [u8; 3] {
        BLOCK_COLORS_LUT[self as usize]
    }

    /// Single-character glyph used by the inventory bar.
    #[inline]
    pub const fn hud_glyph(self) -> char {
        BLOCK_GLYPH_LUT[self as usize]
    }
}

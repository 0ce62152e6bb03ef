/// Texture sampling layer.
/// Textures are small RGBA grids sampled with nearest-neighbour lookup; the
/// atlas maps (block, side) to one of six textures per block.
use crate::voxel::{BlockType, Side, SIDE_COUNT};
use glam::{Vec2, Vec3, Vec4};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Color substituted for textures that failed to load.
pub const PLACEHOLDER_COLOR: Vec3 = Vec3::new(1.0, 0.0, 1.0);

#[derive(Debug, Error)]
pub enum TextureError {
    #[error("failed to decode texture: {0}")]
    Decode(#[from] image::ImageError),
    #[error("texture {0} has no pixels")]
    Empty(String),
}

/// Read-only sampling capability shared by every worker thread.
pub trait TextureSampler: Send + Sync {
    /// Color in `xyz`, alpha in `w`.
    fn sample(&self, block: BlockType, side: Side, uv: Vec2) -> Vec4;
}

impl<F> TextureSampler for F
where
    F: Fn(BlockType, Side, Vec2) -> Vec4 + Send + Sync,
{
    #[inline]
    fn sample(&self, block: BlockType, side: Side, uv: Vec2) -> Vec4 {
        self(block, side, uv)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Texture {
    width: usize,
    height: usize,
    // Row-major, rgb + alpha
    texels: Vec<Vec4>,
}

impl Texture {
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> Vec4) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let mut texels = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                texels.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            texels,
        }
    }

    pub fn solid(color: Vec3, alpha: f32) -> Self {
        Self::from_fn(1, 1, |_, _| color.extend(alpha))
    }

    /// 1x1 magenta, fully opaque.
    pub fn placeholder() -> Self {
        Self::solid(PLACEHOLDER_COLOR, 1.0)
    }

    /// Decode an image file into an RGBA texture.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TextureError> {
        let path = path.as_ref();
        let image = image::open(path)?.to_rgba8();
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(TextureError::Empty(path.display().to_string()));
        }

        const INV_255: f32 = 1.0 / 255.0;
        Ok(Self::from_fn(width as usize, height as usize, |x, y| {
            let [r, g, b, a] = image.get_pixel(x as u32, y as u32).0;
            Vec4::new(r as f32, g as f32, b as f32, a as f32) * INV_255
        }))
    }

    /// Load a texture, falling back to the placeholder so a missing asset
    /// shows up on screen instead of aborting the renderer.
    pub fn load_or_placeholder(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(texture) => texture,
            Err(err) => {
                log::warn!("using placeholder for {}: {}", path.display(), err);
                Self::placeholder()
            }
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Nearest texel for `uv` in [0, 1]; out-of-range coordinates clamp to
    /// the edge texels.
    #[inline]
    pub fn sample(&self, uv: Vec2) -> Vec4 {
        // Float-to-int casts saturate and map NaN to 0
        let x = ((uv.x * self.width as f32) as i64).clamp(0, self.width as i64 - 1) as usize;
        let y = ((uv.y * self.height as f32) as i64).clamp(0, self.height as i64 - 1) as usize;
        self.texels[y * self.width + x]
    }
}

/// The six textures of one block, indexed by [`Side`].
#[derive(Clone, Debug)]
pub struct TextureSet {
    textures: [Arc<Texture>; SIDE_COUNT],
}

impl TextureSet {
    pub fn uniform(texture: Texture) -> Self {
        let t = Arc::new(texture);
        Self {
            textures: std::array::from_fn(|_| t.clone()),
        }
    }

    /// One texture for the four sides, one shared by top and bottom.
    pub fn side_top_bottom(side: Texture, top_bottom: Texture) -> Self {
        let top_bottom = Arc::new(top_bottom);
        Self::from_parts(Arc::new(side), top_bottom.clone(), top_bottom)
    }

    pub fn side_top_bottom_split(side: Texture, top: Texture, bottom: Texture) -> Self {
        Self::from_parts(Arc::new(side), Arc::new(top), Arc::new(bottom))
    }

    fn from_parts(side: Arc<Texture>, top: Arc<Texture>, bottom: Arc<Texture>) -> Self {
        let textures = std::array::from_fn(|i| match Side::ALL[i] {
            Side::Top => top.clone(),
            Side::Bottom => bottom.clone(),
            _ => side.clone(),
        });
        Self { textures }
    }

    #[inline]
    pub fn texture(&self, side: Side) -> &Texture {
        &self.textures[side.index()]
    }

    #[inline]
    pub fn sample(&self, side: Side, uv: Vec2) -> Vec4 {
        self.texture(side).sample(uv)
    }
}

/// Texture sets for every block type
pub struct TextureAtlas {
    pub sets: Vec<TextureSet>,
}

impl TextureAtlas {
    /// Atlas where every block uses the placeholder texture.
    pub fn placeholder() -> Self {
        Self {
            sets: BlockType::ALL
                .iter()
                .map(|_| TextureSet::uniform(Texture::placeholder()))
                .collect(),
        }
    }

    /// Replace the texture set used for `block`.
    pub fn set(&mut self, block: BlockType, set: TextureSet) {
        self.sets[block as usize] = set;
    }

    #[inline]
    pub fn texture_set(&self, block: BlockType) -> &TextureSet {
        &self.sets[block as usize]
    }
}

impl TextureSampler for TextureAtlas {
    #[inline]
    fn sample(&self, block: BlockType, side: Side, uv: Vec2) -> Vec4 {
        self.texture_set(block).sample(side, uv)
    }
}

impl Default for TextureAtlas {
    /// Procedural 8x8 textures so the renderer works without any assets.
    fn default() -> Self {
        let mut atlas = Self::placeholder();

        let grass_top = create_noise([77, 153, 51], [60, 125, 40], 1, 1.0);
        let dirt = create_noise([128, 102, 26], [104, 80, 20], 2, 1.0);
        let grass_side = Texture::from_fn(8, 8, |x, y| {
            if y < 2 {
                grass_top.sample(Vec2::new(x as f32 / 8.0, y as f32 / 8.0))
            } else {
                dirt.sample(Vec2::new(x as f32 / 8.0, y as f32 / 8.0))
            }
        });
        atlas.set(
            BlockType::Grass,
            TextureSet::side_top_bottom_split(grass_side, grass_top, dirt.clone()),
        );
        atlas.set(BlockType::Dirt, TextureSet::uniform(dirt));
        atlas.set(
            BlockType::Stone,
            TextureSet::uniform(create_noise([128, 128, 128], [104, 104, 110], 3, 1.0)),
        );
        atlas.set(
            BlockType::Sand,
            TextureSet::uniform(create_noise([219, 203, 140], [200, 185, 120], 4, 1.0)),
        );

        let bark = Texture::from_fn(8, 8, |x, _| {
            (rgb([110, 80, 45]) * if x % 3 == 0 { 0.8 } else { 1.0 }).extend(1.0)
        });
        let rings = Texture::from_fn(8, 8, |x, y| {
            let d = (x as i32 * 2 - 7).abs().max((y as i32 * 2 - 7).abs());
            let shade = if (d / 2) % 2 == 0 { 1.0 } else { 0.85 };
            (rgb([170, 130, 80]) * shade).extend(1.0)
        });
        atlas.set(BlockType::Wood, TextureSet::side_top_bottom(bark, rings));

        // Leaves have fully transparent holes
        atlas.set(
            BlockType::Leaves,
            TextureSet::uniform(create_noise([46, 120, 38], [30, 95, 28], 6, 0.0)),
        );

        let glass = Texture::from_fn(8, 8, |x, y| {
            let frame = x == 0 || y == 0 || x == 7 || y == 7;
            if frame {
                rgb([235, 245, 250]).extend(0.9)
            } else {
                rgb([200, 230, 240]).extend(0.25)
            }
        });
        atlas.set(BlockType::Glass, TextureSet::uniform(glass));
        atlas.set(
            BlockType::Water,
            TextureSet::uniform(create_noise([40, 90, 200], [35, 80, 185], 8, 0.6)),
        );

        atlas
    }
}

#[inline]
fn rgb(c: [u8; 3]) -> Vec3 {
    Vec3::new(c[0] as f32, c[1] as f32, c[2] as f32) / 255.0
}

/// Two-tone noise texture. Dark texels get `dark_alpha`, the rest are opaque
/// unless `dark_alpha` is below one, in which case every texel is translucent
/// at that level and dark ones punch holes.
fn create_noise(base: [u8; 3], dark: [u8; 3], seed: u32, dark_alpha: f32) -> Texture {
    let mut state: u32 = 12345 ^ seed.wrapping_mul(0x9E37_79B9);
    let base = rgb(base);
    let dark = rgb(dark);
    Texture::from_fn(8, 8, |_, _| {
        state = state.wrapping_mul(1103515245).wrapping_add(12345);
        let is_dark = (state >> 16) & 3 == 0;
        match (is_dark, dark_alpha) {
            (true, a) if a <= 0.0 => dark.extend(0.0),
            (true, a) => dark.extend(a),
            (false, a) if a > 0.0 && a < 1.0 => base.extend(a),
            (false, _) => base.extend(1.0),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient() -> Texture {
        Texture::from_fn(4, 2, |x, y| Vec4::new(x as f32, y as f32, 0.0, 1.0))
    }

    #[test]
    fn sample_picks_nearest_texel() {
        let t = gradient();
        assert_eq!(t.sample(Vec2::new(0.0, 0.0)), Vec4::new(0.0, 0.0, 0.0, 1.0));
        assert_eq!(t.sample(Vec2::new(0.6, 0.7)), Vec4::new(2.0, 1.0, 0.0, 1.0));
    }

    #[test]
    fn sample_clamps_out_of_range_coordinates() {
        let t = gradient();
        assert_eq!(t.sample(Vec2::new(-3.0, -0.5)), Vec4::new(0.0, 0.0, 0.0, 1.0));
        assert_eq!(t.sample(Vec2::new(1.0, 1.0)), Vec4::new(3.0, 1.0, 0.0, 1.0));
        assert_eq!(t.sample(Vec2::new(42.0, 9.0)), Vec4::new(3.0, 1.0, 0.0, 1.0));
        assert_eq!(t.sample(Vec2::new(f32::NAN, 0.0)), Vec4::new(0.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn missing_file_falls_back_to_placeholder() {
        let t = Texture::load_or_placeholder("definitely/not/here.png");
        assert_eq!(t, Texture::placeholder());
        assert_eq!(t.sample(Vec2::splat(0.5)), PLACEHOLDER_COLOR.extend(1.0));
    }

    #[test]
    fn texture_set_routes_sides() {
        let side = Texture::solid(Vec3::X, 1.0);
        let top = Texture::solid(Vec3::Y, 1.0);
        let bottom = Texture::solid(Vec3::Z, 1.0);
        let set = TextureSet::side_top_bottom_split(side, top, bottom);

        assert_eq!(set.sample(Side::Top, Vec2::ZERO).truncate(), Vec3::Y);
        assert_eq!(set.sample(Side::Bottom, Vec2::ZERO).truncate(), Vec3::Z);
        for s in [Side::Left, Side::Right, Side::Front, Side::Back] {
            assert_eq!(set.sample(s, Vec2::ZERO).truncate(), Vec3::X);
        }
    }

    #[test]
    fn default_atlas_alpha_matches_material() {
        let atlas = TextureAtlas::default();
        for block in [BlockType::Grass, BlockType::Dirt, BlockType::Stone, BlockType::Wood] {
            for side in Side::ALL {
                for i in 0..8 {
                    let uv = Vec2::new(i as f32 / 8.0, (7 - i) as f32 / 8.0);
                    let alpha = atlas.sample(block, side, uv).w;
                    assert_eq!(alpha, 1.0, "{:?} should be opaque", block);
                }
            }
        }
        // Glass interior is see-through
        assert!(atlas.sample(BlockType::Glass, Side::Front, Vec2::splat(0.5)).w < 1.0);
    }

    #[test]
    fn closures_are_samplers() {
        let sampler = |_: BlockType, _: Side, uv: Vec2| uv.extend(0.0).extend(0.5);
        let s: &dyn TextureSampler = &sampler;
        assert_eq!(s.sample(BlockType::Stone, Side::Top, Vec2::new(0.25, 0.75)).w, 0.5);
    }
}

/// Software rendering pipeline
/// Mesh in, escape-coded terminal frame out
pub mod compositor;
pub mod encoder;
pub mod fragment;
pub mod framebuffer;
pub mod hud;
pub mod pipeline;
pub mod rasterizer;
pub mod shading;
pub mod texture;
pub mod vertex_stage;

pub use encoder::ColorMode;
pub use fragment::{Fragment, FragmentList};
pub use framebuffer::{ColorBuffer, DebugBuffer, FragmentBuffer, Framebuffer, Grid, HudBuffer};
pub use pipeline::{FrameParams, RenderContext};
pub use rasterizer::Rasterizer;
pub use shading::{
    ClipSpaceShader, FlatShader, FragmentShader, IdentityPost, LambertShader, PassthroughShader,
    PostShader, TexturedShader, VertexShader, VignettePost,
};
pub use texture::{Texture, TextureAtlas, TextureError, TextureSampler, TextureSet};
pub use vertex_stage::VertexStage;

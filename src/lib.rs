pub mod camera;
pub mod config;
pub mod meshing;
pub mod perf;
pub mod rendering;
/// Termcraft - CPU software rasterizer for voxel meshes in the terminal
/// Built with compartmentalized benchmarkable stages
pub mod voxel;

pub use camera::Camera;
pub use config::{ConfigError, RenderSettings};
pub use meshing::{Mesh, Triangle, TriangleId, Vertex};
pub use perf::{CounterSnapshot, FrameStats, FunctionCounters, FUNCTION_COUNTERS};
pub use rendering::{ColorMode, FrameParams, RenderContext, TextureAtlas, TextureSampler};
pub use voxel::{BlockRef, BlockType, Side};

/// Triangle mesh types handed to the renderer every frame
pub mod mesh;

pub use mesh::{Mesh, Triangle, TriangleId, Vertex};

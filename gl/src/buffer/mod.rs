//! Vertex and primitive buffers, vertex declarations and volatile pools.

mod decl;
mod pool;
mod primitive;
mod vertex;

pub use decl::VertexDecl;
pub use pool::VolatilePool;
pub use primitive::{PrimitiveBuffer, INDEX_SIZE};
pub use vertex::VertexBuffer;

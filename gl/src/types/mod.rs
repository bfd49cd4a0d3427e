//! Portable types and descriptors.
//!
//! This module contains the enumerations and descriptors callers use to
//! describe what they want drawn, independent of the native API.

mod common;
mod format;
mod primitive;
mod sampler;
mod state;
mod vertex;

pub use common::{
    ClearFlags, ColorF, Point2I, RectI, MAX_RENDER_SLOTS, TEXTURE_STAGE_COUNT, VERTEX_STREAM_COUNT,
};
pub use format::{PixelFormat, TextureUsage};
pub use primitive::PrimitiveType;
pub use sampler::{FilterMode, SamplerDesc};
pub use state::{
    BlendFactor, BlendOp, CompareFunction, CullMode, FillMode, StateBlockDesc, StencilOp,
};
pub use vertex::{
    BufferType, VertexElement, VertexElementType, VertexFormat, VertexSemantic,
};

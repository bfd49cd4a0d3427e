//! # RedLilium GL
//!
//! OpenGL rendering device for RedLilium.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`GlDevice`] - Lazy state reconciliation and draw submission
//! - [`GpuResource`] - Resources that survive context loss by being
//!   zombified and resurrected
//! - [`GlStateCache`] - Redundant binding elimination
//! - [`StateBlock`] - Immutable render state applied as a minimal diff
//! - [`GlDriver`] - The seam to the native API, with a recording
//!   implementation for tests
//!
//! ## Example
//!
//! ```ignore
//! use redlilium_gl::{DeviceConfig, GlDevice, RecordingDriver};
//!
//! let driver = Arc::new(RecordingDriver::new());
//! let mut device = GlDevice::new(driver, DeviceConfig::default())?;
//! device.begin_scene();
//! // Set targets, buffers and shaders, then draw...
//! device.end_scene();
//! ```

pub mod buffer;
pub mod config;
pub mod device;
pub mod driver;
pub mod error;
pub mod profiler;
pub mod query;
pub mod resource;
pub mod shader;
pub mod state_block;
pub mod state_cache;
pub mod target;
pub mod texture;
pub mod translate;
pub mod types;

// Re-export main types for convenience
pub use buffer::{PrimitiveBuffer, VertexBuffer, VertexDecl};
pub use config::DeviceConfig;
pub use device::{DeviceStatistics, GlDevice, PendingState};
pub use driver::{ContextId, Extension, GlCall, GlDriver};
#[cfg(feature = "recording")]
pub use driver::RecordingDriver;
pub use error::{GraphicsError, GraphicsResult};
pub use profiler::CardProfile;
pub use query::{Fence, FenceKind, FenceStatus, OcclusionQuery, OcclusionQueryStatus};
pub use resource::{GpuResource, ResourceId, ResourceKind};
pub use shader::{
    GenericShaderType, Shader, ShaderConstBuffer, ShaderConstHandle, ShaderConstValue,
    ShaderDescriptor,
};
pub use state_block::StateBlock;
pub use state_cache::GlStateCache;
pub use target::{RenderSlot, RenderTarget, TargetRef, TextureTarget, WindowTarget};
pub use texture::{GlTextureManager, Texture, TextureDescriptor, TextureManager};
pub use types::{
    BufferType, ClearFlags, ColorF, PixelFormat, Point2I, PrimitiveType, RectI, SamplerDesc,
    StateBlockDesc, TextureUsage, VertexElementType, VertexFormat, VertexSemantic,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}

//! Common utilities for device integration tests.
//!
//! Every test drives a [`GlDevice`] over a [`RecordingDriver`] and asserts on
//! the recorded native call stream.

#![allow(dead_code)]

use std::sync::Arc;

use redlilium_gl::{
    BufferType, ContextId, DeviceConfig, Extension, GlCall, GlDevice, Point2I, RecordingDriver,
    VertexBuffer, VertexElementType, VertexFormat, VertexSemantic, WindowTarget,
};

/// Window size used by [`TestContext::with_window`].
pub const WINDOW_SIZE: Point2I = Point2I::new(640, 480);

/// Size in bytes of one [`position_color_format`] vertex.
pub const POSITION_COLOR_SIZE: u32 = 16;

/// Three corners of a triangle, position only.
#[rustfmt::skip]
pub const TRIANGLE_VERTICES: [f32; 9] = [
    0.0, 0.0, 0.0,
    1.0, 0.0, 0.0,
    0.0, 1.0, 0.0,
];

/// Vertex attribute path a test context is created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttribPath {
    /// Attribute pointers re-specified before each draw.
    Legacy,
    /// Native per-binding attributes.
    Bound,
}

// ============================================================================
// Test Context
// ============================================================================

/// Device and driver under test.
pub struct TestContext {
    pub driver: Arc<RecordingDriver>,
    pub device: GlDevice,
}

impl TestContext {
    /// Create a device on the legacy attribute path.
    pub fn new() -> Self {
        Self::with_path(AttribPath::Legacy)
    }

    /// Create a device on the given attribute path.
    pub fn with_path(path: AttribPath) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();

        let driver = match path {
            AttribPath::Legacy => RecordingDriver::new(),
            AttribPath::Bound => {
                RecordingDriver::new().with_extension(Extension::ArbVertexAttribBinding)
            }
        };
        let driver = Arc::new(driver);
        let device = GlDevice::new(driver.clone(), DeviceConfig::new().with_debug_output(false))
            .expect("Failed to create device");
        Self { driver, device }
    }

    /// Create a device and make a window target of [`WINDOW_SIZE`] active.
    pub fn with_window(path: AttribPath) -> (Self, Arc<WindowTarget>) {
        let mut ctx = Self::with_path(path);
        let window = ctx.device.alloc_window_target(ContextId(1), WINDOW_SIZE);
        ctx.device.set_active_render_target(window.clone());
        (ctx, window)
    }

    /// Static vertex buffer holding [`TRIANGLE_VERTICES`].
    pub fn triangle_buffer(&mut self) -> Arc<VertexBuffer> {
        self.device
            .alloc_vertex_buffer(
                3,
                &position_format(),
                12,
                BufferType::Static,
                Some(bytemuck::cast_slice(&TRIANGLE_VERTICES)),
            )
            .expect("Failed to create vertex buffer")
    }

    /// Bind a triangle buffer with its declaration and the flat-colour shader.
    pub fn bind_triangle(&mut self) -> Arc<VertexBuffer> {
        let vb = self.triangle_buffer();
        let decl = self.device.alloc_vertex_decl(&position_format());
        self.device.set_vertex_buffer(Some(vb.clone()));
        self.device.set_vertex_decl(Some(decl));
        self.device.set_shader(None);
        vb
    }

    /// Recorded calls since the last take, with native names erased.
    pub fn take_erased_calls(&self) -> Vec<GlCall> {
        erase(&self.driver.take_calls())
    }

    /// Recorded draw commands since the last take.
    pub fn take_draws(&self) -> Vec<GlCall> {
        self.driver
            .take_calls()
            .into_iter()
            .filter(GlCall::is_draw)
            .collect()
    }
}

/// Position-only vertex format.
pub fn position_format() -> VertexFormat {
    VertexFormat::new().with_element(VertexSemantic::Position, VertexElementType::Float3)
}

/// Position and packed colour.
pub fn position_color_format() -> VertexFormat {
    position_format().with_element(VertexSemantic::Color, VertexElementType::Color)
}

/// Replace every native name in `calls` by the null object.
pub fn erase(calls: &[GlCall]) -> Vec<GlCall> {
    calls.iter().map(GlCall::erase_handles).collect()
}

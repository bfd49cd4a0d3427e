//! Native driver abstraction layer.
//!
//! The device never talks to a GL loader directly. Everything it needs from
//! the native API goes through the [`GlDriver`] trait:
//! - State-changing commands are submitted as [`GlCall`] values
//! - Object creation and queries are typed methods returning handles
//!
//! # Available Drivers
//!
//! - `recording` (default): records every call for inspection, used by tests
//!   and for replaying command streams without a GPU
//!
//! A driver backed by a real context implements the same trait by matching
//! on [`GlCall`] and forwarding to the loaded entry points.

pub mod gl;

#[cfg(feature = "recording")]
pub mod recording;

use crate::error::GraphicsResult;

pub use gl::GLenum;

#[cfg(feature = "recording")]
pub use recording::RecordingDriver;

macro_rules! native_handle {
    ($(#[$meta:meta])* $name:ident($repr:ty)) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
        pub struct $name(pub $repr);

        impl $name {
            /// The null object (binding it unbinds the slot).
            pub const NONE: Self = Self(0);

            /// Returns true if this is the null object.
            pub fn is_none(self) -> bool {
                self.0 == 0
            }
        }
    };
}

native_handle!(
    /// Native buffer object name.
    BufferHandle(u32)
);
native_handle!(
    /// Native texture object name.
    TextureHandle(u32)
);
native_handle!(
    /// Native framebuffer object name.
    FramebufferHandle(u32)
);
native_handle!(
    /// Native linked program name.
    ProgramHandle(u32)
);
native_handle!(
    /// Native query object name.
    QueryHandle(u32)
);
native_handle!(
    /// Native fence sync object.
    SyncHandle(u64)
);
native_handle!(
    /// Native vertex array object name.
    VertexArrayHandle(u32)
);

/// Identifier of a native drawing context (one per window surface).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(pub u64);

/// Driver extensions the device knows how to exploit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Extension {
    /// `GL_KHR_debug`
    KhrDebug,
    /// `GL_ARB_debug_output`
    ArbDebugOutput,
    /// `GL_AMD_debug_output`
    AmdDebugOutput,
    /// `GL_ARB_vertex_attrib_binding`
    ArbVertexAttribBinding,
    /// `GL_ARB_sync`
    ArbSync,
    /// `GL_ARB_texture_filter_anisotropic`
    ArbTextureFilterAnisotropic,
    /// `GL_ARB_color_buffer_float` (blending into 32-bit float targets)
    ArbColorBufferFloat,
    /// `GL_OES_texture_float_linear` (filtering 32-bit float textures)
    OesTextureFloatLinear,
    /// `GL_EXT_texture_compression_s3tc`
    ExtTextureCompressionS3tc,
}

/// Shader sources handed to the external compiler when linking a program.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramSource {
    /// Opaque path of the vertex stage source.
    pub vertex_file: String,
    /// Opaque path of the pixel stage source.
    pub pixel_file: String,
    /// Requested pixel shader model.
    pub pixel_version: f32,
}

/// Result of waiting on a fence sync object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncStatus {
    /// The fence was already signaled when queried.
    AlreadySignaled,
    /// The fence was signaled within the timeout.
    ConditionSatisfied,
    /// The timeout elapsed before the fence was signaled.
    TimeoutExpired,
    /// The wait failed (e.g. the context was lost).
    WaitFailed,
}

/// Sink for native debug-output messages.
pub type DebugCallback = Box<dyn Fn(&str) + Send + Sync>;

/// A native state-changing command.
///
/// Commands are fire-and-forget; object creation lives on [`GlDriver`]
/// because it returns a handle.
#[derive(Debug, Clone, PartialEq)]
pub enum GlCall {
    Enable(GLenum),
    Disable(GLenum),
    BlendFuncSeparate {
        src_rgb: GLenum,
        dst_rgb: GLenum,
        src_alpha: GLenum,
        dst_alpha: GLenum,
    },
    BlendEquationSeparate {
        rgb: GLenum,
        alpha: GLenum,
    },
    ColorMask {
        red: bool,
        green: bool,
        blue: bool,
        alpha: bool,
    },
    DepthFunc(GLenum),
    DepthMask(bool),
    PolygonOffset {
        factor: f32,
        units: f32,
    },
    StencilFunc {
        func: GLenum,
        reference: i32,
        mask: u32,
    },
    StencilOp {
        fail: GLenum,
        depth_fail: GLenum,
        pass: GLenum,
    },
    StencilMask(u32),
    CullFace(GLenum),
    PolygonMode(GLenum),
    ClearColor([f32; 4]),
    ClearDepth(f32),
    ClearStencil(i32),
    Clear(u32),
    Viewport {
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    },
    PixelStore {
        pname: GLenum,
        param: i32,
    },
    ActiveTexture(GLenum),
    BindTexture {
        target: GLenum,
        texture: TextureHandle,
    },
    TexParameter {
        target: GLenum,
        pname: GLenum,
        param: i32,
    },
    TextureStorage {
        texture: TextureHandle,
        target: GLenum,
        levels: u32,
        internal_format: GLenum,
        width: u32,
        height: u32,
    },
    GenerateMipmap(TextureHandle),
    NamedBufferData {
        buffer: BufferHandle,
        size: u64,
        usage: GLenum,
    },
    NamedBufferSubData {
        buffer: BufferHandle,
        offset: u64,
        size: u64,
    },
    BindBuffer {
        target: GLenum,
        buffer: BufferHandle,
    },
    BindVertexArray(VertexArrayHandle),
    BindVertexBuffer {
        binding: u32,
        buffer: BufferHandle,
        offset: u64,
        stride: u32,
    },
    VertexBindingDivisor {
        binding: u32,
        divisor: u32,
    },
    VertexAttribFormat {
        index: u32,
        size: u32,
        ty: GLenum,
        normalized: bool,
        offset: u32,
    },
    VertexAttribBinding {
        index: u32,
        binding: u32,
    },
    VertexAttribPointer {
        index: u32,
        size: u32,
        ty: GLenum,
        normalized: bool,
        stride: u32,
        offset: u32,
    },
    VertexAttribDivisor {
        index: u32,
        divisor: u32,
    },
    EnableVertexAttribArray(u32),
    DisableVertexAttribArray(u32),
    UseProgram(ProgramHandle),
    UniformMatrix4 {
        location: i32,
        value: [f32; 16],
    },
    Uniform4f {
        location: i32,
        value: [f32; 4],
    },
    Uniform1i {
        location: i32,
        value: i32,
    },
    BindFramebuffer {
        target: GLenum,
        framebuffer: FramebufferHandle,
    },
    FramebufferTexture2D {
        attachment: GLenum,
        textarget: GLenum,
        texture: TextureHandle,
        level: u32,
    },
    DrawBuffers(u32),
    DrawArrays {
        mode: GLenum,
        first: u32,
        count: u32,
    },
    DrawArraysInstanced {
        mode: GLenum,
        first: u32,
        count: u32,
        instances: u32,
    },
    DrawElements {
        mode: GLenum,
        count: u32,
        ty: GLenum,
        offset: u64,
    },
    DrawElementsInstanced {
        mode: GLenum,
        count: u32,
        ty: GLenum,
        offset: u64,
        instances: u32,
    },
    BeginQuery {
        target: GLenum,
        query: QueryHandle,
    },
    EndQuery(GLenum),
    MakeCurrent(ContextId),
    DebugMessageControl {
        enabled: bool,
    },
    Finish,
    Flush,
    DeleteBuffer(BufferHandle),
    DeleteTexture(TextureHandle),
    DeleteFramebuffer(FramebufferHandle),
    DeleteProgram(ProgramHandle),
    DeleteQuery(QueryHandle),
    DeleteSync(SyncHandle),
    DeleteVertexArray(VertexArrayHandle),
}

impl GlCall {
    /// Returns a copy with every native object name replaced by the null
    /// object, so call streams from different context generations compare
    /// equal when they differ only in handle identity.
    pub fn erase_handles(&self) -> GlCall {
        let mut call = self.clone();
        match &mut call {
            Self::BindTexture { texture, .. }
            | Self::TextureStorage { texture, .. }
            | Self::FramebufferTexture2D { texture, .. } => *texture = TextureHandle::NONE,
            Self::GenerateMipmap(texture) | Self::DeleteTexture(texture) => {
                *texture = TextureHandle::NONE
            }
            Self::NamedBufferData { buffer, .. }
            | Self::NamedBufferSubData { buffer, .. }
            | Self::BindBuffer { buffer, .. }
            | Self::BindVertexBuffer { buffer, .. } => *buffer = BufferHandle::NONE,
            Self::DeleteBuffer(buffer) => *buffer = BufferHandle::NONE,
            Self::BindVertexArray(vao) | Self::DeleteVertexArray(vao) => {
                *vao = VertexArrayHandle::NONE
            }
            Self::UseProgram(program) | Self::DeleteProgram(program) => {
                *program = ProgramHandle::NONE
            }
            Self::BindFramebuffer { framebuffer, .. } => *framebuffer = FramebufferHandle::NONE,
            Self::DeleteFramebuffer(framebuffer) => *framebuffer = FramebufferHandle::NONE,
            Self::BeginQuery { query, .. } => *query = QueryHandle::NONE,
            Self::DeleteQuery(query) => *query = QueryHandle::NONE,
            Self::DeleteSync(sync) => *sync = SyncHandle::NONE,
            _ => {}
        }
        call
    }

    /// Returns true for draw commands.
    pub fn is_draw(&self) -> bool {
        matches!(
            self,
            Self::DrawArrays { .. }
                | Self::DrawArraysInstanced { .. }
                | Self::DrawElements { .. }
                | Self::DrawElementsInstanced { .. }
        )
    }
}

/// Native driver trait.
///
/// Every method is called on the thread owning the native context; the
/// `Send + Sync` bound only allows resources to keep a shared handle to the
/// driver. Creation methods fail with
/// [`GraphicsError::ContextLost`](crate::GraphicsError::ContextLost) while
/// the context is unusable.
pub trait GlDriver: Send + Sync + 'static {
    /// Get the driver name.
    fn name(&self) -> &'static str;

    /// Resolve the core and extension entry points for the current context.
    fn load_bindings(&self) -> GraphicsResult<()>;

    /// Check whether an extension is exposed by the current context.
    fn has_extension(&self, extension: Extension) -> bool;

    /// Query an integer limit.
    fn get_integer(&self, pname: GLenum) -> i32;

    /// Shading language version of the current context, `0.0` when the
    /// context has no programmable pipeline.
    fn shading_language_version(&self) -> f32;

    /// Execute a state-changing command.
    fn submit(&self, call: GlCall);

    /// Create a buffer object.
    fn gen_buffer(&self) -> GraphicsResult<BufferHandle>;

    /// Create a texture object.
    fn gen_texture(&self) -> GraphicsResult<TextureHandle>;

    /// Create a framebuffer object.
    fn gen_framebuffer(&self) -> GraphicsResult<FramebufferHandle>;

    /// Create a query object.
    fn gen_query(&self) -> GraphicsResult<QueryHandle>;

    /// Create a vertex array object.
    fn gen_vertex_array(&self) -> GraphicsResult<VertexArrayHandle>;

    /// Compile and link a program from opaque source paths.
    fn create_program(&self, source: &ProgramSource) -> GraphicsResult<ProgramHandle>;

    /// Look up a uniform location, `None` if the program has no such uniform.
    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<i32>;

    /// Insert a fence into the command stream.
    fn fence_sync(&self) -> GraphicsResult<SyncHandle>;

    /// Wait on a fence for at most `timeout_ns` nanoseconds.
    fn client_wait_sync(&self, sync: SyncHandle, timeout_ns: u64) -> SyncStatus;

    /// Read a query result; with `wait == false` returns `None` while the
    /// result is not yet available.
    fn query_result(&self, query: QueryHandle, wait: bool) -> Option<u64>;

    /// Install (or remove) the debug-output message sink.
    fn set_debug_callback(&self, callback: Option<DebugCallback>);
}

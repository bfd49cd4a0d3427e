//! The GL device.
//!
//! [`GlDevice`] records the logical draw state requested by the caller
//! (vertex streams, shader, state block, textures, render target, clip rect)
//! and reconciles it with the driver lazily:
//! - Mutations only set [`PendingState`] flags
//! - The flush before each draw or clear consumes those flags and issues
//!   only the native calls needed to bring the driver up to date
//! - Bindings already known to be current are skipped by the
//!   [`GlStateCache`]
//!
//! The device also drives context-loss recovery: [`GlDevice::zombify`]
//! releases every native object, [`GlDevice::resurrect`] recreates them and
//! replays the logical state on the next flush.
//!
//! # Example
//!
//! ```ignore
//! let driver = Arc::new(RecordingDriver::new());
//! let mut device = GlDevice::new(driver, DeviceConfig::default())?;
//!
//! let window = device.alloc_window_target(ContextId(1), Point2I::new(800, 600));
//! device.set_active_render_target(window);
//! device.set_vertex_buffer(Some(vb));
//! let decl = device.alloc_vertex_decl(&format);
//! device.set_vertex_decl(Some(decl));
//! device.set_shader(None);
//! device.draw_primitive(PrimitiveType::TriangleList, 0, 2);
//! ```

mod draw;
mod factory;
mod lifecycle;
mod stats;
mod targets;

use std::collections::HashMap;
use std::sync::Arc;

use bitflags::bitflags;
use glam::Mat4;

use crate::buffer::{PrimitiveBuffer, VertexBuffer, VertexDecl, VolatilePool};
use crate::config::DeviceConfig;
use crate::driver::gl;
use crate::driver::{ContextId, Extension, GlCall, GlDriver, VertexArrayHandle};
use crate::error::GraphicsResult;
use crate::profiler::CardProfile;
use crate::resource::{DeviceShared, RetiredName};
use crate::shader::{GenericShader, GenericShaderType, Shader, ShaderConstBuffer};
use crate::state_block::StateBlock;
use crate::state_cache::GlStateCache;
use crate::target::TargetRef;
use crate::texture::{GlTextureManager, Texture, TextureManager};
use crate::types::{RectI, StateBlockDesc, TEXTURE_STAGE_COUNT, VERTEX_STREAM_COUNT};

pub use stats::DeviceStatistics;

bitflags! {
    /// Logical state changed since the last flush.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PendingState: u32 {
        /// A different state block was requested.
        const STATE_BLOCK = 1 << 0;
        /// A texture unit changed.
        const TEXTURES = 1 << 1;
        /// The render target changed.
        const RENDER_TARGET = 1 << 2;
        /// The viewport changed.
        const VIEWPORT = 1 << 3;
        /// Vertex streams, declaration or attribute path changed.
        const VERTEX_ATTRIB = 1 << 4;

        /// Device-global state reconciled by the state pass.
        const STATE = Self::STATE_BLOCK.bits()
            | Self::TEXTURES.bits()
            | Self::RENDER_TARGET.bits()
            | Self::VIEWPORT.bits();
    }
}

const ALL_UNITS: u32 = (1 << TEXTURE_STAGE_COUNT) - 1;

/// OpenGL rendering device.
pub struct GlDevice {
    shared: Arc<DeviceShared>,
    driver: Arc<dyn GlDriver>,
    config: DeviceConfig,
    profile: CardProfile,
    attrib_binding: bool,
    cache: GlStateCache,
    vertex_array: VertexArrayHandle,
    pending: PendingState,

    // Geometry
    vertex_buffers: [Option<Arc<VertexBuffer>>; VERTEX_STREAM_COUNT],
    vertex_divisors: [u32; VERTEX_STREAM_COUNT],
    draw_instances: u32,
    primitive_buffer: Option<Arc<PrimitiveBuffer>>,
    vertex_decl: Option<Arc<VertexDecl>>,
    vertex_decls: HashMap<String, Arc<VertexDecl>>,
    volatile_vertex_buffers: VolatilePool<VertexBuffer>,
    volatile_primitive_buffers: VolatilePool<PrimitiveBuffer>,

    // Shading
    shader: Option<Arc<Shader>>,
    const_buffer: Option<Arc<ShaderConstBuffer>>,
    generic_shaders: HashMap<GenericShaderType, GenericShader>,
    state_blocks: HashMap<StateBlockDesc, Arc<StateBlock>>,
    state_block: Arc<StateBlock>,
    applied_state_block: Option<Arc<StateBlock>>,
    textures: [Option<Arc<Texture>>; TEXTURE_STAGE_COUNT],
    dirty_units: u32,
    texture_manager: Box<dyn TextureManager>,

    // Targets and transforms
    current_target: Option<TargetRef>,
    target_stack: Vec<TargetRef>,
    deactivate_target: Option<TargetRef>,
    bound_context: Option<ContextId>,
    viewport: RectI,
    clip: RectI,
    projection: Mat4,
    view: Mat4,
    world: Mat4,

    stats: DeviceStatistics,
    can_currently_render: bool,
}

impl GlDevice {
    /// Create a device on the driver's current context.
    pub fn new(driver: Arc<dyn GlDriver>, config: DeviceConfig) -> GraphicsResult<Self> {
        Self::with_texture_manager(driver, config, Box::new(GlTextureManager::new()))
    }

    /// Create a device delegating 2D texture lifetime to `texture_manager`.
    pub fn with_texture_manager(
        driver: Arc<dyn GlDriver>,
        config: DeviceConfig,
        texture_manager: Box<dyn TextureManager>,
    ) -> GraphicsResult<Self> {
        driver.load_bindings()?;
        let profile = CardProfile::query(driver.as_ref());

        driver.submit(GlCall::PixelStore {
            pname: gl::UNPACK_ALIGNMENT,
            param: config.unpack_alignment,
        });
        if config.debug_output {
            install_debug_output(driver.as_ref(), &profile);
        }

        let vertex_array = driver.gen_vertex_array()?;
        driver.submit(GlCall::BindVertexArray(vertex_array));

        let attrib_binding =
            config.prefer_attrib_binding && profile.has_extension(Extension::ArbVertexAttribBinding);
        log::info!(
            "Created GL device on {} (adapter {}, {} vertex attributes)",
            profile.renderer,
            config.adapter_index,
            if attrib_binding { "bound" } else { "legacy" }
        );

        let shared = DeviceShared::new(driver.clone());
        Ok(Self {
            shared,
            driver,
            config,
            profile,
            attrib_binding,
            cache: GlStateCache::new(),
            vertex_array,
            pending: PendingState::STATE_BLOCK,
            vertex_buffers: Default::default(),
            vertex_divisors: [0; VERTEX_STREAM_COUNT],
            draw_instances: 0,
            primitive_buffer: None,
            vertex_decl: None,
            vertex_decls: HashMap::new(),
            volatile_vertex_buffers: VolatilePool::new(),
            volatile_primitive_buffers: VolatilePool::new(),
            shader: None,
            const_buffer: None,
            generic_shaders: HashMap::new(),
            state_blocks: HashMap::new(),
            state_block: Arc::new(StateBlock::new(StateBlockDesc::default())),
            applied_state_block: None,
            textures: std::array::from_fn(|_| None),
            dirty_units: 0,
            texture_manager,
            current_target: None,
            target_stack: Vec::new(),
            deactivate_target: None,
            bound_context: None,
            viewport: RectI::default(),
            clip: RectI::default(),
            projection: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
            world: Mat4::IDENTITY,
            stats: DeviceStatistics::default(),
            can_currently_render: false,
        })
    }

    /// The native driver.
    pub fn driver(&self) -> &Arc<dyn GlDriver> {
        &self.driver
    }

    /// Creation configuration.
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Capability profile queried at creation.
    pub fn profile(&self) -> &CardProfile {
        &self.profile
    }

    /// Number of texture units usable by shaders.
    pub fn num_samplers(&self) -> u32 {
        let units = if self.profile.pixel_shader_version > 0.001 {
            self.profile.max_shader_textures
        } else {
            self.profile.max_ff_textures
        };
        units.min(TEXTURE_STAGE_COUNT as u32)
    }

    /// Number of simultaneous colour outputs.
    pub fn num_render_targets(&self) -> u32 {
        self.profile.max_render_targets
    }

    /// Returns true if vertex attributes use native per-binding state.
    pub fn uses_attrib_binding(&self) -> bool {
        self.attrib_binding
    }

    /// Flags waiting for the next flush.
    pub fn pending_state(&self) -> PendingState {
        self.pending
    }

    /// Number of registered resources.
    pub fn resource_count(&self) -> usize {
        self.shared.resource_count()
    }

    /// Logical description of every registered resource, newest first.
    /// Independent of native handle identity.
    pub fn describe_resources(&self) -> Vec<String> {
        self.shared
            .resources()
            .iter()
            .map(|r| format!("{:?} {}", r.kind(), r.describe()))
            .collect()
    }

    /// Returns true if any registered resource is a zombie.
    pub fn has_zombies(&self) -> bool {
        self.shared.resources().iter().any(|r| r.is_zombie())
    }

    /// Number of 2D textures owned by the texture manager.
    pub fn texture_count(&self) -> usize {
        self.texture_manager.texture_count()
    }

    /// Current projection matrix.
    pub fn projection_matrix(&self) -> Mat4 {
        self.projection
    }

    /// Set the projection matrix.
    pub fn set_projection_matrix(&mut self, matrix: Mat4) {
        self.projection = matrix;
    }

    /// Current view matrix.
    pub fn view_matrix(&self) -> Mat4 {
        self.view
    }

    /// Set the view matrix.
    pub fn set_view_matrix(&mut self, matrix: Mat4) {
        self.view = matrix;
    }

    /// Current world matrix.
    pub fn world_matrix(&self) -> Mat4 {
        self.world
    }

    /// Set the world matrix.
    pub fn set_world_matrix(&mut self, matrix: Mat4) {
        self.world = matrix;
    }

    /// Forget cached bindings of native names deleted since the last call.
    fn drain_retired(&mut self) {
        for name in self.shared.take_retired() {
            match name {
                RetiredName::Buffer(buffer) => self.cache.forget_buffer(buffer),
                RetiredName::Texture(texture) => self.cache.forget_texture(texture),
            }
        }
    }

    /// Schedule the complete logical state for the next flush.
    fn mark_all_dirty(&mut self) {
        self.pending = PendingState::all();
        self.dirty_units = ALL_UNITS;
        self.applied_state_block = None;
    }
}

fn install_debug_output(driver: &dyn GlDriver, profile: &CardProfile) {
    let Some(extension) = profile.debug_output_extension() else {
        log::warn!("Debug output requested but no debug extension is available");
        return;
    };

    let standard = extension != Extension::AmdDebugOutput;
    if standard {
        driver.submit(GlCall::Enable(gl::DEBUG_OUTPUT));
    }
    driver.set_debug_callback(Some(Box::new(|message: &str| {
        log::error!("OPENGL: {message}");
    })));
    if standard {
        driver.submit(GlCall::Enable(gl::DEBUG_OUTPUT_SYNCHRONOUS));
    }
    driver.submit(GlCall::DebugMessageControl { enabled: true });
    log::debug!("Native debug output enabled via {extension:?}");
}

impl std::fmt::Debug for GlDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlDevice")
            .field("driver", &self.driver.name())
            .field("attrib_binding", &self.attrib_binding)
            .field("pending", &self.pending)
            .field("resources", &self.shared.resource_count())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

static_assertions::assert_impl_all!(GlDevice: Send);

//! Render targets: offscreen texture targets and window surfaces.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::driver::gl;
use crate::driver::{ContextId, FramebufferHandle, GlCall, TextureHandle};
use crate::error::GraphicsResult;
use crate::resource::{DeviceShared, GpuResource, ResourceId, ResourceKind, ResourceLink};
use crate::texture::{Texture, TextureKind};
use crate::types::{Point2I, MAX_RENDER_SLOTS};

/// Number of colour attachments of a texture target.
pub const MAX_COLOR_SLOTS: usize = MAX_RENDER_SLOTS - 1;

/// Attachment point of a texture target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderSlot {
    /// Colour attachment `0..MAX_COLOR_SLOTS`.
    Color(u32),
    /// Depth (and stencil, if the format has one).
    DepthStencil,
}

/// Behaviour shared by every render target.
pub trait RenderTarget: GpuResource {
    /// Size in pixels.
    fn size(&self) -> Point2I;

    /// Returns true if attachments changed since the last [`apply_state`].
    ///
    /// [`apply_state`]: RenderTarget::apply_state
    fn is_pending_state(&self) -> bool;

    /// Push pending attachment changes to the native object.
    fn apply_state(&self);

    /// Route subsequent drawing to this target.
    fn make_active(&self);

    /// Called when drawing moves to another target.
    fn deactivate(&self);
}

#[derive(Debug)]
struct Attachments {
    framebuffer: FramebufferHandle,
    zombie: bool,
    colors: [Option<Arc<Texture>>; MAX_COLOR_SLOTS],
    depth: Option<Arc<Texture>>,
    pending: bool,
}

/// Offscreen target rendering into textures.
#[derive(Debug)]
pub struct TextureTarget {
    link: ResourceLink,
    state: Mutex<Attachments>,
}

impl TextureTarget {
    pub(crate) fn create(shared: &Arc<DeviceShared>) -> GraphicsResult<Arc<Self>> {
        let link = shared.link();
        let framebuffer = link.driver().gen_framebuffer()?;
        let target = Arc::new(Self {
            link,
            state: Mutex::new(Attachments {
                framebuffer,
                zombie: false,
                colors: Default::default(),
                depth: None,
                pending: true,
            }),
        });
        shared.register(&target);
        Ok(target)
    }

    /// Attach `texture` to `slot`, or detach with `None`. Takes effect when
    /// the device next reconciles render targets.
    pub fn attach_texture(&self, slot: RenderSlot, texture: Option<Arc<Texture>>) {
        if let Some(texture) = &texture {
            assert!(
                texture.desc().kind == TextureKind::Tex2D,
                "attach_texture: only 2D textures can be attached"
            );
            let depth_format = texture.desc().format.is_depth_stencil();
            assert_eq!(
                depth_format,
                slot == RenderSlot::DepthStencil,
                "attach_texture: {:?} format does not match slot {slot:?}",
                texture.desc().format
            );
        }

        let mut state = self.state.lock();
        match slot {
            RenderSlot::Color(index) => {
                let index = index as usize;
                assert!(index < MAX_COLOR_SLOTS, "attach_texture: slot {index} out of range");
                state.colors[index] = texture;
            }
            RenderSlot::DepthStencil => state.depth = texture,
        }
        state.pending = true;
    }

    /// Texture attached to `slot`.
    pub fn attachment(&self, slot: RenderSlot) -> Option<Arc<Texture>> {
        let state = self.state.lock();
        match slot {
            RenderSlot::Color(index) => state.colors.get(index as usize).cloned().flatten(),
            RenderSlot::DepthStencil => state.depth.clone(),
        }
    }

    /// Native framebuffer (null while zombified).
    pub fn framebuffer(&self) -> FramebufferHandle {
        self.state.lock().framebuffer
    }

    fn color_count(state: &Attachments) -> u32 {
        state
            .colors
            .iter()
            .rposition(Option::is_some)
            .map_or(0, |last| last as u32 + 1)
    }
}

impl RenderTarget for TextureTarget {
    fn size(&self) -> Point2I {
        let state = self.state.lock();
        state
            .colors
            .iter()
            .flatten()
            .chain(state.depth.iter())
            .next()
            .map_or(Point2I::new(0, 0), |t| {
                Point2I::new(t.width() as i32, t.height() as i32)
            })
    }

    fn is_pending_state(&self) -> bool {
        self.state.lock().pending
    }

    fn apply_state(&self) {
        let mut state = self.state.lock();
        if state.zombie || !state.pending {
            return;
        }
        let driver = self.link.driver();
        driver.submit(GlCall::BindFramebuffer {
            target: gl::FRAMEBUFFER,
            framebuffer: state.framebuffer,
        });

        for (index, color) in state.colors.iter().enumerate() {
            driver.submit(GlCall::FramebufferTexture2D {
                attachment: gl::COLOR_ATTACHMENT0 + index as u32,
                textarget: gl::TEXTURE_2D,
                texture: color.as_ref().map_or(TextureHandle::NONE, |t| t.handle()),
                level: 0,
            });
        }

        let (attachment, texture) = match &state.depth {
            Some(depth) if depth.desc().format.has_stencil() => {
                (gl::DEPTH_STENCIL_ATTACHMENT, depth.handle())
            }
            Some(depth) => (gl::DEPTH_ATTACHMENT, depth.handle()),
            None => (gl::DEPTH_STENCIL_ATTACHMENT, TextureHandle::NONE),
        };
        driver.submit(GlCall::FramebufferTexture2D {
            attachment,
            textarget: gl::TEXTURE_2D,
            texture,
            level: 0,
        });
        state.pending = false;
    }

    fn make_active(&self) {
        let state = self.state.lock();
        if state.zombie {
            return;
        }
        let driver = self.link.driver();
        driver.submit(GlCall::BindFramebuffer {
            target: gl::FRAMEBUFFER,
            framebuffer: state.framebuffer,
        });
        driver.submit(GlCall::DrawBuffers(Self::color_count(&state)));
    }

    fn deactivate(&self) {
        let state = self.state.lock();
        for color in state.colors.iter().flatten() {
            color.generate_mips();
        }
    }
}

impl GpuResource for TextureTarget {
    fn id(&self) -> ResourceId {
        self.link.id()
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::TextureTarget
    }

    fn zombify(&self) {
        let mut state = self.state.lock();
        if state.zombie {
            return;
        }
        self.link.driver().submit(GlCall::DeleteFramebuffer(state.framebuffer));
        state.framebuffer = FramebufferHandle::NONE;
        state.zombie = true;
    }

    fn resurrect(&self) -> GraphicsResult<()> {
        let mut state = self.state.lock();
        if !state.zombie {
            return Ok(());
        }
        state.framebuffer = self.link.driver().gen_framebuffer()?;
        state.zombie = false;
        state.pending = true;
        Ok(())
    }

    fn is_zombie(&self) -> bool {
        self.state.lock().zombie
    }

    fn describe(&self) -> String {
        let state = self.state.lock();
        format!(
            "TextureTarget colors {} depth {}",
            Self::color_count(&state),
            state.depth.is_some()
        )
    }
}

impl Drop for TextureTarget {
    fn drop(&mut self) {
        self.link.unregister();
        let state = self.state.get_mut();
        if !state.zombie {
            self.link.driver().submit(GlCall::DeleteFramebuffer(state.framebuffer));
        }
    }
}

/// The default framebuffer of a window's drawing context.
#[derive(Debug)]
pub struct WindowTarget {
    link: ResourceLink,
    context: ContextId,
    size: Mutex<Point2I>,
    zombie: AtomicBool,
}

impl WindowTarget {
    pub(crate) fn create(shared: &Arc<DeviceShared>, context: ContextId, size: Point2I) -> Arc<Self> {
        let target = Arc::new(Self {
            link: shared.link(),
            context,
            size: Mutex::new(size),
            zombie: AtomicBool::new(false),
        });
        shared.register(&target);
        target
    }

    /// Drawing context this window renders through.
    pub fn context(&self) -> ContextId {
        self.context
    }

    /// Update the size after the window was resized.
    pub fn resize(&self, size: Point2I) {
        *self.size.lock() = size;
    }
}

impl RenderTarget for WindowTarget {
    fn size(&self) -> Point2I {
        *self.size.lock()
    }

    fn is_pending_state(&self) -> bool {
        false
    }

    fn apply_state(&self) {}

    fn make_active(&self) {
        let driver = self.link.driver();
        driver.submit(GlCall::MakeCurrent(self.context));
        driver.submit(GlCall::BindFramebuffer {
            target: gl::FRAMEBUFFER,
            framebuffer: FramebufferHandle::NONE,
        });
    }

    fn deactivate(&self) {}
}

impl GpuResource for WindowTarget {
    fn id(&self) -> ResourceId {
        self.link.id()
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::WindowTarget
    }

    // The surface belongs to the window; only the flag changes.
    fn zombify(&self) {
        self.zombie.store(true, Ordering::Relaxed);
    }

    fn resurrect(&self) -> GraphicsResult<()> {
        self.zombie.store(false, Ordering::Relaxed);
        Ok(())
    }

    fn is_zombie(&self) -> bool {
        self.zombie.load(Ordering::Relaxed)
    }

    fn describe(&self) -> String {
        let size = self.size();
        format!("WindowTarget {:?} {}x{}", self.context, size.x, size.y)
    }
}

impl Drop for WindowTarget {
    fn drop(&mut self) {
        self.link.unregister();
    }
}

/// A render target held by the device.
#[derive(Debug, Clone)]
pub enum TargetRef {
    Texture(Arc<TextureTarget>),
    Window(Arc<WindowTarget>),
}

impl TargetRef {
    /// The target behind this reference.
    pub fn target(&self) -> &dyn RenderTarget {
        match self {
            Self::Texture(t) => t.as_ref(),
            Self::Window(w) => w.as_ref(),
        }
    }

    /// Drawing context, for window targets.
    pub fn context(&self) -> Option<ContextId> {
        match self {
            Self::Texture(_) => None,
            Self::Window(w) => Some(w.context()),
        }
    }

    /// Returns true if both refer to the same target.
    pub fn ptr_eq(&self, other: &TargetRef) -> bool {
        match (self, other) {
            (Self::Texture(a), Self::Texture(b)) => Arc::ptr_eq(a, b),
            (Self::Window(a), Self::Window(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<Arc<TextureTarget>> for TargetRef {
    fn from(target: Arc<TextureTarget>) -> Self {
        Self::Texture(target)
    }
}

impl From<Arc<WindowTarget>> for TargetRef {
    fn from(target: Arc<WindowTarget>) -> Self {
        Self::Window(target)
    }
}

static_assertions::assert_impl_all!(TextureTarget: Send, Sync);
static_assertions::assert_impl_all!(WindowTarget: Send, Sync);

//! Textures, cubemaps and the texture manager.
//!
//! 2D textures are tracked by a [`TextureManager`], which zombifies and
//! resurrects them as a group. Cubemaps are ordinary registered resources.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::driver::gl::{self, GLenum};
use crate::driver::{GlCall, TextureHandle};
use crate::error::{GraphicsError, GraphicsResult};
use crate::resource::{DeviceShared, GpuResource, ResourceId, ResourceKind, ResourceLink, RetiredName};
use crate::state_cache::GlStateCache;
use crate::translate::{convert_mag_filter, convert_min_filter, convert_pixel_format};
use crate::types::{FilterMode, PixelFormat, SamplerDesc, TextureUsage};

/// Texture dimensionality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureKind {
    #[default]
    Tex2D,
    Cube,
}

/// Descriptor for creating a texture.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureDescriptor {
    /// Debug label for the texture.
    pub label: Option<String>,
    pub kind: TextureKind,
    pub width: u32,
    pub height: u32,
    pub mip_levels: u32,
    pub format: PixelFormat,
    pub usage: TextureUsage,
    pub sampler: SamplerDesc,
}

impl TextureDescriptor {
    /// Create a descriptor for a 2D texture.
    pub fn new_2d(width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            label: None,
            kind: TextureKind::Tex2D,
            width,
            height,
            mip_levels: 1,
            format,
            usage: TextureUsage::SAMPLED,
            sampler: SamplerDesc::default(),
        }
    }

    /// Create a descriptor for a cubemap with square faces.
    pub fn new_cube(size: u32, format: PixelFormat) -> Self {
        Self {
            kind: TextureKind::Cube,
            ..Self::new_2d(size, size, format)
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the number of mip levels.
    pub fn with_mip_levels(mut self, levels: u32) -> Self {
        self.mip_levels = levels.max(1);
        self
    }

    /// Set usage flags.
    pub fn with_usage(mut self, usage: TextureUsage) -> Self {
        self.usage = usage;
        self
    }

    /// Set sampling parameters.
    pub fn with_sampler(mut self, sampler: SamplerDesc) -> Self {
        self.sampler = sampler;
        self
    }

    /// Native target for this kind.
    pub fn target(&self) -> GLenum {
        match self.kind {
            TextureKind::Tex2D => gl::TEXTURE_2D,
            TextureKind::Cube => gl::TEXTURE_CUBE_MAP,
        }
    }
}

#[derive(Debug)]
struct NativeState {
    handle: TextureHandle,
    zombie: bool,
    sampler: SamplerDesc,
    params_dirty: bool,
}

/// A 2D texture or cubemap.
#[derive(Debug)]
pub struct Texture {
    link: ResourceLink,
    desc: TextureDescriptor,
    internal_format: GLenum,
    anisotropy_supported: bool,
    native: Mutex<NativeState>,
}

impl Texture {
    /// Create the native texture. The caller decides who tracks it.
    pub(crate) fn create(
        shared: &Arc<DeviceShared>,
        desc: &TextureDescriptor,
        anisotropy_supported: bool,
    ) -> GraphicsResult<Arc<Self>> {
        let internal_format = convert_pixel_format(desc.format);
        if internal_format == gl::ZERO {
            return Err(GraphicsError::FeatureNotSupported(format!(
                "pixel format {:?}",
                desc.format
            )));
        }
        if desc.width == 0 || desc.height == 0 {
            return Err(GraphicsError::InvalidParameter(
                "texture dimensions must be non-zero".to_string(),
            ));
        }

        let link = shared.link();
        let handle = link.driver().gen_texture()?;
        let texture = Arc::new(Self {
            link,
            desc: desc.clone(),
            internal_format,
            anisotropy_supported,
            native: Mutex::new(NativeState {
                handle,
                zombie: false,
                sampler: desc.sampler,
                params_dirty: true,
            }),
        });
        texture.allocate_storage(handle);

        log::trace!(
            "Created {:?} texture {} {:?} ({}x{}, {:?})",
            desc.kind,
            texture.id(),
            desc.label,
            desc.width,
            desc.height,
            desc.format
        );
        Ok(texture)
    }

    fn allocate_storage(&self, handle: TextureHandle) {
        self.link.driver().submit(GlCall::TextureStorage {
            texture: handle,
            target: self.desc.target(),
            levels: self.desc.mip_levels,
            internal_format: self.internal_format,
            width: self.desc.width,
            height: self.desc.height,
        });
    }

    /// Creation descriptor.
    pub fn desc(&self) -> &TextureDescriptor {
        &self.desc
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.desc.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.desc.height
    }

    /// Native target.
    pub fn target(&self) -> GLenum {
        self.desc.target()
    }

    /// Returns true if the texture has more than one mip level.
    pub fn has_mips(&self) -> bool {
        self.desc.mip_levels > 1
    }

    /// Current native handle (null while zombified).
    pub fn handle(&self) -> TextureHandle {
        self.native.lock().handle
    }

    /// Current sampling parameters.
    pub fn sampler(&self) -> SamplerDesc {
        self.native.lock().sampler
    }

    /// Change sampling parameters; applied on the next bind.
    pub fn set_sampler(&self, sampler: SamplerDesc) {
        let mut native = self.native.lock();
        if native.sampler != sampler {
            native.sampler = sampler;
            native.params_dirty = true;
        }
    }

    /// Bind to `unit`, applying sampler parameters that changed since the
    /// last bind. A zombie texture unbinds the unit instead.
    pub(crate) fn bind(&self, unit: u32, cache: &mut GlStateCache) {
        let driver = self.link.driver();
        let mut native = self.native.lock();
        if native.zombie {
            cache.unbind_unit(unit, driver);
            return;
        }

        let target = self.target();
        cache.bind_texture(unit, target, native.handle, driver);
        if !native.params_dirty {
            return;
        }

        cache.set_active_unit(unit, driver);
        let sampler = native.sampler;
        driver.submit(GlCall::TexParameter {
            target,
            pname: gl::TEXTURE_MIN_FILTER,
            param: convert_min_filter(sampler.min_filter, sampler.mip_filter, self.desc.mip_levels)
                as i32,
        });
        driver.submit(GlCall::TexParameter {
            target,
            pname: gl::TEXTURE_MAG_FILTER,
            param: convert_mag_filter(sampler.mag_filter) as i32,
        });
        if self.anisotropy_supported && sampler.min_filter == FilterMode::Anisotropic {
            driver.submit(GlCall::TexParameter {
                target,
                pname: gl::TEXTURE_MAX_ANISOTROPY,
                param: sampler.max_anisotropy as i32,
            });
        }
        native.params_dirty = false;
    }

    /// Regenerate the mip chain from level 0.
    pub fn generate_mips(&self) {
        let native = self.native.lock();
        if !native.zombie && self.has_mips() {
            self.link.driver().submit(GlCall::GenerateMipmap(native.handle));
        }
    }
}

impl GpuResource for Texture {
    fn id(&self) -> ResourceId {
        self.link.id()
    }

    fn kind(&self) -> ResourceKind {
        match self.desc.kind {
            TextureKind::Tex2D => ResourceKind::Texture,
            TextureKind::Cube => ResourceKind::Cubemap,
        }
    }

    fn zombify(&self) {
        let mut native = self.native.lock();
        if native.zombie {
            return;
        }
        self.link.driver().submit(GlCall::DeleteTexture(native.handle));
        self.link.retire(RetiredName::Texture(native.handle));
        native.handle = TextureHandle::NONE;
        native.zombie = true;
    }

    fn resurrect(&self) -> GraphicsResult<()> {
        let mut native = self.native.lock();
        if !native.zombie {
            return Ok(());
        }
        let handle = self.link.driver().gen_texture()?;
        self.allocate_storage(handle);
        native.handle = handle;
        native.zombie = false;
        native.params_dirty = true;
        Ok(())
    }

    fn is_zombie(&self) -> bool {
        self.native.lock().zombie
    }

    fn describe(&self) -> String {
        format!(
            "{:?} {}x{} {:?} mips {}",
            self.desc.kind, self.desc.width, self.desc.height, self.desc.format, self.desc.mip_levels
        )
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        self.link.unregister();
        let native = self.native.get_mut();
        if !native.zombie {
            self.link.driver().submit(GlCall::DeleteTexture(native.handle));
            self.link.retire(RetiredName::Texture(native.handle));
        }
    }
}

/// Owner of the 2D texture population.
pub trait TextureManager: Send {
    /// Start tracking a texture created by the device.
    fn track(&mut self, texture: &Arc<Texture>);

    /// Release the native objects of every tracked texture.
    fn zombify(&mut self);

    /// Recreate every tracked texture. Returns the number that stayed zombies.
    fn resurrect(&mut self) -> usize;

    /// Release everything and stop tracking; killed textures never come back.
    fn kill(&mut self);

    /// Number of live tracked textures.
    fn texture_count(&self) -> usize;
}

/// Default texture manager: a weak list of textures.
#[derive(Debug, Default)]
pub struct GlTextureManager {
    textures: Vec<Weak<Texture>>,
}

impl GlTextureManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn live(&mut self) -> Vec<Arc<Texture>> {
        self.textures.retain(|weak| weak.strong_count() > 0);
        self.textures.iter().filter_map(Weak::upgrade).collect()
    }
}

impl TextureManager for GlTextureManager {
    fn track(&mut self, texture: &Arc<Texture>) {
        self.textures.push(Arc::downgrade(texture));
    }

    fn zombify(&mut self) {
        for texture in self.live() {
            texture.zombify();
        }
    }

    fn resurrect(&mut self) -> usize {
        let mut failures = 0;
        for texture in self.live() {
            if let Err(e) = texture.resurrect() {
                log::warn!("Failed to resurrect texture {}: {}", texture.id(), e);
                failures += 1;
            }
        }
        failures
    }

    fn kill(&mut self) {
        self.zombify();
        self.textures.clear();
    }

    fn texture_count(&self) -> usize {
        self.textures
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }
}

static_assertions::assert_impl_all!(Texture: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::RecordingDriver;

    fn setup() -> (Arc<RecordingDriver>, Arc<DeviceShared>) {
        let driver = Arc::new(RecordingDriver::new());
        let shared = DeviceShared::new(driver.clone());
        (driver, shared)
    }

    #[test]
    fn test_unsupported_format_rejected() {
        let (_driver, shared) = setup();
        let desc = TextureDescriptor::new_2d(4, 4, PixelFormat::A4L4);
        assert!(matches!(
            Texture::create(&shared, &desc, false),
            Err(GraphicsError::FeatureNotSupported(_))
        ));
    }

    #[test]
    fn test_bind_applies_params_once() {
        let (driver, shared) = setup();
        let texture = Texture::create(
            &shared,
            &TextureDescriptor::new_2d(64, 64, PixelFormat::R8G8B8A8)
                .with_sampler(SamplerDesc::anisotropic(8)),
            true,
        )
        .unwrap();
        let mut cache = GlStateCache::new();
        driver.clear_calls();

        texture.bind(3, &mut cache);
        let first = driver.take_calls();
        assert!(first.contains(&GlCall::TexParameter {
            target: gl::TEXTURE_2D,
            pname: gl::TEXTURE_MAX_ANISOTROPY,
            param: 8
        }));

        texture.bind(3, &mut cache);
        assert!(driver.calls().is_empty());

        texture.set_sampler(SamplerDesc::point());
        texture.bind(3, &mut cache);
        assert!(driver.calls().contains(&GlCall::TexParameter {
            target: gl::TEXTURE_2D,
            pname: gl::TEXTURE_MAG_FILTER,
            param: gl::NEAREST as i32
        }));
    }

    #[test]
    fn test_manager_cycle() {
        let (_driver, shared) = setup();
        let mut manager = GlTextureManager::new();
        let texture =
            Texture::create(&shared, &TextureDescriptor::new_2d(8, 8, PixelFormat::L8), false)
                .unwrap();
        manager.track(&texture);

        manager.zombify();
        assert!(texture.is_zombie());
        assert_eq!(manager.resurrect(), 0);
        assert!(!texture.is_zombie());

        manager.kill();
        assert!(texture.is_zombie());
        assert_eq!(manager.texture_count(), 0);
        assert_eq!(manager.resurrect(), 0);
        assert!(texture.is_zombie());
    }

    #[test]
    fn test_cube_kind() {
        let (_driver, shared) = setup();
        let cube =
            Texture::create(&shared, &TextureDescriptor::new_cube(32, PixelFormat::R8G8B8A8), false)
                .unwrap();
        assert_eq!(cube.kind(), ResourceKind::Cubemap);
        assert_eq!(cube.target(), gl::TEXTURE_CUBE_MAP);
    }
}

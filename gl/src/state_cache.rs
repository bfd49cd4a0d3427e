//! Mirror of driver-side binding state.
//!
//! The cache only ever short-circuits a call when it *knows* the driver is
//! already in the requested state. After [`GlStateCache::invalidate`] every
//! slot is unknown and the next request goes through.

use crate::driver::gl::{self, GLenum};
use crate::driver::{BufferHandle, GlCall, GlDriver, TextureHandle};
use crate::types::TEXTURE_STAGE_COUNT;

#[derive(Debug, Clone, Copy, Default)]
struct TextureUnit {
    /// `None` = unknown.
    texture_2d: Option<TextureHandle>,
    texture_cube: Option<TextureHandle>,
    /// Target of the last logical bind, `gl::ZERO` when nothing is bound.
    active_target: GLenum,
}

impl TextureUnit {
    fn slot_mut(&mut self, target: GLenum) -> &mut Option<TextureHandle> {
        if target == gl::TEXTURE_CUBE_MAP {
            &mut self.texture_cube
        } else {
            &mut self.texture_2d
        }
    }
}

/// Cached binding state of one native context.
#[derive(Debug, Clone)]
pub struct GlStateCache {
    active_unit: Option<u32>,
    units: [TextureUnit; TEXTURE_STAGE_COUNT],
    array_buffer: Option<BufferHandle>,
    element_buffer: Option<BufferHandle>,
    /// Bit `i` set = attribute `i` enabled. `None` = unknown.
    attrib_mask: Option<u32>,
}

impl Default for GlStateCache {
    fn default() -> Self {
        Self::new()
    }
}

impl GlStateCache {
    /// Create a cache with every slot unknown.
    pub fn new() -> Self {
        Self {
            active_unit: None,
            units: [TextureUnit::default(); TEXTURE_STAGE_COUNT],
            array_buffer: None,
            element_buffer: None,
            attrib_mask: None,
        }
    }

    /// Forget everything; the next request for every slot reaches the driver.
    pub fn invalidate(&mut self) {
        *self = Self::new();
    }

    /// Select the active texture unit.
    pub fn set_active_unit(&mut self, unit: u32, driver: &dyn GlDriver) {
        if self.active_unit == Some(unit) {
            return;
        }
        driver.submit(GlCall::ActiveTexture(gl::TEXTURE0 + unit));
        self.active_unit = Some(unit);
    }

    /// Bind `texture` to `target` on `unit`. Returns false if the bind was
    /// redundant and skipped.
    pub fn bind_texture(
        &mut self,
        unit: u32,
        target: GLenum,
        texture: TextureHandle,
        driver: &dyn GlDriver,
    ) -> bool {
        let index = unit as usize;
        assert!(
            index < TEXTURE_STAGE_COUNT,
            "bind_texture: unit {unit} out of range"
        );

        self.units[index].active_target = target;
        if *self.units[index].slot_mut(target) == Some(texture) {
            return false;
        }

        self.set_active_unit(unit, driver);
        driver.submit(GlCall::BindTexture { target, texture });
        *self.units[index].slot_mut(target) = Some(texture);
        true
    }

    /// Unbind whatever was last bound on `unit`, if anything.
    pub fn unbind_unit(&mut self, unit: u32, driver: &dyn GlDriver) -> bool {
        let index = unit as usize;
        let target = self.units[index].active_target;
        if target == gl::ZERO {
            return false;
        }

        self.set_active_unit(unit, driver);
        driver.submit(GlCall::BindTexture {
            target,
            texture: TextureHandle::NONE,
        });
        *self.units[index].slot_mut(target) = Some(TextureHandle::NONE);
        self.units[index].active_target = gl::ZERO;
        true
    }

    /// Target last bound on `unit` (`gl::ZERO` for none).
    pub fn active_target(&self, unit: u32) -> GLenum {
        self.units[unit as usize].active_target
    }

    /// Texture the cache believes is bound, `None` if unknown.
    pub fn bound_texture(&self, unit: u32, target: GLenum) -> Option<TextureHandle> {
        let unit = &self.units[unit as usize];
        if target == gl::TEXTURE_CUBE_MAP {
            unit.texture_cube
        } else {
            unit.texture_2d
        }
    }

    /// Bind a buffer to the array or element-array target.
    pub fn bind_buffer(&mut self, target: GLenum, buffer: BufferHandle, driver: &dyn GlDriver) {
        let slot = if target == gl::ELEMENT_ARRAY_BUFFER {
            &mut self.element_buffer
        } else {
            &mut self.array_buffer
        };
        if *slot == Some(buffer) {
            return;
        }
        driver.submit(GlCall::BindBuffer { target, buffer });
        *slot = Some(buffer);
    }

    /// Forget a buffer binding after the buffer was deleted or released.
    pub fn forget_buffer(&mut self, buffer: BufferHandle) {
        if self.array_buffer == Some(buffer) {
            self.array_buffer = None;
        }
        if self.element_buffer == Some(buffer) {
            self.element_buffer = None;
        }
    }

    /// Forget every binding of a deleted texture name. The driver reverts
    /// such bindings to the null object, so the slot becomes unknown.
    pub fn forget_texture(&mut self, texture: TextureHandle) {
        for unit in &mut self.units {
            for slot in [&mut unit.texture_2d, &mut unit.texture_cube] {
                if *slot == Some(texture) {
                    *slot = None;
                }
            }
        }
    }

    /// Returns the known enabled-attribute mask.
    pub fn attrib_mask(&self) -> Option<u32> {
        self.attrib_mask
    }

    /// Enable exactly the attributes in `wanted`, touching only the ones
    /// that differ from the known state.
    pub fn set_enabled_attribs(&mut self, wanted: u32, driver: &dyn GlDriver) {
        let current = self.attrib_mask;
        for index in 0..32 {
            let bit = 1u32 << index;
            let want = wanted & bit != 0;
            let known = current.map(|mask| mask & bit != 0);
            match (want, known) {
                (true, Some(true)) | (false, Some(false)) => {}
                // Unknown disabled attributes are left alone unless they
                // are part of the active range.
                (false, None) if index >= 16 => {}
                (true, _) => driver.submit(GlCall::EnableVertexAttribArray(index)),
                (false, _) => driver.submit(GlCall::DisableVertexAttribArray(index)),
            }
        }
        self.attrib_mask = Some(wanted);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::RecordingDriver;

    #[test]
    fn test_redundant_bind_skipped() {
        let driver = RecordingDriver::new();
        let mut cache = GlStateCache::new();

        assert!(cache.bind_texture(0, gl::TEXTURE_2D, TextureHandle(3), &driver));
        assert!(!cache.bind_texture(0, gl::TEXTURE_2D, TextureHandle(3), &driver));

        assert_eq!(
            driver.take_calls(),
            vec![
                GlCall::ActiveTexture(gl::TEXTURE0),
                GlCall::BindTexture {
                    target: gl::TEXTURE_2D,
                    texture: TextureHandle(3)
                },
            ]
        );
    }

    #[test]
    fn test_invalidate_forces_rebind() {
        let driver = RecordingDriver::new();
        let mut cache = GlStateCache::new();

        cache.bind_texture(2, gl::TEXTURE_2D, TextureHandle(3), &driver);
        cache.invalidate();
        driver.clear_calls();

        assert!(cache.bind_texture(2, gl::TEXTURE_2D, TextureHandle(3), &driver));
        assert_eq!(driver.calls().len(), 2);
    }

    #[test]
    fn test_unbind_only_when_bound() {
        let driver = RecordingDriver::new();
        let mut cache = GlStateCache::new();

        assert!(!cache.unbind_unit(1, &driver));
        assert!(driver.calls().is_empty());

        cache.bind_texture(1, gl::TEXTURE_CUBE_MAP, TextureHandle(9), &driver);
        assert!(cache.unbind_unit(1, &driver));
        assert_eq!(cache.active_target(1), gl::ZERO);
        assert_eq!(
            driver.calls().last(),
            Some(&GlCall::BindTexture {
                target: gl::TEXTURE_CUBE_MAP,
                texture: TextureHandle::NONE
            })
        );
    }

    #[test]
    fn test_attrib_mask_diff() {
        let driver = RecordingDriver::new();
        let mut cache = GlStateCache::new();

        cache.set_enabled_attribs(0b101, &driver);
        driver.clear_calls();

        cache.set_enabled_attribs(0b011, &driver);
        assert_eq!(
            driver.calls(),
            vec![
                GlCall::EnableVertexAttribArray(1),
                GlCall::DisableVertexAttribArray(2),
            ]
        );
    }

    #[test]
    fn test_buffer_binding_cache() {
        let driver = RecordingDriver::new();
        let mut cache = GlStateCache::new();

        cache.bind_buffer(gl::ARRAY_BUFFER, BufferHandle(4), &driver);
        cache.bind_buffer(gl::ARRAY_BUFFER, BufferHandle(4), &driver);
        assert_eq!(driver.calls().len(), 1);

        cache.forget_buffer(BufferHandle(4));
        cache.bind_buffer(gl::ARRAY_BUFFER, BufferHandle(4), &driver);
        assert_eq!(driver.calls().len(), 2);
    }
}

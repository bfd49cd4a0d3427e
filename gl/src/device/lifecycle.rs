//! Scene bracketing, context-loss recovery and teardown.

use super::GlDevice;
use crate::driver::{GlCall, VertexArrayHandle};

impl GlDevice {
    /// Start a frame.
    pub fn begin_scene(&mut self) {
        self.can_currently_render = true;
    }

    /// End a frame.
    pub fn end_scene(&mut self) {
        self.can_currently_render = false;
    }

    /// Returns true between [`GlDevice::begin_scene`] and
    /// [`GlDevice::end_scene`].
    pub fn can_currently_render(&self) -> bool {
        self.can_currently_render
    }

    /// Release every native object after the context was lost.
    ///
    /// Bound buffers stay bound logically; only their native binding is
    /// released. Calling it twice is harmless.
    pub fn zombify(&mut self) {
        log::info!("Zombifying {} device resources", self.shared.resource_count());

        self.texture_manager.zombify();
        for buffer in self.vertex_buffers.iter().flatten() {
            buffer.finish(self.attrib_binding);
        }
        if let Some(buffer) = &self.primitive_buffer {
            buffer.finish(&mut self.cache);
        }
        self.shared.zombify_all();

        if !self.vertex_array.is_none() {
            self.driver.submit(GlCall::DeleteVertexArray(self.vertex_array));
            self.vertex_array = VertexArrayHandle::NONE;
        }
    }

    /// Recreate every native object and schedule the full logical state for
    /// the next flush. Returns the number of resources that stayed zombies.
    pub fn resurrect(&mut self) -> usize {
        let mut failures = self.shared.resurrect_all();

        self.shared.take_retired();
        self.cache.invalidate();
        if self.vertex_array.is_none() {
            match self.driver.gen_vertex_array() {
                Ok(vertex_array) => self.vertex_array = vertex_array,
                Err(e) => log::warn!("Failed to recreate vertex array object: {}", e),
            }
        }
        if !self.vertex_array.is_none() {
            self.driver.submit(GlCall::BindVertexArray(self.vertex_array));
        }

        for (stream, buffer) in self.vertex_buffers.iter().enumerate() {
            if let Some(buffer) = buffer {
                buffer.prepare(stream as u32, self.vertex_divisors[stream], self.attrib_binding);
            }
        }
        if let Some(buffer) = &self.primitive_buffer {
            buffer.prepare(&mut self.cache);
        }
        failures += self.texture_manager.resurrect();

        if self.attrib_binding {
            if let Some(decl) = &self.vertex_decl {
                decl.prepare_vertex_format(&mut self.cache, self.driver.as_ref());
            }
        }
        if let Some(shader) = &self.shader {
            shader.use_program();
        }

        self.mark_all_dirty();
        self.deactivate_target = None;
        self.bound_context = None;

        if failures > 0 {
            log::warn!("{} resources could not be resurrected", failures);
        } else {
            log::info!("Resurrected {} device resources", self.shared.resource_count());
        }
        failures
    }

    /// Zombify and immediately resurrect every resource. Leaves the device
    /// functionally unchanged apart from native handle values.
    pub fn cycle_resources(&mut self) -> usize {
        self.zombify();
        self.resurrect()
    }
}

impl Drop for GlDevice {
    fn drop(&mut self) {
        self.vertex_buffers = Default::default();
        self.primitive_buffer = None;
        self.volatile_vertex_buffers.clear();
        self.volatile_primitive_buffers.clear();
        self.vertex_decl = None;
        self.textures = std::array::from_fn(|_| None);
        self.const_buffer = None;
        self.shader = None;
        self.generic_shaders.clear();
        self.target_stack.clear();
        self.current_target = None;
        self.deactivate_target = None;

        self.texture_manager.zombify();
        self.texture_manager.kill();
        self.shared.zombify_all();

        if !self.vertex_array.is_none() {
            self.driver.submit(GlCall::DeleteVertexArray(self.vertex_array));
        }
        log::debug!("GL device destroyed");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::DeviceConfig;
    use crate::driver::RecordingDriver;
    use crate::types::{BufferType, VertexElementType, VertexFormat, VertexSemantic};

    fn device() -> (Arc<RecordingDriver>, GlDevice) {
        let driver = Arc::new(RecordingDriver::new());
        let device = GlDevice::new(driver.clone(), DeviceConfig::default()).unwrap();
        (driver, device)
    }

    #[test]
    fn test_scene_bracketing() {
        let (_driver, mut device) = device();
        assert!(!device.can_currently_render());
        device.begin_scene();
        assert!(device.can_currently_render());
        device.end_scene();
        assert!(!device.can_currently_render());
    }

    #[test]
    fn test_zombify_twice_is_harmless() {
        let (driver, mut device) = device();
        let format = VertexFormat::new().with_element(VertexSemantic::Position, VertexElementType::Float3);
        let _vb = device
            .alloc_vertex_buffer(4, &format, 12, BufferType::Static, None)
            .unwrap();

        device.zombify();
        driver.clear_calls();
        device.zombify();
        assert!(driver.calls().is_empty());
        assert!(device.has_zombies());

        assert_eq!(device.resurrect(), 0);
        assert!(!device.has_zombies());
    }

    #[test]
    fn test_resurrect_rebinds_vertex_array() {
        let (driver, mut device) = device();
        device.cycle_resources();
        assert!(matches!(
            driver.calls().last(),
            Some(GlCall::BindVertexArray(vao)) if !vao.is_none()
        ));
    }

    #[test]
    fn test_drop_zombifies_survivors() {
        let (_driver, mut device) = device();
        let query = device.create_occlusion_query().unwrap();
        drop(device);
        assert!(crate::resource::GpuResource::is_zombie(query.as_ref()));
    }
}

//! Draw state and the pre-draw flush.

use std::sync::Arc;

use super::{GlDevice, PendingState};
use crate::buffer::{PrimitiveBuffer, VertexBuffer, VertexDecl, INDEX_SIZE};
use crate::driver::gl;
use crate::driver::GlCall;
use crate::error::GraphicsResult;
use crate::shader::{GenericShader, GenericShaderType, Shader, ShaderConstBuffer};
use crate::state_block::StateBlock;
use crate::texture::{Texture, TextureKind};
use crate::translate::{convert_clear_flags, convert_primitive_type};
use crate::types::{ClearFlags, ColorF, PrimitiveType};

fn same<T>(a: Option<&Arc<T>>, b: Option<&Arc<T>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

impl GlDevice {
    /// Bind `buffer` to vertex stream `stream` (0 = per-vertex data,
    /// 1 = per-instance data).
    ///
    /// For stream 0, `frequency` is the instance count of following draws;
    /// zero draws without instancing. Stream 1 advances once per instance
    /// and requires a frequency of 1.
    pub fn set_vertex_stream(&mut self, stream: u32, buffer: Option<Arc<VertexBuffer>>, frequency: u32) {
        assert!(
            stream < self.config.vertex_stream_count,
            "set_vertex_stream: only streams 0 (data) and 1 (instancing) are supported, got {stream}"
        );
        let index = stream as usize;

        if !same(self.vertex_buffers[index].as_ref(), buffer.as_ref()) {
            if let Some(old) = self.vertex_buffers[index].take() {
                old.finish(self.attrib_binding);
            }

            if let Some(buffer) = &buffer {
                let divisor = if stream == 0 {
                    0
                } else {
                    assert!(
                        frequency == 1,
                        "set_vertex_stream: instancing stream 1 needs a frequency of 1, got {frequency}"
                    );
                    1
                };
                self.vertex_divisors[index] = divisor;
                buffer.prepare(stream, divisor, self.attrib_binding);
            }
            self.vertex_buffers[index] = buffer;
            self.pending |= PendingState::VERTEX_ATTRIB;
        }

        if stream == 0 && self.vertex_buffers[0].is_some() {
            self.draw_instances = frequency;
        }
    }

    /// Bind per-vertex data to stream 0 without instancing.
    pub fn set_vertex_buffer(&mut self, buffer: Option<Arc<VertexBuffer>>) {
        self.set_vertex_stream(0, buffer, 0);
    }

    /// Buffer bound to `stream`.
    pub fn vertex_stream(&self, stream: u32) -> Option<&Arc<VertexBuffer>> {
        self.vertex_buffers.get(stream as usize).and_then(Option::as_ref)
    }

    /// Instance count of the next draw (0 = not instanced).
    pub fn draw_instances(&self) -> u32 {
        self.draw_instances
    }

    /// Bind the index buffer for following indexed draws.
    pub fn set_primitive_buffer(&mut self, buffer: Option<Arc<PrimitiveBuffer>>) {
        self.drain_retired();
        if let Some(old) = self.primitive_buffer.take() {
            old.finish(&mut self.cache);
        }
        if let Some(buffer) = &buffer {
            buffer.prepare(&mut self.cache);
        }
        self.primitive_buffer = buffer;
    }

    /// Bound index buffer.
    pub fn primitive_buffer(&self) -> Option<&Arc<PrimitiveBuffer>> {
        self.primitive_buffer.as_ref()
    }

    /// Set the vertex declaration describing the bound streams.
    pub fn set_vertex_decl(&mut self, decl: Option<Arc<VertexDecl>>) {
        if same(self.vertex_decl.as_ref(), decl.as_ref()) {
            return;
        }
        if self.attrib_binding {
            if let Some(decl) = &decl {
                decl.prepare_vertex_format(&mut self.cache, self.driver.as_ref());
            }
        }
        self.vertex_decl = decl;
        self.pending |= PendingState::VERTEX_ATTRIB;
    }

    /// Switch between native per-binding attributes and the legacy
    /// per-draw attribute upload. Native binding is only used when the
    /// driver supports it.
    pub fn set_attrib_binding_path(&mut self, enabled: bool) {
        let enabled = enabled
            && self
                .profile
                .has_extension(crate::driver::Extension::ArbVertexAttribBinding);
        if enabled == self.attrib_binding {
            return;
        }
        log::debug!(
            "Vertex attributes now use the {} path",
            if enabled { "bound" } else { "legacy" }
        );

        for buffer in self.vertex_buffers.iter().flatten() {
            buffer.finish(self.attrib_binding);
        }
        self.attrib_binding = enabled;
        for (stream, buffer) in self.vertex_buffers.iter().enumerate() {
            if let Some(buffer) = buffer {
                buffer.prepare(stream as u32, self.vertex_divisors[stream], enabled);
            }
        }
        if enabled {
            if let Some(decl) = &self.vertex_decl {
                decl.prepare_vertex_format(&mut self.cache, self.driver.as_ref());
            }
        }
        self.pending |= PendingState::VERTEX_ATTRIB;
    }

    /// Request a state block; applied at the next flush.
    pub fn set_state_block(&mut self, block: &Arc<StateBlock>) {
        if Arc::ptr_eq(&self.state_block, block) {
            return;
        }
        self.state_block = block.clone();
        self.pending |= PendingState::STATE_BLOCK;
    }

    /// Requested state block.
    pub fn state_block(&self) -> &Arc<StateBlock> {
        &self.state_block
    }

    fn set_unit(&mut self, unit: u32, texture: Option<Arc<Texture>>) {
        assert!(
            unit < self.num_samplers(),
            "set_texture: unit {unit} out of range ({} samplers)",
            self.num_samplers()
        );
        let slot = &mut self.textures[unit as usize];
        if same(slot.as_ref(), texture.as_ref()) {
            return;
        }
        *slot = texture;
        self.dirty_units |= 1 << unit;
        self.pending |= PendingState::TEXTURES;
    }

    /// Bind a 2D texture to `unit`, or unbind with `None`.
    pub fn set_texture(&mut self, unit: u32, texture: Option<Arc<Texture>>) {
        if let Some(texture) = &texture {
            assert!(
                texture.desc().kind == TextureKind::Tex2D,
                "set_texture: unit {unit} given a cubemap"
            );
        }
        self.set_unit(unit, texture);
    }

    /// Bind a cubemap to `unit`, or unbind with `None`.
    pub fn set_cubemap(&mut self, unit: u32, cubemap: Option<Arc<Texture>>) {
        if let Some(cubemap) = &cubemap {
            assert!(
                cubemap.desc().kind == TextureKind::Cube,
                "set_cubemap: unit {unit} given a 2D texture"
            );
        }
        self.set_unit(unit, cubemap);
    }

    /// Texture requested on `unit`.
    pub fn texture(&self, unit: u32) -> Option<&Arc<Texture>> {
        self.textures.get(unit as usize).and_then(Option::as_ref)
    }

    /// Make `shader` current. `None` selects the built-in flat-colour
    /// shader.
    pub fn set_shader(&mut self, shader: Option<&Arc<Shader>>) {
        match shader {
            Some(shader) => {
                if same(self.shader.as_ref(), Some(shader)) {
                    return;
                }
                shader.use_program();
                self.shader = Some(shader.clone());
            }
            None => {
                if let Err(e) = self.setup_generic_shaders(GenericShaderType::Color) {
                    log::warn!("Failed to set up built-in shaders: {}", e);
                }
            }
        }
    }

    /// Current shader.
    pub fn shader(&self) -> Option<&Arc<Shader>> {
        self.shader.as_ref()
    }

    /// Set the constant buffer uploaded before each draw.
    pub fn set_shader_const_buffer(&mut self, buffer: Option<Arc<ShaderConstBuffer>>) {
        self.const_buffer = buffer;
    }

    /// Activate the built-in shader for `ty` with the current
    /// projection * view * world transform. The built-in set is created on
    /// first use.
    pub fn setup_generic_shaders(&mut self, ty: GenericShaderType) -> GraphicsResult<()> {
        assert!(
            ty != GenericShaderType::TargetRestore,
            "setup_generic_shaders: TargetRestore is not supported"
        );

        if !self.generic_shaders.contains_key(&GenericShaderType::Color) {
            for ty in GenericShaderType::ALL {
                let generic = GenericShader::create(&self.shared, ty)?;
                self.generic_shaders.insert(ty, generic);
            }
        }

        let Some(generic) = self.generic_shaders.get(&ty).cloned() else {
            return Ok(());
        };
        let model_view = self.projection * self.view * self.world;
        generic.buffer.set_matrix(&generic.model_view, model_view);

        self.set_shader(Some(&generic.shader));
        self.set_shader_const_buffer(Some(generic.buffer));
        Ok(())
    }

    /// Clear the active render target.
    pub fn clear(&mut self, flags: ClearFlags, color: ColorF, z: f32, stencil: u32) {
        self.drain_retired();
        self.update_render_targets();

        let driver = self.driver.clone();
        driver.submit(GlCall::ColorMask {
            red: true,
            green: true,
            blue: true,
            alpha: true,
        });
        driver.submit(GlCall::DepthMask(true));
        driver.submit(GlCall::StencilMask(u32::MAX));
        driver.submit(GlCall::ClearColor(color.to_array()));
        driver.submit(GlCall::ClearDepth(z));
        driver.submit(GlCall::ClearStencil(stencil as i32));
        driver.submit(GlCall::Clear(convert_clear_flags(flags)));

        if let Some(block) = &self.applied_state_block {
            block.restore_write_masks(driver.as_ref());
        }
    }

    /// Bring the driver up to date with the logical state.
    fn pre_draw(&mut self) {
        self.drain_retired();
        if self.pending.intersects(PendingState::STATE) {
            self.update_states();
        }

        if let Some(buffer) = &self.const_buffer {
            buffer.activate();
        }

        if !self.attrib_binding && self.pending.contains(PendingState::VERTEX_ATTRIB) {
            let decl = self.vertex_decl.clone();
            assert!(decl.is_some(), "draw: no vertex declaration is set");
            if let Some(decl) = decl {
                let driver = self.driver.clone();
                for (stream, buffer) in self.vertex_buffers.iter().enumerate() {
                    if let Some(buffer) = buffer {
                        decl.prepare_buffer_legacy(
                            stream as u32,
                            buffer.handle(),
                            self.vertex_divisors[stream],
                            &mut self.cache,
                            driver.as_ref(),
                        );
                    }
                }
                decl.update_active_vertex_attrib(&mut self.cache, driver.as_ref());
            }
        }
        self.pending.remove(PendingState::VERTEX_ATTRIB);
    }

    fn post_draw(&mut self, primitive_count: u32) {
        self.stats.draw_calls = self.stats.draw_calls.wrapping_add(1);
        self.stats.poly_count = self.stats.poly_count.wrapping_add(primitive_count);
    }

    /// Draw `primitive_count` primitives from the bound vertex streams.
    pub fn draw_primitive(&mut self, prim: PrimitiveType, vertex_start: u32, primitive_count: u32) {
        self.pre_draw();

        let mode = convert_primitive_type(prim);
        let count = prim.element_count(primitive_count);
        self.driver.submit(if self.draw_instances > 0 {
            GlCall::DrawArraysInstanced {
                mode,
                first: vertex_start,
                count,
                instances: self.draw_instances,
            }
        } else {
            GlCall::DrawArrays {
                mode,
                first: vertex_start,
                count,
            }
        });

        self.post_draw(primitive_count);
    }

    /// Draw `primitive_count` primitives using 16-bit indices from the bound
    /// primitive buffer, starting at index `start_index`.
    ///
    /// A non-zero `start_vertex` is not supported.
    pub fn draw_indexed_primitive(
        &mut self,
        prim: PrimitiveType,
        start_vertex: u32,
        _min_index: u32,
        _num_verts: u32,
        start_index: u32,
        primitive_count: u32,
    ) {
        assert!(
            start_vertex == 0,
            "draw_indexed_primitive: base vertex {start_vertex} is not supported"
        );
        assert!(
            self.primitive_buffer.is_some(),
            "draw_indexed_primitive: no primitive buffer is set"
        );
        self.pre_draw();

        let mode = convert_primitive_type(prim);
        let count = prim.element_count(primitive_count);
        let offset = u64::from(start_index) * INDEX_SIZE;
        self.driver.submit(if self.draw_instances > 0 {
            GlCall::DrawElementsInstanced {
                mode,
                count,
                ty: gl::UNSIGNED_SHORT,
                offset,
                instances: self.draw_instances,
            }
        } else {
            GlCall::DrawElements {
                mode,
                count,
                ty: gl::UNSIGNED_SHORT,
                offset,
            }
        });

        self.post_draw(primitive_count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeviceConfig;
    use crate::driver::RecordingDriver;
    use crate::types::{BufferType, VertexElementType, VertexFormat, VertexSemantic};

    fn device() -> (Arc<RecordingDriver>, GlDevice) {
        let driver = Arc::new(RecordingDriver::new());
        let device = GlDevice::new(driver.clone(), DeviceConfig::new().with_debug_output(false))
            .unwrap();
        (driver, device)
    }

    fn format() -> VertexFormat {
        VertexFormat::new().with_element(VertexSemantic::Position, VertexElementType::Float3)
    }

    #[test]
    fn test_same_stream_buffer_is_noop() {
        let (driver, mut device) = device();
        let vb = device
            .alloc_vertex_buffer(3, &format(), 12, BufferType::Static, None)
            .unwrap();
        device.set_vertex_buffer(Some(vb.clone()));
        device.pending = PendingState::empty();
        driver.clear_calls();

        device.set_vertex_buffer(Some(vb));
        assert!(driver.calls().is_empty());
        assert!(device.pending_state().is_empty());
    }

    #[test]
    fn test_instance_count_follows_stream_zero() {
        let (_driver, mut device) = device();
        device.set_vertex_stream(0, None, 4);
        assert_eq!(device.draw_instances(), 0);

        let vb = device
            .alloc_vertex_buffer(3, &format(), 12, BufferType::Static, None)
            .unwrap();
        device.set_vertex_stream(0, Some(vb), 4);
        assert_eq!(device.draw_instances(), 4);
    }

    #[test]
    #[should_panic(expected = "only streams 0 (data) and 1 (instancing)")]
    fn test_stream_index_out_of_range() {
        let (_driver, mut device) = device();
        device.set_vertex_stream(2, None, 0);
    }

    #[test]
    #[should_panic(expected = "base vertex")]
    fn test_base_vertex_rejected() {
        let (_driver, mut device) = device();
        device.draw_indexed_primitive(PrimitiveType::TriangleList, 3, 0, 3, 0, 1);
    }

    #[test]
    fn test_clear_restores_narrowed_masks() {
        let (driver, mut device) = device();
        let block = device.create_state_block(
            &crate::types::StateBlockDesc::default().with_z_read_write(true, false),
        );
        device.set_state_block(&block);
        let vb = device
            .alloc_vertex_buffer(3, &format(), 12, BufferType::Static, None)
            .unwrap();
        let decl = device.alloc_vertex_decl(&format());
        device.set_vertex_buffer(Some(vb));
        device.set_vertex_decl(Some(decl));
        device.draw_primitive(PrimitiveType::TriangleList, 0, 1);
        driver.clear_calls();

        device.clear(ClearFlags::TARGET | ClearFlags::Z_BUFFER, ColorF::BLACK, 1.0, 0);
        let calls = driver.calls();
        assert_eq!(calls[1], GlCall::DepthMask(true));
        assert_eq!(calls.last(), Some(&GlCall::DepthMask(false)));
    }

    #[test]
    fn test_generic_shader_uploads_model_view() {
        let (driver, mut device) = device();
        device.set_shader(None);

        let color = device.shader().cloned().unwrap();
        assert_eq!(color.desc(), &GenericShaderType::Color.descriptor().unwrap());
        assert!(driver
            .calls()
            .contains(&GlCall::UseProgram(color.program())));

        // Same shader again: nothing to do.
        driver.clear_calls();
        device.set_shader(Some(&color));
        assert!(driver.calls().is_empty());
        assert_eq!(device.resource_count(), 4);
    }

    #[test]
    #[should_panic(expected = "TargetRestore")]
    fn test_target_restore_rejected() {
        let (_driver, mut device) = device();
        let _ = device.setup_generic_shaders(GenericShaderType::TargetRestore);
    }
}

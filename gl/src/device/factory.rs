//! Resource creation.

use std::sync::Arc;

use super::GlDevice;
use crate::buffer::{PrimitiveBuffer, VertexBuffer, VertexDecl};
use crate::driver::{ContextId, Extension};
use crate::error::GraphicsResult;
use crate::query::{Fence, FenceKind, OcclusionQuery};
use crate::shader::{Shader, ShaderDescriptor};
use crate::state_block::StateBlock;
use crate::target::{TextureTarget, WindowTarget};
use crate::texture::{Texture, TextureDescriptor};
use crate::types::{BufferType, PixelFormat, Point2I, StateBlockDesc, TextureUsage, VertexFormat};

impl GlDevice {
    /// Allocate a vertex buffer of `num_verts` vertices of `vertex_size`
    /// bytes, optionally filled from `data`.
    ///
    /// Volatile requests reuse the first pooled buffer that is large enough,
    /// has the same format and is not referenced outside the pool. Any other
    /// type always creates a new buffer.
    pub fn alloc_vertex_buffer(
        &mut self,
        num_verts: u32,
        format: &VertexFormat,
        vertex_size: u32,
        buffer_type: BufferType,
        data: Option<&[u8]>,
    ) -> GraphicsResult<Arc<VertexBuffer>> {
        if buffer_type != BufferType::Volatile {
            return VertexBuffer::create(&self.shared, num_verts, format, vertex_size, buffer_type, data);
        }

        let shared = &self.shared;
        let buffer = self.volatile_vertex_buffers.find_or_create(
            |vb| vb.num_verts() >= num_verts && vb.format() == format && vb.vertex_size() == vertex_size,
            || VertexBuffer::create(shared, num_verts, format, vertex_size, BufferType::Volatile, None),
        )?;
        if let Some(data) = data {
            buffer.update(0, data);
        }
        Ok(buffer)
    }

    /// Allocate an index buffer of `index_count` 16-bit indices, optionally
    /// filled from `data`. Volatile requests are pooled like vertex buffers.
    pub fn alloc_primitive_buffer(
        &mut self,
        index_count: u32,
        primitive_count: u32,
        buffer_type: BufferType,
        data: Option<&[u16]>,
    ) -> GraphicsResult<Arc<PrimitiveBuffer>> {
        if buffer_type != BufferType::Volatile {
            return PrimitiveBuffer::create(&self.shared, index_count, primitive_count, buffer_type, data);
        }

        let shared = &self.shared;
        let buffer = self.volatile_primitive_buffers.find_or_create(
            |pb| pb.index_count() >= index_count,
            || {
                PrimitiveBuffer::create(
                    shared,
                    index_count,
                    primitive_count,
                    BufferType::Volatile,
                    None,
                )
            },
        )?;
        if let Some(data) = data {
            buffer.update(0, data);
        }
        Ok(buffer)
    }

    /// Number of pooled volatile (vertex, primitive) buffers.
    pub fn volatile_pool_sizes(&self) -> (usize, usize) {
        (
            self.volatile_vertex_buffers.len(),
            self.volatile_primitive_buffers.len(),
        )
    }

    /// Declaration for `format`, shared by every caller asking for the same
    /// format.
    pub fn alloc_vertex_decl(&mut self, format: &VertexFormat) -> Arc<VertexDecl> {
        self.vertex_decls
            .entry(format.description().to_string())
            .or_insert_with(|| Arc::new(VertexDecl::new(format)))
            .clone()
    }

    /// State block for `desc`, shared by every caller asking for an equal
    /// description.
    pub fn create_state_block(&mut self, desc: &StateBlockDesc) -> Arc<StateBlock> {
        self.state_blocks
            .entry(desc.clone())
            .or_insert_with(|| {
                log::trace!("Created state block {}", desc.describe());
                Arc::new(StateBlock::new(desc.clone()))
            })
            .clone()
    }

    /// Create a 2D texture owned by the texture manager.
    pub fn create_texture(&mut self, desc: &TextureDescriptor) -> GraphicsResult<Arc<Texture>> {
        let texture = Texture::create(&self.shared, desc, self.profile.supports_anisotropic())?;
        self.texture_manager.track(&texture);
        Ok(texture)
    }

    /// Create a registered cubemap with faces of `size` pixels.
    pub fn create_cubemap(
        &mut self,
        size: u32,
        format: PixelFormat,
        mip_levels: u32,
    ) -> GraphicsResult<Arc<Texture>> {
        let desc = TextureDescriptor::new_cube(size, format).with_mip_levels(mip_levels);
        let cubemap = Texture::create(&self.shared, &desc, self.profile.supports_anisotropic())?;
        self.shared.register(&cubemap);
        Ok(cubemap)
    }

    /// Compile and link a registered shader.
    pub fn create_shader(&mut self, desc: &ShaderDescriptor) -> GraphicsResult<Arc<Shader>> {
        Shader::create(&self.shared, desc)
    }

    /// Create an offscreen render target.
    pub fn alloc_render_to_texture_target(&mut self) -> GraphicsResult<Arc<TextureTarget>> {
        TextureTarget::create(&self.shared)
    }

    /// Create the target for a window drawing through `context`.
    pub fn alloc_window_target(&mut self, context: ContextId, size: Point2I) -> Arc<WindowTarget> {
        WindowTarget::create(&self.shared, context, size)
    }

    /// Create an occlusion query.
    pub fn create_occlusion_query(&mut self) -> GraphicsResult<Arc<OcclusionQuery>> {
        OcclusionQuery::create(&self.shared)
    }

    /// Create a fence, backed by a native sync object when available.
    pub fn create_fence(&mut self) -> Arc<Fence> {
        let kind = if self.profile.has_extension(Extension::ArbSync) {
            FenceKind::Sync
        } else {
            FenceKind::General
        };
        Fence::create(&self.shared, kind)
    }

    /// First format of `formats` usable for `usage`; see
    /// [`CardProfile::select_supported_format`](crate::CardProfile::select_supported_format).
    pub fn select_supported_format(
        &self,
        usage: TextureUsage,
        formats: &[PixelFormat],
        texture: bool,
        must_blend: bool,
        must_filter: bool,
    ) -> PixelFormat {
        self.profile
            .select_supported_format(usage, formats, texture, must_blend, must_filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeviceConfig;
    use crate::driver::RecordingDriver;
    use crate::resource::ResourceKind;
    use crate::types::{VertexElementType, VertexSemantic};

    fn device() -> GlDevice {
        GlDevice::new(Arc::new(RecordingDriver::new()), DeviceConfig::default()).unwrap()
    }

    #[test]
    fn test_decls_and_state_blocks_are_shared() {
        let mut device = device();
        let format = VertexFormat::new().with_element(VertexSemantic::Position, VertexElementType::Float3);

        let a = device.alloc_vertex_decl(&format);
        let b = device.alloc_vertex_decl(&format.clone());
        assert!(Arc::ptr_eq(&a, &b));

        let desc = StateBlockDesc::default().with_z_read_write(false, false);
        let a = device.create_state_block(&desc);
        let b = device.create_state_block(&desc);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_textures_tracked_outside_registry() {
        let mut device = device();
        let texture = device
            .create_texture(&TextureDescriptor::new_2d(4, 4, PixelFormat::R8G8B8A8))
            .unwrap();
        assert_eq!(device.texture_count(), 1);
        assert_eq!(device.resource_count(), 0);

        let cubemap = device.create_cubemap(16, PixelFormat::R8G8B8A8, 1).unwrap();
        assert_eq!(device.resource_count(), 1);
        drop((texture, cubemap));
        assert_eq!(device.texture_count(), 0);
        assert_eq!(device.resource_count(), 0);
    }

    #[test]
    fn test_fence_kind_follows_sync_support() {
        let mut device = device();
        assert_eq!(device.create_fence().fence_kind(), FenceKind::Sync);

        let driver = Arc::new(RecordingDriver::new().with_extensions(&[]));
        let mut device = GlDevice::new(driver, DeviceConfig::default()).unwrap();
        let fence = device.create_fence();
        assert_eq!(fence.fence_kind(), FenceKind::General);
        assert!(device.describe_resources()[0].starts_with(&format!("{:?}", ResourceKind::Fence)));
    }
}

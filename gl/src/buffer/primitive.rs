//! Primitive (16-bit index) buffers.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::driver::gl;
use crate::driver::{BufferHandle, GlCall};
use crate::error::GraphicsResult;
use crate::resource::{DeviceShared, GpuResource, ResourceId, ResourceKind, ResourceLink, RetiredName};
use crate::state_cache::GlStateCache;
use crate::translate::convert_buffer_usage;
use crate::types::BufferType;

/// Size of one index in bytes.
pub const INDEX_SIZE: u64 = std::mem::size_of::<u16>() as u64;

#[derive(Debug)]
struct NativeState {
    handle: BufferHandle,
    zombie: bool,
    shadow: Vec<u16>,
}

/// A buffer of 16-bit indices.
#[derive(Debug)]
pub struct PrimitiveBuffer {
    link: ResourceLink,
    index_count: u32,
    primitive_count: u32,
    buffer_type: BufferType,
    native: Mutex<NativeState>,
}

impl PrimitiveBuffer {
    pub(crate) fn create(
        shared: &Arc<DeviceShared>,
        index_count: u32,
        primitive_count: u32,
        buffer_type: BufferType,
        indices: Option<&[u16]>,
    ) -> GraphicsResult<Arc<Self>> {
        let link = shared.link();
        let handle = link.driver().gen_buffer()?;
        let size = u64::from(index_count) * INDEX_SIZE;

        link.driver().submit(GlCall::NamedBufferData {
            buffer: handle,
            size,
            usage: convert_buffer_usage(buffer_type),
        });

        let mut shadow = Vec::new();
        if buffer_type != BufferType::Volatile {
            shadow.resize(index_count as usize, 0);
        }
        if let Some(indices) = indices {
            assert!(
                indices.len() <= index_count as usize,
                "PrimitiveBuffer::create: {} indices for a buffer of {index_count}",
                indices.len()
            );
            link.driver().submit(GlCall::NamedBufferSubData {
                buffer: handle,
                offset: 0,
                size: indices.len() as u64 * INDEX_SIZE,
            });
            if !shadow.is_empty() {
                shadow[..indices.len()].copy_from_slice(indices);
            }
        }

        log::trace!(
            "Created primitive buffer {} ({} indices, {:?})",
            link.id(),
            index_count,
            buffer_type
        );

        let buffer = Arc::new(Self {
            link,
            index_count,
            primitive_count,
            buffer_type,
            native: Mutex::new(NativeState {
                handle,
                zombie: false,
                shadow,
            }),
        });
        shared.register(&buffer);
        Ok(buffer)
    }

    /// Capacity in indices.
    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// Number of primitives the buffer was sized for.
    pub fn primitive_count(&self) -> u32 {
        self.primitive_count
    }

    /// Buffer type.
    pub fn buffer_type(&self) -> BufferType {
        self.buffer_type
    }

    /// Current native handle (null while zombified).
    pub fn handle(&self) -> BufferHandle {
        self.native.lock().handle
    }

    /// Write indices starting at `start`.
    pub fn update(&self, start: u32, indices: &[u16]) {
        assert!(
            self.buffer_type != BufferType::Immutable,
            "PrimitiveBuffer::update: immutable buffers only take data at creation"
        );
        let start = start as usize;
        assert!(
            start + indices.len() <= self.index_count as usize,
            "PrimitiveBuffer::update: write past the end of the buffer"
        );

        let mut native = self.native.lock();
        if !native.shadow.is_empty() {
            native.shadow[start..start + indices.len()].copy_from_slice(indices);
        }
        if native.zombie {
            return;
        }
        self.link.driver().submit(GlCall::NamedBufferSubData {
            buffer: native.handle,
            offset: start as u64 * INDEX_SIZE,
            size: bytemuck::cast_slice::<u16, u8>(indices).len() as u64,
        });
    }

    /// Bind as the element array for the following indexed draws.
    pub(crate) fn prepare(&self, cache: &mut GlStateCache) {
        let native = self.native.lock();
        if native.zombie {
            return;
        }
        cache.bind_buffer(gl::ELEMENT_ARRAY_BUFFER, native.handle, self.link.driver());
    }

    /// Release the element array binding.
    pub(crate) fn finish(&self, cache: &mut GlStateCache) {
        cache.bind_buffer(
            gl::ELEMENT_ARRAY_BUFFER,
            BufferHandle::NONE,
            self.link.driver(),
        );
    }
}

impl GpuResource for PrimitiveBuffer {
    fn id(&self) -> ResourceId {
        self.link.id()
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::PrimitiveBuffer
    }

    fn zombify(&self) {
        let mut native = self.native.lock();
        if native.zombie {
            return;
        }
        self.link.driver().submit(GlCall::DeleteBuffer(native.handle));
        self.link.retire(RetiredName::Buffer(native.handle));
        native.handle = BufferHandle::NONE;
        native.zombie = true;
    }

    fn resurrect(&self) -> GraphicsResult<()> {
        let mut native = self.native.lock();
        if !native.zombie {
            return Ok(());
        }
        let driver = self.link.driver();
        let handle = driver.gen_buffer()?;
        driver.submit(GlCall::NamedBufferData {
            buffer: handle,
            size: u64::from(self.index_count) * INDEX_SIZE,
            usage: convert_buffer_usage(self.buffer_type),
        });
        if !native.shadow.is_empty() {
            driver.submit(GlCall::NamedBufferSubData {
                buffer: handle,
                offset: 0,
                size: native.shadow.len() as u64 * INDEX_SIZE,
            });
        }
        native.handle = handle;
        native.zombie = false;
        Ok(())
    }

    fn is_zombie(&self) -> bool {
        self.native.lock().zombie
    }

    fn describe(&self) -> String {
        format!(
            "PrimitiveBuffer {} indices / {} prims {:?}",
            self.index_count, self.primitive_count, self.buffer_type
        )
    }
}

impl Drop for PrimitiveBuffer {
    fn drop(&mut self) {
        self.link.unregister();
        let native = self.native.get_mut();
        if !native.zombie {
            self.link.driver().submit(GlCall::DeleteBuffer(native.handle));
            self.link.retire(RetiredName::Buffer(native.handle));
        }
    }
}

static_assertions::assert_impl_all!(PrimitiveBuffer: Send, Sync);

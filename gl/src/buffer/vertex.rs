//! Vertex buffers.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::driver::{BufferHandle, GlCall};
use crate::error::GraphicsResult;
use crate::resource::{DeviceShared, GpuResource, ResourceId, ResourceKind, ResourceLink, RetiredName};
use crate::translate::convert_buffer_usage;
use crate::types::{BufferType, VertexFormat};

#[derive(Debug)]
struct NativeState {
    handle: BufferHandle,
    zombie: bool,
    /// CPU copy of the contents, re-uploaded on resurrect. Volatile buffers
    /// keep none: their contents only live for one frame.
    shadow: Vec<u8>,
    /// (stream, divisor) while prepared against a stream.
    binding: Option<(u32, u32)>,
}

/// A buffer of vertices in one [`VertexFormat`].
#[derive(Debug)]
pub struct VertexBuffer {
    link: ResourceLink,
    num_verts: u32,
    format: VertexFormat,
    vertex_size: u32,
    buffer_type: BufferType,
    native: Mutex<NativeState>,
}

impl VertexBuffer {
    pub(crate) fn create(
        shared: &Arc<DeviceShared>,
        num_verts: u32,
        format: &VertexFormat,
        vertex_size: u32,
        buffer_type: BufferType,
        data: Option<&[u8]>,
    ) -> GraphicsResult<Arc<Self>> {
        let link = shared.link();
        let handle = link.driver().gen_buffer()?;
        let size = u64::from(num_verts) * u64::from(vertex_size);

        link.driver().submit(GlCall::NamedBufferData {
            buffer: handle,
            size,
            usage: convert_buffer_usage(buffer_type),
        });

        let mut shadow = Vec::new();
        if buffer_type != BufferType::Volatile {
            shadow.resize(size as usize, 0);
        }
        if let Some(data) = data {
            assert!(
                data.len() as u64 <= size,
                "VertexBuffer::create: {} bytes of data for a {size}-byte buffer",
                data.len()
            );
            link.driver().submit(GlCall::NamedBufferSubData {
                buffer: handle,
                offset: 0,
                size: data.len() as u64,
            });
            if !shadow.is_empty() {
                shadow[..data.len()].copy_from_slice(data);
            }
        }

        log::trace!(
            "Created vertex buffer {} ({} verts x {} bytes, {:?})",
            link.id(),
            num_verts,
            vertex_size,
            buffer_type
        );

        let buffer = Arc::new(Self {
            link,
            num_verts,
            format: format.clone(),
            vertex_size,
            buffer_type,
            native: Mutex::new(NativeState {
                handle,
                zombie: false,
                shadow,
                binding: None,
            }),
        });
        shared.register(&buffer);
        Ok(buffer)
    }

    /// Capacity in vertices.
    pub fn num_verts(&self) -> u32 {
        self.num_verts
    }

    /// Vertex layout.
    pub fn format(&self) -> &VertexFormat {
        &self.format
    }

    /// Stride in bytes.
    pub fn vertex_size(&self) -> u32 {
        self.vertex_size
    }

    /// Buffer type.
    pub fn buffer_type(&self) -> BufferType {
        self.buffer_type
    }

    /// Total size in bytes.
    pub fn size_in_bytes(&self) -> u64 {
        u64::from(self.num_verts) * u64::from(self.vertex_size)
    }

    /// Current native handle (null while zombified).
    pub fn handle(&self) -> BufferHandle {
        self.native.lock().handle
    }

    /// Stream and divisor this buffer is prepared against, if any.
    pub fn binding(&self) -> Option<(u32, u32)> {
        self.native.lock().binding
    }

    /// Write raw vertex bytes starting at `start_vertex`.
    ///
    /// While zombified only the CPU copy is updated.
    pub fn update(&self, start_vertex: u32, data: &[u8]) {
        assert!(
            self.buffer_type != BufferType::Immutable,
            "VertexBuffer::update: immutable buffers only take data at creation"
        );
        let offset = u64::from(start_vertex) * u64::from(self.vertex_size);
        assert!(
            offset + data.len() as u64 <= self.size_in_bytes(),
            "VertexBuffer::update: write past the end of the buffer"
        );

        let mut native = self.native.lock();
        if !native.shadow.is_empty() {
            let start = offset as usize;
            native.shadow[start..start + data.len()].copy_from_slice(data);
        }
        if native.zombie {
            return;
        }
        self.link.driver().submit(GlCall::NamedBufferSubData {
            buffer: native.handle,
            offset,
            size: data.len() as u64,
        });
    }

    /// Write typed vertices starting at `start_vertex`.
    pub fn update_vertices<T: bytemuck::Pod>(&self, start_vertex: u32, vertices: &[T]) {
        self.update(start_vertex, bytemuck::cast_slice(vertices));
    }

    /// Bind against `stream` with the given instance step rate. With native
    /// per-binding attributes the binding is programmed immediately;
    /// otherwise it is recorded for the next attribute upload.
    pub(crate) fn prepare(&self, stream: u32, divisor: u32, attrib_binding: bool) {
        let mut native = self.native.lock();
        native.binding = Some((stream, divisor));
        if native.zombie || !attrib_binding {
            return;
        }
        let driver = self.link.driver();
        driver.submit(GlCall::BindVertexBuffer {
            binding: stream,
            buffer: native.handle,
            offset: 0,
            stride: self.vertex_size,
        });
        driver.submit(GlCall::VertexBindingDivisor {
            binding: stream,
            divisor,
        });
    }

    /// Release the stream binding. The buffer itself stays alive.
    pub(crate) fn finish(&self, attrib_binding: bool) {
        let mut native = self.native.lock();
        let Some((stream, _)) = native.binding.take() else {
            return;
        };
        if native.zombie || !attrib_binding {
            return;
        }
        self.link.driver().submit(GlCall::BindVertexBuffer {
            binding: stream,
            buffer: BufferHandle::NONE,
            offset: 0,
            stride: 0,
        });
    }
}

impl GpuResource for VertexBuffer {
    fn id(&self) -> ResourceId {
        self.link.id()
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::VertexBuffer
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
            size: self.size_in_bytes(),
            usage: convert_buffer_usage(self.buffer_type),
        });
        if !native.shadow.is_empty() {
            driver.submit(GlCall::NamedBufferSubData {
                buffer: handle,
                offset: 0,
                size: native.shadow.len() as u64,
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
            "VertexBuffer {} verts x {} bytes [{}] {:?}",
            self.num_verts,
            self.vertex_size,
            self.format.description(),
            self.buffer_type
        )
    }
}

impl Drop for VertexBuffer {
    fn drop(&mut self) {
        self.link.unregister();
        let native = self.native.get_mut();
        if !native.zombie {
            self.link.driver().submit(GlCall::DeleteBuffer(native.handle));
            self.link.retire(RetiredName::Buffer(native.handle));
        }
    }
}

static_assertions::assert_impl_all!(VertexBuffer: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::RecordingDriver;
    use crate::types::{VertexElementType, VertexSemantic};

    fn format() -> VertexFormat {
        VertexFormat::new().with_element(VertexSemantic::Position, VertexElementType::Float3)
    }

    #[test]
    fn test_static_buffer_survives_cycle() {
        let driver = Arc::new(RecordingDriver::new());
        let shared = DeviceShared::new(driver.clone());
        let vb = VertexBuffer::create(&shared, 3, &format(), 12, BufferType::Static, None).unwrap();
        vb.update_vertices(0, &[[0.0f32, 1.0, 2.0]; 3]);

        vb.zombify();
        assert!(vb.is_zombie());
        assert!(vb.handle().is_none());

        driver.clear_calls();
        vb.resurrect().unwrap();
        assert!(!vb.is_zombie());
        assert!(driver.calls().contains(&GlCall::NamedBufferSubData {
            buffer: vb.handle(),
            offset: 0,
            size: 36,
        }));
    }

    #[test]
    fn test_prepare_native_binding() {
        let driver = Arc::new(RecordingDriver::new());
        let shared = DeviceShared::new(driver.clone());
        let vb = VertexBuffer::create(&shared, 4, &format(), 12, BufferType::Dynamic, None).unwrap();
        driver.clear_calls();

        vb.prepare(1, 1, true);
        assert_eq!(vb.binding(), Some((1, 1)));
        assert_eq!(
            driver.take_calls(),
            vec![
                GlCall::BindVertexBuffer {
                    binding: 1,
                    buffer: vb.handle(),
                    offset: 0,
                    stride: 12
                },
                GlCall::VertexBindingDivisor {
                    binding: 1,
                    divisor: 1
                },
            ]
        );

        vb.finish(true);
        assert_eq!(vb.binding(), None);
    }

    #[test]
    fn test_legacy_prepare_records_only() {
        let driver = Arc::new(RecordingDriver::new());
        let shared = DeviceShared::new(driver.clone());
        let vb = VertexBuffer::create(&shared, 4, &format(), 12, BufferType::Dynamic, None).unwrap();
        driver.clear_calls();

        vb.prepare(0, 0, false);
        assert_eq!(vb.binding(), Some((0, 0)));
        assert!(driver.calls().is_empty());
    }

    #[test]
    #[should_panic(expected = "immutable")]
    fn test_immutable_update_rejected() {
        let driver = Arc::new(RecordingDriver::new());
        let shared = DeviceShared::new(driver);
        let vb = VertexBuffer::create(&shared, 1, &format(), 12, BufferType::Immutable, Some(&[0; 12]))
            .unwrap();
        vb.update(0, &[0; 12]);
    }

    #[test]
    fn test_drop_deletes_and_unregisters() {
        let driver = Arc::new(RecordingDriver::new());
        let shared = DeviceShared::new(driver.clone());
        let vb = VertexBuffer::create(&shared, 1, &format(), 12, BufferType::Static, None).unwrap();
        let handle = vb.handle();
        assert_eq!(shared.resource_count(), 1);

        drop(vb);
        assert_eq!(shared.resource_count(), 0);
        assert_eq!(driver.calls().last(), Some(&GlCall::DeleteBuffer(handle)));
        assert_eq!(shared.take_retired(), vec![RetiredName::Buffer(handle)]);
    }
}

//! Vertex declarations: a [`VertexFormat`] translated to attribute state.

use crate::driver::gl::{self, GLenum};
use crate::driver::{BufferHandle, GlCall, GlDriver};
use crate::state_cache::GlStateCache;
use crate::translate::convert_vertex_element;
use crate::types::VertexFormat;

#[derive(Debug, Clone, Copy, PartialEq)]
struct VertexAttrib {
    location: u32,
    stream: u32,
    size: u32,
    ty: GLenum,
    normalized: bool,
    offset: u32,
    stride: u32,
}

/// Attribute layout derived from a vertex format.
#[derive(Debug)]
pub struct VertexDecl {
    format: VertexFormat,
    attribs: Vec<VertexAttrib>,
    enabled_mask: u32,
}

impl VertexDecl {
    /// Build the declaration for `format`.
    pub fn new(format: &VertexFormat) -> Self {
        let attribs: Vec<_> = format
            .elements()
            .iter()
            .enumerate()
            .map(|(index, element)| {
                let (size, ty, normalized) = convert_vertex_element(element.ty);
                VertexAttrib {
                    location: element.semantic.attrib_location(),
                    stream: element.stream,
                    size,
                    ty,
                    normalized,
                    offset: format.offset_of(index),
                    stride: format.size_for_stream(element.stream),
                }
            })
            .collect();

        let enabled_mask = attribs.iter().fold(0, |mask, a| mask | (1 << a.location));

        Self {
            format: format.clone(),
            attribs,
            enabled_mask,
        }
    }

    /// Source format.
    pub fn format(&self) -> &VertexFormat {
        &self.format
    }

    /// Attribute locations enabled by this declaration, one bit each.
    pub fn enabled_mask(&self) -> u32 {
        self.enabled_mask
    }

    /// Program attribute formats and stream bindings (native per-binding
    /// attribute path). Buffers are attached separately per stream.
    pub(crate) fn prepare_vertex_format(&self, cache: &mut GlStateCache, driver: &dyn GlDriver) {
        for attrib in &self.attribs {
            driver.submit(GlCall::VertexAttribFormat {
                index: attrib.location,
                size: attrib.size,
                ty: attrib.ty,
                normalized: attrib.normalized,
                offset: attrib.offset,
            });
            driver.submit(GlCall::VertexAttribBinding {
                index: attrib.location,
                binding: attrib.stream,
            });
        }
        self.update_active_vertex_attrib(cache, driver);
    }

    /// Point the attributes read from `stream` at `buffer` (legacy path).
    pub(crate) fn prepare_buffer_legacy(
        &self,
        stream: u32,
        buffer: BufferHandle,
        divisor: u32,
        cache: &mut GlStateCache,
        driver: &dyn GlDriver,
    ) {
        cache.bind_buffer(gl::ARRAY_BUFFER, buffer, driver);
        for attrib in self.attribs.iter().filter(|a| a.stream == stream) {
            driver.submit(GlCall::VertexAttribPointer {
                index: attrib.location,
                size: attrib.size,
                ty: attrib.ty,
                normalized: attrib.normalized,
                stride: attrib.stride,
                offset: attrib.offset,
            });
            driver.submit(GlCall::VertexAttribDivisor {
                index: attrib.location,
                divisor,
            });
        }
    }

    /// Enable exactly this declaration's attributes.
    pub(crate) fn update_active_vertex_attrib(&self, cache: &mut GlStateCache, driver: &dyn GlDriver) {
        cache.set_enabled_attribs(self.enabled_mask, driver);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::RecordingDriver;
    use crate::types::{VertexElementType, VertexSemantic};

    fn instanced_format() -> VertexFormat {
        VertexFormat::new()
            .with_element(VertexSemantic::Position, VertexElementType::Float3)
            .with_element(VertexSemantic::Color, VertexElementType::Color)
            .with_stream_element(1, VertexSemantic::TexCoord(1), VertexElementType::Float4)
    }

    #[test]
    fn test_enabled_mask() {
        let decl = VertexDecl::new(&instanced_format());
        assert_eq!(decl.enabled_mask(), (1 << 0) | (1 << 2) | (1 << 7));
    }

    #[test]
    fn test_legacy_upload_per_stream() {
        let driver = RecordingDriver::new();
        let mut cache = GlStateCache::new();
        let decl = VertexDecl::new(&instanced_format());

        decl.prepare_buffer_legacy(1, BufferHandle(5), 1, &mut cache, &driver);
        assert_eq!(
            driver.calls(),
            vec![
                GlCall::BindBuffer {
                    target: gl::ARRAY_BUFFER,
                    buffer: BufferHandle(5)
                },
                GlCall::VertexAttribPointer {
                    index: 7,
                    size: 4,
                    ty: gl::FLOAT,
                    normalized: false,
                    stride: 16,
                    offset: 0
                },
                GlCall::VertexAttribDivisor {
                    index: 7,
                    divisor: 1
                },
            ]
        );
    }

    #[test]
    fn test_native_format_programming() {
        let driver = RecordingDriver::new();
        let mut cache = GlStateCache::new();
        let decl = VertexDecl::new(&instanced_format());

        decl.prepare_vertex_format(&mut cache, &driver);
        let calls = driver.calls();
        assert!(calls.contains(&GlCall::VertexAttribFormat {
            index: 2,
            size: 4,
            ty: gl::UNSIGNED_BYTE,
            normalized: true,
            offset: 12
        }));
        assert!(calls.contains(&GlCall::VertexAttribBinding {
            index: 7,
            binding: 1
        }));
        assert_eq!(cache.attrib_mask(), Some(decl.enabled_mask()));
    }
}

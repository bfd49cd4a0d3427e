//! Device configuration.

use crate::types::VERTEX_STREAM_COUNT;

/// Configuration for creating a [`GlDevice`](crate::GlDevice).
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceConfig {
    /// Index of the adapter the context was created on.
    pub adapter_index: u32,
    /// Forward native debug output to the log when the driver supports it.
    pub debug_output: bool,
    /// Number of vertex streams (at most 2).
    pub vertex_stream_count: u32,
    /// Row alignment used for texture uploads.
    pub unpack_alignment: i32,
    /// Use native per-binding vertex attributes when the driver has them.
    pub prefer_attrib_binding: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            adapter_index: 0,
            debug_output: cfg!(debug_assertions),
            vertex_stream_count: VERTEX_STREAM_COUNT as u32,
            unpack_alignment: 1,
            prefer_attrib_binding: true,
        }
    }
}

impl DeviceConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the adapter index.
    pub fn with_adapter_index(mut self, index: u32) -> Self {
        self.adapter_index = index;
        self
    }

    /// Enable or disable native debug output.
    pub fn with_debug_output(mut self, enabled: bool) -> Self {
        self.debug_output = enabled;
        self
    }

    /// Set the vertex stream count, clamped to `1..=2`.
    pub fn with_vertex_stream_count(mut self, count: u32) -> Self {
        self.vertex_stream_count = count.clamp(1, VERTEX_STREAM_COUNT as u32);
        self
    }

    /// Set the unpack alignment.
    pub fn with_unpack_alignment(mut self, alignment: i32) -> Self {
        self.unpack_alignment = alignment;
        self
    }

    /// Prefer native per-binding vertex attributes.
    pub fn with_attrib_binding(mut self, enabled: bool) -> Self {
        self.prefer_attrib_binding = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DeviceConfig::default();
        assert_eq!(config.vertex_stream_count, 2);
        assert_eq!(config.unpack_alignment, 1);
        assert!(config.prefer_attrib_binding);
    }

    #[test]
    fn test_stream_count_clamped() {
        assert_eq!(DeviceConfig::new().with_vertex_stream_count(8).vertex_stream_count, 2);
        assert_eq!(DeviceConfig::new().with_vertex_stream_count(0).vertex_stream_count, 1);
    }
}

//! Primitive topologies.

/// Primitive topology for draw calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveType {
    PointList,
    LineList,
    LineStrip,
    #[default]
    TriangleList,
    TriangleStrip,
    TriangleFan,
}

impl PrimitiveType {
    /// Number of vertices (or indices) needed to draw `primitive_count`
    /// primitives of this topology.
    pub fn element_count(self, primitive_count: u32) -> u32 {
        match self {
            Self::PointList => primitive_count,
            Self::LineList => primitive_count.saturating_mul(2),
            Self::LineStrip => primitive_count.saturating_add(1),
            Self::TriangleList => primitive_count.saturating_mul(3),
            Self::TriangleStrip | Self::TriangleFan => primitive_count.saturating_add(2),
        }
    }
}

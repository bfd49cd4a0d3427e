//! Vertex layout and buffer types.

use std::fmt::Write as _;
use std::hash::{Hash, Hasher};

/// How a buffer's contents are expected to change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BufferType {
    /// Written once, drawn many times.
    #[default]
    Static,
    /// Rewritten occasionally.
    Dynamic,
    /// Transient per-frame data, recycled through the volatile pools.
    Volatile,
    /// Written once at creation, never updated.
    Immutable,
}

/// Semantic meaning of a vertex element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexSemantic {
    Position,
    Normal,
    Color,
    Tangent,
    TangentW,
    Binormal,
    /// Texture coordinate set 0..=7.
    TexCoord(u8),
}

impl VertexSemantic {
    /// Maximum number of texture coordinate sets.
    pub const MAX_TEXCOORDS: u8 = 8;

    /// Fixed attribute location shared by every program the device links.
    pub fn attrib_location(self) -> u32 {
        match self {
            Self::Position => 0,
            Self::Normal => 1,
            Self::Color => 2,
            Self::Tangent => 3,
            Self::TangentW => 4,
            Self::Binormal => 5,
            Self::TexCoord(set) => 6 + u32::from(set.min(Self::MAX_TEXCOORDS - 1)),
        }
    }

    fn label(self) -> String {
        match self {
            Self::Position => "POSITION".to_string(),
            Self::Normal => "NORMAL".to_string(),
            Self::Color => "COLOR".to_string(),
            Self::Tangent => "TANGENT".to_string(),
            Self::TangentW => "TANGENTW".to_string(),
            Self::Binormal => "BINORMAL".to_string(),
            Self::TexCoord(set) => format!("TEXCOORD{set}"),
        }
    }
}

/// Data type of a vertex element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexElementType {
    Float,
    Float2,
    Float3,
    Float4,
    /// Four normalized unsigned bytes.
    Color,
}

impl VertexElementType {
    /// Number of components.
    pub fn components(self) -> u32 {
        match self {
            Self::Float => 1,
            Self::Float2 => 2,
            Self::Float3 => 3,
            Self::Float4 | Self::Color => 4,
        }
    }

    /// Size in bytes.
    pub fn size_in_bytes(self) -> u32 {
        match self {
            Self::Color => 4,
            other => other.components() * 4,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Float => "float",
            Self::Float2 => "float2",
            Self::Float3 => "float3",
            Self::Float4 => "float4",
            Self::Color => "color",
        }
    }
}

/// One element of a vertex layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexElement {
    /// Vertex stream the element is read from.
    pub stream: u32,
    pub semantic: VertexSemantic,
    pub ty: VertexElementType,
}

/// Ordered vertex layout.
///
/// Two formats are interchangeable exactly when their descriptions match;
/// equality and hashing only look at the description string.
#[derive(Debug, Clone, Default)]
pub struct VertexFormat {
    elements: Vec<VertexElement>,
    description: String,
}

impl VertexFormat {
    /// Create an empty format.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an element read from stream 0.
    pub fn with_element(self, semantic: VertexSemantic, ty: VertexElementType) -> Self {
        self.with_stream_element(0, semantic, ty)
    }

    /// Append an element read from `stream`.
    pub fn with_stream_element(
        mut self,
        stream: u32,
        semantic: VertexSemantic,
        ty: VertexElementType,
    ) -> Self {
        self.elements.push(VertexElement {
            stream,
            semantic,
            ty,
        });
        let _ = write!(
            self.description,
            "{}:{}:{};",
            stream,
            semantic.label(),
            ty.label()
        );
        self
    }

    /// Elements in declaration order.
    pub fn elements(&self) -> &[VertexElement] {
        &self.elements
    }

    /// Canonical description used as the cache key for declarations.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns true if there are no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Stride in bytes of one vertex in `stream`.
    pub fn size_for_stream(&self, stream: u32) -> u32 {
        self.elements
            .iter()
            .filter(|e| e.stream == stream)
            .map(|e| e.ty.size_in_bytes())
            .sum()
    }

    /// Byte offset of element `index` within its stream.
    pub fn offset_of(&self, index: usize) -> u32 {
        let stream = self.elements[index].stream;
        self.elements[..index]
            .iter()
            .filter(|e| e.stream == stream)
            .map(|e| e.ty.size_in_bytes())
            .sum()
    }

    /// Returns true if any element is read from the per-instance stream.
    pub fn has_instancing(&self) -> bool {
        self.elements.iter().any(|e| e.stream > 0)
    }
}

impl PartialEq for VertexFormat {
    fn eq(&self, other: &Self) -> bool {
        self.description == other.description
    }
}

impl Eq for VertexFormat {}

impl Hash for VertexFormat {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.description.hash(state);
    }
}

//! Type conversions between portable types and native GL enumerations.

use crate::driver::gl::{self, GLenum};
use crate::types::{
    BlendFactor, BlendOp, BufferType, ClearFlags, CompareFunction, CullMode, FillMode, FilterMode,
    PixelFormat, PrimitiveType, StencilOp, VertexElementType,
};

/// Convert a primitive topology to a GL draw mode.
pub fn convert_primitive_type(prim: PrimitiveType) -> GLenum {
    match prim {
        PrimitiveType::PointList => gl::POINTS,
        PrimitiveType::LineList => gl::LINES,
        PrimitiveType::LineStrip => gl::LINE_STRIP,
        PrimitiveType::TriangleList => gl::TRIANGLES,
        PrimitiveType::TriangleStrip => gl::TRIANGLE_STRIP,
        PrimitiveType::TriangleFan => gl::TRIANGLE_FAN,
    }
}

/// Convert a pixel format to a sized GL internal format.
///
/// Returns [`gl::ZERO`] for formats the native API has no equivalent for.
pub fn convert_pixel_format(format: PixelFormat) -> GLenum {
    match format {
        PixelFormat::A4L4 => gl::ZERO,

        // Legacy single-channel formats live in the red channel
        PixelFormat::A8 | PixelFormat::L8 => gl::R8,
        PixelFormat::L16 => gl::R16,

        PixelFormat::R16F => gl::R16F,
        PixelFormat::R8G8 => gl::RG8,
        PixelFormat::R32F => gl::R32F,
        PixelFormat::R16G16F => gl::RG16F,
        PixelFormat::R8G8B8 => gl::RGB8,
        PixelFormat::R8G8B8A8 => gl::RGBA8,
        PixelFormat::R8G8B8A8Srgb => gl::SRGB8_ALPHA8,
        PixelFormat::R10G10B10A2 => gl::RGB10_A2,
        PixelFormat::R16G16B16A16 => gl::RGBA16,
        PixelFormat::R16G16B16A16F => gl::RGBA16F,
        PixelFormat::R32G32B32A32F => gl::RGBA32F,

        PixelFormat::D16 => gl::DEPTH_COMPONENT16,
        PixelFormat::D24X8 => gl::DEPTH_COMPONENT24,
        PixelFormat::D24S8 => gl::DEPTH24_STENCIL8,
        PixelFormat::D32F => gl::DEPTH_COMPONENT32F,

        PixelFormat::Dxt1 => gl::COMPRESSED_RGBA_S3TC_DXT1,
        PixelFormat::Dxt3 => gl::COMPRESSED_RGBA_S3TC_DXT3,
        PixelFormat::Dxt5 => gl::COMPRESSED_RGBA_S3TC_DXT5,
    }
}

/// Convert a magnification filter.
pub fn convert_mag_filter(mode: FilterMode) -> GLenum {
    match mode {
        FilterMode::None | FilterMode::Point => gl::NEAREST,
        FilterMode::Linear | FilterMode::Anisotropic => gl::LINEAR,
    }
}

/// Convert a minification filter combined with the mip filter.
///
/// Single-level textures never sample mips.
pub fn convert_min_filter(min: FilterMode, mip: FilterMode, mip_levels: u32) -> GLenum {
    let min_linear = matches!(min, FilterMode::Linear | FilterMode::Anisotropic);
    if mip_levels <= 1 {
        return if min_linear { gl::LINEAR } else { gl::NEAREST };
    }

    match (min_linear, mip) {
        (true, FilterMode::None) => gl::LINEAR,
        (false, FilterMode::None) => gl::NEAREST,
        (true, FilterMode::Point) => gl::LINEAR_MIPMAP_NEAREST,
        (false, FilterMode::Point) => gl::NEAREST_MIPMAP_NEAREST,
        (true, _) => gl::LINEAR_MIPMAP_LINEAR,
        (false, _) => gl::NEAREST_MIPMAP_LINEAR,
    }
}

/// Convert a blend factor.
pub fn convert_blend_factor(factor: BlendFactor) -> GLenum {
    match factor {
        BlendFactor::Zero => gl::ZERO,
        BlendFactor::One => gl::ONE,
        BlendFactor::SrcColor => gl::SRC_COLOR,
        BlendFactor::InvSrcColor => gl::ONE_MINUS_SRC_COLOR,
        BlendFactor::SrcAlpha => gl::SRC_ALPHA,
        BlendFactor::InvSrcAlpha => gl::ONE_MINUS_SRC_ALPHA,
        BlendFactor::DestAlpha => gl::DST_ALPHA,
        BlendFactor::InvDestAlpha => gl::ONE_MINUS_DST_ALPHA,
        BlendFactor::DestColor => gl::DST_COLOR,
        BlendFactor::InvDestColor => gl::ONE_MINUS_DST_COLOR,
        BlendFactor::SrcAlphaSat => gl::SRC_ALPHA_SATURATE,
    }
}

/// Convert a blend equation.
pub fn convert_blend_op(op: BlendOp) -> GLenum {
    match op {
        BlendOp::Add => gl::FUNC_ADD,
        BlendOp::Subtract => gl::FUNC_SUBTRACT,
        BlendOp::RevSubtract => gl::FUNC_REVERSE_SUBTRACT,
        BlendOp::Min => gl::MIN,
        BlendOp::Max => gl::MAX,
    }
}

/// Convert a comparison function.
pub fn convert_compare_function(func: CompareFunction) -> GLenum {
    match func {
        CompareFunction::Never => gl::NEVER,
        CompareFunction::Less => gl::LESS,
        CompareFunction::Equal => gl::EQUAL,
        CompareFunction::LessEqual => gl::LEQUAL,
        CompareFunction::Greater => gl::GREATER,
        CompareFunction::NotEqual => gl::NOTEQUAL,
        CompareFunction::GreaterEqual => gl::GEQUAL,
        CompareFunction::Always => gl::ALWAYS,
    }
}

/// Convert a stencil operation.
pub fn convert_stencil_op(op: StencilOp) -> GLenum {
    match op {
        StencilOp::Keep => gl::KEEP,
        StencilOp::Zero => gl::ZERO,
        StencilOp::Replace => gl::REPLACE,
        StencilOp::IncrSat => gl::INCR,
        StencilOp::DecrSat => gl::DECR,
        StencilOp::Invert => gl::INVERT,
        StencilOp::Incr => gl::INCR_WRAP,
        StencilOp::Decr => gl::DECR_WRAP,
    }
}

/// Convert a cull mode to the face GL should cull, `None` to disable culling.
///
/// Front faces are counter-clockwise, so culling clockwise geometry culls
/// back faces.
pub fn convert_cull_mode(mode: CullMode) -> Option<GLenum> {
    match mode {
        CullMode::None => None,
        CullMode::Cw => Some(gl::BACK),
        CullMode::Ccw => Some(gl::FRONT),
    }
}

/// Convert a fill mode to a polygon mode.
pub fn convert_fill_mode(mode: FillMode) -> GLenum {
    match mode {
        FillMode::Point => gl::POINT,
        FillMode::Wireframe => gl::LINE,
        FillMode::Solid => gl::FILL,
    }
}

/// Convert a buffer type to a GL usage hint.
pub fn convert_buffer_usage(ty: BufferType) -> GLenum {
    match ty {
        BufferType::Static | BufferType::Immutable => gl::STATIC_DRAW,
        BufferType::Dynamic => gl::DYNAMIC_DRAW,
        BufferType::Volatile => gl::STREAM_DRAW,
    }
}

/// Convert a vertex element type to (component count, data type, normalized).
pub fn convert_vertex_element(ty: VertexElementType) -> (u32, GLenum, bool) {
    match ty {
        VertexElementType::Color => (4, gl::UNSIGNED_BYTE, true),
        other => (other.components(), gl::FLOAT, false),
    }
}

/// Convert clear flags to a GL clear bitfield.
pub fn convert_clear_flags(flags: ClearFlags) -> u32 {
    let mut result = 0;

    if flags.contains(ClearFlags::TARGET) {
        result |= gl::COLOR_BUFFER_BIT;
    }
    if flags.contains(ClearFlags::Z_BUFFER) {
        result |= gl::DEPTH_BUFFER_BIT;
    }
    if flags.contains(ClearFlags::STENCIL) {
        result |= gl::STENCIL_BUFFER_BIT;
    }

    result
}

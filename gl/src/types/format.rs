//! Portable pixel formats.

use bitflags::bitflags;

/// Pixel format enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PixelFormat {
    // 8-bit formats
    /// 4-bit alpha with 4-bit luminance (no native equivalent).
    A4L4,
    /// 8-bit alpha only.
    A8,
    /// 8-bit luminance.
    L8,

    // 16-bit formats
    /// 16-bit luminance.
    L16,
    /// 16-bit red channel, float.
    R16F,
    /// 8-bit RG channels.
    R8G8,

    // 32-bit formats
    /// 32-bit red channel, float.
    R32F,
    /// 16-bit RG channels, float.
    R16G16F,
    /// 8-bit RGB channels.
    R8G8B8,
    /// 8-bit RGBA channels.
    #[default]
    R8G8B8A8,
    /// 8-bit RGBA channels, sRGB.
    R8G8B8A8Srgb,
    /// 10-bit RGB channels with 2-bit alpha.
    R10G10B10A2,

    // 64-bit formats
    /// 16-bit RGBA channels, normalized.
    R16G16B16A16,
    /// 16-bit RGBA channels, float.
    R16G16B16A16F,

    // 128-bit formats
    /// 32-bit RGBA channels, float.
    R32G32B32A32F,

    // Depth/stencil formats
    /// 16-bit depth.
    D16,
    /// 24-bit depth, 8 bits unused.
    D24X8,
    /// 24-bit depth with 8-bit stencil.
    D24S8,
    /// 32-bit depth, float.
    D32F,

    // Block-compressed formats
    /// BC1.
    Dxt1,
    /// BC2.
    Dxt3,
    /// BC3.
    Dxt5,
}

impl PixelFormat {
    /// Returns true if this is a depth or stencil format.
    pub fn is_depth_stencil(&self) -> bool {
        matches!(self, Self::D16 | Self::D24X8 | Self::D24S8 | Self::D32F)
    }

    /// Returns true if this format has a stencil component.
    pub fn has_stencil(&self) -> bool {
        matches!(self, Self::D24S8)
    }

    /// Returns true for block-compressed formats.
    pub fn is_compressed(&self) -> bool {
        matches!(self, Self::Dxt1 | Self::Dxt3 | Self::Dxt5)
    }

    /// Returns true for the legacy single-channel formats that cannot be
    /// bound as colour attachments.
    pub fn is_single_channel(&self) -> bool {
        matches!(self, Self::A8 | Self::L8 | Self::L16)
    }

    /// Returns true if any channel is a 32-bit float.
    pub fn is_float32(&self) -> bool {
        matches!(self, Self::R32F | Self::R32G32B32A32F | Self::D32F)
    }

    /// Returns the size in bytes per pixel, or per 4x4 block for
    /// compressed formats.
    pub fn block_size(&self) -> u32 {
        match self {
            Self::A4L4 | Self::A8 | Self::L8 => 1,
            Self::L16 | Self::R16F | Self::R8G8 | Self::D16 => 2,
            Self::R8G8B8 => 3,
            Self::R32F
            | Self::R16G16F
            | Self::R8G8B8A8
            | Self::R8G8B8A8Srgb
            | Self::R10G10B10A2
            | Self::D24X8
            | Self::D24S8
            | Self::D32F => 4,
            Self::R16G16B16A16 | Self::R16G16B16A16F | Self::Dxt1 => 8,
            Self::R32G32B32A32F | Self::Dxt3 | Self::Dxt5 => 16,
        }
    }
}

bitflags! {
    /// Intended use of a texture, consulted by format selection.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u32 {
        /// Texture is sampled in a shader.
        const SAMPLED = 1 << 0;
        /// Texture is bound as a colour attachment.
        const RENDER_TARGET = 1 << 1;
        /// Texture is bound as the depth-stencil attachment.
        const DEPTH_STENCIL = 1 << 2;
        /// Mip levels are generated after rendering.
        const GENERATE_MIPS = 1 << 3;
    }
}

impl Default for TextureUsage {
    fn default() -> Self {
        Self::SAMPLED
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_classes() {
        assert!(PixelFormat::D24S8.is_depth_stencil());
        assert!(PixelFormat::D24S8.has_stencil());
        assert!(!PixelFormat::D32F.has_stencil());
        assert!(PixelFormat::L16.is_single_channel());
        assert!(!PixelFormat::R8G8B8A8.is_single_channel());
        assert!(PixelFormat::Dxt5.is_compressed());
        assert_eq!(PixelFormat::default(), PixelFormat::R8G8B8A8);
    }

    #[test]
    fn test_block_size() {
        assert_eq!(PixelFormat::R8G8B8A8.block_size(), 4);
        assert_eq!(PixelFormat::R32G32B32A32F.block_size(), 16);
        assert_eq!(PixelFormat::Dxt1.block_size(), 8);
    }
}

//! Sampler descriptors.

/// Texture filtering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterMode {
    /// No filtering (only meaningful for the mip filter).
    None,
    Point,
    #[default]
    Linear,
    Anisotropic,
}

/// Sampling parameters attached to a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerDesc {
    pub min_filter: FilterMode,
    pub mag_filter: FilterMode,
    pub mip_filter: FilterMode,
    /// Maximum anisotropy, used only with [`FilterMode::Anisotropic`].
    pub max_anisotropy: u32,
}

impl Default for SamplerDesc {
    fn default() -> Self {
        Self {
            min_filter: FilterMode::Linear,
            mag_filter: FilterMode::Linear,
            mip_filter: FilterMode::Linear,
            max_anisotropy: 1,
        }
    }
}

impl SamplerDesc {
    /// Linear filtering on every axis.
    pub fn linear() -> Self {
        Self::default()
    }

    /// Nearest-neighbour filtering without mip blending.
    pub fn point() -> Self {
        Self {
            min_filter: FilterMode::Point,
            mag_filter: FilterMode::Point,
            mip_filter: FilterMode::Point,
            max_anisotropy: 1,
        }
    }

    /// Anisotropic filtering up to `level`.
    pub fn anisotropic(level: u32) -> Self {
        Self {
            min_filter: FilterMode::Anisotropic,
            mag_filter: FilterMode::Linear,
            mip_filter: FilterMode::Linear,
            max_anisotropy: level.max(1),
        }
    }
}

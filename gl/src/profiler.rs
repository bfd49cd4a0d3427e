//! Card capability profile and format selection.

use std::collections::HashSet;

use crate::driver::gl;
use crate::driver::{Extension, GlDriver};
use crate::translate::convert_pixel_format;
use crate::types::{PixelFormat, TextureUsage, MAX_RENDER_SLOTS};

/// Limits and feature flags of the driver, queried once at device creation.
#[derive(Debug, Clone, PartialEq)]
pub struct CardProfile {
    /// Driver name.
    pub renderer: String,
    /// Texture units reachable from shaders.
    pub max_shader_textures: u32,
    /// Texture units of the fixed-function pipeline.
    pub max_ff_textures: u32,
    /// Simultaneous colour outputs, clamped to `MAX_RENDER_SLOTS - 1`.
    pub max_render_targets: u32,
    /// Shading language version, `0.0` without a programmable pipeline.
    pub pixel_shader_version: f32,
    extensions: HashSet<Extension>,
}

impl Default for CardProfile {
    fn default() -> Self {
        Self {
            renderer: String::new(),
            max_shader_textures: 2,
            max_ff_textures: 2,
            max_render_targets: 1,
            pixel_shader_version: 0.0,
            extensions: HashSet::new(),
        }
    }
}

impl CardProfile {
    /// Extensions probed by [`CardProfile::query`].
    pub const PROBED: [Extension; 9] = [
        Extension::KhrDebug,
        Extension::ArbDebugOutput,
        Extension::AmdDebugOutput,
        Extension::ArbVertexAttribBinding,
        Extension::ArbSync,
        Extension::ArbTextureFilterAnisotropic,
        Extension::ArbColorBufferFloat,
        Extension::OesTextureFloatLinear,
        Extension::ExtTextureCompressionS3tc,
    ];

    /// Query limits and extensions from the current context.
    pub fn query(driver: &dyn GlDriver) -> Self {
        let limit = |pname| driver.get_integer(pname).max(0) as u32;
        let max_render_targets = limit(gl::MAX_COLOR_ATTACHMENTS)
            .clamp(1, MAX_RENDER_SLOTS as u32 - 1);

        let profile = Self {
            renderer: driver.name().to_string(),
            max_shader_textures: limit(gl::MAX_TEXTURE_IMAGE_UNITS),
            max_ff_textures: limit(gl::MAX_TEXTURE_UNITS),
            max_render_targets,
            pixel_shader_version: driver.shading_language_version(),
            extensions: Self::PROBED
                .into_iter()
                .filter(|&ext| driver.has_extension(ext))
                .collect(),
        };

        log::info!(
            "{}: GLSL {:.2}, {} shader texture units, {} fixed-function units, {} render targets",
            profile.renderer,
            profile.pixel_shader_version,
            profile.max_shader_textures,
            profile.max_ff_textures,
            profile.max_render_targets
        );
        log::debug!("Extensions: {:?}", profile.extensions);
        profile
    }

    /// Returns true if the extension was reported by the driver.
    pub fn has_extension(&self, extension: Extension) -> bool {
        self.extensions.contains(&extension)
    }

    /// Anisotropic filtering support.
    pub fn supports_anisotropic(&self) -> bool {
        self.has_extension(Extension::ArbTextureFilterAnisotropic)
    }

    /// Native debug-output extension to use, preferring the standard ones.
    pub fn debug_output_extension(&self) -> Option<Extension> {
        [
            Extension::KhrDebug,
            Extension::ArbDebugOutput,
            Extension::AmdDebugOutput,
        ]
        .into_iter()
        .find(|&ext| self.has_extension(ext))
    }

    fn supports_format(
        &self,
        format: PixelFormat,
        usage: TextureUsage,
        texture: bool,
        must_blend: bool,
        must_filter: bool,
    ) -> bool {
        if convert_pixel_format(format) == gl::ZERO {
            return false;
        }
        if usage.contains(TextureUsage::RENDER_TARGET) && format.is_single_channel() {
            return false;
        }
        let s3tc = self.has_extension(Extension::ExtTextureCompressionS3tc);
        if format.is_compressed() && (!texture || !s3tc) {
            return false;
        }
        if format.is_float32() {
            if must_blend && !self.has_extension(Extension::ArbColorBufferFloat) {
                return false;
            }
            if must_filter && !self.has_extension(Extension::OesTextureFloatLinear) {
                return false;
            }
        }
        true
    }

    /// First format of `formats` usable for `usage`, else
    /// [`PixelFormat::R8G8B8A8`].
    ///
    /// Render targets skip single-channel formats. `must_blend` and
    /// `must_filter` skip 32-bit float formats the driver cannot blend into or
    /// filter. Compressed formats need S3TC and are only valid for textures.
    pub fn select_supported_format(
        &self,
        usage: TextureUsage,
        formats: &[PixelFormat],
        texture: bool,
        must_blend: bool,
        must_filter: bool,
    ) -> PixelFormat {
        formats
            .iter()
            .copied()
            .find(|&f| self.supports_format(f, usage, texture, must_blend, must_filter))
            .unwrap_or_else(|| {
                log::warn!("No supported format in {formats:?}, falling back to R8G8B8A8");
                PixelFormat::R8G8B8A8
            })
    }
}

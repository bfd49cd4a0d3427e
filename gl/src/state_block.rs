//! Immutable fixed-function state blocks.
//!
//! A [`StateBlock`] wraps a [`StateBlockDesc`] together with its translated
//! native values. Activation is a pure function of the previously active
//! block: only the native state that differs is touched.

use std::sync::OnceLock;

use crate::driver::gl::{self, GLenum};
use crate::driver::{GlCall, GlDriver};
use crate::translate::{
    convert_blend_factor, convert_blend_op, convert_compare_function, convert_cull_mode,
    convert_fill_mode, convert_stencil_op,
};
use crate::types::StateBlockDesc;

/// Native values translated from a description.
#[derive(Debug, Clone, Copy, PartialEq)]
struct NativeState {
    blend_enable: bool,
    blend_func: [GLenum; 4],
    blend_equation: [GLenum; 2],
    color_mask: [bool; 4],
    depth_test: bool,
    depth_mask: bool,
    depth_func: GLenum,
    /// (slope factor, constant units); both zero disables the offset.
    polygon_offset: (f32, f32),
    cull_face: Option<GLenum>,
    polygon_mode: GLenum,
    stencil_test: bool,
    stencil_func: (GLenum, i32, u32),
    stencil_op: [GLenum; 3],
    stencil_write_mask: u32,
}

impl NativeState {
    fn from_desc(desc: &StateBlockDesc) -> Self {
        let src_rgb = convert_blend_factor(desc.blend_src);
        let dst_rgb = convert_blend_factor(desc.blend_dest);
        let rgb_op = convert_blend_op(desc.blend_op);

        let (src_alpha, dst_alpha, alpha_op) = if desc.separate_alpha_blend_enable {
            (
                convert_blend_factor(desc.separate_alpha_blend_src),
                convert_blend_factor(desc.separate_alpha_blend_dest),
                convert_blend_op(desc.separate_alpha_blend_op),
            )
        } else {
            (src_rgb, dst_rgb, rgb_op)
        };

        Self {
            blend_enable: desc.blend_enable,
            blend_func: [src_rgb, dst_rgb, src_alpha, dst_alpha],
            blend_equation: [rgb_op, alpha_op],
            color_mask: [
                desc.color_write_red,
                desc.color_write_green,
                desc.color_write_blue,
                desc.color_write_alpha,
            ],
            depth_test: desc.z_enable,
            depth_mask: desc.z_write_enable,
            depth_func: convert_compare_function(desc.z_func),
            polygon_offset: (desc.z_slope_bias, desc.z_bias),
            cull_face: convert_cull_mode(desc.cull_mode),
            polygon_mode: convert_fill_mode(desc.fill_mode),
            stencil_test: desc.stencil_enable,
            stencil_func: (
                convert_compare_function(desc.stencil_func),
                desc.stencil_ref as i32,
                desc.stencil_mask,
            ),
            stencil_op: [
                convert_stencil_op(desc.stencil_fail_op),
                convert_stencil_op(desc.stencil_z_fail_op),
                convert_stencil_op(desc.stencil_pass_op),
            ],
            stencil_write_mask: desc.stencil_write_mask,
        }
    }
}

fn differs<T: PartialEq>(
    old: Option<&NativeState>,
    new: &NativeState,
    pick: impl Fn(&NativeState) -> T,
) -> bool {
    old.map_or(true, |old| pick(old) != pick(new))
}

fn toggle(driver: &dyn GlDriver, cap: GLenum, enabled: bool) {
    driver.submit(if enabled {
        GlCall::Enable(cap)
    } else {
        GlCall::Disable(cap)
    });
}

/// Immutable bundle of rasterizer, blend and depth-stencil settings.
#[derive(Debug)]
pub struct StateBlock {
    desc: StateBlockDesc,
    native: OnceLock<NativeState>,
}

impl StateBlock {
    /// Create a state block. Native values are translated on first use.
    pub fn new(desc: StateBlockDesc) -> Self {
        Self {
            desc,
            native: OnceLock::new(),
        }
    }

    /// The description this block was created from.
    pub fn desc(&self) -> &StateBlockDesc {
        &self.desc
    }

    fn native(&self) -> &NativeState {
        self.native.get_or_init(|| NativeState::from_desc(&self.desc))
    }

    /// Apply this block, issuing only the calls that differ from `previous`.
    /// With no previous block every piece of state is applied.
    pub fn activate(&self, previous: Option<&StateBlock>, driver: &dyn GlDriver) {
        let new = self.native();
        let old = previous.map(StateBlock::native);

        // Blending
        if differs(old, new, |s| s.blend_enable) {
            toggle(driver, gl::BLEND, new.blend_enable);
        }
        if differs(old, new, |s| s.blend_func) {
            let [src_rgb, dst_rgb, src_alpha, dst_alpha] = new.blend_func;
            driver.submit(GlCall::BlendFuncSeparate {
                src_rgb,
                dst_rgb,
                src_alpha,
                dst_alpha,
            });
        }
        if differs(old, new, |s| s.blend_equation) {
            let [rgb, alpha] = new.blend_equation;
            driver.submit(GlCall::BlendEquationSeparate { rgb, alpha });
        }
        if differs(old, new, |s| s.color_mask) {
            let [red, green, blue, alpha] = new.color_mask;
            driver.submit(GlCall::ColorMask {
                red,
                green,
                blue,
                alpha,
            });
        }

        // Depth
        if differs(old, new, |s| s.depth_test) {
            toggle(driver, gl::DEPTH_TEST, new.depth_test);
        }
        if differs(old, new, |s| s.depth_mask) {
            driver.submit(GlCall::DepthMask(new.depth_mask));
        }
        if differs(old, new, |s| s.depth_func) {
            driver.submit(GlCall::DepthFunc(new.depth_func));
        }
        if differs(old, new, |s| s.polygon_offset) {
            let (factor, units) = new.polygon_offset;
            let enabled = factor != 0.0 || units != 0.0;
            toggle(driver, gl::POLYGON_OFFSET_FILL, enabled);
            if enabled {
                driver.submit(GlCall::PolygonOffset { factor, units });
            }
        }

        // Rasterizer
        if differs(old, new, |s| s.cull_face) {
            toggle(driver, gl::CULL_FACE, new.cull_face.is_some());
            if let Some(face) = new.cull_face {
                driver.submit(GlCall::CullFace(face));
            }
        }
        if differs(old, new, |s| s.polygon_mode) {
            driver.submit(GlCall::PolygonMode(new.polygon_mode));
        }

        // Stencil
        if differs(old, new, |s| s.stencil_test) {
            toggle(driver, gl::STENCIL_TEST, new.stencil_test);
        }
        if differs(old, new, |s| s.stencil_func) {
            let (func, reference, mask) = new.stencil_func;
            driver.submit(GlCall::StencilFunc {
                func,
                reference,
                mask,
            });
        }
        if differs(old, new, |s| s.stencil_op) {
            let [fail, depth_fail, pass] = new.stencil_op;
            driver.submit(GlCall::StencilOp {
                fail,
                depth_fail,
                pass,
            });
        }
        if differs(old, new, |s| s.stencil_write_mask) {
            driver.submit(GlCall::StencilMask(new.stencil_write_mask));
        }
    }

    /// Restore the write masks this block narrows after they were forced
    /// open (e.g. around a clear).
    pub fn restore_write_masks(&self, driver: &dyn GlDriver) {
        let native = self.native();
        if native.color_mask != [true; 4] {
            let [red, green, blue, alpha] = native.color_mask;
            driver.submit(GlCall::ColorMask {
                red,
                green,
                blue,
                alpha,
            });
        }
        if !native.depth_mask {
            driver.submit(GlCall::DepthMask(false));
        }
        if native.stencil_write_mask != u32::MAX {
            driver.submit(GlCall::StencilMask(native.stencil_write_mask));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::RecordingDriver;
    use crate::types::{BlendFactor, CullMode};

    #[test]
    fn test_activate_without_previous_applies_everything() {
        let driver = RecordingDriver::new();
        StateBlock::new(StateBlockDesc::default()).activate(None, &driver);

        let calls = driver.calls();
        assert!(calls.contains(&GlCall::Disable(gl::BLEND)));
        assert!(calls.contains(&GlCall::Enable(gl::DEPTH_TEST)));
        assert!(calls.contains(&GlCall::DepthFunc(gl::LEQUAL)));
        assert!(calls.contains(&GlCall::CullFace(gl::FRONT)));
        assert!(calls.contains(&GlCall::StencilMask(u32::MAX)));
    }

    #[test]
    fn test_activate_same_block_is_silent() {
        let driver = RecordingDriver::new();
        let block = StateBlock::new(StateBlockDesc::default());
        block.activate(Some(&block), &driver);
        assert!(driver.calls().is_empty());
    }

    #[test]
    fn test_activate_diffs_only_changes() {
        let driver = RecordingDriver::new();
        let base = StateBlock::new(StateBlockDesc::default());
        let alpha = StateBlock::new(
            StateBlockDesc::default()
                .with_blend(BlendFactor::SrcAlpha, BlendFactor::InvSrcAlpha)
                .with_cull_mode(CullMode::None),
        );

        alpha.activate(Some(&base), &driver);

        assert_eq!(
            driver.calls(),
            vec![
                GlCall::Enable(gl::BLEND),
                GlCall::BlendFuncSeparate {
                    src_rgb: gl::SRC_ALPHA,
                    dst_rgb: gl::ONE_MINUS_SRC_ALPHA,
                    src_alpha: gl::SRC_ALPHA,
                    dst_alpha: gl::ONE_MINUS_SRC_ALPHA,
                },
                GlCall::Disable(gl::CULL_FACE),
            ]
        );
    }

    #[test]
    fn test_restore_write_masks() {
        let driver = RecordingDriver::new();
        let block = StateBlock::new(
            StateBlockDesc::default()
                .with_z_read_write(true, false)
                .with_color_writes(true, true, true, false),
        );
        block.restore_write_masks(&driver);
        assert_eq!(
            driver.calls(),
            vec![
                GlCall::ColorMask {
                    red: true,
                    green: true,
                    blue: true,
                    alpha: false
                },
                GlCall::DepthMask(false),
            ]
        );
    }
}

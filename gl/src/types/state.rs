//! Fixed-function state descriptors.

use std::hash::{Hash, Hasher};

/// Blend factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    InvSrcColor,
    SrcAlpha,
    InvSrcAlpha,
    DestAlpha,
    InvDestAlpha,
    DestColor,
    InvDestColor,
    SrcAlphaSat,
}

/// Blend equation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendOp {
    Add,
    Subtract,
    RevSubtract,
    Min,
    Max,
}

/// Comparison function for depth and stencil tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareFunction {
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

/// Stencil buffer operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StencilOp {
    Keep,
    Zero,
    Replace,
    IncrSat,
    DecrSat,
    Invert,
    Incr,
    Decr,
}

/// Face culling mode, named after the winding that gets culled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CullMode {
    None,
    Cw,
    Ccw,
}

/// Polygon rasterization mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FillMode {
    Point,
    Wireframe,
    Solid,
}

/// Description of a fixed-function state block.
///
/// Descriptions are plain values; the device creates one immutable
/// [`StateBlock`](crate::StateBlock) per distinct description.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateBlockDesc {
    // Blending
    pub blend_enable: bool,
    pub blend_src: BlendFactor,
    pub blend_dest: BlendFactor,
    pub blend_op: BlendOp,
    /// When false the alpha channel blends with the colour factors.
    pub separate_alpha_blend_enable: bool,
    pub separate_alpha_blend_src: BlendFactor,
    pub separate_alpha_blend_dest: BlendFactor,
    pub separate_alpha_blend_op: BlendOp,

    // Colour writes
    pub color_write_red: bool,
    pub color_write_green: bool,
    pub color_write_blue: bool,
    pub color_write_alpha: bool,

    // Depth
    pub z_enable: bool,
    pub z_write_enable: bool,
    pub z_func: CompareFunction,
    pub z_bias: f32,
    pub z_slope_bias: f32,

    // Rasterizer
    pub cull_mode: CullMode,
    pub fill_mode: FillMode,

    // Stencil
    pub stencil_enable: bool,
    pub stencil_fail_op: StencilOp,
    pub stencil_z_fail_op: StencilOp,
    pub stencil_pass_op: StencilOp,
    pub stencil_func: CompareFunction,
    pub stencil_ref: u32,
    pub stencil_mask: u32,
    pub stencil_write_mask: u32,
}

impl Default for StateBlockDesc {
    fn default() -> Self {
        Self {
            blend_enable: false,
            blend_src: BlendFactor::One,
            blend_dest: BlendFactor::Zero,
            blend_op: BlendOp::Add,
            separate_alpha_blend_enable: false,
            separate_alpha_blend_src: BlendFactor::One,
            separate_alpha_blend_dest: BlendFactor::Zero,
            separate_alpha_blend_op: BlendOp::Add,
            color_write_red: true,
            color_write_green: true,
            color_write_blue: true,
            color_write_alpha: true,
            z_enable: true,
            z_write_enable: true,
            z_func: CompareFunction::LessEqual,
            z_bias: 0.0,
            z_slope_bias: 0.0,
            cull_mode: CullMode::Ccw,
            fill_mode: FillMode::Solid,
            stencil_enable: false,
            stencil_fail_op: StencilOp::Keep,
            stencil_z_fail_op: StencilOp::Keep,
            stencil_pass_op: StencilOp::Keep,
            stencil_func: CompareFunction::Never,
            stencil_ref: 0,
            stencil_mask: 0xFFFF_FFFF,
            stencil_write_mask: 0xFFFF_FFFF,
        }
    }
}

impl StateBlockDesc {
    /// Create a description with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable blending with the given colour factors.
    pub fn with_blend(mut self, src: BlendFactor, dest: BlendFactor) -> Self {
        self.blend_enable = true;
        self.blend_src = src;
        self.blend_dest = dest;
        self
    }

    /// Set the colour blend equation.
    pub fn with_blend_op(mut self, op: BlendOp) -> Self {
        self.blend_op = op;
        self
    }

    /// Blend alpha with its own factors.
    pub fn with_separate_alpha_blend(
        mut self,
        src: BlendFactor,
        dest: BlendFactor,
        op: BlendOp,
    ) -> Self {
        self.separate_alpha_blend_enable = true;
        self.separate_alpha_blend_src = src;
        self.separate_alpha_blend_dest = dest;
        self.separate_alpha_blend_op = op;
        self
    }

    /// Set depth test and depth write.
    pub fn with_z_read_write(mut self, read: bool, write: bool) -> Self {
        self.z_enable = read;
        self.z_write_enable = write;
        self
    }

    /// Set the depth comparison function.
    pub fn with_z_func(mut self, func: CompareFunction) -> Self {
        self.z_func = func;
        self
    }

    /// Set depth bias and slope-scaled depth bias.
    pub fn with_z_bias(mut self, bias: f32, slope_bias: f32) -> Self {
        self.z_bias = bias;
        self.z_slope_bias = slope_bias;
        self
    }

    /// Set the cull mode.
    pub fn with_cull_mode(mut self, mode: CullMode) -> Self {
        self.cull_mode = mode;
        self
    }

    /// Set the fill mode.
    pub fn with_fill_mode(mut self, mode: FillMode) -> Self {
        self.fill_mode = mode;
        self
    }

    /// Set the per-channel colour write mask.
    pub fn with_color_writes(mut self, red: bool, green: bool, blue: bool, alpha: bool) -> Self {
        self.color_write_red = red;
        self.color_write_green = green;
        self.color_write_blue = blue;
        self.color_write_alpha = alpha;
        self
    }

    /// Enable the stencil test.
    pub fn with_stencil(mut self, func: CompareFunction, reference: u32) -> Self {
        self.stencil_enable = true;
        self.stencil_func = func;
        self.stencil_ref = reference;
        self
    }

    /// Set the stencil operations for fail, depth-fail and pass.
    pub fn with_stencil_ops(mut self, fail: StencilOp, z_fail: StencilOp, pass: StencilOp) -> Self {
        self.stencil_fail_op = fail;
        self.stencil_z_fail_op = z_fail;
        self.stencil_pass_op = pass;
        self
    }

    /// Set the stencil read and write masks.
    pub fn with_stencil_masks(mut self, read: u32, write: u32) -> Self {
        self.stencil_mask = read;
        self.stencil_write_mask = write;
        self
    }

    /// Returns true if any colour channel write is disabled.
    pub fn masks_color(&self) -> bool {
        !(self.color_write_red
            && self.color_write_green
            && self.color_write_blue
            && self.color_write_alpha)
    }

    /// Human-readable summary for diagnostics.
    pub fn describe(&self) -> String {
        format!(
            "blend: {} {:?}/{:?} {:?}, z: {} write {} {:?}, cull {:?}, fill {:?}, stencil: {} {:?}",
            self.blend_enable,
            self.blend_src,
            self.blend_dest,
            self.blend_op,
            self.z_enable,
            self.z_write_enable,
            self.z_func,
            self.cull_mode,
            self.fill_mode,
            self.stencil_enable,
            self.stencil_func,
        )
    }
}

// Bias values are compared bitwise so descriptions can key a hash map.
impl Eq for StateBlockDesc {}

impl Hash for StateBlockDesc {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.blend_enable.hash(state);
        self.blend_src.hash(state);
        self.blend_dest.hash(state);
        self.blend_op.hash(state);
        self.separate_alpha_blend_enable.hash(state);
        self.separate_alpha_blend_src.hash(state);
        self.separate_alpha_blend_dest.hash(state);
        self.separate_alpha_blend_op.hash(state);
        self.color_write_red.hash(state);
        self.color_write_green.hash(state);
        self.color_write_blue.hash(state);
        self.color_write_alpha.hash(state);
        self.z_enable.hash(state);
        self.z_write_enable.hash(state);
        self.z_func.hash(state);
        self.z_bias.to_bits().hash(state);
        self.z_slope_bias.to_bits().hash(state);
        self.cull_mode.hash(state);
        self.fill_mode.hash(state);
        self.stencil_enable.hash(state);
        self.stencil_fail_op.hash(state);
        self.stencil_z_fail_op.hash(state);
        self.stencil_pass_op.hash(state);
        self.stencil_func.hash(state);
        self.stencil_ref.hash(state);
        self.stencil_mask.hash(state);
        self.stencil_write_mask.hash(state);
    }
}

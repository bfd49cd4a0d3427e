//! Common types shared across the device.

use bitflags::bitflags;

/// Number of texture units the device tracks.
pub const TEXTURE_STAGE_COUNT: usize = 16;

/// Number of render target slots (colour attachments plus depth).
pub const MAX_RENDER_SLOTS: usize = 6;

/// Number of vertex streams (stream 0 = geometry, stream 1 = per-instance).
pub const VERTEX_STREAM_COUNT: usize = 2;

// ============================================================================
// Points and Rectangles
// ============================================================================

/// Integer 2D point, also used as an extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point2I {
    pub x: i32,
    pub y: i32,
}

impl Point2I {
    /// Create a new point.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Integer rectangle in target space (origin top-left, +Y down).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RectI {
    /// Top-left corner.
    pub point: Point2I,
    /// Width and height.
    pub extent: Point2I,
}

impl RectI {
    /// Create a rectangle from origin and size.
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            point: Point2I::new(x, y),
            extent: Point2I::new(width, height),
        }
    }

    /// Create a rectangle covering `size` with origin at (0, 0).
    pub const fn from_extent(size: Point2I) -> Self {
        Self {
            point: Point2I::new(0, 0),
            extent: size,
        }
    }

    /// Returns true if the rectangle has no area.
    pub fn is_empty(&self) -> bool {
        self.extent.x <= 0 || self.extent.y <= 0
    }

    /// Right edge, saturating at `i32::MAX`.
    pub fn max_x(&self) -> i32 {
        self.point.x.saturating_add(self.extent.x)
    }

    /// Bottom edge, saturating at `i32::MAX`.
    pub fn max_y(&self) -> i32 {
        self.point.y.saturating_add(self.extent.y)
    }

    /// Intersection of two rectangles.
    ///
    /// Disjoint rectangles produce an empty rectangle positioned at the
    /// clamped origin, never a negative extent.
    pub fn intersect(&self, other: &RectI) -> RectI {
        let min_x = self.point.x.max(other.point.x);
        let min_y = self.point.y.max(other.point.y);
        let max_x = self.max_x().min(other.max_x());
        let max_y = self.max_y().min(other.max_y());

        RectI::new(
            min_x,
            min_y,
            max_x.saturating_sub(min_x).max(0),
            max_y.saturating_sub(min_y).max(0),
        )
    }
}

// ============================================================================
// Colors and clears
// ============================================================================

/// Linear floating-point colour.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ColorF {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl ColorF {
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);

    /// Create a new colour.
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Convert from 8-bit channels.
    pub fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::new(
            f32::from(r) / 255.0,
            f32::from(g) / 255.0,
            f32::from(b) / 255.0,
            f32::from(a) / 255.0,
        )
    }

    /// Channels as an array.
    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

bitflags! {
    /// Buffers affected by a clear.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClearFlags: u32 {
        /// Clear the colour attachments.
        const TARGET = 1 << 0;
        /// Clear the depth buffer.
        const Z_BUFFER = 1 << 1;
        /// Clear the stencil buffer.
        const STENCIL = 1 << 2;
    }
}

impl Default for ClearFlags {
    fn default() -> Self {
        Self::empty()
    }
}

//! Draw statistics.

use super::GlDevice;

/// Counters accumulated by a device until reset. They wrap on overflow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DeviceStatistics {
    /// Draw calls issued.
    pub draw_calls: u32,
    /// Primitives submitted.
    pub poly_count: u32,
    /// Render target activations.
    pub render_target_changes: u32,
}

impl GlDevice {
    /// Counters since the last reset.
    pub fn statistics(&self) -> DeviceStatistics {
        self.stats
    }

    /// Zero every counter.
    pub fn reset_statistics(&mut self) {
        self.stats = DeviceStatistics::default();
    }
}

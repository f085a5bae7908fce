//! Immutable performance vote snapshots.

use serde::{Deserialize, Serialize};

/// Resource votes for one pipe, or aggregated across all active pipes.
///
/// Bandwidth is in kilobytes per second, the clock in hertz. A snapshot is
/// never mutated by a commit; each commit computes a fresh one and the
/// arbitrator merges it into the pipe's bookkeeping field by field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerfParams {
    /// Instantaneous (peak) bandwidth vote in KB/s.
    pub max_per_pipe_ib_kbps: u32,
    /// Average bandwidth vote in KB/s.
    pub bandwidth_kbps: u64,
    /// Core clock rate in Hz.
    pub core_clk_hz: u64,
}

impl PerfParams {
    /// The vote of an idle pipe.
    pub const ZERO: PerfParams = PerfParams {
        max_per_pipe_ib_kbps: 0,
        bandwidth_kbps: 0,
        core_clk_hz: 0,
    };

    /// True when either bandwidth field is above `current`.
    ///
    /// The two bus fields travel together: if either one rises the bus vote
    /// must be refreshed, and both are adopted at once.
    pub(crate) fn bus_exceeds(&self, current: &PerfParams) -> bool {
        self.bandwidth_kbps > current.bandwidth_kbps
            || self.max_per_pipe_ib_kbps > current.max_per_pipe_ib_kbps
    }

    /// True when either bandwidth field is below `current`.
    pub(crate) fn bus_trails(&self, current: &PerfParams) -> bool {
        self.bandwidth_kbps < current.bandwidth_kbps
            || self.max_per_pipe_ib_kbps < current.max_per_pipe_ib_kbps
    }

    /// Adopt both bus fields from `new`, leaving the clock untouched.
    pub(crate) fn adopt_bus(&mut self, new: &PerfParams) {
        self.bandwidth_kbps = new.bandwidth_kbps;
        self.max_per_pipe_ib_kbps = new.max_per_pipe_ib_kbps;
    }

    /// Fold one pipe's vote into an aggregate: bandwidth sums (saturating),
    /// the instantaneous vote and the clock take the maximum.
    pub(crate) fn accumulate(&mut self, pipe: &PerfParams) {
        self.bandwidth_kbps = self.bandwidth_kbps.saturating_add(pipe.bandwidth_kbps);
        self.max_per_pipe_ib_kbps = self.max_per_pipe_ib_kbps.max(pipe.max_per_pipe_ib_kbps);
        self.core_clk_hz = self.core_clk_hz.max(pipe.core_clk_hz);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(ib: u32, bw: u64, clk: u64) -> PerfParams {
        PerfParams {
            max_per_pipe_ib_kbps: ib,
            bandwidth_kbps: bw,
            core_clk_hz: clk,
        }
    }

    #[test]
    fn test_bus_exceeds_on_either_field() {
        let current = params(400, 1000, 50);
        assert!(params(400, 1001, 50).bus_exceeds(&current));
        assert!(params(401, 1000, 50).bus_exceeds(&current));
        assert!(!params(400, 1000, 999).bus_exceeds(&current));
        assert!(!params(399, 999, 50).bus_exceeds(&current));
    }

    #[test]
    fn test_bus_trails_on_either_field() {
        let current = params(400, 1000, 50);
        assert!(params(400, 999, 50).bus_trails(&current));
        assert!(params(399, 1000, 50).bus_trails(&current));
        assert!(!params(400, 1000, 1).bus_trails(&current));
    }

    #[test]
    fn test_adopt_bus_leaves_clock() {
        let mut current = params(400, 1000, 50);
        current.adopt_bus(&params(800, 2000, 90));
        assert_eq!(current, params(800, 2000, 50));
    }

    #[test]
    fn test_accumulate_sums_bandwidth_and_maxes_the_rest() {
        let mut agg = PerfParams::ZERO;
        agg.accumulate(&params(400, 1000, 50));
        agg.accumulate(&params(700, 2000, 30));
        assert_eq!(agg, params(700, 3000, 50));
    }
}

//! Point-in-time views of arbitration state.

use serde::Serialize;

use crate::demand::PipeId;
use crate::params::PerfParams;
use crate::tuning::{FixedVotes, TuningMode};

/// Monotonic operation counters.
///
/// Updated under the context lock; a snapshot copies them out. They only
/// ever grow, so deltas between snapshots are meaningful.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PerfCounters {
    /// Demands refused by `check`.
    pub checks_rejected: u64,
    /// Update passes that programmed at least one resource.
    pub updates_applied: u64,
    /// Resource manager calls that failed.
    pub apply_failures: u64,
    /// Pipes torn down via `release`.
    pub releases: u64,
}

/// One pipe's bookkeeping as of the snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct PipeSnapshot {
    pub id: PipeId,
    /// Votes the shared resources currently account for.
    pub last_applied: PerfParams,
    /// Votes computed at prepare, waiting for the completion pass.
    pub pending: Option<PerfParams>,
}

/// Point-in-time copy of the whole arbitration state.
///
/// This is the inspection surface: everything the debug front-end shows
/// comes from here, in one consistent cut taken under the context lock.
#[derive(Debug, Clone, Serialize)]
pub struct PerfSnapshot {
    /// Active tuning mode.
    pub mode: TuningMode,
    /// Whether `release` may lower shared votes.
    pub bandwidth_release_enabled: bool,
    /// Last bandwidth vote the interconnect accepted, KB/s.
    pub applied_ab_kbps: u64,
    /// Last instantaneous vote the interconnect accepted, KB/s.
    pub applied_ib_kbps: u32,
    /// Last rate the core clock accepted, Hz.
    pub core_clk_hz: u64,
    /// Clock ceiling the context enforces, Hz.
    pub max_core_clk_hz: u64,
    /// Live aggregate over active pipes (what Normal mode would apply).
    pub computed: PerfParams,
    /// Pinned votes while fixed override is active.
    pub fixed: Option<FixedVotes>,
    /// Staged fixed clock, Hz.
    pub staged_clk_hz: Option<u64>,
    /// Staged fixed average bandwidth, KB/s.
    pub staged_ab_kbps: Option<u32>,
    /// Staged fixed instantaneous bandwidth, KB/s.
    pub staged_ib_kbps: Option<u32>,
    /// Active pipes in id order.
    pub pipes: Vec<PipeSnapshot>,
    /// Operation counters.
    pub counters: PerfCounters,
}

impl PerfSnapshot {
    /// Sum of active pipes' last-applied average bandwidth, KB/s.
    pub fn active_bandwidth_kbps(&self) -> u64 {
        self.pipes
            .iter()
            .map(|p| p.last_applied.bandwidth_kbps)
            .sum()
    }
}

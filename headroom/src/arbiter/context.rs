//! Arbitration context: owned state, construction and tuning control.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::demand::PipeId;
use crate::error::{Ceiling, PerfError};
use crate::params::PerfParams;
use crate::platform::PerfTable;
use crate::resource::{CoreClock, InterconnectPath};
use crate::tuning::{FixedVotes, Tuning, TuningMode};

use super::snapshot::{PerfCounters, PerfSnapshot, PipeSnapshot};

/// Per-pipe bookkeeping.
#[derive(Debug, Clone)]
pub(super) struct PipeState {
    /// Votes the shared resources currently account for.
    pub(super) last_applied: PerfParams,
    /// Votes computed at prepare, adopted at completion.
    pub(super) pending: Option<PerfParams>,
}

impl PipeState {
    pub(super) fn idle() -> Self {
        Self {
            last_applied: PerfParams::ZERO,
            pending: None,
        }
    }
}

/// Mutable state guarded by the context lock.
pub(super) struct Inner {
    pub(super) pipes: BTreeMap<PipeId, PipeState>,
    pub(super) tuning: Tuning,
    pub(super) staged_clk_hz: Option<u64>,
    pub(super) staged_ab_kbps: Option<u32>,
    pub(super) staged_ib_kbps: Option<u32>,
    pub(super) bandwidth_release_enabled: bool,
    /// Last bandwidth vote the interconnect accepted.
    pub(super) applied_ab_kbps: u64,
    pub(super) applied_ib_kbps: u32,
    /// Last rate the core clock accepted.
    pub(super) core_clk_hz: u64,
    pub(super) counters: PerfCounters,
}

impl Inner {
    fn new() -> Self {
        Self {
            pipes: BTreeMap::new(),
            tuning: Tuning::Normal,
            staged_clk_hz: None,
            staged_ab_kbps: None,
            staged_ib_kbps: None,
            bandwidth_release_enabled: false,
            applied_ab_kbps: 0,
            applied_ib_kbps: 0,
            core_clk_hz: 0,
            counters: PerfCounters::default(),
        }
    }
}

/// Performance arbitration context for one display controller.
///
/// Owns the platform table, the injected resource managers and all per-pipe
/// bookkeeping. One `Mutex` serializes every operation, including the
/// synchronous calls into the managers, so vote computation and application
/// are never interleaved.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use headroom::{CorePerf, NullClock, NullInterconnect, PerfTable};
///
/// let perf = CorePerf::new(
///     PerfTable::default(),
///     Arc::new(NullInterconnect),
///     Arc::new(NullClock),
/// )
/// .with_bandwidth_release(true);
///
/// assert_eq!(perf.snapshot().pipes.len(), 0);
/// ```
pub struct CorePerf {
    pub(super) table: PerfTable,
    pub(super) bus: Arc<dyn InterconnectPath>,
    pub(super) clock: Arc<dyn CoreClock>,
    pub(super) max_core_clk_hz: u64,
    pub(super) inner: Mutex<Inner>,
}

impl fmt::Debug for CorePerf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CorePerf")
            .field("table", &self.table)
            .field("max_core_clk_hz", &self.max_core_clk_hz)
            .finish_non_exhaustive()
    }
}

impl CorePerf {
    /// Create a context over the given table and resource managers.
    ///
    /// The clock ceiling starts at the table's value; use
    /// [`with_max_core_clk`](Self::with_max_core_clk) when the clock
    /// provider reports a lower reachable rate.
    pub fn new(
        table: PerfTable,
        bus: Arc<dyn InterconnectPath>,
        clock: Arc<dyn CoreClock>,
    ) -> Self {
        let max_core_clk_hz = table.max_core_clk_hz;
        info!(
            max_core_clk_hz,
            max_bandwidth_kbps = table.max_bandwidth_kbps,
            "Core perf context initialized"
        );
        Self {
            table,
            bus,
            clock,
            max_core_clk_hz,
            inner: Mutex::new(Inner::new()),
        }
    }

    /// Lower the enforced clock ceiling. Values above the table ceiling are
    /// clamped to it.
    pub fn with_max_core_clk(mut self, hz: u64) -> Self {
        self.max_core_clk_hz = hz.min(self.table.max_core_clk_hz);
        self
    }

    /// Set whether `release` may lower shared votes.
    pub fn with_bandwidth_release(self, enabled: bool) -> Self {
        self.inner.lock().bandwidth_release_enabled = enabled;
        self
    }

    /// The platform table this context arbitrates against.
    pub fn table(&self) -> &PerfTable {
        &self.table
    }

    /// The clock ceiling this context enforces, Hz.
    pub fn max_core_clk_hz(&self) -> u64 {
        self.max_core_clk_hz
    }

    /// Last clock rate the provider accepted, Hz.
    pub fn core_clk_hz(&self) -> u64 {
        self.inner.lock().core_clk_hz
    }

    /// Last bandwidth vote the interconnect accepted, KB/s.
    pub fn applied_bandwidth_kbps(&self) -> u64 {
        self.inner.lock().applied_ab_kbps
    }

    /// Active tuning mode.
    pub fn tuning_mode(&self) -> TuningMode {
        self.inner.lock().tuning.mode()
    }

    /// Whether `release` may lower shared votes.
    pub fn bandwidth_release_enabled(&self) -> bool {
        self.inner.lock().bandwidth_release_enabled
    }

    /// Allow or forbid `release` to lower shared votes.
    pub fn set_bandwidth_release(&self, enabled: bool) {
        let mut inner = self.inner.lock();
        if inner.bandwidth_release_enabled != enabled {
            info!(enabled, "Bandwidth release toggled");
        }
        inner.bandwidth_release_enabled = enabled;
    }

    /// Switch tuning mode.
    ///
    /// Entering fixed override pins the staged votes and applies them
    /// immediately; all three must be staged first. Returning to normal
    /// recomputes the real aggregate and applies it. Switching to the
    /// current mode is a no-op.
    pub fn set_tuning_mode(&self, mode: TuningMode) -> Result<(), PerfError> {
        let mut inner = self.inner.lock();
        if inner.tuning.mode() == mode {
            return Ok(());
        }
        match mode {
            TuningMode::FixedOverride => {
                let votes = match (
                    inner.staged_clk_hz,
                    inner.staged_ab_kbps,
                    inner.staged_ib_kbps,
                ) {
                    (Some(core_clk_hz), Some(ab_kbps), Some(ib_kbps)) => FixedVotes {
                        core_clk_hz,
                        ab_kbps,
                        ib_kbps,
                    },
                    _ => return Err(PerfError::MissingOverrideValues),
                };
                inner.tuning = Tuning::Fixed(votes);
                info!(
                    clk_hz = votes.core_clk_hz,
                    ab_kbps = votes.ab_kbps,
                    ib_kbps = votes.ib_kbps,
                    "Tuning: fixed override engaged"
                );
                self.apply_aggregate(&mut inner)?;
            }
            TuningMode::Measure => {
                inner.tuning = Tuning::Measure;
                let agg = self.aggregate(&inner);
                info!(
                    ab_kbps = agg.bandwidth_kbps,
                    ib_kbps = agg.max_per_pipe_ib_kbps,
                    clk_hz = agg.core_clk_hz,
                    "Tuning: measure mode, votes held"
                );
            }
            TuningMode::Normal => {
                inner.tuning = Tuning::Normal;
                info!("Tuning: normal arbitration restored");
                self.apply_aggregate(&mut inner)?;
            }
        }
        Ok(())
    }

    /// Stage the fixed core clock rate, Hz.
    ///
    /// Rejected while fixed override is active, and for rates above the
    /// enforced ceiling.
    pub fn set_fixed_clock_rate(&self, hz: u64) -> Result<(), PerfError> {
        let mut inner = self.inner.lock();
        self.reject_if_override_active(&inner)?;
        if hz > self.max_core_clk_hz {
            return Err(PerfError::Rejected {
                ceiling: Ceiling::CoreClock,
                requested: hz,
                limit: self.max_core_clk_hz,
            });
        }
        inner.staged_clk_hz = Some(hz);
        debug!(hz, "Staged fixed core clock");
        Ok(())
    }

    /// Stage the fixed average bandwidth vote, KB/s.
    ///
    /// Deliberately not checked against the aggregate bandwidth ceiling.
    /// Rejected while fixed override is active.
    pub fn set_fixed_ab_vote(&self, kbps: u32) -> Result<(), PerfError> {
        let mut inner = self.inner.lock();
        self.reject_if_override_active(&inner)?;
        inner.staged_ab_kbps = Some(kbps);
        debug!(kbps, "Staged fixed ab vote");
        Ok(())
    }

    /// Stage the fixed instantaneous bandwidth vote, KB/s.
    ///
    /// Rejected while fixed override is active.
    pub fn set_fixed_ib_vote(&self, kbps: u32) -> Result<(), PerfError> {
        let mut inner = self.inner.lock();
        self.reject_if_override_active(&inner)?;
        inner.staged_ib_kbps = Some(kbps);
        debug!(kbps, "Staged fixed ib vote");
        Ok(())
    }

    fn reject_if_override_active(&self, inner: &Inner) -> Result<(), PerfError> {
        if matches!(inner.tuning, Tuning::Fixed(_)) {
            return Err(PerfError::InvalidTuningTransition(
                "fixed override is active; leave it before editing staged votes".into(),
            ));
        }
        Ok(())
    }

    /// Operation counters as of now.
    pub fn counters(&self) -> PerfCounters {
        self.inner.lock().counters
    }

    /// One consistent cut of the whole arbitration state.
    pub fn snapshot(&self) -> PerfSnapshot {
        let inner = self.inner.lock();
        let computed = self.aggregate(&inner);
        PerfSnapshot {
            mode: inner.tuning.mode(),
            bandwidth_release_enabled: inner.bandwidth_release_enabled,
            applied_ab_kbps: inner.applied_ab_kbps,
            applied_ib_kbps: inner.applied_ib_kbps,
            core_clk_hz: inner.core_clk_hz,
            max_core_clk_hz: self.max_core_clk_hz,
            computed,
            fixed: match inner.tuning {
                Tuning::Fixed(votes) => Some(votes),
                _ => None,
            },
            staged_clk_hz: inner.staged_clk_hz,
            staged_ab_kbps: inner.staged_ab_kbps,
            staged_ib_kbps: inner.staged_ib_kbps,
            pipes: inner
                .pipes
                .iter()
                .map(|(id, state)| PipeSnapshot {
                    id: *id,
                    last_applied: state.last_applied,
                    pending: state.pending,
                })
                .collect(),
            counters: inner.counters,
        }
    }
}

//! Vote computation and safety-ordered application.
//!
//! The ordering rule that everything here serves: a shared vote may only
//! be *raised* before the pipe's new configuration takes effect, and only
//! *lowered* after it is confirmed active. Underrun is a visible glitch;
//! an over-reservation for one frame is not. Within one pass the bus vote
//! always lands before the clock, so bandwidth exists when the clock rises.

use tracing::{debug, info, warn};

use crate::demand::{PipeDemand, PipeId};
use crate::error::{Ceiling, PerfError, ResourceKind};
use crate::params::PerfParams;
use crate::tuning::Tuning;

use super::context::{CorePerf, Inner, PipeState};

/// Commit phase of [`CorePerf::update`].
///
/// Splits the old "params changed" flag into the two calls the commit
/// driver actually makes, one on each side of the hardware latch.
#[derive(Debug, Clone, Copy)]
pub enum UpdatePhase<'a> {
    /// The new configuration is validated but not yet latched. Raises the
    /// shared votes it needs; never lowers anything.
    Prepare(&'a PipeDemand),
    /// The new configuration is confirmed active. Lowers whatever the
    /// prepare pass left high; never raises anything.
    Complete,
}

impl CorePerf {
    /// Validate a proposed demand against the platform ceilings.
    ///
    /// Read-only: no bookkeeping or hardware state changes, no clamping.
    /// Other pipes count at their last-applied votes; their in-flight
    /// pending values may still be abandoned and do not reserve anything.
    pub fn check(&self, pipe: PipeId, demand: &PipeDemand) -> Result<(), PerfError> {
        let mut inner = self.inner.lock();
        let result = self.check_locked(&inner, pipe, demand);
        if let Err(error) = &result {
            inner.counters.checks_rejected += 1;
            debug!(pipe = %pipe, %error, "Perf check rejected");
        }
        result
    }

    fn check_locked(
        &self,
        inner: &Inner,
        pipe: PipeId,
        demand: &PipeDemand,
    ) -> Result<(), PerfError> {
        let proposed = self.table.cost(demand)?;

        if proposed.max_per_pipe_ib_kbps > self.table.max_pipe_ib_kbps {
            return Err(PerfError::Rejected {
                ceiling: Ceiling::PipeInstantaneousBandwidth,
                requested: proposed.max_per_pipe_ib_kbps as u64,
                limit: self.table.max_pipe_ib_kbps as u64,
            });
        }

        if proposed.core_clk_hz > self.max_core_clk_hz {
            return Err(PerfError::Rejected {
                ceiling: Ceiling::CoreClock,
                requested: proposed.core_clk_hz,
                limit: self.max_core_clk_hz,
            });
        }

        let others = inner
            .pipes
            .iter()
            .filter(|(id, _)| **id != pipe)
            .map(|(_, state)| state.last_applied.bandwidth_kbps)
            .fold(0u64, u64::saturating_add);
        let total = others.saturating_add(proposed.bandwidth_kbps);
        if total > self.table.max_bandwidth_kbps {
            return Err(PerfError::Rejected {
                ceiling: Ceiling::AggregateBandwidth,
                requested: total,
                limit: self.table.max_bandwidth_kbps,
            });
        }

        debug!(
            pipe = %pipe,
            bw_kbps = proposed.bandwidth_kbps,
            total_kbps = total,
            "Perf check passed"
        );
        Ok(())
    }

    /// Recompute one pipe's votes and apply the shared aggregate.
    ///
    /// [`UpdatePhase::Prepare`] adopts and applies only increases;
    /// [`UpdatePhase::Complete`] only decreases. The bandwidth fields
    /// travel together: if either rises (or falls) both are adopted, the
    /// clock moves independently. A completion with nothing pending is a
    /// no-op.
    ///
    /// A manager failure surfaces as [`PerfError::ApplyFailed`]; the
    /// pipe's bookkeeping stays advanced and the next pass retries the
    /// same aggregate.
    pub fn update(&self, pipe: PipeId, phase: UpdatePhase<'_>) -> Result<(), PerfError> {
        match phase {
            UpdatePhase::Prepare(demand) => self.prepare(pipe, demand),
            UpdatePhase::Complete => self.complete(pipe),
        }
    }

    fn prepare(&self, pipe: PipeId, demand: &PipeDemand) -> Result<(), PerfError> {
        let new = self.table.cost(demand)?;
        let mut inner = self.inner.lock();

        let entry = inner.pipes.entry(pipe).or_insert_with(PipeState::idle);
        let mut update_bus = false;
        let mut update_clk = false;

        if new.bus_exceeds(&entry.last_applied) {
            entry.last_applied.adopt_bus(&new);
            update_bus = true;
        }
        if new.core_clk_hz > entry.last_applied.core_clk_hz {
            entry.last_applied.core_clk_hz = new.core_clk_hz;
            update_clk = true;
        }
        entry.pending = Some(new);

        debug!(
            pipe = %pipe,
            bw_kbps = new.bandwidth_kbps,
            ib_kbps = new.max_per_pipe_ib_kbps,
            clk_hz = new.core_clk_hz,
            update_bus,
            update_clk,
            "Perf prepare"
        );
        self.apply_votes(&mut inner, update_bus, update_clk)
    }

    fn complete(&self, pipe: PipeId) -> Result<(), PerfError> {
        let mut inner = self.inner.lock();

        let Some(entry) = inner.pipes.get_mut(&pipe) else {
            debug!(pipe = %pipe, "Perf completion for inactive pipe");
            return Ok(());
        };
        let Some(new) = entry.pending.take() else {
            return Ok(());
        };

        let mut update_bus = false;
        let mut update_clk = false;
        if new.bus_trails(&entry.last_applied) {
            entry.last_applied.adopt_bus(&new);
            update_bus = true;
        }
        if new.core_clk_hz < entry.last_applied.core_clk_hz {
            entry.last_applied.core_clk_hz = new.core_clk_hz;
            update_clk = true;
        }

        debug!(
            pipe = %pipe,
            bw_kbps = new.bandwidth_kbps,
            clk_hz = new.core_clk_hz,
            update_bus,
            update_clk,
            "Perf complete"
        );
        self.apply_votes(&mut inner, update_bus, update_clk)
    }

    /// Tear down a pipe's reservation.
    ///
    /// The entry is removed unconditionally. Shared votes are lowered only
    /// in normal mode with bandwidth release enabled; otherwise they stay
    /// where they are and the next update pass owns convergence. Failures
    /// are logged, not returned: the pipe is already idle and there is
    /// nothing for the caller to unwind.
    pub fn release(&self, pipe: PipeId) {
        let mut inner = self.inner.lock();
        if inner.pipes.remove(&pipe).is_none() {
            debug!(pipe = %pipe, "Release for inactive pipe");
            return;
        }
        inner.counters.releases += 1;

        match inner.tuning {
            Tuning::Normal if inner.bandwidth_release_enabled => {
                let agg = self.aggregate(&inner);
                info!(
                    pipe = %pipe,
                    ab_kbps = agg.bandwidth_kbps,
                    clk_hz = agg.core_clk_hz,
                    "Releasing perf reservation"
                );
                if self
                    .request_bus(&mut inner, agg.bandwidth_kbps, agg.max_per_pipe_ib_kbps)
                    .is_ok()
                    && agg.core_clk_hz < inner.core_clk_hz
                {
                    let _ = self.set_clock(&mut inner, agg.core_clk_hz);
                }
            }
            Tuning::Normal => {
                debug!(pipe = %pipe, "Pipe released, votes retained");
            }
            Tuning::Measure | Tuning::Fixed(_) => {
                debug!(pipe = %pipe, mode = %inner.tuning.mode(), "Pipe released under tuning override");
            }
        }
    }

    /// Aggregate the active pipes' last-applied votes: bandwidth sums, the
    /// instantaneous vote and the clock take the maximum, the clock clamped
    /// to the enforced ceiling.
    pub(super) fn aggregate(&self, inner: &Inner) -> PerfParams {
        let mut agg = PerfParams::ZERO;
        for state in inner.pipes.values() {
            agg.accumulate(&state.last_applied);
        }
        agg.core_clk_hz = agg.core_clk_hz.min(self.max_core_clk_hz);
        agg
    }

    /// Apply the current aggregate (or override) unconditionally, bus first.
    pub(super) fn apply_aggregate(&self, inner: &mut Inner) -> Result<(), PerfError> {
        self.apply_votes(inner, true, true)
    }

    fn apply_votes(
        &self,
        inner: &mut Inner,
        update_bus: bool,
        update_clk: bool,
    ) -> Result<(), PerfError> {
        if !update_bus && !update_clk {
            return Ok(());
        }

        let (ab_kbps, ib_kbps, clk_hz) = match inner.tuning {
            Tuning::Measure => {
                let agg = self.aggregate(inner);
                info!(
                    ab_kbps = agg.bandwidth_kbps,
                    ib_kbps = agg.max_per_pipe_ib_kbps,
                    clk_hz = agg.core_clk_hz,
                    "Measured aggregate, not applied"
                );
                return Ok(());
            }
            Tuning::Fixed(votes) => (votes.ab_kbps as u64, votes.ib_kbps, votes.core_clk_hz),
            Tuning::Normal => {
                let agg = self.aggregate(inner);
                (agg.bandwidth_kbps, agg.max_per_pipe_ib_kbps, agg.core_clk_hz)
            }
        };

        if update_bus {
            self.request_bus(inner, ab_kbps, ib_kbps)?;
        }
        if update_clk {
            self.set_clock(inner, clk_hz)?;
        }
        inner.counters.updates_applied += 1;
        Ok(())
    }

    fn request_bus(
        &self,
        inner: &mut Inner,
        ab_kbps: u64,
        ib_kbps: u32,
    ) -> Result<(), PerfError> {
        match self.bus.request(ab_kbps, ib_kbps) {
            Ok(()) => {
                inner.applied_ab_kbps = ab_kbps;
                inner.applied_ib_kbps = ib_kbps;
                debug!(ab_kbps, ib_kbps, "Interconnect vote applied");
                Ok(())
            }
            Err(source) => {
                inner.counters.apply_failures += 1;
                warn!(ab_kbps, ib_kbps, error = %source, "Interconnect vote failed");
                Err(PerfError::ApplyFailed {
                    resource: ResourceKind::Interconnect,
                    source,
                })
            }
        }
    }

    fn set_clock(&self, inner: &mut Inner, hz: u64) -> Result<(), PerfError> {
        match self.clock.set_rate(hz) {
            Ok(()) => {
                inner.core_clk_hz = hz;
                debug!(hz, "Core clock applied");
                Ok(())
            }
            Err(source) => {
                inner.counters.apply_failures += 1;
                warn!(hz, error = %source, "Core clock set failed");
                Err(PerfError::ApplyFailed {
                    resource: ResourceKind::CoreClock,
                    source,
                })
            }
        }
    }
}

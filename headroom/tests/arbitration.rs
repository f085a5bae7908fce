//! Integration tests for the arbitration pipeline.
//!
//! These tests drive `CorePerf` end to end against recording resource
//! managers and verify:
//! - Vote ordering around the hardware latch (raise before, lower after)
//! - Bus-before-clock ordering within one pass
//! - Aggregation across concurrently active pipes
//! - Release, tuning override and failure semantics
//!
//! Run with: `cargo test --test arbitration`

use std::sync::Arc;

use parking_lot::Mutex;

use headroom::{
    Ceiling, CoreClock, CorePerf, InterconnectPath, PerfError, PerfTable, PipeDemand,
    PipeId, PixelFormat, ResourceError, ResourceKind, TuningMode, UpdatePhase,
};

// ============================================================================
// Recording resource managers
// ============================================================================

/// One observed call into the shared resources, or a test-placed marker.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Event {
    Bus { ab_kbps: u64, ib_kbps: u32 },
    Clock { hz: u64 },
    Marker(&'static str),
}

/// Shared, ordered log of everything the arbitrator programmed.
#[derive(Default)]
struct EventLog(Mutex<Vec<Event>>);

impl EventLog {
    fn record(&self, event: Event) {
        self.0.lock().push(event);
    }

    fn mark(&self, label: &'static str) {
        self.record(Event::Marker(label));
    }

    fn events(&self) -> Vec<Event> {
        self.0.lock().clone()
    }

    /// Index of the first event matching the predicate.
    fn position<F: Fn(&Event) -> bool>(&self, pred: F) -> Option<usize> {
        self.0.lock().iter().position(|e| pred(e))
    }
}

/// Interconnect that records accepted votes and can be switched to fail.
struct RecordingBus {
    log: Arc<EventLog>,
    fail: Mutex<bool>,
}

impl RecordingBus {
    fn new(log: Arc<EventLog>) -> Self {
        Self {
            log,
            fail: Mutex::new(false),
        }
    }

    fn set_fail(&self, fail: bool) {
        *self.fail.lock() = fail;
    }
}

impl InterconnectPath for RecordingBus {
    fn request(&self, ab_kbps: u64, ib_kbps: u32) -> Result<(), ResourceError> {
        if *self.fail.lock() {
            return Err(ResourceError::Rejected("bus saturated".into()));
        }
        self.log.record(Event::Bus { ab_kbps, ib_kbps });
        Ok(())
    }
}

/// Clock that records accepted rates and can be switched to fail.
struct RecordingClock {
    log: Arc<EventLog>,
    fail: Mutex<bool>,
}

impl RecordingClock {
    fn new(log: Arc<EventLog>) -> Self {
        Self {
            log,
            fail: Mutex::new(false),
        }
    }

    fn set_fail(&self, fail: bool) {
        *self.fail.lock() = fail;
    }
}

impl CoreClock for RecordingClock {
    fn set_rate(&self, hz: u64) -> Result<(), ResourceError> {
        if *self.fail.lock() {
            return Err(ResourceError::Rejected("rate out of range".into()));
        }
        self.log.record(Event::Clock { hz });
        Ok(())
    }
}

// ============================================================================
// Helper functions
// ============================================================================

/// Create an arbitrator over the given table, wired to a shared event log.
fn create_recorded_perf(
    table: PerfTable,
) -> (CorePerf, Arc<EventLog>, Arc<RecordingBus>, Arc<RecordingClock>) {
    let log = Arc::new(EventLog::default());
    let bus = Arc::new(RecordingBus::new(Arc::clone(&log)));
    let clock = Arc::new(RecordingClock::new(Arc::clone(&log)));
    let perf = CorePerf::new(
        table,
        Arc::clone(&bus) as Arc<dyn InterconnectPath>,
        Arc::clone(&clock) as Arc<dyn CoreClock>,
    );
    (perf, log, bus, clock)
}

fn demand_1080p60() -> PipeDemand {
    PipeDemand::new(1920, 1080, 60, PixelFormat::Argb8888)
}

fn demand_720p60() -> PipeDemand {
    PipeDemand::new(1280, 720, 60, PixelFormat::Argb8888)
}

/// Prepare and complete one pipe, as the commit driver would.
fn activate(perf: &CorePerf, pipe: PipeId, demand: &PipeDemand) {
    perf.update(pipe, UpdatePhase::Prepare(demand)).unwrap();
    perf.update(pipe, UpdatePhase::Complete).unwrap();
}

// ============================================================================
// Ordering around the hardware latch
// ============================================================================

/// A pipe lighting up must have its votes raised before the latch marker.
#[test]
fn test_raise_lands_before_the_latch() {
    let (perf, log, _, _) = create_recorded_perf(PerfTable::default());

    perf.update(PipeId(0), UpdatePhase::Prepare(&demand_1080p60()))
        .unwrap();
    log.mark("latched");
    perf.update(PipeId(0), UpdatePhase::Complete).unwrap();

    let latch = log.position(|e| *e == Event::Marker("latched")).unwrap();
    let bus = log
        .position(|e| matches!(e, Event::Bus { .. }))
        .expect("bus vote was never raised");
    let clock = log
        .position(|e| matches!(e, Event::Clock { .. }))
        .expect("clock was never raised");

    assert!(bus < latch, "bus raise must precede the latch");
    assert!(clock < latch, "clock raise must precede the latch");
    // Nothing shrank, so completion adds no events.
    assert_eq!(log.events().len(), 3);
}

/// A shrinking configuration must keep old votes until after the latch.
#[test]
fn test_lower_lands_after_the_latch() {
    let (perf, log, _, _) = create_recorded_perf(PerfTable::default());
    activate(&perf, PipeId(0), &demand_1080p60());

    // Same clock, less bandwidth.
    let lighter = PipeDemand::new(1920, 1080, 60, PixelFormat::Rgb565);
    perf.update(PipeId(0), UpdatePhase::Prepare(&lighter))
        .unwrap();
    log.mark("latched");
    perf.update(PipeId(0), UpdatePhase::Complete).unwrap();

    let latch = log.position(|e| *e == Event::Marker("latched")).unwrap();
    let lowered = log
        .position(|e| matches!(e, Event::Bus { ab_kbps: 298_598, .. }))
        .expect("bus vote was never lowered");
    assert!(lowered > latch, "bus lowering must follow the latch");
}

/// Within one pass the bus vote must land before the clock.
#[test]
fn test_bus_lands_before_clock_within_a_pass() {
    let (perf, log, _, _) = create_recorded_perf(PerfTable::default());
    perf.update(PipeId(0), UpdatePhase::Prepare(&demand_1080p60()))
        .unwrap();

    let events = log.events();
    assert_eq!(
        events,
        vec![
            Event::Bus {
                ab_kbps: 597_196,
                ib_kbps: 597_196,
            },
            Event::Clock { hz: 130_636_800 },
        ]
    );
}

/// A failed bus vote must keep the clock from rising.
#[test]
fn test_bus_failure_skips_the_clock() {
    let (perf, log, bus, _) = create_recorded_perf(PerfTable::default());
    bus.set_fail(true);

    let err = perf
        .update(PipeId(0), UpdatePhase::Prepare(&demand_1080p60()))
        .unwrap_err();
    assert!(matches!(err, PerfError::ApplyFailed { .. }));
    assert!(log.events().is_empty(), "no call may reach the clock");

    // Bookkeeping advanced anyway: the same demand raises nothing new,
    // so recovery needs a bigger demand or another pipe.
    bus.set_fail(false);
    perf.update(PipeId(0), UpdatePhase::Prepare(&demand_1080p60()))
        .unwrap();
    assert!(log.events().is_empty());

    let bigger = PipeDemand::new(2560, 1440, 60, PixelFormat::Argb8888);
    perf.update(PipeId(0), UpdatePhase::Prepare(&bigger)).unwrap();
    assert!(!log.events().is_empty());
}

/// A failed clock call leaves the applied rate at the last success, even
/// though the bus vote before it already landed.
#[test]
fn test_clock_failure_keeps_the_applied_rate() {
    let (perf, log, _, clock) = create_recorded_perf(PerfTable::default());
    activate(&perf, PipeId(0), &demand_720p60());
    clock.set_fail(true);

    // 1080p raises both votes: the bus lands, the clock refuses.
    let err = perf
        .update(PipeId(0), UpdatePhase::Prepare(&demand_1080p60()))
        .unwrap_err();
    assert!(matches!(
        err,
        PerfError::ApplyFailed {
            resource: ResourceKind::CoreClock,
            ..
        }
    ));

    let snapshot = perf.snapshot();
    assert_eq!(snapshot.applied_ab_kbps, 597_196, "bus mirror advances");
    assert_eq!(
        snapshot.core_clk_hz, 58_060_800,
        "clock mirror holds the last success"
    );
    assert_eq!(
        log.events().last(),
        Some(&Event::Bus {
            ab_kbps: 597_196,
            ib_kbps: 597_196,
        })
    );
    assert_eq!(perf.counters().apply_failures, 1);

    // Recovery mirrors the bus case: bookkeeping already advanced, so
    // only a bigger demand re-raises the clock.
    clock.set_fail(false);
    let bigger = PipeDemand::new(2560, 1440, 60, PixelFormat::Argb8888);
    perf.update(PipeId(0), UpdatePhase::Prepare(&bigger)).unwrap();
    assert_eq!(perf.snapshot().core_clk_hz, 232_243_200);
}

// ============================================================================
// Aggregation across pipes
// ============================================================================

/// Two active pipes: bandwidth sums, instantaneous and clock take the max.
#[test]
fn test_aggregate_sums_bandwidth_and_maxes_clock() {
    let (perf, log, _, _) = create_recorded_perf(PerfTable::default());
    activate(&perf, PipeId(0), &demand_1080p60());
    activate(&perf, PipeId(1), &demand_720p60());

    // 1080p60: 597,196 KB/s, ib 597,196, clk 130,636,800.
    // 720p60:  265,420 KB/s, ib floored to 400,000, clk 58,060,800.
    // The second pipe re-asserts the unchanged aggregate clock.
    let events = log.events();
    assert_eq!(
        events[events.len() - 2..],
        [
            Event::Bus {
                ab_kbps: 862_616,
                ib_kbps: 597_196,
            },
            Event::Clock { hz: 130_636_800 },
        ]
    );
}

/// The walkthrough scenario: activate two pipes, drop one, re-raise it.
#[test]
fn test_two_pipe_lifecycle_keeps_aggregate_consistent() {
    let (perf, log, _, _) = create_recorded_perf(PerfTable::default());
    perf.set_bandwidth_release(true);

    let a = PipeId(0);
    let b = PipeId(1);
    let demand_a = demand_720p60();
    let demand_b = demand_1080p60();
    let cost_a = perf.table().cost(&demand_a).unwrap();
    let cost_b = perf.table().cost(&demand_b).unwrap();

    activate(&perf, a, &demand_a);
    activate(&perf, b, &demand_b);
    assert_eq!(
        perf.snapshot().applied_ab_kbps,
        cost_a.bandwidth_kbps + cost_b.bandwidth_kbps
    );

    // A goes idle: aggregate falls to B alone.
    perf.release(a);
    assert_eq!(perf.snapshot().applied_ab_kbps, cost_b.bandwidth_kbps);
    assert_eq!(perf.snapshot().core_clk_hz, cost_b.core_clk_hz);

    // A returns bigger: the raise lands before A's latch.
    let demand_a2 = PipeDemand::new(2560, 1440, 60, PixelFormat::Argb8888);
    let cost_a2 = perf.table().cost(&demand_a2).unwrap();
    perf.update(a, UpdatePhase::Prepare(&demand_a2)).unwrap();
    log.mark("a2-latched");
    perf.update(a, UpdatePhase::Complete).unwrap();

    let snapshot = perf.snapshot();
    assert_eq!(
        snapshot.applied_ab_kbps,
        cost_a2.bandwidth_kbps + cost_b.bandwidth_kbps
    );
    assert_eq!(
        snapshot.core_clk_hz,
        cost_a2.core_clk_hz.max(cost_b.core_clk_hz)
    );

    let latch = log.position(|e| *e == Event::Marker("a2-latched")).unwrap();
    let raise = log
        .position(|e| {
            matches!(e, Event::Bus { ab_kbps, .. }
                if *ab_kbps == cost_a2.bandwidth_kbps + cost_b.bandwidth_kbps)
        })
        .expect("re-activation never raised the bus");
    assert!(raise < latch);
}

/// Applied aggregate equals the snapshot's per-pipe sum at every step.
#[test]
fn test_snapshot_matches_applied_votes() {
    let (perf, _, _, _) = create_recorded_perf(PerfTable::default());
    activate(&perf, PipeId(0), &demand_1080p60());
    activate(&perf, PipeId(1), &demand_720p60());

    let snapshot = perf.snapshot();
    assert_eq!(snapshot.applied_ab_kbps, snapshot.active_bandwidth_kbps());
    assert_eq!(snapshot.computed.bandwidth_kbps, snapshot.applied_ab_kbps);
}

// ============================================================================
// Release semantics
// ============================================================================

/// With releases disabled, teardown must not touch the hardware at all.
#[test]
fn test_release_disabled_makes_no_calls() {
    let (perf, log, _, _) = create_recorded_perf(PerfTable::default());
    activate(&perf, PipeId(0), &demand_1080p60());
    let before = log.events().len();

    perf.release(PipeId(0));

    assert_eq!(log.events().len(), before, "release must stay silent");
    assert!(perf.snapshot().pipes.is_empty());
}

/// With releases enabled, teardown lowers bus first, then the clock.
#[test]
fn test_release_enabled_lowers_bus_then_clock() {
    let (perf, log, _, _) = create_recorded_perf(PerfTable::default());
    perf.set_bandwidth_release(true);
    activate(&perf, PipeId(0), &demand_1080p60());

    perf.release(PipeId(0));

    let events = log.events();
    let tail = &events[events.len() - 2..];
    assert_eq!(
        tail,
        &[
            Event::Bus {
                ab_kbps: 0,
                ib_kbps: 0,
            },
            Event::Clock { hz: 0 },
        ]
    );
}

// ============================================================================
// Tuning overrides
// ============================================================================

/// Fixed override pins the votes regardless of demand changes.
#[test]
fn test_fixed_override_pins_votes() {
    let (perf, log, _, _) = create_recorded_perf(PerfTable::default());
    activate(&perf, PipeId(0), &demand_720p60());

    perf.set_fixed_clock_rate(300_000_000).unwrap();
    perf.set_fixed_ab_vote(2_000_000).unwrap();
    perf.set_fixed_ib_vote(1_000_000).unwrap();
    perf.set_tuning_mode(TuningMode::FixedOverride).unwrap();

    assert_eq!(
        log.events().last(),
        Some(&Event::Clock { hz: 300_000_000 })
    );

    // A rising demand re-asserts the fixed votes, not the computed ones.
    perf.update(PipeId(0), UpdatePhase::Prepare(&demand_1080p60()))
        .unwrap();
    let events = log.events();
    assert_eq!(
        events[events.len() - 2..],
        [
            Event::Bus {
                ab_kbps: 2_000_000,
                ib_kbps: 1_000_000,
            },
            Event::Clock { hz: 300_000_000 },
        ]
    );
}

/// Entering fixed override without staged values changes nothing.
#[test]
fn test_fixed_override_rejected_without_staged_votes() {
    let (perf, log, _, _) = create_recorded_perf(PerfTable::default());
    activate(&perf, PipeId(0), &demand_1080p60());
    let before = log.events().len();

    let err = perf.set_tuning_mode(TuningMode::FixedOverride).unwrap_err();
    assert!(matches!(err, PerfError::MissingOverrideValues));
    assert_eq!(perf.tuning_mode(), TuningMode::Normal);
    assert_eq!(log.events().len(), before);
}

/// Leaving fixed override restores exactly the computed aggregate.
#[test]
fn test_leaving_fixed_override_recomputes() {
    let (perf, log, _, _) = create_recorded_perf(PerfTable::default());
    activate(&perf, PipeId(0), &demand_1080p60());

    perf.set_fixed_clock_rate(300_000_000).unwrap();
    perf.set_fixed_ab_vote(2_000_000).unwrap();
    perf.set_fixed_ib_vote(1_000_000).unwrap();
    perf.set_tuning_mode(TuningMode::FixedOverride).unwrap();
    perf.set_tuning_mode(TuningMode::Normal).unwrap();

    let events = log.events();
    assert_eq!(
        events[events.len() - 2..],
        [
            Event::Bus {
                ab_kbps: 597_196,
                ib_kbps: 597_196,
            },
            Event::Clock { hz: 130_636_800 },
        ]
    );
}

/// Measure mode records demand but never talks to the hardware.
#[test]
fn test_measure_mode_stays_silent() {
    let (perf, log, _, _) = create_recorded_perf(PerfTable::default());
    perf.set_tuning_mode(TuningMode::Measure).unwrap();

    activate(&perf, PipeId(0), &demand_1080p60());
    perf.release(PipeId(0));

    assert!(log.events().is_empty());
}

// ============================================================================
// Check semantics
// ============================================================================

/// Check reports the first exceeded ceiling and mutates nothing.
#[test]
fn test_check_rejects_and_leaves_state_untouched() {
    let table = PerfTable {
        max_bandwidth_kbps: 1_000_000,
        ..PerfTable::default()
    };
    let (perf, log, _, _) = create_recorded_perf(table);
    activate(&perf, PipeId(0), &demand_1080p60());
    let before = log.events().len();

    let err = perf.check(PipeId(1), &demand_1080p60()).unwrap_err();
    assert!(matches!(
        err,
        PerfError::Rejected {
            ceiling: Ceiling::AggregateBandwidth,
            ..
        }
    ));
    assert_eq!(log.events().len(), before);
    assert_eq!(perf.snapshot().pipes.len(), 1);
    assert_eq!(perf.counters().checks_rejected, 1);
}

//! JSON scenario schema for the simulator.
//!
//! A scenario is what a commit driver and a debug front-end would do over
//! time, flattened into a step list:
//!
//! ```json
//! {
//!   "steps": [
//!     { "op": "check",    "pipe": 0, "demand": { "width": 1920, "height": 1080,
//!                                                "refresh_hz": 60, "format": "argb8888" } },
//!     { "op": "prepare",  "pipe": 0, "demand": { "width": 1920, "height": 1080,
//!                                                "refresh_hz": 60, "format": "argb8888" } },
//!     { "op": "complete", "pipe": 0 },
//!     { "op": "release",  "pipe": 0 }
//!   ]
//! }
//! ```

use serde::Deserialize;

use headroom::{PerfTable, PipeDemand};

/// A scripted sequence of arbitration operations.
#[derive(Debug, Deserialize)]
pub struct Scenario {
    /// Inline platform table; defaults apply when absent.
    #[serde(default)]
    pub table: Option<PerfTable>,
    /// Steps, executed in order.
    pub steps: Vec<Step>,
}

/// One scripted operation.
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Pre-commit validation of a proposed demand.
    Check { pipe: u32, demand: PipeDemand },
    /// Commit prepare: raise votes for the new demand.
    Prepare { pipe: u32, demand: PipeDemand },
    /// Commit completion: lower votes the pipe no longer needs.
    Complete { pipe: u32 },
    /// Tear a pipe down.
    Release { pipe: u32 },
    /// Switch tuning mode by its debug integer (0 normal, 1 measure,
    /// 2 fixed override).
    SetMode { mode: u32 },
    /// Stage the fixed core clock rate.
    SetFixedClock { hz: u64 },
    /// Stage the fixed average bandwidth vote.
    SetFixedAb { kbps: u32 },
    /// Stage the fixed instantaneous bandwidth vote.
    SetFixedIb { kbps: u32 },
    /// Allow or forbid release to lower shared votes.
    SetBandwidthRelease { enabled: bool },
}

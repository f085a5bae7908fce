//! Error types for demand validation and vote application.

use std::fmt;

use thiserror::Error;

use crate::demand::PixelFormat;
use crate::resource::ResourceError;

/// Platform ceiling that a demand ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ceiling {
    /// Sum of all active pipes' average bandwidth.
    AggregateBandwidth,
    /// One pipe's instantaneous (peak) bandwidth.
    PipeInstantaneousBandwidth,
    /// Core clock rate of the display datapath.
    CoreClock,
}

impl Ceiling {
    /// Short description for display.
    pub fn as_str(&self) -> &'static str {
        match self {
            Ceiling::AggregateBandwidth => "aggregate bandwidth",
            Ceiling::PipeInstantaneousBandwidth => "per-pipe instantaneous bandwidth",
            Ceiling::CoreClock => "core clock",
        }
    }
}

impl fmt::Display for Ceiling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Shared resource the arbitrator programs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// Memory interconnect path.
    Interconnect,
    /// Core clock of the display datapath.
    CoreClock,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Interconnect => write!(f, "interconnect"),
            ResourceKind::CoreClock => write!(f, "core clock"),
        }
    }
}

/// Errors surfaced by arbitration operations.
///
/// None of these are fatal to the arbitrator itself. A `Rejected` check
/// leaves all state untouched; an `ApplyFailed` update keeps its advanced
/// bookkeeping so a later pass can converge.
#[derive(Debug, Error)]
pub enum PerfError {
    /// A proposed configuration exceeds a platform ceiling.
    ///
    /// `requested` and `limit` share the ceiling's unit (KB/s for the
    /// bandwidth ceilings, Hz for the clock).
    #[error("{ceiling} ceiling exceeded: requested {requested}, limit {limit}")]
    Rejected {
        ceiling: Ceiling,
        requested: u64,
        limit: u64,
    },

    /// A resource manager refused a vote. Per-pipe bookkeeping has already
    /// advanced; the applied-vote mirrors still hold the last success.
    #[error("failed to program {resource}: {source}")]
    ApplyFailed {
        resource: ResourceKind,
        #[source]
        source: ResourceError,
    },

    /// Fixed override was requested before all three fixed votes were staged.
    #[error("fixed override requires staged clock, ab and ib votes")]
    MissingOverrideValues,

    /// A tuning mode change or staged-vote edit is not allowed right now.
    #[error("invalid tuning transition: {0}")]
    InvalidTuningTransition(String),

    /// The platform table has no cost entry for a demand's pixel format.
    #[error("pixel format {0} has no cost entry in the platform table")]
    UnknownFormat(PixelFormat),
}

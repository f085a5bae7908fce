//! Operator-selectable tuning modes.
//!
//! Bring-up and power work needs to bend the arbitrator without patching
//! it: hold votes at known values, or watch what it would do without
//! letting it touch the hardware. Modes move freely; none is terminal.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::PerfError;

/// Arbitration mode, as the operator sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TuningMode {
    /// Computed votes are applied. The production mode.
    Normal,
    /// Computed votes are logged, nothing is applied.
    Measure,
    /// Staged fixed votes are applied verbatim, computation is ignored.
    FixedOverride,
}

impl TuningMode {
    /// Short description for display.
    pub fn as_str(&self) -> &'static str {
        match self {
            TuningMode::Normal => "normal",
            TuningMode::Measure => "measure",
            TuningMode::FixedOverride => "fixed",
        }
    }
}

impl fmt::Display for TuningMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<u32> for TuningMode {
    type Error = PerfError;

    /// Parse the debug front-end's integer encoding: 0 normal, 1 measure,
    /// 2 fixed override.
    fn try_from(raw: u32) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(TuningMode::Normal),
            1 => Ok(TuningMode::Measure),
            2 => Ok(TuningMode::FixedOverride),
            other => Err(PerfError::InvalidTuningTransition(format!(
                "unknown mode {other}"
            ))),
        }
    }
}

/// Votes applied verbatim while [`TuningMode::FixedOverride`] is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedVotes {
    /// Core clock rate in Hz.
    pub core_clk_hz: u64,
    /// Average bandwidth vote in KB/s.
    pub ab_kbps: u32,
    /// Instantaneous bandwidth vote in KB/s.
    pub ib_kbps: u32,
}

/// Internal mode state. The fixed payload is pinned on entry so later
/// staged-vote edits cannot drift under an active override.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Tuning {
    Normal,
    Measure,
    Fixed(FixedVotes),
}

impl Tuning {
    pub(crate) fn mode(&self) -> TuningMode {
        match self {
            Tuning::Normal => TuningMode::Normal,
            Tuning::Measure => TuningMode::Measure,
            Tuning::Fixed(_) => TuningMode::FixedOverride,
        }
    }
}

//! Capability traits for the shared resources the arbitrator programs.
//!
//! The arbitrator only decides numbers; actually moving a bandwidth vote or
//! a clock rate belongs to platform drivers behind these traits. That keeps
//! the vote pipeline testable with recording fakes and lets the CLI run
//! whole scenarios with nothing but a logger behind it.
//!
//! # Implementors
//!
//! - Platform interconnect/clock providers (out of tree)
//! - `NullInterconnect` / `NullClock` - accept everything, do nothing
//! - `TracingInterconnect` / `TracingClock` - accept everything, log it

use thiserror::Error;
use tracing::info;

/// Error from a resource manager.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceError {
    /// The manager understood the request and refused it.
    #[error("request rejected: {0}")]
    Rejected(String),

    /// The manager cannot be reached at all.
    #[error("manager unavailable: {0}")]
    Unavailable(String),
}

/// Shared interconnect path from the display controller to memory.
///
/// One vote covers the whole controller: `ab` is the average bandwidth the
/// fabric must sustain, `ib` the instantaneous peak any single pipe may
/// burst. Both are in KB/s. A successful call replaces the previous vote.
pub trait InterconnectPath: Send + Sync {
    /// Vote average (`ab`) and instantaneous (`ib`) bandwidth.
    fn request(&self, ab_kbps: u64, ib_kbps: u32) -> Result<(), ResourceError>;
}

/// Core clock feeding the display controller datapath.
pub trait CoreClock: Send + Sync {
    /// Set the clock rate in Hz.
    fn set_rate(&self, hz: u64) -> Result<(), ResourceError>;
}

/// Interconnect that accepts every vote and does nothing.
///
/// Useful for unit tests where only the bookkeeping matters.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullInterconnect;

impl InterconnectPath for NullInterconnect {
    fn request(&self, _ab_kbps: u64, _ib_kbps: u32) -> Result<(), ResourceError> {
        Ok(())
    }
}

/// Clock that accepts every rate and does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullClock;

impl CoreClock for NullClock {
    fn set_rate(&self, _hz: u64) -> Result<(), ResourceError> {
        Ok(())
    }
}

/// Interconnect that logs every vote at info level.
///
/// Backs the CLI simulator, where the log *is* the hardware.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingInterconnect;

impl InterconnectPath for TracingInterconnect {
    fn request(&self, ab_kbps: u64, ib_kbps: u32) -> Result<(), ResourceError> {
        info!(ab_kbps, ib_kbps, "Interconnect vote");
        Ok(())
    }
}

/// Clock that logs every rate change at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingClock;

impl CoreClock for TracingClock {
    fn set_rate(&self, hz: u64) -> Result<(), ResourceError> {
        info!(hz, "Core clock rate");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_null_managers_accept_everything() {
        assert!(NullInterconnect.request(u64::MAX, u32::MAX).is_ok());
        assert!(NullClock.set_rate(u64::MAX).is_ok());
    }

    #[test]
    fn test_trait_object_usage() {
        let bus: Arc<dyn InterconnectPath> = Arc::new(NullInterconnect);
        let clock: Arc<dyn CoreClock> = Arc::new(NullClock);
        assert!(bus.request(1000, 400).is_ok());
        assert!(clock.set_rate(200_000_000).is_ok());
    }
}

//! Core arbitration: per-pipe bookkeeping, vote aggregation, safety-ordered
//! application.
//!
//! # Architecture
//!
//! ```text
//!                 ┌────────────────────────────┐
//!  commit driver ─┤ check()                    │
//!                 │ update(Prepare | Complete) ├──request()──► InterconnectPath
//!                 │ release()                  ├──set_rate()─► CoreClock
//!  debug frontend─┤ snapshot(), tuning setters │
//!                 └────────── CorePerf ────────┘
//!                        (one lock, one table)
//! ```
//!
//! `CorePerf` holds every per-pipe vote under a single lock and talks to
//! the resource managers while still holding it, so no two passes can
//! interleave their aggregate computation with their application.

mod context;
mod snapshot;
mod vote;

pub use context::CorePerf;
pub use snapshot::{PerfCounters, PerfSnapshot, PipeSnapshot};
pub use vote::UpdatePhase;

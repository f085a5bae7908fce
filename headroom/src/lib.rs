//! Headroom - bandwidth and clock arbitration for multi-pipe scanout.
//!
//! Display pipelines steal bandwidth from everything else on the memory
//! fabric, and they cannot tolerate losing: a late pixel is a visible
//! glitch. Headroom decides how much interconnect bandwidth and core clock
//! a set of concurrently active pipes needs, reserves it through injected
//! resource managers, and takes it back when pipes go idle.
//!
//! The one rule everything follows: shared votes are raised *before* a
//! pipe's new configuration takes effect and lowered only *after* it is
//! confirmed active, with the bus vote landing before the clock within a
//! pass. Over-reserving for a frame costs a little power; under-reserving
//! costs a frame.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use headroom::{
//!     CorePerf, NullClock, NullInterconnect, PerfTable, PipeDemand, PipeId,
//!     PixelFormat, UpdatePhase,
//! };
//!
//! let perf = CorePerf::new(
//!     PerfTable::default(),
//!     Arc::new(NullInterconnect),
//!     Arc::new(NullClock),
//! );
//!
//! let pipe = PipeId(0);
//! let demand = PipeDemand::new(1920, 1080, 60, PixelFormat::Argb8888);
//!
//! // Pre-commit: would this configuration fit the platform at all?
//! perf.check(pipe, &demand)?;
//!
//! // Commit: raise shared votes, latch the hardware, then trim.
//! perf.update(pipe, UpdatePhase::Prepare(&demand))?;
//! // ... hardware latches the new configuration here ...
//! perf.update(pipe, UpdatePhase::Complete)?;
//!
//! assert_eq!(perf.snapshot().applied_ab_kbps, 597_196);
//! # Ok::<(), headroom::PerfError>(())
//! ```

pub mod arbiter;
pub mod demand;
pub mod error;
pub mod params;
pub mod platform;
pub mod resource;
pub mod tuning;

pub use arbiter::{CorePerf, PerfCounters, PerfSnapshot, PipeSnapshot, UpdatePhase};
pub use demand::{PipeDemand, PipeId, PixelFormat};
pub use error::{Ceiling, PerfError, ResourceKind};
pub use params::PerfParams;
pub use platform::{FormatCost, PerfTable, TableError};
pub use resource::{
    CoreClock, InterconnectPath, NullClock, NullInterconnect, ResourceError,
    TracingClock, TracingInterconnect,
};
pub use tuning::{FixedVotes, TuningMode};

/// Library version from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

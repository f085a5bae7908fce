//! Platform performance table: cost coefficients and ceilings.
//!
//! Every target platform ships one table describing how expensive scanout is
//! on its memory fabric (bytes moved per pixel, overhead factors) and where
//! the hard limits sit (aggregate bandwidth, per-pipe peak bandwidth, core
//! clock). The arbitrator consumes the table read-only; boards override the
//! built-in defaults with a JSON file.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::demand::{PipeDemand, PixelFormat};
use crate::error::PerfError;
use crate::params::PerfParams;

/// Default average-bandwidth overhead in percent.
///
/// Real fabrics never reach theoretical throughput; votes are padded by
/// 20% so the interconnect grants usable headroom.
pub const DEFAULT_BW_OVERHEAD_PCT: u64 = 120;

/// Default core-clock overhead in percent.
///
/// Covers blanking intervals and pipeline stalls on top of the raw pixel
/// rate.
pub const DEFAULT_CLK_OVERHEAD_PCT: u64 = 105;

/// Default floor for one pipe's instantaneous bandwidth vote, in KB/s.
///
/// Small modes still need DRAM to respond quickly when a burst hits the
/// FIFO; votes below this floor are raised to it.
pub const DEFAULT_MIN_PIPE_IB_KBPS: u32 = 400_000;

/// Default ceiling for one pipe's instantaneous bandwidth vote, in KB/s.
pub const DEFAULT_MAX_PIPE_IB_KBPS: u32 = 2_500_000;

/// Default ceiling for the aggregate average bandwidth, in KB/s.
pub const DEFAULT_MAX_BANDWIDTH_KBPS: u64 = 6_800_000;

/// Default ceiling for the display core clock, in Hz.
pub const DEFAULT_MAX_CORE_CLK_HZ: u64 = 412_500_000;

/// Cost entry for one pixel format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatCost {
    pub format: PixelFormat,
    pub bits_per_pixel: u32,
}

/// Errors loading or validating a platform table.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("failed to read platform table: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse platform table: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid platform table: {0}")]
    Invalid(String),
}

/// Performance coefficients and ceilings for one platform.
///
/// # Example
///
/// ```
/// use headroom::platform::PerfTable;
/// use headroom::{PipeDemand, PixelFormat};
///
/// let table = PerfTable::default();
/// let demand = PipeDemand::new(1920, 1080, 60, PixelFormat::Argb8888);
/// let cost = table.cost(&demand).unwrap();
///
/// assert_eq!(cost.bandwidth_kbps, 597_196);
/// assert_eq!(cost.core_clk_hz, 130_636_800);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerfTable {
    /// Average-bandwidth overhead in percent (>= 100).
    pub bw_overhead_pct: u64,
    /// Core-clock overhead in percent (>= 100).
    pub clk_overhead_pct: u64,
    /// Floor for one pipe's instantaneous bandwidth vote, KB/s.
    pub min_pipe_ib_kbps: u32,
    /// Ceiling for one pipe's instantaneous bandwidth vote, KB/s.
    pub max_pipe_ib_kbps: u32,
    /// Ceiling for the aggregate average bandwidth, KB/s.
    pub max_bandwidth_kbps: u64,
    /// Ceiling for the display core clock, Hz.
    pub max_core_clk_hz: u64,
    /// Per-format scanout costs.
    pub formats: Vec<FormatCost>,
}

impl Default for PerfTable {
    fn default() -> Self {
        Self {
            bw_overhead_pct: DEFAULT_BW_OVERHEAD_PCT,
            clk_overhead_pct: DEFAULT_CLK_OVERHEAD_PCT,
            min_pipe_ib_kbps: DEFAULT_MIN_PIPE_IB_KBPS,
            max_pipe_ib_kbps: DEFAULT_MAX_PIPE_IB_KBPS,
            max_bandwidth_kbps: DEFAULT_MAX_BANDWIDTH_KBPS,
            max_core_clk_hz: DEFAULT_MAX_CORE_CLK_HZ,
            formats: default_formats(),
        }
    }
}

fn default_formats() -> Vec<FormatCost> {
    vec![
        FormatCost {
            format: PixelFormat::Argb8888,
            bits_per_pixel: 32,
        },
        FormatCost {
            format: PixelFormat::Xrgb8888,
            bits_per_pixel: 32,
        },
        FormatCost {
            format: PixelFormat::Rgb565,
            bits_per_pixel: 16,
        },
        FormatCost {
            format: PixelFormat::Nv12,
            bits_per_pixel: 12,
        },
    ]
}

impl PerfTable {
    /// Load a table from a JSON file and validate it.
    ///
    /// Fields absent from the file keep their default values, so a board
    /// file only has to name what it changes.
    pub fn load(path: &Path) -> Result<Self, TableError> {
        let text = fs::read_to_string(path)?;
        let table: Self = serde_json::from_str(&text)?;
        table.validate()?;
        Ok(table)
    }

    /// Validate coefficient and ceiling sanity.
    pub fn validate(&self) -> Result<(), TableError> {
        if self.bw_overhead_pct < 100 || self.clk_overhead_pct < 100 {
            return Err(TableError::Invalid(
                "overhead percentages must be at least 100".into(),
            ));
        }
        if self.min_pipe_ib_kbps > self.max_pipe_ib_kbps {
            return Err(TableError::Invalid(format!(
                "per-pipe ib floor {} exceeds ceiling {}",
                self.min_pipe_ib_kbps, self.max_pipe_ib_kbps
            )));
        }
        if self.max_bandwidth_kbps == 0 || self.max_core_clk_hz == 0 {
            return Err(TableError::Invalid(
                "bandwidth and clock ceilings must be non-zero".into(),
            ));
        }
        if self.formats.is_empty() {
            return Err(TableError::Invalid("no pixel format costs".into()));
        }
        for (i, cost) in self.formats.iter().enumerate() {
            if cost.bits_per_pixel == 0 {
                return Err(TableError::Invalid(format!(
                    "format {} has zero bits per pixel",
                    cost.format
                )));
            }
            if self.formats[..i].iter().any(|c| c.format == cost.format) {
                return Err(TableError::Invalid(format!(
                    "duplicate cost entry for format {}",
                    cost.format
                )));
            }
        }
        Ok(())
    }

    /// Bits per pixel for a format, if the table prices it.
    pub fn bits_per_pixel(&self, format: PixelFormat) -> Option<u32> {
        self.formats
            .iter()
            .find(|c| c.format == format)
            .map(|c| c.bits_per_pixel)
    }

    /// Cost a proposed scanout configuration.
    ///
    /// Average bandwidth is `pixels/s * bytes-per-pixel * overhead`,
    /// truncated to KB/s. The instantaneous vote is the average raised to
    /// the platform floor. The clock is the pixel rate with clock overhead.
    /// Arithmetic saturates on oversized demands, keeping their votes
    /// maximal instead of wrapping past the limits.
    /// Ceilings are not enforced here; [`CorePerf::check`] owns that.
    ///
    /// [`CorePerf::check`]: crate::CorePerf::check
    pub fn cost(&self, demand: &PipeDemand) -> Result<PerfParams, PerfError> {
        let bpp = self
            .bits_per_pixel(demand.format)
            .ok_or(PerfError::UnknownFormat(demand.format))?;

        let pixels = demand.pixels_per_second();
        let bytes_per_second = pixels.saturating_mul(bpp as u64) / 8;
        let bandwidth_kbps = bytes_per_second.saturating_mul(self.bw_overhead_pct) / 100 / 1000;
        let core_clk_hz = pixels.saturating_mul(self.clk_overhead_pct) / 100;

        let ib_kbps = bandwidth_kbps
            .max(self.min_pipe_ib_kbps as u64)
            .min(u32::MAX as u64) as u32;

        Ok(PerfParams {
            max_per_pipe_ib_kbps: ib_kbps,
            bandwidth_kbps,
            core_clk_hz,
        })
    }
}

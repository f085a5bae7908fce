//! Pipe identity and scanout demand descriptors.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of one display output pipeline.
///
/// The arbitrator never allocates these; the commit driver names its pipes
/// and keeps the numbering stable across commits.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PipeId(pub u32);

impl fmt::Display for PipeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pipe{}", self.0)
    }
}

/// Scanout pixel formats the cost model can price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    Argb8888,
    Xrgb8888,
    Rgb565,
    Nv12,
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PixelFormat::Argb8888 => "ARGB8888",
            PixelFormat::Xrgb8888 => "XRGB8888",
            PixelFormat::Rgb565 => "RGB565",
            PixelFormat::Nv12 => "NV12",
        };
        write!(f, "{name}")
    }
}

/// One pipe's proposed scanout configuration.
///
/// This is everything the cost model needs: the active area, the refresh
/// rate and the framebuffer format. Blending and plane layout are the
/// commit driver's problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipeDemand {
    /// Active width in pixels.
    pub width: u32,
    /// Active height in pixels.
    pub height: u32,
    /// Vertical refresh rate in Hz.
    pub refresh_hz: u32,
    /// Framebuffer pixel format.
    pub format: PixelFormat,
}

impl PipeDemand {
    /// Create a demand for the given mode and format.
    pub fn new(width: u32, height: u32, refresh_hz: u32, format: PixelFormat) -> Self {
        Self {
            width,
            height,
            refresh_hz,
            format,
        }
    }

    /// Pixels scanned out per second.
    ///
    /// Saturates at `u64::MAX` for geometries too large to represent, so an
    /// absurd mode prices as infinitely expensive rather than wrapping to a
    /// small number.
    pub fn pixels_per_second(&self) -> u64 {
        (self.width as u64)
            .saturating_mul(self.height as u64)
            .saturating_mul(self.refresh_hz as u64)
    }
}

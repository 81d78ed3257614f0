//! Camera interface trait for focus and exposure measurements.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::HardwareResult;
use crate::subframe::{SensorSize, Subframe};

/// Measurements the camera software extracts from one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Exposure {
    /// Star FWHM in pixels; `None` when no star was detected
    pub fwhm: Option<f64>,
    /// Brightest pixel value in ADU
    pub peak_counts: f64,
    /// Brightest pixel column, in full-sensor coordinates
    pub peak_x: u32,
    /// Brightest pixel row, in full-sensor coordinates
    pub peak_y: u32,
}

impl Exposure {
    /// FWHM if a star was actually measured (present, finite, non-zero).
    pub fn star_fwhm(&self) -> Option<f64> {
        self.fwhm.filter(|f| f.is_finite() && *f > 0.0)
    }
}

/// Interface for a star camera
///
/// Abstracts the camera and its image analysis. Each call to
/// [`expose`](Self::expose) blocks until the frame has been read out and
/// analysed, so consecutive calls never return the same frame.
pub trait CameraInterface {
    /// Take one exposure of the given duration with the current readout window
    fn expose(&mut self, duration: Duration) -> HardwareResult<Exposure>;

    /// Full sensor dimensions
    fn sensor_size(&self) -> SensorSize;

    /// Restrict readout to a window
    fn set_subframe(&mut self, frame: Subframe) -> HardwareResult<()>;

    /// Read out the whole sensor
    fn set_full_frame(&mut self) -> HardwareResult<()> {
        let full = self.sensor_size().full_frame();
        self.set_subframe(full)
    }
}

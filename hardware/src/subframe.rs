//! Sensor geometry and readout windows.

use serde::{Deserialize, Serialize};

/// Full sensor dimensions in (binned) pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorSize {
    pub width: u32,
    pub height: u32,
}

impl SensorSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Readout window covering the whole sensor.
    pub fn full_frame(&self) -> Subframe {
        Subframe {
            x: 0,
            y: 0,
            width: self.width,
            height: self.height,
        }
    }
}

/// Rectangular readout window; `x`, `y` is the upper-left corner in sensor pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subframe {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Subframe {
    /// Window of `width` x `height` centred on `(peak_x, peak_y)`.
    ///
    /// The size is capped at the sensor size and the window is shifted, never
    /// shrunk, to stay on the sensor. A star near the edge therefore sits off
    /// centre rather than falling outside the window.
    pub fn centered_on(
        peak_x: u32,
        peak_y: u32,
        width: u32,
        height: u32,
        sensor: SensorSize,
    ) -> Self {
        let width = width.min(sensor.width);
        let height = height.min(sensor.height);
        let x = peak_x.saturating_sub(width / 2).min(sensor.width - width);
        let y = peak_y.saturating_sub(height / 2).min(sensor.height - height);
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// True if the sensor pixel `(px, py)` is read out by this window.
    pub fn contains(&self, px: u32, py: u32) -> bool {
        px >= self.x && px < self.x + self.width && py >= self.y && py < self.y + self.height
    }

    pub fn pixel_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

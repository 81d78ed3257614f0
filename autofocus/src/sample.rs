//! Single exposures and the statistics aggregated over one focus position.

use serde::{Deserialize, Serialize};

/// Mean/stdev value reported for a position without a single usable exposure.
pub const NO_DATA_SENTINEL: f64 = -1.0;

/// One exposure's image quality reading at a focus position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Focuser step count the exposure was taken at
    pub focus_position: i32,
    /// Full width at half maximum in pixels (smaller is sharper)
    pub metric: f64,
    /// False when the camera reported no star ("no signal" / zero FWHM)
    pub valid: bool,
}

impl Sample {
    /// Reading from a completed exposure; zero, negative or non-finite FWHM is invalid.
    pub fn measured(focus_position: i32, fwhm: f64) -> Self {
        Self {
            focus_position,
            metric: fwhm,
            valid: fwhm.is_finite() && fwhm > 0.0,
        }
    }

    /// Exposure that produced no measurement.
    pub fn no_signal(focus_position: i32) -> Self {
        Self {
            focus_position,
            metric: NO_DATA_SENTINEL,
            valid: false,
        }
    }
}

/// Aggregate of all exposures taken at one focus position.
///
/// `mean` and `stdev` are computed over valid samples only and are both
/// [`NO_DATA_SENTINEL`] when there were none. `stdev` is the population
/// standard deviation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FocusPointStats {
    pub focus_position: i32,
    pub mean: f64,
    pub stdev: f64,
    /// Exposures taken, valid or not
    pub sample_count: usize,
    /// Exposures excluded from the statistics
    pub invalid_count: usize,
}

impl FocusPointStats {
    /// Aggregate the samples taken at `focus_position`.
    ///
    /// A sample flagged valid but carrying a non-finite metric is counted as invalid.
    pub fn from_samples(focus_position: i32, samples: &[Sample]) -> Self {
        let values: Vec<f64> = samples
            .iter()
            .filter(|s| s.valid && s.metric.is_finite())
            .map(|s| s.metric)
            .collect();
        let invalid_count = samples.len() - values.len();

        let (mean, stdev) = if values.is_empty() {
            (NO_DATA_SENTINEL, NO_DATA_SENTINEL)
        } else {
            let n = values.len() as f64;
            let mean = values.iter().sum::<f64>() / n;
            let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
            (mean, variance.sqrt())
        };

        Self {
            focus_position,
            mean,
            stdev,
            sample_count: samples.len(),
            invalid_count,
        }
    }

    /// Number of samples that contributed to `mean`/`stdev`.
    pub fn valid_count(&self) -> usize {
        self.sample_count - self.invalid_count
    }

    /// False when the statistics are sentinels.
    pub fn has_valid_data(&self) -> bool {
        self.valid_count() > 0
    }
}

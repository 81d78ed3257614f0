//! Optical model of star size against focuser position.
//!
//! The defocused star grows along a hyperbola:
//!
//! ```text
//! fwhm(p) = sqrt(f0^2 + (k * (p - p_best))^2)
//! ```
//!
//! which is flat at focus (seeing-limited `f0`) and linear far from it with
//! slope `k` pixels per focuser step.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors in simulation parameters
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulationError {
    #[error("Invalid simulation parameter {name}: {value}")]
    InvalidParameter { name: &'static str, value: f64 },
}

/// Hyperbolic V-curve with a detection cutoff for very diffuse stars.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VCurveModel {
    /// Focuser position of best focus
    pub best_position: i32,
    /// FWHM at best focus in pixels
    pub min_fwhm: f64,
    /// Asymptotic FWHM growth in pixels per focuser step
    pub slope_px_per_step: f64,
    /// Stars wider than this are lost in the background
    pub detection_limit_fwhm: f64,
}

impl Default for VCurveModel {
    fn default() -> Self {
        Self {
            best_position: 6130,
            min_fwhm: 2.2,
            slope_px_per_step: 0.004,
            detection_limit_fwhm: 12.0,
        }
    }
}

impl VCurveModel {
    /// Noise-free FWHM at `position`.
    pub fn fwhm(&self, position: i32) -> f64 {
        let defocus = self.slope_px_per_step * f64::from(position - self.best_position);
        self.min_fwhm.hypot(defocus)
    }

    /// True when a star at `position` is compact enough to be detected.
    pub fn detectable(&self, position: i32) -> bool {
        self.fwhm(position) <= self.detection_limit_fwhm
    }

    /// Peak pixel value relative to the in-focus peak; the flux spreads over `fwhm^2`.
    pub fn peak_fraction(&self, position: i32) -> f64 {
        let ratio = self.min_fwhm / self.fwhm(position);
        ratio * ratio
    }
}

/// Full parameter set for a simulated focuser and camera.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub model: VCurveModel,
    /// Standard deviation of per-frame FWHM noise in pixels
    pub fwhm_noise_px: f64,
    /// Probability that a frame reports no star at all
    pub dropout_probability: f64,
    /// Peak count rate of the in-focus star, ADU per second
    pub star_peak_rate: f64,
    /// Sky background level, ADU per second
    pub background_rate: f64,
    /// Pixel value at which the sensor clips
    pub saturation_adu: f64,
    /// Focuser travel per motion poll, in steps
    pub focuser_steps_per_poll: i32,
    /// Focuser travel range
    pub focuser_min: i32,
    pub focuser_max: i32,
    /// Sensor size in (binned) pixels
    pub sensor_width: u32,
    pub sensor_height: u32,
    /// Where the reference star lands on the sensor after a slew
    pub star_x: u32,
    pub star_y: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            model: VCurveModel::default(),
            fwhm_noise_px: 0.08,
            dropout_probability: 0.05,
            star_peak_rate: 40000.0,
            background_rate: 200.0,
            saturation_adu: 65535.0,
            focuser_steps_per_poll: 250,
            focuser_min: 0,
            focuser_max: 12000,
            sensor_width: 765,
            sensor_height: 510,
            star_x: 402,
            star_y: 231,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), SimulationError> {
        let check = |ok: bool, name: &'static str, value: f64| {
            if ok {
                Ok(())
            } else {
                Err(SimulationError::InvalidParameter { name, value })
            }
        };

        check(self.model.min_fwhm > 0.0, "min_fwhm", self.model.min_fwhm)?;
        check(
            self.model.slope_px_per_step >= 0.0,
            "slope_px_per_step",
            self.model.slope_px_per_step,
        )?;
        check(self.fwhm_noise_px >= 0.0, "fwhm_noise_px", self.fwhm_noise_px)?;
        check(
            (0.0..=1.0).contains(&self.dropout_probability),
            "dropout_probability",
            self.dropout_probability,
        )?;
        check(self.star_peak_rate >= 0.0, "star_peak_rate", self.star_peak_rate)?;
        check(self.background_rate >= 0.0, "background_rate", self.background_rate)?;
        check(
            self.focuser_steps_per_poll > 0,
            "focuser_steps_per_poll",
            f64::from(self.focuser_steps_per_poll),
        )?;
        check(
            self.focuser_min <= self.focuser_max,
            "focuser_max",
            f64::from(self.focuser_max),
        )?;
        check(
            self.star_x < self.sensor_width && self.star_y < self.sensor_height,
            "star_x",
            f64::from(self.star_x),
        )?;
        Ok(())
    }

    /// Save config to JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)
    }

    /// Load config from JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tempfile::NamedTempFile;

    #[test]
    fn test_fwhm_minimum_at_best_position() {
        let model = VCurveModel::default();
        assert_relative_eq!(model.fwhm(6130), 2.2);
        assert!(model.fwhm(6030) > model.fwhm(6130));
        assert_relative_eq!(model.fwhm(6030), model.fwhm(6230), epsilon = 1e-12);
    }

    #[test]
    fn test_fwhm_linear_far_from_focus() {
        let model = VCurveModel {
            min_fwhm: 1.0,
            ..Default::default()
        };
        // 3000 steps out the hyperbola is within 0.5% of its asymptote
        let far = model.fwhm(6130 + 3000);
        assert_relative_eq!(far, 12.0, max_relative = 5e-3);
    }

    #[test]
    fn test_detection_cutoff() {
        let model = VCurveModel::default();
        assert!(model.detectable(6130));
        assert!(model.detectable(6130 + 2000));
        assert!(!model.detectable(6130 + 4000));
    }

    #[test]
    fn test_peak_fraction() {
        let model = VCurveModel::default();
        assert_relative_eq!(model.peak_fraction(6130), 1.0);
        assert!(model.peak_fraction(4000) < 0.1);
    }

    #[test]
    fn test_validate() {
        assert!(SimulationConfig::default().validate().is_ok());

        let config = SimulationConfig {
            dropout_probability: 1.5,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(SimulationError::InvalidParameter {
                name: "dropout_probability",
                value: 1.5
            })
        );
    }

    #[test]
    fn test_config_file_round_trip() {
        let config = SimulationConfig {
            fwhm_noise_px: 0.2,
            ..Default::default()
        };
        let file = NamedTempFile::new().unwrap();
        config.save_to_file(file.path()).unwrap();
        assert_eq!(SimulationConfig::load_from_file(file.path()).unwrap(), config);
    }
}

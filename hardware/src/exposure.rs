//! Field setup: subframe on the reference star and tune the exposure time.
//!
//! Starting from a full-frame exposure, the readout is narrowed to a small
//! window around the brightest pixel and the exposure time is rescaled until
//! the peak count lands inside a target window:
//!
//! ```text
//! t_next = max(t_min, target * t / peak)
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::camera_interface::CameraInterface;
use crate::error::{HardwareError, HardwareResult};
use crate::subframe::Subframe;

/// Exposure tuning parameters. Times are in seconds, counts in ADU.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExposureConfig {
    pub initial_exposure_s: f64,
    pub min_exposure_s: f64,
    pub max_exposure_s: f64,
    /// Peak count aimed for when rescaling
    pub target_peak: f64,
    /// Lowest acceptable peak count
    pub min_peak: f64,
    /// Highest acceptable peak count
    pub max_peak: f64,
    /// Side of the square readout window around the star, in pixels
    pub subframe_size: u32,
    /// Rescaling attempts before giving up
    pub max_iterations: usize,
}

impl Default for ExposureConfig {
    fn default() -> Self {
        Self {
            initial_exposure_s: 0.5,
            min_exposure_s: 0.25,
            max_exposure_s: 30.0,
            target_peak: 15000.0,
            min_peak: 10000.0,
            max_peak: 20000.0,
            subframe_size: 100,
            max_iterations: 10,
        }
    }
}

impl ExposureConfig {
    pub fn validate(&self) -> HardwareResult<()> {
        let invalid = |msg: String| Err(HardwareError::InvalidConfig(msg));

        if !(self.min_exposure_s > 0.0 && self.min_exposure_s <= self.max_exposure_s) {
            return invalid(format!(
                "exposure limits [{}, {}] s are not a positive range",
                self.min_exposure_s, self.max_exposure_s
            ));
        }
        if Duration::try_from_secs_f64(self.max_exposure_s).is_err() {
            return invalid(format!(
                "maximum exposure {} s is not a representable duration",
                self.max_exposure_s
            ));
        }
        if !(self.min_exposure_s..=self.max_exposure_s).contains(&self.initial_exposure_s) {
            return invalid(format!(
                "initial exposure {} s outside [{}, {}] s",
                self.initial_exposure_s, self.min_exposure_s, self.max_exposure_s
            ));
        }
        if !(self.min_peak > 0.0
            && self.min_peak <= self.target_peak
            && self.target_peak <= self.max_peak)
        {
            return invalid(format!(
                "target peak {} must lie in the window [{}, {}]",
                self.target_peak, self.min_peak, self.max_peak
            ));
        }
        if self.subframe_size == 0 {
            return invalid("subframe size must be positive".to_string());
        }
        Ok(())
    }

    pub fn initial_exposure(&self) -> Duration {
        Duration::from_secs_f64(self.initial_exposure_s)
    }

    fn peak_in_window(&self, peak: f64) -> bool {
        (self.min_peak..=self.max_peak).contains(&peak)
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

/// Result of [`tune_exposure`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExposureTuning {
    pub exposure_time: Duration,
    /// Peak count of the last frame taken
    pub peak_counts: f64,
    /// Readout window left active on the camera
    pub subframe: Subframe,
    /// Rescaled exposures taken after the initial full frame
    pub iterations: usize,
    /// False when the iteration cap was hit with the peak still out of window
    pub converged: bool,
}

/// Subframe the camera on the brightest star and tune the exposure time.
///
/// The peak is accepted when it sits inside `[min_peak, max_peak]`, or when it
/// is too bright but the exposure is already at `min_exposure_s`. A frame with
/// no signal at all cannot be rescaled and is reported as a camera error.
pub fn tune_exposure<C>(camera: &mut C, config: &ExposureConfig) -> HardwareResult<ExposureTuning>
where
    C: CameraInterface + ?Sized,
{
    config.validate()?;

    camera.set_full_frame()?;
    let mut exposure_s = config.initial_exposure_s;
    let full = camera.expose(Duration::from_secs_f64(exposure_s))?;

    let subframe = Subframe::centered_on(
        full.peak_x,
        full.peak_y,
        config.subframe_size,
        config.subframe_size,
        camera.sensor_size(),
    );
    camera.set_subframe(subframe)?;
    debug!(
        "Subframed to {}x{} at ({}, {}) around peak ({}, {})",
        subframe.width, subframe.height, subframe.x, subframe.y, full.peak_x, full.peak_y
    );

    let mut peak = full.peak_counts;
    let mut iterations = 0;
    let converged = loop {
        if config.peak_in_window(peak) {
            break true;
        }
        if peak > config.max_peak && exposure_s <= config.min_exposure_s {
            debug!("Peak {peak:.0} above window at minimum exposure {exposure_s:.3}s");
            break true;
        }
        if iterations >= config.max_iterations {
            break false;
        }
        if peak.is_nan() || peak <= 0.0 {
            return Err(HardwareError::device(
                "camera",
                format!("no signal to scale exposure from ({peak} counts)"),
            ));
        }

        debug!("{peak:.0} counts at {exposure_s:.3}s exposure");
        exposure_s = (config.target_peak * exposure_s / peak)
            .clamp(config.min_exposure_s, config.max_exposure_s);
        peak = camera.expose(Duration::from_secs_f64(exposure_s))?.peak_counts;
        iterations += 1;
    };

    if !converged {
        warn!(
            "Exposure tuning stopped after {iterations} iterations: {peak:.0} counts at {exposure_s:.3}s"
        );
    }

    Ok(ExposureTuning {
        exposure_time: Duration::from_secs_f64(exposure_s),
        peak_counts: peak,
        subframe,
        iterations,
        converged,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera_interface::Exposure;
    use crate::subframe::SensorSize;
    use approx::assert_relative_eq;
    use tempfile::NamedTempFile;

    /// Camera whose peak count is linear in exposure time, optionally saturating.
    struct LinearCamera {
        counts_per_second: f64,
        saturation: f64,
        frames: Vec<Subframe>,
        current: Subframe,
        exposures: Vec<f64>,
    }

    impl LinearCamera {
        fn new(counts_per_second: f64) -> Self {
            let current = SensorSize::new(765, 510).full_frame();
            Self {
                counts_per_second,
                saturation: 65535.0,
                frames: Vec::new(),
                current,
                exposures: Vec::new(),
            }
        }
    }

    impl CameraInterface for LinearCamera {
        fn expose(&mut self, duration: Duration) -> HardwareResult<Exposure> {
            let t = duration.as_secs_f64();
            self.exposures.push(t);
            Ok(Exposure {
                fwhm: Some(3.0),
                peak_counts: (self.counts_per_second * t).min(self.saturation),
                peak_x: 700,
                peak_y: 40,
            })
        }

        fn sensor_size(&self) -> SensorSize {
            SensorSize::new(765, 510)
        }

        fn set_subframe(&mut self, frame: Subframe) -> HardwareResult<()> {
            self.frames.push(frame);
            self.current = frame;
            Ok(())
        }
    }

    #[test]
    fn test_already_in_window() {
        let mut camera = LinearCamera::new(30000.0);
        let tuning = tune_exposure(&mut camera, &ExposureConfig::default()).unwrap();

        assert!(tuning.converged);
        assert_eq!(tuning.iterations, 0);
        assert_relative_eq!(tuning.peak_counts, 15000.0);
        assert_eq!(tuning.exposure_time, Duration::from_millis(500));
        assert_eq!(camera.exposures.len(), 1);
    }

    #[test]
    fn test_subframes_on_peak() {
        let mut camera = LinearCamera::new(30000.0);
        let tuning = tune_exposure(&mut camera, &ExposureConfig::default()).unwrap();

        // full frame first, then the window clamped against the right edge
        assert_eq!(camera.frames[0], SensorSize::new(765, 510).full_frame());
        assert_eq!(
            tuning.subframe,
            Subframe {
                x: 650,
                y: 0,
                width: 100,
                height: 100
            }
        );
        assert_eq!(camera.current, tuning.subframe);
    }

    #[test]
    fn test_dim_star_lengthens_exposure() {
        let mut camera = LinearCamera::new(5000.0);
        let tuning = tune_exposure(&mut camera, &ExposureConfig::default()).unwrap();

        assert!(tuning.converged);
        assert_eq!(tuning.iterations, 1);
        assert_relative_eq!(tuning.exposure_time.as_secs_f64(), 3.0, epsilon = 1e-9);
        assert_relative_eq!(tuning.peak_counts, 15000.0, epsilon = 1e-3);
    }

    #[test]
    fn test_bright_star_clamps_at_minimum() {
        let mut camera = LinearCamera::new(200000.0);
        let tuning = tune_exposure(&mut camera, &ExposureConfig::default()).unwrap();

        // 0.5 s saturates; rescaling asks for less than 0.25 s and is clamped
        assert!(tuning.converged);
        assert_eq!(tuning.iterations, 1);
        assert_relative_eq!(tuning.exposure_time.as_secs_f64(), 0.25, epsilon = 1e-9);
        assert_relative_eq!(tuning.peak_counts, 50000.0, epsilon = 1e-6);
    }

    #[test]
    fn test_saturated_star_iterates_down() {
        let mut camera = LinearCamera::new(40000.0);
        camera.saturation = 25000.0;
        let config = ExposureConfig {
            initial_exposure_s: 2.0,
            ..Default::default()
        };
        let tuning = tune_exposure(&mut camera, &config).unwrap();

        // a clipped peak under-predicts the brightness: 2.0 -> 1.2 -> 0.72 -> 0.432 s
        assert!(tuning.converged);
        assert_eq!(tuning.iterations, 3);
        assert_relative_eq!(tuning.exposure_time.as_secs_f64(), 0.432, epsilon = 1e-9);
        assert_relative_eq!(tuning.peak_counts, 17280.0, epsilon = 1e-3);
    }

    #[test]
    fn test_iteration_cap() {
        let mut camera = LinearCamera::new(1.0);
        let config = ExposureConfig {
            max_iterations: 3,
            ..Default::default()
        };
        let tuning = tune_exposure(&mut camera, &config).unwrap();

        assert!(!tuning.converged);
        assert_eq!(tuning.iterations, 3);
        assert_relative_eq!(tuning.exposure_time.as_secs_f64(), 30.0, epsilon = 1e-9);
    }

    #[test]
    fn test_no_signal_is_error() {
        let mut camera = LinearCamera::new(0.0);
        let err = tune_exposure(&mut camera, &ExposureConfig::default()).unwrap_err();
        assert_eq!(err.device_name(), "camera");
    }

    #[test]
    fn test_invalid_config() {
        let mut camera = LinearCamera::new(30000.0);
        let config = ExposureConfig {
            target_peak: 25000.0,
            ..Default::default()
        };
        assert!(matches!(
            tune_exposure(&mut camera, &config),
            Err(HardwareError::InvalidConfig(_))
        ));
        assert!(camera.exposures.is_empty());
    }

    #[test]
    fn test_unbounded_exposure_limit_rejected() {
        let mut camera = LinearCamera::new(1.0);
        for max_exposure_s in [f64::INFINITY, 1e30] {
            let config = ExposureConfig {
                max_exposure_s,
                ..Default::default()
            };
            assert!(matches!(config.validate(), Err(HardwareError::InvalidConfig(_))));
            assert!(matches!(
                tune_exposure(&mut camera, &config),
                Err(HardwareError::InvalidConfig(_))
            ));
        }
        assert!(camera.exposures.is_empty());
    }

    #[test]
    fn test_config_file_round_trip() {
        let config = ExposureConfig {
            initial_exposure_s: 1.0,
            subframe_size: 64,
            ..Default::default()
        };
        let file = NamedTempFile::new().unwrap();
        config.save_to_file(file.path()).unwrap();
        assert_eq!(ExposureConfig::load_from_file(file.path()).unwrap(), config);
    }
}

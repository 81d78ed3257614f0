//! Adaptive focus search for a robotic telescope.
//!
//! The search finds the focuser position minimising the mean FWHM of a
//! reference star using a few coarse-to-fine passes over noisy, occasionally
//! missing measurements. Hardware is reached only through the
//! [`MeasurementSource`] trait.
//!
//! ```
//! use autofocus::{from_fn, FocusConfig, FocusSearchEngine, Sample};
//!
//! let mut engine = FocusSearchEngine::new(FocusConfig::default())?;
//! let mut source = from_fn(|p| Ok(Sample::measured(p, 2.0 + ((p - 6200) as f64).abs() / 400.0)));
//! let report = engine.focus_at_point(6000, &mut source)?;
//! assert_eq!(report.optimum, 6200);
//! # Ok::<(), autofocus::FocusError>(())
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod measurement;
pub mod report;
pub mod run_state;
pub mod sample;

pub use config::{FocusConfig, FocusPass, STANDARD_PASSES};
pub use engine::FocusSearchEngine;
pub use error::{FocusError, FocusResult};
pub use measurement::{from_fn, DeviceFailure, FnSource, MeasurementSource};
pub use report::FocusReport;
pub use run_state::{select_optimum, FocusRunState};
pub use sample::{FocusPointStats, Sample, NO_DATA_SENTINEL};

//! Device interfaces for the autofocus bench.
//!
//! This crate defines the capability traits the focus run needs from the
//! focuser, camera and mount, plus the blocking glue that turns a focuser
//! and camera into an [`autofocus::MeasurementSource`]:
//!
//! - [`FocuserInterface`] - absolute-position focus motor
//! - [`CameraInterface`] - exposures with FWHM and peak-pixel analysis
//! - [`MountInterface`] - slewing to catalog stars
//! - [`DeviceMeasurement`] - move, wait for quiescence, expose
//! - [`tune_exposure`] - subframe on the star and pick an exposure time

pub mod camera_interface;
pub mod device_measurement;
pub mod error;
pub mod exposure;
pub mod focuser_interface;
pub mod mount_interface;
pub mod subframe;

pub use camera_interface::{CameraInterface, Exposure};
pub use device_measurement::{DeviceMeasurement, DEFAULT_POLL_INTERVAL, DEFAULT_SETTLE_TIMEOUT};
pub use error::{HardwareError, HardwareResult};
pub use exposure::{tune_exposure, ExposureConfig, ExposureTuning};
pub use focuser_interface::FocuserInterface;
pub use mount_interface::MountInterface;
pub use subframe::{SensorSize, Subframe};

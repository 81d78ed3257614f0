//! Offline stand-ins for the autofocus bench hardware.
//!
//! The simulated camera images a single reference star whose FWHM follows a
//! hyperbolic V-curve around a configurable best-focus position, with
//! per-frame Gaussian noise and random dropouts. Focuser and camera share the
//! focuser position so the [`hardware::DeviceMeasurement`] glue can drive
//! them exactly like real devices.

pub mod devices;
pub mod focus_model;
pub mod sky;

pub use devices::{
    simulated_devices, FocuserPosition, SimulatedCamera, SimulatedFocuser, SimulatedMount,
};
pub use focus_model::{SimulationConfig, SimulationError, VCurveModel};
pub use sky::random_catalog_entries;

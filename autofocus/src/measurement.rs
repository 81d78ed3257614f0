//! Measurement source interface consumed by the focus search.

use crate::sample::Sample;
use thiserror::Error;

/// Fatal error reported by the hardware behind a measurement source.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{device}: {message}")]
pub struct DeviceFailure {
    /// Which device failed (e.g. "focuser", "camera")
    pub device: String,
    pub message: String,
}

impl DeviceFailure {
    pub fn new(device: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            message: message.into(),
        }
    }
}

/// Interface for taking focus measurements
///
/// Abstracts the focuser and camera so the search never knows how moves are
/// awaited or how FWHM is extracted. Calls are strictly sequential.
pub trait MeasurementSource {
    /// Move the focus mechanism to `focus_position` and return once it has stopped.
    fn move_to(&mut self, focus_position: i32) -> Result<(), DeviceFailure>;

    /// Take one complete exposure at the current position and report its quality.
    fn measure(&mut self, focus_position: i32) -> Result<Sample, DeviceFailure>;
}

/// Measurement source backed by a closure; moves are instantaneous.
pub struct FnSource<F> {
    measure: F,
}

/// Wrap a closure `focus_position -> Sample` as a [`MeasurementSource`].
pub fn from_fn<F>(measure: F) -> FnSource<F>
where
    F: FnMut(i32) -> Result<Sample, DeviceFailure>,
{
    FnSource { measure }
}

impl<F> MeasurementSource for FnSource<F>
where
    F: FnMut(i32) -> Result<Sample, DeviceFailure>,
{
    fn move_to(&mut self, _focus_position: i32) -> Result<(), DeviceFailure> {
        Ok(())
    }

    fn measure(&mut self, focus_position: i32) -> Result<Sample, DeviceFailure> {
        (self.measure)(focus_position)
    }
}

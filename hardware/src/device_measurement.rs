//! Blocking measurement source over a real focuser and camera.

use std::time::{Duration, Instant};

use autofocus::{DeviceFailure, MeasurementSource, Sample};
use tracing::{debug, trace};

use crate::camera_interface::CameraInterface;
use crate::error::{HardwareError, HardwareResult};
use crate::focuser_interface::FocuserInterface;

/// Default interval between focuser motion polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Default limit on how long a single focuser move may take.
pub const DEFAULT_SETTLE_TIMEOUT: Duration = Duration::from_secs(60);

/// [`MeasurementSource`] that moves a focuser and exposes a camera.
///
/// Moves block until the focuser reports it has stopped. A frame with no
/// star (missing or zero FWHM) becomes an invalid sample; only device errors
/// abort the run.
pub struct DeviceMeasurement<F, C> {
    focuser: F,
    camera: C,
    exposure_time: Duration,
    poll_interval: Duration,
    settle_timeout: Duration,
}

impl<F: FocuserInterface, C: CameraInterface> DeviceMeasurement<F, C> {
    pub fn new(focuser: F, camera: C, exposure_time: Duration) -> Self {
        Self {
            focuser,
            camera,
            exposure_time,
            poll_interval: DEFAULT_POLL_INTERVAL,
            settle_timeout: DEFAULT_SETTLE_TIMEOUT,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_settle_timeout(mut self, settle_timeout: Duration) -> Self {
        self.settle_timeout = settle_timeout;
        self
    }

    pub fn set_exposure_time(&mut self, exposure_time: Duration) {
        self.exposure_time = exposure_time;
    }

    pub fn exposure_time(&self) -> Duration {
        self.exposure_time
    }

    pub fn camera_mut(&mut self) -> &mut C {
        &mut self.camera
    }

    pub fn focuser_mut(&mut self) -> &mut F {
        &mut self.focuser
    }

    pub fn into_parts(self) -> (F, C) {
        (self.focuser, self.camera)
    }

    /// Command a move and poll until the focuser stops at `position`.
    pub fn move_and_settle(&mut self, position: i32) -> HardwareResult<()> {
        self.focuser.move_to(position)?;

        let start = Instant::now();
        while self.focuser.is_moving()? {
            if start.elapsed() > self.settle_timeout {
                return Err(HardwareError::Timeout {
                    device: "focuser",
                    waited: start.elapsed(),
                });
            }
            trace!("Focuser moving to {position}");
            std::thread::sleep(self.poll_interval);
        }

        let reached = self.focuser.position()?;
        if reached != position {
            return Err(HardwareError::device(
                "focuser",
                format!("stopped at {reached}, commanded {position}"),
            ));
        }
        debug!("Focuser settled at {position} after {:?}", start.elapsed());
        Ok(())
    }
}

impl<F: FocuserInterface, C: CameraInterface> MeasurementSource for DeviceMeasurement<F, C> {
    fn move_to(&mut self, focus_position: i32) -> Result<(), DeviceFailure> {
        Ok(self.move_and_settle(focus_position)?)
    }

    fn measure(&mut self, focus_position: i32) -> Result<Sample, DeviceFailure> {
        let exposure = self.camera.expose(self.exposure_time)?;
        match exposure.star_fwhm() {
            Some(fwhm) => Ok(Sample::measured(focus_position, fwhm)),
            None => {
                debug!("No star detected at focus {focus_position}");
                Ok(Sample::no_signal(focus_position))
            }
        }
    }
}

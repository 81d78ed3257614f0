//! Mount interface trait for pointing at reference stars.

use shared::Coordinate;

use crate::error::HardwareResult;

/// Interface for a slewing telescope mount
pub trait MountInterface {
    /// Slew to equatorial coordinates, blocking until the mount is tracking
    fn slew_to(&mut self, target: Coordinate) -> HardwareResult<()>;
}

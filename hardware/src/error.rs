//! Errors reported by bench devices.

use std::time::Duration;

use autofocus::DeviceFailure;
use thiserror::Error;

/// Errors that can occur while driving the focuser, camera or mount.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HardwareError {
    /// Device did not reach the expected state in time.
    #[error("{device} timed out after {waited:?}")]
    Timeout {
        device: &'static str,
        waited: Duration,
    },

    /// Device rejected a command or reported a fault.
    #[error("{device} error: {message}")]
    Device {
        device: &'static str,
        message: String,
    },

    /// Invalid parameters passed to a device helper.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl HardwareError {
    pub fn device(device: &'static str, message: impl Into<String>) -> Self {
        Self::Device {
            device,
            message: message.into(),
        }
    }

    /// Name of the device that failed, if any.
    pub fn device_name(&self) -> &'static str {
        match self {
            Self::Timeout { device, .. } | Self::Device { device, .. } => device,
            Self::InvalidConfig(_) => "config",
        }
    }
}

impl From<HardwareError> for DeviceFailure {
    fn from(err: HardwareError) -> Self {
        DeviceFailure::new(err.device_name(), err.to_string())
    }
}

/// Result type for device operations.
pub type HardwareResult<T> = Result<T, HardwareError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_device_failure() {
        let failure: DeviceFailure = HardwareError::Timeout {
            device: "focuser",
            waited: Duration::from_millis(250),
        }
        .into();
        assert_eq!(failure.device, "focuser");
        assert_eq!(failure.message, "focuser timed out after 250ms");
    }

    #[test]
    fn test_device_error_message() {
        let err = HardwareError::device("camera", "shutter stuck");
        assert_eq!(err.to_string(), "camera error: shutter stuck");
        assert_eq!(err.device_name(), "camera");
    }
}

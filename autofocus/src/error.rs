//! Error types for focus runs.

use crate::measurement::DeviceFailure;
use thiserror::Error;

/// Errors that end or invalidate a focus run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FocusError {
    /// The measurement source failed; the run is aborted and its optimum is not trusted.
    #[error("Device failure at focus position {focus_position}: {source}")]
    DeviceFailure {
        focus_position: i32,
        #[source]
        source: DeviceFailure,
    },

    /// Every visited position returned only invalid samples.
    #[error("No usable focus: all {positions_visited} visited positions returned no valid samples")]
    NoUsableFocus { positions_visited: usize },

    #[error("Invalid focus configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for focus operations.
pub type FocusResult<T> = Result<T, FocusError>;

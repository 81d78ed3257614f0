//! Focuser interface trait for focus runs.

use crate::error::HardwareResult;

/// Interface for an absolute-position focuser
///
/// Abstracts the focus motor so focus runs can be tested without hardware.
pub trait FocuserInterface {
    /// Start a move to an absolute step position
    ///
    /// Returns once the command is accepted; use [`is_moving`](Self::is_moving)
    /// to wait for the move to finish.
    fn move_to(&mut self, position: i32) -> HardwareResult<()>;

    /// True while the focuser is still travelling
    fn is_moving(&mut self) -> HardwareResult<bool>;

    /// Current step position
    fn position(&mut self) -> HardwareResult<i32>;
}

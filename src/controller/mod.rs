//! Input collaborators
//!
//! Two kinds of producers feed the router over one channel:
//!
//! 1. [`joystick`] - periodic stick sampling and zone classification
//! 2. [`debounce`] - one debounced watcher per wired button
//!
//! ```text
//! JoystickAdc ──► JoystickPoller ──┐
//!                                  ├──► mpsc<InputEvent> ──► InputRouter
//! DigitalInput ─► DebouncedInput ──┘
//! ```
//!
//! Both run as tokio tasks until their cancellation token fires or the
//! router side of the channel goes away.

pub mod debounce;
pub mod joystick;

pub use debounce::{DebounceSettings, DebouncedInput, Debouncer};
pub use joystick::{Joystick, JoystickPoller, JoystickSnapshot};

use crate::hal::HalError;

#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("Hardware error: {0}")]
    Hardware(#[from] HalError),

    #[error("Already started: {0}")]
    AlreadyStarted(String),
}

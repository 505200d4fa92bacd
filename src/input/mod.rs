//! Input types shared by the collaborators and the router
//!
//! ```text
//! Joystick poller ──┐
//!                   ├─[InputEvent]→ InputRouter ─→ CursorIntegrator | host callbacks | diagnostics
//! Debouncers ───────┘
//! ```

pub mod classifier;
pub mod velocity;
pub mod zone;

pub use classifier::ZoneClassifier;
pub use velocity::{VelocityTable, VelocityTables};
pub use zone::{
    AxisZone, JoystickFormat, JoystickSample, JoystickValue, RawReading, XZone, YZone,
};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Logical button identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ButtonId {
    A,
    B,
    JoystickClick,
    Option,
    LeftShoulder,
    RightShoulder,
}

impl ButtonId {
    pub fn all() -> &'static [ButtonId] {
        &[
            ButtonId::A,
            ButtonId::B,
            ButtonId::JoystickClick,
            ButtonId::Option,
            ButtonId::LeftShoulder,
            ButtonId::RightShoulder,
        ]
    }

    /// Label used in diagnostic records
    pub fn label(&self) -> &'static str {
        match self {
            ButtonId::A => "A",
            ButtonId::B => "B",
            ButtonId::JoystickClick => "JOY",
            ButtonId::Option => "OPTION",
            ButtonId::LeftShoulder => "LS",
            ButtonId::RightShoulder => "RS",
        }
    }
}

impl fmt::Display for ButtonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Settled button transition as produced by a debouncer
///
/// `duration` is zero for a press and the held time for a release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonEvent {
    pub pin: u8,
    pub pressed: bool,
    pub duration: Duration,
}

impl ButtonEvent {
    pub fn new(pin: u8, pressed: bool, duration: Duration) -> Self {
        Self {
            pin,
            pressed,
            duration,
        }
    }
}

/// Message delivered from a collaborator to the router
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    Joystick(JoystickValue),
    Button(ButtonId, ButtonEvent),
}

//! Host callback registry and diagnostics sink

use crate::input::{ButtonId, JoystickFormat, JoystickValue};
use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Failure reported by, or caught around, a host callback
#[derive(Debug, thiserror::Error)]
pub enum CallbackError {
    #[error("Callback failed: {0}")]
    Failed(String),

    #[error("Callback panicked: {0}")]
    Panicked(String),
}

pub type CallbackResult = Result<(), CallbackError>;

/// Host handler for one button: `(pin, pressed, duration)`
pub type ButtonCallback = Arc<dyn Fn(u8, bool, Duration) -> CallbackResult + Send + Sync>;

/// Host handler for the joystick: `(requested format, value)`
pub type JoystickCallback =
    Arc<dyn Fn(JoystickFormat, JoystickValue) -> CallbackResult + Send + Sync>;

/// Optional host handlers, fixed once the gamepad is constructed
#[derive(Clone, Default)]
pub struct CallbackRegistry {
    buttons: HashMap<ButtonId, ButtonCallback>,
    joystick: Option<JoystickCallback>,
    joystick_format: JoystickFormat,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_button<F>(mut self, button: ButtonId, callback: F) -> Self
    where
        F: Fn(u8, bool, Duration) -> CallbackResult + Send + Sync + 'static,
    {
        if self.buttons.insert(button, Arc::new(callback)).is_some() {
            warn!("Replacing existing callback for button {}", button);
        }
        self
    }

    pub fn with_joystick<F>(mut self, format: JoystickFormat, callback: F) -> Self
    where
        F: Fn(JoystickFormat, JoystickValue) -> CallbackResult + Send + Sync + 'static,
    {
        self.joystick = Some(Arc::new(callback));
        self.joystick_format = format;
        self
    }

    /// Sets the forwarding format without registering a handler
    pub fn with_joystick_format(mut self, format: JoystickFormat) -> Self {
        self.joystick_format = format;
        self
    }

    pub fn button(&self, button: ButtonId) -> Option<&ButtonCallback> {
        self.buttons.get(&button)
    }

    pub fn joystick(&self) -> Option<&JoystickCallback> {
        self.joystick.as_ref()
    }

    pub fn joystick_format(&self) -> JoystickFormat {
        self.joystick_format
    }

    pub fn registered_buttons(&self) -> Vec<ButtonId> {
        let mut ids: Vec<ButtonId> = self.buttons.keys().copied().collect();
        ids.sort();
        ids
    }
}

impl fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("buttons", &self.registered_buttons())
            .field("joystick", &self.joystick.is_some())
            .field("joystick_format", &self.joystick_format)
            .finish()
    }
}

/// Receives the fallback record for buttons that are not forwarded
pub trait DiagnosticSink: Send + Sync {
    fn button(&self, button: ButtonId, pressed: bool);
}

/// Writes `"<LABEL> Button:<pressed>"` lines to standard output
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutDiagnostics;

impl DiagnosticSink for StdoutDiagnostics {
    fn button(&self, button: ButtonId, pressed: bool) {
        info!("{} Button:{}", button.label(), pressed);
        let mut out = std::io::stdout().lock();
        if let Err(e) = writeln!(out, "{} Button:{}", button.label(), pressed) {
            warn!("Failed to write button diagnostic: {}", e);
        }
    }
}

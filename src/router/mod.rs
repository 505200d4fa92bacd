//! Input router
//!
//! Decides, per event, whether input is consumed internally or forwarded to
//! the host, based on the current [`Mode`].
//!
//! | Event | Mode | Handler registered | Result |
//! |---|---|---|---|
//! | joystick | external-run | yes | forwarded in the requested format |
//! | joystick | internal-menu | any | cursor moves |
//! | joystick | external-run | no | dropped silently |
//! | button | external-run | yes | forwarded unmodified |
//! | button | otherwise | any | diagnostic record |
//!
//! Only raw → classified conversion is performed before forwarding. A sample
//! that arrives classified is forwarded as-is even if raw was requested.
//!
//! Host callbacks run inline on the router task. Errors and panics are caught
//! and logged so the next event is still delivered; a callback that never
//! returns stalls delivery.

pub mod callbacks;


pub use callbacks::{
    ButtonCallback, CallbackError, CallbackRegistry, CallbackResult, DiagnosticSink,
    JoystickCallback, StdoutDiagnostics,
};

use crate::cursor::{CursorIntegrator, CursorPosition};
use crate::input::{
    ButtonEvent, ButtonId, InputEvent, JoystickFormat, JoystickSample, JoystickValue,
    ZoneClassifier,
};
use crate::mode::{Mode, ModeArbiter};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

/// What the router did with one event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    Forwarded,
    CursorMoved(CursorPosition),
    Dropped,
    Diagnostic,
    CallbackFailed,
}

pub struct InputRouter {
    mode: Arc<ModeArbiter>,
    cursor: Arc<CursorIntegrator>,
    callbacks: Arc<CallbackRegistry>,
    classifier: ZoneClassifier,
    diagnostics: Arc<dyn DiagnosticSink>,
}

impl InputRouter {
    pub fn new(
        mode: Arc<ModeArbiter>,
        cursor: Arc<CursorIntegrator>,
        callbacks: Arc<CallbackRegistry>,
        classifier: ZoneClassifier,
        diagnostics: Arc<dyn DiagnosticSink>,
    ) -> Self {
        debug!("Creating input router with callbacks: {:?}", callbacks);
        Self {
            mode,
            cursor,
            callbacks,
            classifier,
            diagnostics,
        }
    }

    pub fn route(&self, event: InputEvent) -> RouteOutcome {
        match event {
            InputEvent::Joystick(value) => self.route_joystick(value),
            InputEvent::Button(button, event) => self.route_button(button, event),
        }
    }

    fn route_joystick(&self, value: JoystickValue) -> RouteOutcome {
        match (self.mode.current(), self.callbacks.joystick()) {
            (Mode::ExternalRun, Some(callback)) => {
                let format = self.callbacks.joystick_format();
                let forwarded = match (format, value) {
                    (JoystickFormat::Classified, JoystickValue::Raw(raw)) => {
                        JoystickValue::Classified(self.classifier.classify(raw))
                    }
                    (_, value) => value,
                };
                debug!("Forwarding joystick {:?} as {:?}", forwarded, format);
                self.invoke("joystick", || callback(format, forwarded))
            }
            (Mode::InternalMenu, _) => {
                let sample = self.to_sample(value);
                RouteOutcome::CursorMoved(self.cursor.apply(sample))
            }
            (Mode::ExternalRun, None) => {
                trace!("No joystick handler registered, dropping {:?}", value);
                RouteOutcome::Dropped
            }
        }
    }

    fn route_button(&self, button: ButtonId, event: ButtonEvent) -> RouteOutcome {
        match (self.mode.current(), self.callbacks.button(button)) {
            (Mode::ExternalRun, Some(callback)) => {
                debug!(
                    "Forwarding button {} (pin {}, pressed {}, {:?})",
                    button, event.pin, event.pressed, event.duration
                );
                self.invoke(button.label(), || {
                    callback(event.pin, event.pressed, event.duration)
                })
            }
            _ => {
                self.diagnostics.button(button, event.pressed);
                RouteOutcome::Diagnostic
            }
        }
    }

    fn to_sample(&self, value: JoystickValue) -> JoystickSample {
        match value {
            JoystickValue::Raw(raw) => self.classifier.classify(raw),
            JoystickValue::Classified(sample) => sample,
        }
    }

    fn invoke<F>(&self, target: &str, call: F) -> RouteOutcome
    where
        F: FnOnce() -> CallbackResult,
    {
        let result = match panic::catch_unwind(AssertUnwindSafe(call)) {
            Ok(result) => result,
            Err(payload) => Err(CallbackError::Panicked(panic_message(payload.as_ref()))),
        };

        match result {
            Ok(()) => RouteOutcome::Forwarded,
            Err(e) => {
                error!("Host callback for {} failed: {}", target, e);
                RouteOutcome::CallbackFailed
            }
        }
    }

    /// Consumes events until the channel closes or `cancel` fires
    pub async fn run(self, mut events: mpsc::Receiver<InputEvent>, cancel: CancellationToken) {
        info!("Input router started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Input router cancelled");
                    break;
                }
                event = events.recv() => match event {
                    Some(event) => {
                        let outcome = self.route(event);
                        trace!("Routed {:?} -> {:?}", event, outcome);
                    }
                    None => {
                        info!("Input channel closed, router stopping");
                        break;
                    }
                }
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

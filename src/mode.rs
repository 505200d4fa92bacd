//! Mode arbiter
//!
//! Process-wide routing mode. The arbiter only stores and publishes the mode;
//! what triggers a transition is up to the host, which calls [`ModeArbiter::set`].

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::watch;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    /// Input drives the internal menu cursor
    InternalMenu,
    /// Input is forwarded to the running external application
    #[default]
    ExternalRun,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::InternalMenu => write!(f, "internal-menu"),
            Mode::ExternalRun => write!(f, "external-run"),
        }
    }
}

#[derive(Debug)]
pub struct ModeArbiter {
    mode: watch::Sender<Mode>,
}

impl ModeArbiter {
    pub fn new(initial: Mode) -> Self {
        info!("Mode arbiter starting in {}", initial);
        let (mode, _) = watch::channel(initial);
        Self { mode }
    }

    pub fn current(&self) -> Mode {
        *self.mode.borrow()
    }

    /// Switches the routing mode, returning the previous one
    pub fn set(&self, mode: Mode) -> Mode {
        let previous = self.mode.send_replace(mode);
        if previous != mode {
            info!("Mode changed: {} -> {}", previous, mode);
        }
        previous
    }

    pub fn subscribe(&self) -> watch::Receiver<Mode> {
        self.mode.subscribe()
    }
}

impl Default for ModeArbiter {
    fn default() -> Self {
        Self::new(Mode::default())
    }
}

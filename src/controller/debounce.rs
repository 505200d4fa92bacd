//! Debounced button inputs
//!
//! A line is sampled every `sample_period`. A level that differs from the
//! settled state becomes a candidate; the candidate settles once it has held
//! for the whole debounce window, and any flip back in between discards it.
//! Durations are measured between the first edges of the press and the
//! release.

use super::ControllerError;
use crate::hal::DigitalInput;
use crate::input::{ButtonEvent, ButtonId, InputEvent};
use statum::{machine, state};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceSettings {
    pub window: Duration,
    pub sample_period: Duration,
    pub active_low: bool,
}

/// Pure edge filter, fed one level sample at a time
#[derive(Debug, Clone)]
pub struct Debouncer {
    pin: u8,
    window: Duration,
    active_low: bool,
    pressed: bool,
    candidate: Option<(bool, Instant)>,
    pressed_at: Option<Instant>,
}

impl Debouncer {
    pub fn new(pin: u8, window: Duration, active_low: bool, initial_high: bool) -> Self {
        Self {
            pin,
            window,
            active_low,
            pressed: initial_high != active_low,
            candidate: None,
            pressed_at: None,
        }
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    /// Feeds one sample; returns the transition if one settled
    pub fn observe(&mut self, high: bool, now: Instant) -> Option<ButtonEvent> {
        let level = high != self.active_low;

        if level == self.pressed {
            if self.candidate.take().is_some() {
                trace!("GPIO{} bounced back", self.pin);
            }
            return None;
        }

        let since = match self.candidate {
            Some((candidate, since)) if candidate == level => since,
            _ => {
                self.candidate = Some((level, now));
                now
            }
        };

        if now.duration_since(since) < self.window {
            return None;
        }

        self.candidate = None;
        self.pressed = level;
        let duration = if level {
            self.pressed_at = Some(since);
            Duration::ZERO
        } else {
            self.pressed_at
                .take()
                .map(|at| since.duration_since(at))
                .unwrap_or_default()
        };
        Some(ButtonEvent::new(self.pin, level, duration))
    }
}

#[state]
#[derive(Debug, Clone)]
pub enum DebounceState {
    Configured,
    Watching(Debouncer),
}

#[machine]
pub struct DebouncedInput<S: DebounceState> {
    button: ButtonId,
    input: Box<dyn DigitalInput>,
    settings: DebounceSettings,
    events: mpsc::Sender<InputEvent>,
}

impl DebouncedInput<Configured> {
    pub fn create(
        button: ButtonId,
        input: Box<dyn DigitalInput>,
        settings: DebounceSettings,
        events: mpsc::Sender<InputEvent>,
    ) -> Self {
        debug!(
            "Creating debouncer for {} on GPIO{} ({:?} window)",
            button,
            input.pin(),
            settings.window
        );
        Self::new(button, input, settings, events)
    }

    /// Reads the resting level; a line that cannot be read aborts setup
    pub fn start(mut self) -> Result<DebouncedInput<Watching>, ControllerError> {
        let high = self.input.is_high()?;
        let filter = Debouncer::new(
            self.input.pin(),
            self.settings.window,
            self.settings.active_low,
            high,
        );
        info!(
            "Watching {} on GPIO{} (initially {})",
            self.button,
            self.input.pin(),
            if filter.is_pressed() { "pressed" } else { "released" }
        );
        Ok(self.transition_with(filter))
    }
}

impl DebouncedInput<Watching> {
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }

    pub async fn run(mut self, cancel: CancellationToken) {
        let Some(mut filter) = self.get_state_data().cloned() else {
            warn!("Debouncer for {} has no filter state", self.button);
            return;
        };
        let mut ticker = time::interval(self.settings.sample_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Debouncer for {} cancelled", self.button);
                    break;
                }
                _ = ticker.tick() => {
                    let high = match self.input.is_high() {
                        Ok(high) => high,
                        Err(e) => {
                            warn!("Reading {} failed: {}", self.button, e);
                            continue;
                        }
                    };

                    if let Some(event) = filter.observe(high, Instant::now()) {
                        debug!("{} settled: {:?}", self.button, event);
                        if self
                            .events
                            .send(InputEvent::Button(self.button, event))
                            .await
                            .is_err()
                        {
                            info!("Router gone, debouncer for {} stops", self.button);
                            break;
                        }
                    }
                }
            }
        }
    }
}

/// Wraps `input` in a watcher and spawns it
pub fn watch_button(
    button: ButtonId,
    input: Box<dyn DigitalInput>,
    settings: DebounceSettings,
    events: mpsc::Sender<InputEvent>,
    cancel: CancellationToken,
) -> Result<JoinHandle<()>, ControllerError> {
    let watcher = DebouncedInput::create(button, input, settings, events).start()?;
    Ok(watcher.spawn(cancel))
}

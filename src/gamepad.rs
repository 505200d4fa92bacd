//! Gamepad facade
//!
//! [`Gamepad`] owns every collaborator handle and the background tasks:
//!
//! ```text
//! Gamepad
//!   ├─ display          (render_buffer, splash)
//!   ├─ Joystick ───────► poller task ──┐
//!   ├─ buttons ────────► debouncers ───┼─► router task ─► callbacks | cursor | diagnostics
//!   ├─ ModeArbiter ◄──────────────────┘
//!   └─ CursorIntegrator
//! ```
//!
//! Dropping the gamepad cancels the tasks; [`Gamepad::shutdown`] also waits
//! for them.

use crate::config::{ConfigError, GamepadConfig};
use crate::controller::debounce::{watch_button, DebounceSettings};
use crate::controller::{ControllerError, Joystick};
use crate::cursor::{CursorIntegrator, CursorPosition};
use crate::hal::{DigitalInput, DisplayDriver, GrayFrame, HalError, Hardware};
use crate::input::{ButtonId, InputEvent, JoystickSample, RawReading};
use crate::mode::{Mode, ModeArbiter};
use crate::router::{CallbackRegistry, DiagnosticSink, InputRouter, StdoutDiagnostics};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Capacity of the producer → router channel
const INPUT_QUEUE: usize = 1000;

/// Key color for composing frames onto the cleared panel
const TRANSPARENT: u8 = 0;

#[derive(Debug, thiserror::Error)]
pub enum GamepadError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Hardware error: {0}")]
    Hardware(#[from] HalError),

    #[error("Initialization failed: {0}")]
    Initialization(String),

    #[error("Channel error: {0}")]
    Channel(String),
}

impl From<ControllerError> for GamepadError {
    fn from(e: ControllerError) -> Self {
        match e {
            ControllerError::Hardware(e) => GamepadError::Hardware(e),
            ControllerError::AlreadyStarted(what) => GamepadError::Initialization(what),
        }
    }
}

/// Optional parts of [`Gamepad::initialize_with`]
#[derive(Default)]
pub struct InitOptions {
    /// Frame shown once at start-up; falls back to the configured file, then
    /// to a plain border
    pub splash: Option<GrayFrame>,
    /// Where button diagnostics go; stdout by default
    pub diagnostics: Option<Arc<dyn DiagnosticSink>>,
}

pub struct Gamepad {
    config: GamepadConfig,
    display: Box<dyn DisplayDriver>,
    joystick: Joystick,
    mode: Arc<ModeArbiter>,
    cursor: Arc<CursorIntegrator>,
    cancel: CancellationToken,
    tasks: Vec<(String, JoinHandle<()>)>,
}

impl Gamepad {
    /// Brings the gamepad up with the default splash and stdout diagnostics
    ///
    /// Must be called from within a tokio runtime.
    pub fn initialize(
        config: GamepadConfig,
        hardware: Hardware,
        callbacks: CallbackRegistry,
    ) -> Result<Self, GamepadError> {
        Self::initialize_with(config, hardware, callbacks, InitOptions::default())
    }

    pub fn initialize_with(
        config: GamepadConfig,
        hardware: Hardware,
        callbacks: CallbackRegistry,
        options: InitOptions,
    ) -> Result<Self, GamepadError> {
        info!("Initializing gamepad");
        config.validate()?;

        let Hardware {
            mut display,
            joystick: adc,
            buttons,
        } = hardware;

        let (width, height) = (config.display.width, config.display.height);
        let (panel_width, panel_height) = (display.width(), display.height());
        if (panel_width, panel_height) != (width, height) {
            error!(
                "Display reports {}x{}, configuration says {}x{}",
                panel_width, panel_height, width, height
            );
            return Err(ConfigError::InvalidDisplay {
                width: panel_width,
                height: panel_height,
            }
            .into());
        }

        let splash = match options.splash {
            Some(frame) => frame,
            None => match &config.display.splash {
                Some(path) => load_splash(path, width, height)?,
                None => default_splash(width, height),
            },
        };
        if (splash.width(), splash.height()) != (width, height) {
            return Err(ConfigError::SplashSize {
                width: splash.width(),
                height: splash.height(),
                display_width: width,
                display_height: height,
            }
            .into());
        }

        let mode = Arc::new(ModeArbiter::new(config.mode.initial));
        let cursor = Arc::new(CursorIntegrator::new(
            config.velocity_tables()?,
            width,
            height,
            config.cursor_start(),
        )?);
        debug!(
            "Mode {} with cursor at {:?}",
            mode.current(),
            cursor.position()
        );

        compose(display.as_mut(), &splash)?;
        info!("Splash presented");

        let classifier = config.joystick.classifier();
        let diagnostics = options
            .diagnostics
            .unwrap_or_else(|| Arc::new(StdoutDiagnostics) as Arc<dyn DiagnosticSink>);
        let router = InputRouter::new(
            mode.clone(),
            cursor.clone(),
            Arc::new(callbacks),
            classifier,
            diagnostics,
        );

        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::channel(INPUT_QUEUE);
        let mut tasks = vec![(
            "router".to_string(),
            tokio::spawn(router.run(rx, cancel.clone())),
        )];

        let mut joystick = Joystick::new(
            adc,
            classifier,
            config.joystick.report,
            config.joystick.polling_interval(),
        );

        let started = start_producers(&config, &mut joystick, buttons, &tx, &cancel);
        match started {
            Ok(handles) => tasks.extend(handles),
            Err(e) => {
                error!("Gamepad initialization failed: {}", e);
                cancel.cancel();
                return Err(e);
            }
        }

        info!("Gamepad ready: {} tasks running", tasks.len());
        Ok(Self {
            config,
            display,
            joystick,
            mode,
            cursor,
            cancel,
            tasks,
        })
    }

    /// Clears the panel, composes `frame` at the origin and presents it
    pub fn render_buffer(&mut self, frame: &GrayFrame) -> Result<(), GamepadError> {
        compose(self.display.as_mut(), frame)?;
        Ok(())
    }

    pub fn current_joystick_state(&self) -> JoystickSample {
        self.joystick.current_state()
    }

    pub fn current_joystick_raw(&self) -> RawReading {
        self.joystick.raw_count()
    }

    /// `(x_reversed, y_reversed)`
    pub fn joystick_axis_reversal(&self) -> (bool, bool) {
        (self.joystick.x_reversed(), self.joystick.y_reversed())
    }

    pub fn mode(&self) -> Mode {
        self.mode.current()
    }

    /// Switches mode, returning the previous one
    pub fn set_mode(&self, mode: Mode) -> Mode {
        self.mode.set(mode)
    }

    pub fn subscribe_mode(&self) -> watch::Receiver<Mode> {
        self.mode.subscribe()
    }

    pub fn cursor(&self) -> CursorPosition {
        self.cursor.position()
    }

    pub fn subscribe_cursor(&self) -> watch::Receiver<CursorPosition> {
        self.cursor.subscribe()
    }

    pub fn config(&self) -> &GamepadConfig {
        &self.config
    }

    /// Cancels every task and waits for them to finish
    pub async fn shutdown(mut self) {
        info!("Shutting down gamepad");
        self.cancel.cancel();

        for (name, task) in std::mem::take(&mut self.tasks) {
            match task.await {
                Ok(()) => debug!("Task {} stopped", name),
                Err(e) => warn!("Task {} ended abnormally: {}", name, e),
            }
        }
        info!("Gamepad shut down");
    }
}

impl Drop for Gamepad {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for Gamepad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gamepad")
            .field("mode", &self.mode.current())
            .field("cursor", &self.cursor.position())
            .field("joystick", &self.joystick)
            .field("tasks", &self.tasks.len())
            .finish()
    }
}

fn start_producers(
    config: &GamepadConfig,
    joystick: &mut Joystick,
    buttons: Vec<(ButtonId, Box<dyn DigitalInput>)>,
    tx: &mpsc::Sender<InputEvent>,
    cancel: &CancellationToken,
) -> Result<Vec<(String, JoinHandle<()>)>, GamepadError> {
    let mut handles = Vec::with_capacity(buttons.len() + 1);
    handles.push((
        "joystick".to_string(),
        joystick.start_polling(tx.clone(), cancel.clone())?,
    ));

    let settings = DebounceSettings {
        window: config.buttons.debounce(),
        sample_period: config.buttons.sample_period(),
        active_low: config.buttons.active_low,
    };
    for (button, input) in buttons {
        let handle = watch_button(button, input, settings, tx.clone(), cancel.clone())?;
        handles.push((format!("button {}", button), handle));
    }
    Ok(handles)
}

fn compose(display: &mut dyn DisplayDriver, frame: &GrayFrame) -> Result<(), HalError> {
    display.fill(0);
    display.blit(frame, 0, 0, Some(TRANSPARENT));
    display.show()
}

/// Reads a raw GS4_HMSB image sized for the display
pub fn load_splash(path: &Path, width: u32, height: u32) -> Result<GrayFrame, ConfigError> {
    let data = fs::read(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let actual = data.len();
    GrayFrame::from_bytes(width, height, data).map_err(|_| ConfigError::SplashBytes {
        path: path.to_path_buf(),
        expected: GrayFrame::byte_len(width, height),
        actual,
    })
}

/// Full-brightness border two pixels wide
fn default_splash(width: u32, height: u32) -> GrayFrame {
    let mut frame = GrayFrame::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let edge = x < 2 || y < 2 || x + 2 >= width || y + 2 >= height;
            if edge {
                frame.set_pixel(x, y, GrayFrame::MAX_LEVEL);
            }
        }
    }
    frame
}

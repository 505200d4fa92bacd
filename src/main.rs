use color_eyre::{eyre::eyre, Result};
use handheld_gamepad::config::GamepadConfig;
use handheld_gamepad::cursor::CursorPosition;
use handheld_gamepad::gamepad::Gamepad;
use handheld_gamepad::hal::{rpi, GrayFrame};
use handheld_gamepad::input::{ButtonId, JoystickValue};
use handheld_gamepad::mode::Mode;
use handheld_gamepad::router::{CallbackError, CallbackRegistry};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Menu falls back to external-run after this long without cursor movement
const MENU_IDLE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config_path = match std::env::args().nth(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let path = GamepadConfig::default_path()?;
            GamepadConfig::ensure_default(&path)?;
            path
        }
    };
    let config = GamepadConfig::load_or_default(&config_path)?;
    info!("Using configuration {}", config_path.display());

    let hardware = rpi::open_board(&config).map_err(|e| eyre!("Failed to open board: {}", e))?;

    // Option opens the on-device menu; callbacks cannot reach the gamepad
    // directly, so they signal the main loop
    let (menu_tx, mut menu_rx) = mpsc::unbounded_channel();
    let callbacks = CallbackRegistry::new()
        .with_button(ButtonId::A, |pin, pressed, held| {
            info!("A (GPIO{}) pressed={} held={:?}", pin, pressed, held);
            Ok(())
        })
        .with_button(ButtonId::B, |pin, pressed, held| {
            info!("B (GPIO{}) pressed={} held={:?}", pin, pressed, held);
            Ok(())
        })
        .with_button(ButtonId::Option, move |_, pressed, _| {
            if !pressed {
                menu_tx
                    .send(())
                    .map_err(|e| CallbackError::Failed(e.to_string()))?;
            }
            Ok(())
        })
        .with_joystick(config.joystick.forward, |format, value| {
            match value {
                JoystickValue::Raw(raw) => debug!("Stick ({:?}) raw {:?}", format, raw),
                JoystickValue::Classified(sample) => {
                    debug!("Stick ({:?}) {} / {}", format, sample.x, sample.y)
                }
            }
            Ok(())
        });

    let mut gamepad = Gamepad::initialize(config, hardware, callbacks)?;
    let mut cursor_rx = gamepad.subscribe_cursor();
    let menu_idle = time::sleep(MENU_IDLE);
    tokio::pin!(menu_idle);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl-C received");
                break;
            }
            Some(()) = menu_rx.recv() => {
                gamepad.set_mode(Mode::InternalMenu);
                let position = gamepad.cursor();
                draw_cursor(&mut gamepad, position);
                menu_idle.as_mut().reset(time::Instant::now() + MENU_IDLE);
            }
            Ok(()) = cursor_rx.changed() => {
                let position = *cursor_rx.borrow_and_update();
                draw_cursor(&mut gamepad, position);
                menu_idle.as_mut().reset(time::Instant::now() + MENU_IDLE);
            }
            _ = &mut menu_idle, if gamepad.mode() == Mode::InternalMenu => {
                info!("Menu idle, returning to external-run");
                gamepad.set_mode(Mode::ExternalRun);
                let display = &gamepad.config().display;
                let blank = GrayFrame::new(display.width, display.height);
                gamepad.render_buffer(&blank)?;
            }
        }
    }

    gamepad.shutdown().await;
    Ok(())
}

/// Draws a 3x3 cursor marker on an otherwise blank frame
fn draw_cursor(gamepad: &mut Gamepad, position: CursorPosition) {
    let (width, height) = (
        gamepad.config().display.width,
        gamepad.config().display.height,
    );
    let mut frame = GrayFrame::new(width, height);
    for dy in -1..=1 {
        for dx in -1..=1 {
            let (x, y) = (position.x + dx, position.y + dy);
            if x >= 0 && y >= 0 {
                frame.set_pixel(x as u32, y as u32, GrayFrame::MAX_LEVEL);
            }
        }
    }
    if let Err(e) = gamepad.render_buffer(&frame) {
        warn!("Failed to draw cursor: {}", e);
    }
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}

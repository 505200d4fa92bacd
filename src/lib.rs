//! Mode-arbitrated input routing for a handheld gamepad
//!
//! The device has a 128x128 grayscale panel, a two-axis analog stick and up to
//! six buttons. Input is either forwarded to host callbacks (external-run
//! mode) or consumed internally to drive an on-screen cursor (internal-menu
//! mode).
//!
//! ```no_run
//! use handheld_gamepad::config::GamepadConfig;
//! use handheld_gamepad::gamepad::Gamepad;
//! use handheld_gamepad::hal::mock::MockBoard;
//! use handheld_gamepad::input::ButtonId;
//! use handheld_gamepad::router::CallbackRegistry;
//!
//! # async fn demo() -> Result<(), handheld_gamepad::gamepad::GamepadError> {
//! let config = GamepadConfig::default();
//! let (hardware, _board) = MockBoard::new(&config);
//! let callbacks = CallbackRegistry::new().with_button(ButtonId::A, |pin, pressed, held| {
//!     println!("A on GPIO{pin}: {pressed} after {held:?}");
//!     Ok(())
//! });
//!
//! let gamepad = Gamepad::initialize(config, hardware, callbacks)?;
//! gamepad.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod controller;
pub mod cursor;
pub mod gamepad;
pub mod hal;
pub mod input;
pub mod mode;
pub mod router;

pub use gamepad::{Gamepad, GamepadError, InitOptions};

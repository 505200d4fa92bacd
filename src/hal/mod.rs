//! Hardware collaborator interfaces
//!
//! The core only talks to hardware through the three traits defined here.
//! [`rpi`] implements them on a Raspberry Pi with `rppal`, [`mock`] implements
//! them in memory for tests and desktop runs.

pub mod frame;
pub mod mock;
pub mod rpi;

pub use frame::GrayFrame;

use crate::input::{ButtonId, RawReading};

#[derive(Debug, thiserror::Error)]
pub enum HalError {
    #[error("GPIO error: {0}")]
    Gpio(String),

    #[error("SPI error: {0}")]
    Spi(String),

    #[error("I2C error: {0}")]
    I2c(String),

    #[error("Frame has {actual} bytes, expected {expected}")]
    FrameSize { expected: usize, actual: usize },

    #[error("Device not responding: {0}")]
    Disconnected(String),
}

/// Pixel panel with an internal back buffer
pub trait DisplayDriver: Send {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Sets every back-buffer pixel to `level`
    fn fill(&mut self, level: u8);

    /// Composes `frame` into the back buffer, skipping pixels equal to `key`
    fn blit(&mut self, frame: &GrayFrame, x: i32, y: i32, key: Option<u8>);

    /// Transfers the back buffer to the panel
    fn show(&mut self) -> Result<(), HalError>;
}

/// Two-axis analog stick sampler
pub trait JoystickAdc: Send {
    fn read(&mut self) -> Result<RawReading, HalError>;
}

/// A single digital input line, sampled on demand
pub trait DigitalInput: Send {
    fn pin(&self) -> u8;

    fn is_high(&mut self) -> Result<bool, HalError>;
}

/// Everything the gamepad needs from the board
pub struct Hardware {
    pub display: Box<dyn DisplayDriver>,
    pub joystick: Box<dyn JoystickAdc>,
    pub buttons: Vec<(ButtonId, Box<dyn DigitalInput>)>,
}

impl std::fmt::Debug for Hardware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let buttons: Vec<(ButtonId, u8)> =
            self.buttons.iter().map(|(id, pin)| (*id, pin.pin())).collect();
        f.debug_struct("Hardware")
            .field("display", &(self.display.width(), self.display.height()))
            .field("buttons", &buttons)
            .finish()
    }
}

//! In-memory hardware for tests and desktop runs
//!
//! Every mock hands out a cloneable control handle, so a test can keep driving
//! pins and the stick after the hardware has been moved into a `Gamepad`.
//!
//! ```no_run
//! use handheld_gamepad::config::GamepadConfig;
//! use handheld_gamepad::hal::mock::MockBoard;
//!
//! let config = GamepadConfig::default();
//! let (hardware, board) = MockBoard::new(&config);
//! board.stick.set(handheld_gamepad::input::RawReading::new(0, 0x8000));
//! ```

use super::{DigitalInput, DisplayDriver, GrayFrame, HalError, Hardware, JoystickAdc};
use crate::config::GamepadConfig;
use crate::input::{ButtonId, RawReading};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// One display call, in the order received
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayOp {
    Fill(u8),
    Blit { x: i32, y: i32, key: Option<u8> },
    Show,
}

#[derive(Debug, Default)]
struct PanelState {
    ops: Vec<DisplayOp>,
    presented: Vec<GrayFrame>,
    fail_show: bool,
}

/// Panel that records calls and keeps every presented frame
#[derive(Debug)]
pub struct MockDisplay {
    buffer: GrayFrame,
    state: Arc<Mutex<PanelState>>,
}

/// Inspection handle for a [`MockDisplay`]
#[derive(Debug, Clone)]
pub struct PanelHandle {
    state: Arc<Mutex<PanelState>>,
}

impl MockDisplay {
    pub fn new(width: u32, height: u32) -> (Self, PanelHandle) {
        let state = Arc::new(Mutex::new(PanelState::default()));
        (
            Self {
                buffer: GrayFrame::new(width, height),
                state: state.clone(),
            },
            PanelHandle { state },
        )
    }

    fn record(&self, op: DisplayOp) {
        lock(&self.state).ops.push(op);
    }
}

impl DisplayDriver for MockDisplay {
    fn width(&self) -> u32 {
        self.buffer.width()
    }

    fn height(&self) -> u32 {
        self.buffer.height()
    }

    fn fill(&mut self, level: u8) {
        self.record(DisplayOp::Fill(level));
        self.buffer.fill(level);
    }

    fn blit(&mut self, frame: &GrayFrame, x: i32, y: i32, key: Option<u8>) {
        self.record(DisplayOp::Blit { x, y, key });
        self.buffer.blit(frame, x, y, key);
    }

    fn show(&mut self) -> Result<(), HalError> {
        let mut state = lock(&self.state);
        if state.fail_show {
            return Err(HalError::Spi("mock panel refused transfer".into()));
        }
        state.ops.push(DisplayOp::Show);
        state.presented.push(self.buffer.clone());
        Ok(())
    }
}

impl PanelHandle {
    pub fn ops(&self) -> Vec<DisplayOp> {
        lock(&self.state).ops.clone()
    }

    pub fn presented(&self) -> Vec<GrayFrame> {
        lock(&self.state).presented.clone()
    }

    pub fn last_presented(&self) -> Option<GrayFrame> {
        lock(&self.state).presented.last().cloned()
    }

    pub fn fail_show(&self, fail: bool) {
        lock(&self.state).fail_show = fail;
    }
}

#[derive(Debug)]
struct StickState {
    reading: RawReading,
    reads: usize,
    disconnected: bool,
}

/// ADC that returns whatever the handle last set
#[derive(Debug)]
pub struct MockAdc {
    state: Arc<Mutex<StickState>>,
}

/// Control handle for a [`MockAdc`]
#[derive(Debug, Clone)]
pub struct StickHandle {
    state: Arc<Mutex<StickState>>,
}

impl MockAdc {
    pub fn new() -> (Self, StickHandle) {
        let state = Arc::new(Mutex::new(StickState {
            reading: RawReading::centered(),
            reads: 0,
            disconnected: false,
        }));
        (
            Self {
                state: state.clone(),
            },
            StickHandle { state },
        )
    }
}

impl JoystickAdc for MockAdc {
    fn read(&mut self) -> Result<RawReading, HalError> {
        let mut state = lock(&self.state);
        if state.disconnected {
            return Err(HalError::Disconnected("mock ADC unplugged".into()));
        }
        state.reads += 1;
        Ok(state.reading)
    }
}

impl StickHandle {
    pub fn set(&self, reading: RawReading) {
        lock(&self.state).reading = reading;
    }

    pub fn reads(&self) -> usize {
        lock(&self.state).reads
    }

    pub fn disconnect(&self, disconnected: bool) {
        lock(&self.state).disconnected = disconnected;
    }
}

/// Digital line whose level is set through a [`PinHandle`]
#[derive(Debug)]
pub struct MockPin {
    pin: u8,
    level: Arc<AtomicBool>,
}

#[derive(Debug, Clone)]
pub struct PinHandle {
    pin: u8,
    level: Arc<AtomicBool>,
}

impl MockPin {
    pub fn new(pin: u8, initial_high: bool) -> (Self, PinHandle) {
        let level = Arc::new(AtomicBool::new(initial_high));
        (
            Self {
                pin,
                level: level.clone(),
            },
            PinHandle { pin, level },
        )
    }
}

impl DigitalInput for MockPin {
    fn pin(&self) -> u8 {
        self.pin
    }

    fn is_high(&mut self) -> Result<bool, HalError> {
        Ok(self.level.load(Ordering::SeqCst))
    }
}

impl PinHandle {
    pub fn pin(&self) -> u8 {
        self.pin
    }

    pub fn set_high(&self, high: bool) {
        self.level.store(high, Ordering::SeqCst);
    }
}

/// Control handles for a full mock board
#[derive(Debug, Clone)]
pub struct MockBoard {
    pub panel: PanelHandle,
    pub stick: StickHandle,
    pub pins: HashMap<ButtonId, PinHandle>,
    active_low: bool,
}

impl MockBoard {
    /// Builds mock hardware wired the way `config` describes
    ///
    /// Buttons start released.
    pub fn new(config: &GamepadConfig) -> (Hardware, MockBoard) {
        let (display, panel) = MockDisplay::new(config.display.width, config.display.height);
        let (adc, stick) = MockAdc::new();
        let active_low = config.buttons.active_low;

        let mut buttons: Vec<(ButtonId, Box<dyn DigitalInput>)> = Vec::new();
        let mut pins = HashMap::new();
        for (id, pin) in config.buttons.wired() {
            let (input, handle) = MockPin::new(pin, active_low);
            buttons.push((id, Box::new(input)));
            pins.insert(id, handle);
        }

        let hardware = Hardware {
            display: Box::new(display),
            joystick: Box::new(adc),
            buttons,
        };
        (
            hardware,
            MockBoard {
                panel,
                stick,
                pins,
                active_low,
            },
        )
    }

    /// Drives the line of `button` to its pressed or released level
    pub fn press(&self, button: ButtonId, pressed: bool) {
        if let Some(pin) = self.pins.get(&button) {
            pin.set_high(pressed != self.active_low);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_records_call_order() {
        let (mut display, panel) = MockDisplay::new(4, 4);
        let frame = GrayFrame::new(4, 4);
        display.fill(0);
        display.blit(&frame, 0, 0, Some(0));
        display.show().unwrap();

        assert_eq!(
            panel.ops(),
            vec![
                DisplayOp::Fill(0),
                DisplayOp::Blit {
                    x: 0,
                    y: 0,
                    key: Some(0)
                },
                DisplayOp::Show
            ]
        );
        assert_eq!(panel.presented().len(), 1);
    }

    #[test]
    fn test_adc_reports_disconnect() {
        let (mut adc, stick) = MockAdc::new();
        stick.set(RawReading::new(1, 2));
        assert_eq!(adc.read().unwrap(), RawReading::new(1, 2));

        stick.disconnect(true);
        assert!(matches!(adc.read(), Err(HalError::Disconnected(_))));
        assert_eq!(stick.reads(), 1);
    }

    #[test]
    fn test_board_press_respects_polarity() {
        let config = GamepadConfig::default();
        let (mut hardware, board) = MockBoard::new(&config);
        let (_, pin) = hardware
            .buttons
            .iter_mut()
            .find(|(id, _)| *id == ButtonId::A)
            .unwrap();

        assert!(pin.is_high().unwrap());
        board.press(ButtonId::A, true);
        assert!(!pin.is_high().unwrap());
    }
}

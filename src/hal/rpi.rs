//! Raspberry Pi hardware backend
//!
//! - SSD1327 128x128 grayscale OLED on SPI, with data/command and reset lines
//! - ADS1115 four-channel ADC on I2C, one channel per stick axis
//! - buttons on GPIO inputs with the configured pull resistor
//!
//! Opening any of these off a Pi fails with a [`HalError`], which aborts
//! gamepad initialization.

use super::{DigitalInput, DisplayDriver, GrayFrame, HalError, Hardware, JoystickAdc};
use crate::config::{DisplayConfig, GamepadConfig, JoystickConfig, Pull};
use crate::input::{ButtonId, RawReading};
use rppal::gpio::{Gpio, InputPin, OutputPin};
use rppal::i2c::I2c;
use rppal::spi::{Bus, Mode, SlaveSelect, Spi};
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

// SSD1327 command set
const CMD_SET_COLUMN: u8 = 0x15;
const CMD_SET_ROW: u8 = 0x75;
const CMD_DISPLAY_OFF: u8 = 0xAE;
const CMD_DISPLAY_ON: u8 = 0xAF;

#[rustfmt::skip]
const SSD1327_INIT: &[u8] = &[
    CMD_DISPLAY_OFF,
    0xA0, 0x51, // remap: column and nibble order for a 128x128 panel
    0xA1, 0x00, // start line
    0xA2, 0x00, // display offset
    0xA4,       // normal display
    0xA8, 0x7F, // multiplex ratio 128
    0xAB, 0x01, // internal VDD regulator
    0xB1, 0xF1, // phase length
    0xB3, 0x00, // clock divider
    0xBC, 0x08, // pre-charge voltage
    0xBE, 0x07, // VCOMH
    0xB6, 0x0F, // second pre-charge
    0xD5, 0x62, // function selection B
    0x81, 0x7F, // contrast
    CMD_DISPLAY_ON,
];

/// Largest single spidev transfer
const SPI_CHUNK: usize = 4096;

pub struct Ssd1327 {
    spi: Spi,
    dc: OutputPin,
    reset: OutputPin,
    buffer: GrayFrame,
}

impl Ssd1327 {
    pub fn open(gpio: &Gpio, config: &DisplayConfig) -> Result<Self, HalError> {
        let bus = match config.spi_bus {
            0 => Bus::Spi0,
            1 => Bus::Spi1,
            other => return Err(HalError::Spi(format!("unsupported SPI bus {}", other))),
        };
        let slave = match config.slave_select {
            0 => SlaveSelect::Ss0,
            1 => SlaveSelect::Ss1,
            2 => SlaveSelect::Ss2,
            other => {
                return Err(HalError::Spi(format!(
                    "unsupported slave select {}",
                    other
                )))
            }
        };

        let spi = Spi::new(bus, slave, config.spi_clock_hz, Mode::Mode0)
            .map_err(|e| HalError::Spi(e.to_string()))?;
        let dc = output_pin(gpio, config.dc_pin)?;
        let reset = output_pin(gpio, config.reset_pin)?;

        let mut display = Self {
            spi,
            dc,
            reset,
            buffer: GrayFrame::new(config.width, config.height),
        };
        display.init()?;
        info!(
            "SSD1327 ready on SPI{} ({}x{})",
            config.spi_bus, config.width, config.height
        );
        Ok(display)
    }

    fn init(&mut self) -> Result<(), HalError> {
        self.reset.set_high();
        thread::sleep(Duration::from_millis(1));
        self.reset.set_low();
        thread::sleep(Duration::from_millis(10));
        self.reset.set_high();
        thread::sleep(Duration::from_millis(10));
        self.command(SSD1327_INIT)
    }

    fn command(&mut self, bytes: &[u8]) -> Result<(), HalError> {
        self.dc.set_low();
        self.write(bytes)
    }

    fn data(&mut self, bytes: &[u8]) -> Result<(), HalError> {
        self.dc.set_high();
        self.write(bytes)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), HalError> {
        for chunk in bytes.chunks(SPI_CHUNK) {
            self.spi
                .write(chunk)
                .map_err(|e| HalError::Spi(e.to_string()))?;
        }
        Ok(())
    }
}

impl DisplayDriver for Ssd1327 {
    fn width(&self) -> u32 {
        self.buffer.width()
    }

    fn height(&self) -> u32 {
        self.buffer.height()
    }

    fn fill(&mut self, level: u8) {
        self.buffer.fill(level);
    }

    fn blit(&mut self, frame: &GrayFrame, x: i32, y: i32, key: Option<u8>) {
        self.buffer.blit(frame, x, y, key);
    }

    fn show(&mut self) -> Result<(), HalError> {
        // Column addresses count byte pairs, i.e. two pixels each
        let last_col = (self.buffer.width().div_ceil(2)).saturating_sub(1) as u8;
        let last_row = self.buffer.height().saturating_sub(1) as u8;
        self.command(&[CMD_SET_COLUMN, 0, last_col, CMD_SET_ROW, 0, last_row])?;

        let frame = self.buffer.as_bytes().to_vec();
        self.data(&frame)
    }
}

// ADS1115 registers and config bits
const ADS_REG_CONVERSION: u8 = 0x00;
const ADS_REG_CONFIG: u8 = 0x01;
const ADS_OS_SINGLE: u16 = 0x8000;
const ADS_MUX_SINGLE_0: u16 = 0x4000;
const ADS_PGA_4_096V: u16 = 0x0200;
const ADS_MODE_SINGLE: u16 = 0x0100;
const ADS_DR_128SPS: u16 = 0x0080;
const ADS_COMP_DISABLE: u16 = 0x0003;
const ADS_READY_POLLS: usize = 20;
/// One conversion at 128 SPS
const ADS_CONVERSION_TIME: Duration = Duration::from_micros(7_900);
const ADS_RETRY_DELAY: Duration = Duration::from_millis(1);

pub struct Ads1115 {
    i2c: I2c,
    x_channel: u8,
    y_channel: u8,
    full_scale: u16,
}

impl Ads1115 {
    pub fn open(config: &JoystickConfig) -> Result<Self, HalError> {
        let mut i2c = I2c::with_bus(config.i2c_bus).map_err(|e| HalError::I2c(e.to_string()))?;
        i2c.set_slave_address(config.adc_address)
            .map_err(|e| HalError::I2c(e.to_string()))?;
        info!(
            "ADS1115 at 0x{:02x} on I2C{} (x=AIN{}, y=AIN{})",
            config.adc_address, config.i2c_bus, config.x_channel, config.y_channel
        );
        Ok(Self {
            i2c,
            x_channel: config.x_channel,
            y_channel: config.y_channel,
            full_scale: config.adc_full_scale.max(1),
        })
    }

    fn read_channel(&mut self, channel: u8) -> Result<u16, HalError> {
        let config = ADS_OS_SINGLE
            | (ADS_MUX_SINGLE_0 + ((channel as u16 & 0x03) << 12))
            | ADS_PGA_4_096V
            | ADS_MODE_SINGLE
            | ADS_DR_128SPS
            | ADS_COMP_DISABLE;
        let [hi, lo] = config.to_be_bytes();
        self.i2c
            .write(&[ADS_REG_CONFIG, hi, lo])
            .map_err(|e| HalError::I2c(e.to_string()))?;

        let mut buf = [0u8; 2];
        let mut ready = false;
        thread::sleep(ADS_CONVERSION_TIME);
        for attempt in 0..ADS_READY_POLLS {
            if attempt > 0 {
                thread::sleep(ADS_RETRY_DELAY);
            }
            self.i2c
                .write_read(&[ADS_REG_CONFIG], &mut buf)
                .map_err(|e| HalError::I2c(e.to_string()))?;
            if u16::from_be_bytes(buf) & ADS_OS_SINGLE != 0 {
                ready = true;
                break;
            }
        }
        if !ready {
            return Err(HalError::Disconnected(format!(
                "ADS1115 conversion on AIN{} never completed",
                channel
            )));
        }

        self.i2c
            .write_read(&[ADS_REG_CONVERSION], &mut buf)
            .map_err(|e| HalError::I2c(e.to_string()))?;
        let value = i16::from_be_bytes(buf).max(0) as u32;
        Ok(scale_count(value, self.full_scale))
    }
}

/// Maps `0..=full_scale` onto the 16-bit scale used by the classifier
fn scale_count(value: u32, full_scale: u16) -> u16 {
    let scaled = value * u16::MAX as u32 / full_scale as u32;
    scaled.min(u16::MAX as u32) as u16
}

impl JoystickAdc for Ads1115 {
    fn read(&mut self) -> Result<RawReading, HalError> {
        let x = self.read_channel(self.x_channel)?;
        let y = self.read_channel(self.y_channel)?;
        debug!("ADS1115 raw x={} y={}", x, y);
        Ok(RawReading::new(x, y))
    }
}

pub struct GpioButton {
    pin: InputPin,
}

impl GpioButton {
    pub fn open(gpio: &Gpio, pin: u8, pull: Pull) -> Result<Self, HalError> {
        let pin = gpio
            .get(pin)
            .map_err(|e| HalError::Gpio(e.to_string()))?;
        let pin = match pull {
            Pull::Up => pin.into_input_pullup(),
            Pull::Down => pin.into_input_pulldown(),
            Pull::None => pin.into_input(),
        };
        Ok(Self { pin })
    }
}

impl DigitalInput for GpioButton {
    fn pin(&self) -> u8 {
        self.pin.pin()
    }

    fn is_high(&mut self) -> Result<bool, HalError> {
        Ok(self.pin.is_high())
    }
}

fn output_pin(gpio: &Gpio, pin: u8) -> Result<OutputPin, HalError> {
    Ok(gpio
        .get(pin)
        .map_err(|e| HalError::Gpio(e.to_string()))?
        .into_output())
}

/// Opens every collaborator the configuration describes
pub fn open_board(config: &GamepadConfig) -> Result<Hardware, HalError> {
    let gpio = Gpio::new().map_err(|e| HalError::Gpio(e.to_string()))?;

    let display = Ssd1327::open(&gpio, &config.display)?;
    let joystick = Ads1115::open(&config.joystick)?;

    let mut buttons: Vec<(ButtonId, Box<dyn DigitalInput>)> = Vec::new();
    for (id, pin) in config.buttons.wired() {
        let input = GpioButton::open(&gpio, pin, config.buttons.pull)?;
        debug!("Button {} on GPIO{}", id, pin);
        buttons.push((id, Box::new(input)));
    }

    Ok(Hardware {
        display: Box::new(display),
        joystick: Box::new(joystick),
        buttons,
    })
}

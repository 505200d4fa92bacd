//! Device configuration
//!
//! Loaded from a TOML file. Every section has defaults matching the reference
//! board (128x128 panel, 1000 ms stick polling, 50 ms debounce), so a missing
//! or partial file still yields a usable configuration. Validation happens
//! here, before any hardware is touched.

use crate::cursor::CursorPosition;
use crate::input::classifier::DEFAULT_DEADZONE;
use crate::input::{
    AxisZone, ButtonId, JoystickFormat, VelocityTable, VelocityTables, XZone, YZone,
    ZoneClassifier,
};
use crate::mode::Mode;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

const APP_DIR: &str = "handheld-gamepad";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Velocity table for axis {axis} has no entry for zone {zone}")]
    MissingVelocity { axis: &'static str, zone: String },

    #[error("Unknown zone {zone} in velocity table for axis {axis}")]
    UnknownZone { axis: &'static str, zone: String },

    #[error("Cursor start ({x}, {y}) lies outside the {width}x{height} display")]
    CursorOutOfBounds {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    },

    #[error("Invalid display size {width}x{height}")]
    InvalidDisplay { width: u32, height: u32 },

    #[error("Splash is {width}x{height}, display is {display_width}x{display_height}")]
    SplashSize {
        width: u32,
        height: u32,
        display_width: u32,
        display_height: u32,
    },

    #[error("Splash image {path} has {actual} bytes, expected {expected}")]
    SplashBytes {
        path: PathBuf,
        expected: usize,
        actual: usize,
    },

    #[error("Pin {pin} is assigned to more than one button")]
    DuplicatePin { pin: u8 },

    #[error("No configuration directory available on this system")]
    NoConfigDir,
}

/// Internal pull resistor applied to button lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Pull {
    #[default]
    Up,
    Down,
    None,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct DisplayConfig {
    pub width: u32,
    pub height: u32,
    pub spi_bus: u8,
    pub slave_select: u8,
    pub spi_clock_hz: u32,
    pub dc_pin: u8,
    pub reset_pin: u8,
    /// Raw 4-bit splash image, `width * height / 2` bytes
    pub splash: Option<PathBuf>,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 128,
            height: 128,
            spi_bus: 0,
            slave_select: 0,
            spi_clock_hz: 8_000_000,
            dc_pin: 25,
            reset_pin: 24,
            splash: None,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct JoystickConfig {
    pub i2c_bus: u8,
    pub adc_address: u16,
    pub x_channel: u8,
    pub y_channel: u8,
    /// ADC count at full stick travel (3.3 V on the 4.096 V range)
    pub adc_full_scale: u16,
    pub polling_ms: u64,
    pub deadzone: u16,
    pub reverse_x: bool,
    pub reverse_y: bool,
    /// Format the poller emits
    pub report: JoystickFormat,
    /// Format the bundled binary registers its stick handler with
    ///
    /// The library never reads this; hosts pass their preference to
    /// `CallbackRegistry::with_joystick` directly.
    pub forward: JoystickFormat,
}

impl Default for JoystickConfig {
    fn default() -> Self {
        Self {
            i2c_bus: 1,
            adc_address: 0x48,
            x_channel: 0,
            y_channel: 1,
            adc_full_scale: 26_400,
            polling_ms: 1000,
            deadzone: DEFAULT_DEADZONE,
            reverse_x: false,
            reverse_y: false,
            report: JoystickFormat::Classified,
            forward: JoystickFormat::Classified,
        }
    }
}

impl JoystickConfig {
    pub fn classifier(&self) -> ZoneClassifier {
        ZoneClassifier::new(self.deadzone, self.reverse_x, self.reverse_y)
    }

    pub fn polling_interval(&self) -> Duration {
        Duration::from_millis(self.polling_ms.max(1))
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ButtonsConfig {
    pub debounce_ms: u64,
    /// Line sampling period of the debouncers
    pub sample_ms: u64,
    pub pull: Pull,
    /// Pressed reads as low (pull-up wiring)
    pub active_low: bool,
    pub a: Option<u8>,
    pub b: Option<u8>,
    pub joystick_click: Option<u8>,
    pub option: Option<u8>,
    pub left_shoulder: Option<u8>,
    pub right_shoulder: Option<u8>,
}

impl Default for ButtonsConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 50,
            sample_ms: 5,
            pull: Pull::Up,
            active_low: true,
            a: Some(5),
            b: Some(6),
            joystick_click: Some(13),
            option: Some(19),
            left_shoulder: None,
            right_shoulder: None,
        }
    }
}

impl ButtonsConfig {
    pub fn pin(&self, button: ButtonId) -> Option<u8> {
        match button {
            ButtonId::A => self.a,
            ButtonId::B => self.b,
            ButtonId::JoystickClick => self.joystick_click,
            ButtonId::Option => self.option,
            ButtonId::LeftShoulder => self.left_shoulder,
            ButtonId::RightShoulder => self.right_shoulder,
        }
    }

    /// Wired buttons and their pins, unwired ones omitted
    pub fn wired(&self) -> Vec<(ButtonId, u8)> {
        ButtonId::all()
            .iter()
            .filter_map(|id| self.pin(*id).map(|pin| (*id, pin)))
            .collect()
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn sample_period(&self) -> Duration {
        Duration::from_millis(self.sample_ms.max(1))
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Default)]
#[serde(default)]
pub struct CursorConfig {
    /// Defaults to the display center
    pub start_x: Option<i32>,
    pub start_y: Option<i32>,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Default)]
#[serde(default)]
pub struct ModeConfig {
    pub initial: Mode,
}

/// Per-axis velocity tables keyed by zone name (`left-min`, `down-max`, ...)
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct VelocityConfig {
    pub x: BTreeMap<String, i32>,
    pub y: BTreeMap<String, i32>,
}

impl Default for VelocityConfig {
    fn default() -> Self {
        Self {
            x: named(VelocityTable::<XZone>::default().to_map()),
            y: named(VelocityTable::<YZone>::default().to_map()),
        }
    }
}

impl VelocityConfig {
    fn table<Z>(entries: &BTreeMap<String, i32>) -> Result<VelocityTable<Z>, ConfigError>
    where
        Z: AxisZone + FromStr,
    {
        let mut map = BTreeMap::new();
        for (name, velocity) in entries {
            let zone = name.parse::<Z>().map_err(|_| ConfigError::UnknownZone {
                axis: Z::AXIS,
                zone: name.clone(),
            })?;
            map.insert(zone, *velocity);
        }
        VelocityTable::from_map(&map)
    }
}

fn named<Z: AxisZone>(map: BTreeMap<Z, i32>) -> BTreeMap<String, i32> {
    map.into_iter().map(|(z, v)| (z.to_string(), v)).collect()
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Default)]
#[serde(default)]
pub struct GamepadConfig {
    pub display: DisplayConfig,
    pub joystick: JoystickConfig,
    pub buttons: ButtonsConfig,
    pub cursor: CursorConfig,
    pub mode: ModeConfig,
    pub velocity: VelocityConfig,
}

impl GamepadConfig {
    /// `$XDG_CONFIG_HOME/handheld-gamepad/config.toml` or the platform equivalent
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
            .ok_or(ConfigError::NoConfigDir)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: GamepadConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        info!("Loading configuration from {}", path.display());
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Loads `path`, falling back to defaults when the file does not exist
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            warn!(
                "No configuration at {}, using defaults",
                path.display()
            );
            Ok(Self::default())
        }
    }

    /// Writes the default configuration to `path` unless a file already exists
    pub fn ensure_default(path: &Path) -> Result<(), ConfigError> {
        if path.exists() {
            debug!("Configuration already present at {}", path.display());
            return Ok(());
        }
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(path, Self::default().to_toml()?).map_err(io_err)?;
        info!("Wrote default configuration to {}", path.display());
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let (width, height) = (self.display.width, self.display.height);
        if width == 0 || height == 0 {
            return Err(ConfigError::InvalidDisplay { width, height });
        }

        self.velocity_tables()?;

        let start = self.cursor_start();
        if start.x < 0 || start.y < 0 || start.x >= width as i32 || start.y >= height as i32 {
            return Err(ConfigError::CursorOutOfBounds {
                x: start.x,
                y: start.y,
                width,
                height,
            });
        }

        let mut seen: HashMap<u8, ButtonId> = HashMap::new();
        for (id, pin) in self.buttons.wired() {
            if seen.insert(pin, id).is_some() {
                return Err(ConfigError::DuplicatePin { pin });
            }
        }
        Ok(())
    }

    pub fn velocity_tables(&self) -> Result<VelocityTables, ConfigError> {
        Ok(VelocityTables::new(
            VelocityConfig::table::<XZone>(&self.velocity.x)?,
            VelocityConfig::table::<YZone>(&self.velocity.y)?,
        ))
    }

    pub fn cursor_start(&self) -> CursorPosition {
        CursorPosition::new(
            self.cursor
                .start_x
                .unwrap_or(self.display.width as i32 / 2),
            self.cursor
                .start_y
                .unwrap_or(self.display.height as i32 / 2),
        )
    }
}

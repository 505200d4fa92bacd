//! Joystick zone types
//!
//! A zone is the discretized deflection bucket of one stick axis. The joystick
//! collaborator produces zones from raw ADC counts; everything downstream of it
//! (velocity lookup, cursor integration, external forwarding) works on these
//! symbolic values.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Common surface of the two per-axis zone enums
///
/// Every axis has exactly seven zones, so a velocity table can be stored as a
/// fixed array indexed by [`AxisZone::index`].
pub trait AxisZone:
    Copy + Ord + std::hash::Hash + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    /// Every zone of the axis, in index order
    const ALL: [Self; 7];

    /// Human readable axis name, used in configuration errors
    const AXIS: &'static str;

    fn index(self) -> usize;

    fn is_centered(self) -> bool {
        self.index() == 0
    }
}

/// Horizontal deflection bucket
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum XZone {
    #[default]
    Centered,
    LeftMin,
    LeftMid,
    LeftMax,
    RightMin,
    RightMid,
    RightMax,
}

impl AxisZone for XZone {
    const ALL: [Self; 7] = [
        XZone::Centered,
        XZone::LeftMin,
        XZone::LeftMid,
        XZone::LeftMax,
        XZone::RightMin,
        XZone::RightMid,
        XZone::RightMax,
    ];

    const AXIS: &'static str = "x";

    fn index(self) -> usize {
        self as usize
    }
}

/// Vertical deflection bucket
///
/// Named after the physical stick direction. Pixel rows grow downwards, so
/// `Up*` zones move the cursor towards row 0.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum YZone {
    #[default]
    Centered,
    UpMin,
    UpMid,
    UpMax,
    DownMin,
    DownMid,
    DownMax,
}

impl AxisZone for YZone {
    const ALL: [Self; 7] = [
        YZone::Centered,
        YZone::UpMin,
        YZone::UpMid,
        YZone::UpMax,
        YZone::DownMin,
        YZone::DownMid,
        YZone::DownMax,
    ];

    const AXIS: &'static str = "y";

    fn index(self) -> usize {
        self as usize
    }
}

/// Deflection strength shared by both axes, used by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deflection {
    Min,
    Mid,
    Max,
}

impl XZone {
    pub fn from_deflection(negative: bool, deflection: Deflection) -> Self {
        match (negative, deflection) {
            (true, Deflection::Min) => XZone::LeftMin,
            (true, Deflection::Mid) => XZone::LeftMid,
            (true, Deflection::Max) => XZone::LeftMax,
            (false, Deflection::Min) => XZone::RightMin,
            (false, Deflection::Mid) => XZone::RightMid,
            (false, Deflection::Max) => XZone::RightMax,
        }
    }
}

impl YZone {
    pub fn from_deflection(negative: bool, deflection: Deflection) -> Self {
        match (negative, deflection) {
            (true, Deflection::Min) => YZone::UpMin,
            (true, Deflection::Mid) => YZone::UpMid,
            (true, Deflection::Max) => YZone::UpMax,
            (false, Deflection::Min) => YZone::DownMin,
            (false, Deflection::Mid) => YZone::DownMid,
            (false, Deflection::Max) => YZone::DownMax,
        }
    }
}

impl fmt::Display for XZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            XZone::Centered => "centered",
            XZone::LeftMin => "left-min",
            XZone::LeftMid => "left-mid",
            XZone::LeftMax => "left-max",
            XZone::RightMin => "right-min",
            XZone::RightMid => "right-mid",
            XZone::RightMax => "right-max",
        };
        f.write_str(name)
    }
}

impl fmt::Display for YZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            YZone::Centered => "centered",
            YZone::UpMin => "up-min",
            YZone::UpMid => "up-mid",
            YZone::UpMax => "up-max",
            YZone::DownMin => "down-min",
            YZone::DownMid => "down-mid",
            YZone::DownMax => "down-max",
        };
        f.write_str(name)
    }
}

/// Zone name that matches no zone of the axis
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown zone: {0}")]
pub struct UnknownZone(pub String);

impl FromStr for XZone {
    type Err = UnknownZone;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        XZone::ALL
            .into_iter()
            .find(|z| z.to_string() == s)
            .ok_or_else(|| UnknownZone(s.to_string()))
    }
}

impl FromStr for YZone {
    type Err = UnknownZone;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        YZone::ALL
            .into_iter()
            .find(|z| z.to_string() == s)
            .ok_or_else(|| UnknownZone(s.to_string()))
    }
}

/// Simultaneous horizontal and vertical zones at one sampling instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct JoystickSample {
    pub x: XZone,
    pub y: YZone,
}

impl JoystickSample {
    pub const CENTERED: JoystickSample = JoystickSample {
        x: XZone::Centered,
        y: YZone::Centered,
    };

    pub fn new(x: XZone, y: YZone) -> Self {
        Self { x, y }
    }

    pub fn is_centered(&self) -> bool {
        self.x.is_centered() && self.y.is_centered()
    }
}

/// Raw two-axis ADC reading on a 16-bit scale
///
/// Mid-scale (`0x8000`) is the resting stick position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawReading {
    pub x: u16,
    pub y: u16,
}

impl RawReading {
    pub const MID_SCALE: u16 = 0x8000;

    pub fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }

    pub fn centered() -> Self {
        Self::new(Self::MID_SCALE, Self::MID_SCALE)
    }
}

impl Default for RawReading {
    fn default() -> Self {
        Self::centered()
    }
}

/// A joystick value as delivered by the joystick collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoystickValue {
    Raw(RawReading),
    Classified(JoystickSample),
}

impl JoystickValue {
    pub fn is_raw(&self) -> bool {
        matches!(self, JoystickValue::Raw(_))
    }
}

/// Format in which the host wants joystick values forwarded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JoystickFormat {
    Raw,
    #[default]
    Classified,
}

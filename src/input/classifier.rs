//! Raw ADC counts to joystick zones
//!
//! Each axis is measured as an offset from mid-scale. Offsets inside the
//! deadzone are centered; the remaining travel is split into three equal bands
//! (min, mid, max). Low counts are left/up unless the axis is reversed.

use crate::input::zone::{Deflection, JoystickSample, RawReading, XZone, YZone};
use serde::{Deserialize, Serialize};

/// Reference deadzone around mid-scale
pub const DEFAULT_DEADZONE: u16 = 0x2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneClassifier {
    pub deadzone: u16,
    pub reverse_x: bool,
    pub reverse_y: bool,
}

impl Default for ZoneClassifier {
    fn default() -> Self {
        Self {
            deadzone: DEFAULT_DEADZONE,
            reverse_x: false,
            reverse_y: false,
        }
    }
}

impl ZoneClassifier {
    pub fn new(deadzone: u16, reverse_x: bool, reverse_y: bool) -> Self {
        Self {
            deadzone,
            reverse_x,
            reverse_y,
        }
    }

    pub fn classify(&self, raw: RawReading) -> JoystickSample {
        let x = match self.deflection(raw.x, self.reverse_x) {
            None => XZone::Centered,
            Some((negative, d)) => XZone::from_deflection(negative, d),
        };
        let y = match self.deflection(raw.y, self.reverse_y) {
            None => YZone::Centered,
            Some((negative, d)) => YZone::from_deflection(negative, d),
        };
        JoystickSample { x, y }
    }

    /// Returns `(towards_low_end, band)` or `None` inside the deadzone
    fn deflection(&self, count: u16, reversed: bool) -> Option<(bool, Deflection)> {
        let mid = RawReading::MID_SCALE as i32;
        let mut offset = count as i32 - mid;
        if reversed {
            offset = -offset;
        }

        let magnitude = offset.abs();
        let deadzone = self.deadzone as i32;
        if magnitude < deadzone {
            return None;
        }

        // Travel outside the deadzone, split in thirds
        let span = (mid - deadzone).max(1);
        let band = ((magnitude - deadzone) * 3) / span;
        let deflection = match band {
            0 => Deflection::Min,
            1 => Deflection::Mid,
            _ => Deflection::Max,
        };
        Some((offset < 0, deflection))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rest_position_is_centered() {
        let classifier = ZoneClassifier::default();
        assert_eq!(
            classifier.classify(RawReading::centered()),
            JoystickSample::CENTERED
        );
    }

    #[test]
    fn test_deadzone_edges() {
        let classifier = ZoneClassifier::default();
        let just_inside = RawReading::MID_SCALE + DEFAULT_DEADZONE - 1;
        let at_edge = RawReading::MID_SCALE + DEFAULT_DEADZONE;

        assert_eq!(
            classifier.classify(RawReading::new(just_inside, RawReading::MID_SCALE)).x,
            XZone::Centered
        );
        assert_eq!(
            classifier.classify(RawReading::new(at_edge, RawReading::MID_SCALE)).x,
            XZone::RightMin
        );
    }

    #[test]
    fn test_full_travel_is_max() {
        let classifier = ZoneClassifier::default();
        let sample = classifier.classify(RawReading::new(0, u16::MAX));
        assert_eq!(sample.x, XZone::LeftMax);
        assert_eq!(sample.y, YZone::DownMax);
    }

    #[test]
    fn test_bands_are_ordered() {
        let classifier = ZoneClassifier::default();
        let mid = RawReading::MID_SCALE;
        // deadzone 0x2000, span 0x6000, bands of 0x2000
        let min = classifier.classify(RawReading::new(mid, mid - 0x2000 - 0x1000));
        let midz = classifier.classify(RawReading::new(mid, mid - 0x4000 - 0x1000));
        let max = classifier.classify(RawReading::new(mid, mid - 0x6000 - 0x1000));
        assert_eq!(min.y, YZone::UpMin);
        assert_eq!(midz.y, YZone::UpMid);
        assert_eq!(max.y, YZone::UpMax);
    }

    #[test]
    fn test_reversal_flips_direction() {
        let classifier = ZoneClassifier::new(DEFAULT_DEADZONE, true, true);
        let sample = classifier.classify(RawReading::new(0, 0));
        assert_eq!(sample.x, XZone::RightMax);
        assert_eq!(sample.y, YZone::DownMax);
    }
}

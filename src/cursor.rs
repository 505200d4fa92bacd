//! Cursor integrator
//!
//! Owns the menu cursor position and advances it by the velocity of each
//! joystick sample. The position is published through a watch channel: the
//! router commits updates, the render path subscribes and reads.

use crate::config::ConfigError;
use crate::input::{JoystickSample, VelocityTables};
use tokio::sync::watch;
use tracing::{debug, info};

/// Cursor position in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CursorPosition {
    pub x: i32,
    pub y: i32,
}

impl CursorPosition {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug)]
pub struct CursorIntegrator {
    tables: VelocityTables,
    width: i32,
    height: i32,
    position: watch::Sender<CursorPosition>,
}

impl CursorIntegrator {
    /// Creates the integrator at `start`
    ///
    /// The start must already lie inside a non-empty `width` x `height` area.
    pub fn new(
        tables: VelocityTables,
        width: u32,
        height: u32,
        start: CursorPosition,
    ) -> Result<Self, ConfigError> {
        if width == 0 || height == 0 {
            return Err(ConfigError::InvalidDisplay { width, height });
        }
        let (width, height) = (width as i32, height as i32);
        if !(0..width).contains(&start.x) || !(0..height).contains(&start.y) {
            return Err(ConfigError::CursorOutOfBounds {
                x: start.x,
                y: start.y,
                width: width as u32,
                height: height as u32,
            });
        }

        info!(
            "Cursor integrator ready at ({}, {}) on {}x{}",
            start.x, start.y, width, height
        );
        let (position, _) = watch::channel(start);
        Ok(Self {
            tables,
            width,
            height,
            position,
        })
    }

    /// Advances the cursor by one sample and returns the committed position
    pub fn apply(&self, sample: JoystickSample) -> CursorPosition {
        let (vx, vy) = self.tables.velocity(sample);
        let (width, height) = (self.width, self.height);

        // Both axes are committed in one update so readers never see half a move
        self.position.send_if_modified(|pos| {
            let next = CursorPosition {
                x: pos.x.saturating_add(vx).clamp(0, width - 1),
                y: pos.y.saturating_add(vy).clamp(0, height - 1),
            };
            let changed = next != *pos;
            *pos = next;
            changed
        });

        let pos = self.position();
        debug!(
            "Cursor ({}, {}) after sample {}/{} (v={},{})",
            pos.x, pos.y, sample.x, sample.y, vx, vy
        );
        pos
    }

    /// Explicit re-initialization, clamped to the display
    pub fn reset(&self, start: CursorPosition) -> CursorPosition {
        let clamped = CursorPosition {
            x: start.x.clamp(0, self.width - 1),
            y: start.y.clamp(0, self.height - 1),
        };
        self.position.send_replace(clamped);
        info!("Cursor reset to ({}, {})", clamped.x, clamped.y);
        clamped
    }

    pub fn position(&self) -> CursorPosition {
        *self.position.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<CursorPosition> {
        self.position.subscribe()
    }

    pub fn bounds(&self) -> (u32, u32) {
        (self.width as u32, self.height as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{AxisZone, XZone, YZone};

    fn integrator_at(x: i32, y: i32) -> CursorIntegrator {
        CursorIntegrator::new(
            VelocityTables::default(),
            128,
            128,
            CursorPosition::new(x, y),
        )
        .unwrap()
    }

    #[test]
    fn test_right_max_moves_six_pixels() {
        let cursor = integrator_at(64, 64);
        let pos = cursor.apply(JoystickSample::new(XZone::RightMax, YZone::Centered));
        assert_eq!(pos, CursorPosition::new(70, 64));
    }

    #[test]
    fn test_down_min_moves_one_row_down() {
        let cursor = integrator_at(64, 64);
        let pos = cursor.apply(JoystickSample::new(XZone::Centered, YZone::DownMin));
        assert_eq!(pos, CursorPosition::new(64, 65));
    }

    #[test]
    fn test_clamps_at_left_edge() {
        let cursor = integrator_at(0, 10);
        let pos = cursor.apply(JoystickSample::new(XZone::LeftMin, YZone::Centered));
        assert_eq!(pos, CursorPosition::new(0, 10));
    }

    #[test]
    fn test_clamps_at_bottom_right_corner() {
        let cursor = integrator_at(125, 126);
        let pos = cursor.apply(JoystickSample::new(XZone::RightMax, YZone::DownMax));
        assert_eq!(pos, CursorPosition::new(127, 127));
    }

    #[test]
    fn test_centered_sample_is_idempotent() {
        let cursor = integrator_at(17, 99);
        for _ in 0..10 {
            cursor.apply(JoystickSample::CENTERED);
        }
        assert_eq!(cursor.position(), CursorPosition::new(17, 99));
    }

    #[test]
    fn test_stays_in_bounds_for_any_sequence() {
        let cursor = integrator_at(64, 64);
        // Walk every zone combination repeatedly in a fixed, uneven order
        for round in 0..40 {
            for (i, x) in XZone::ALL.iter().enumerate() {
                let y = YZone::ALL[(i + round) % YZone::ALL.len()];
                let pos = cursor.apply(JoystickSample::new(*x, y));
                assert!((0..128).contains(&pos.x), "x out of bounds: {:?}", pos);
                assert!((0..128).contains(&pos.y), "y out of bounds: {:?}", pos);
            }
        }
    }

    #[test]
    fn test_extreme_velocities_saturate_at_edges() {
        let mut config = crate::config::GamepadConfig::default();
        config.velocity.x.insert("right-max".into(), i32::MAX);
        config.velocity.y.insert("up-max".into(), i32::MIN);
        config.validate().unwrap();

        let cursor = CursorIntegrator::new(
            config.velocity_tables().unwrap(),
            128,
            128,
            CursorPosition::new(64, 64),
        )
        .unwrap();
        let pos = cursor.apply(JoystickSample::new(XZone::RightMax, YZone::UpMax));
        assert_eq!(pos, CursorPosition::new(127, 0));

        // Already at the edge: a second huge step must not wrap
        let pos = cursor.apply(JoystickSample::new(XZone::RightMax, YZone::UpMax));
        assert_eq!(pos, CursorPosition::new(127, 0));
    }

    #[test]
    fn test_rejects_start_outside_display() {
        let result = CursorIntegrator::new(
            VelocityTables::default(),
            128,
            128,
            CursorPosition::new(128, 0),
        );
        assert!(matches!(
            result,
            Err(ConfigError::CursorOutOfBounds { x: 128, .. })
        ));
    }

    #[test]
    fn test_subscriber_sees_committed_position() {
        let cursor = integrator_at(64, 64);
        let mut rx = cursor.subscribe();
        cursor.apply(JoystickSample::new(XZone::LeftMid, YZone::UpMid));
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), CursorPosition::new(61, 61));
    }

    #[test]
    fn test_reset_clamps() {
        let cursor = integrator_at(64, 64);
        assert_eq!(
            cursor.reset(CursorPosition::new(-5, 500)),
            CursorPosition::new(0, 127)
        );
    }
}

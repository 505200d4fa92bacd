//! Zone to cursor velocity lookup
//!
//! One table per axis, each a total mapping from the seven zones of that axis
//! to a signed pixel step per sample interval. Totality is checked once when a
//! table is built from configuration, so a lookup at event time cannot miss.

use crate::config::ConfigError;
use crate::input::zone::{AxisZone, JoystickSample, XZone, YZone};
use std::collections::BTreeMap;
use std::marker::PhantomData;

/// Step sizes of the reference tables, in pixels per sample
pub const STEP_MIN: i32 = 1;
pub const STEP_MID: i32 = 3;
pub const STEP_MAX: i32 = 6;

/// Total velocity mapping for one axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VelocityTable<Z: AxisZone> {
    values: [i32; 7],
    _axis: PhantomData<Z>,
}

impl<Z: AxisZone> VelocityTable<Z> {
    /// Builds a table from a possibly partial map
    ///
    /// Fails with [`ConfigError::MissingVelocity`] naming the first zone that
    /// has no entry.
    pub fn from_map(map: &BTreeMap<Z, i32>) -> Result<Self, ConfigError> {
        let mut values = [0; 7];
        for zone in Z::ALL {
            match map.get(&zone) {
                Some(v) => values[zone.index()] = *v,
                None => {
                    return Err(ConfigError::MissingVelocity {
                        axis: Z::AXIS,
                        zone: zone.to_string(),
                    })
                }
            }
        }
        Ok(Self {
            values,
            _axis: PhantomData,
        })
    }

    pub fn velocity(&self, zone: Z) -> i32 {
        self.values[zone.index()]
    }

    pub fn to_map(&self) -> BTreeMap<Z, i32> {
        Z::ALL.iter().map(|z| (*z, self.velocity(*z))).collect()
    }

    fn from_values(values: [i32; 7]) -> Self {
        Self {
            values,
            _axis: PhantomData,
        }
    }
}

impl Default for VelocityTable<XZone> {
    fn default() -> Self {
        // Index order: centered, left min/mid/max, right min/mid/max
        Self::from_values([0, -STEP_MIN, -STEP_MID, -STEP_MAX, STEP_MIN, STEP_MID, STEP_MAX])
    }
}

impl Default for VelocityTable<YZone> {
    fn default() -> Self {
        // Rows grow downwards: up is negative, down is positive
        Self::from_values([0, -STEP_MIN, -STEP_MID, -STEP_MAX, STEP_MIN, STEP_MID, STEP_MAX])
    }
}

/// The pair of per-axis tables used by the cursor integrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VelocityTables {
    pub x: VelocityTable<XZone>,
    pub y: VelocityTable<YZone>,
}

impl VelocityTables {
    pub fn new(x: VelocityTable<XZone>, y: VelocityTable<YZone>) -> Self {
        Self { x, y }
    }

    /// Velocity `(vx, vy)` for a sample, both axes looked up independently
    pub fn velocity(&self, sample: JoystickSample) -> (i32, i32) {
        (self.x.velocity(sample.x), self.y.velocity(sample.y))
    }
}

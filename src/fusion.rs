//! Distance fusion: two sensor readings into one proximity feedback value
//!
//! Feedback is a linear closeness scale: 0.0 at or beyond the active
//! ceiling, 1000.0 at contact distance. The ceiling depends on the range
//! class: the short class stays silent about anything beyond arm's-reach
//! surroundings, the long class also reports distant obstacles in open
//! spaces.

use crate::config::FusionConfig;
use crate::core::types::{OperatingMode, RangeClass, SensorSelect};

/// Upper bound of the feedback scale
pub const FEEDBACK_MAX: f64 = 1000.0;

/// Fusion policy holding the two range-class ceilings
#[derive(Debug, Clone)]
pub struct Fusion {
    /// Ceiling for the short range class (mm)
    pub near_ceiling_mm: u16,
    /// Ceiling for the long range class (mm)
    pub far_ceiling_mm: u16,
}

impl Fusion {
    /// Create from config
    pub fn from_config(config: &FusionConfig) -> Self {
        Self {
            near_ceiling_mm: config.near_ceiling_mm,
            far_ceiling_mm: config.far_ceiling_mm,
        }
    }

    /// Ceiling for the mode's range class
    pub fn ceiling_mm(&self, mode: OperatingMode) -> u16 {
        match mode.range {
            RangeClass::Near => self.near_ceiling_mm,
            RangeClass::Far => self.far_ceiling_mm,
        }
    }

    /// Fuse the two distance readings into a feedback value
    ///
    /// Both readings are clipped to the active ceiling before selection, so
    /// a sensor reporting its fail-safe "no obstacle" distance contributes
    /// exactly zero feedback. The selector picks which sensor (or the nearer
    /// of both) drives the output.
    pub fn feedback(&self, ultrasonic_mm: u16, lidar_mm: u16, mode: OperatingMode) -> f64 {
        let ceiling = self.ceiling_mm(mode);
        let ultrasonic = ultrasonic_mm.min(ceiling);
        let lidar = lidar_mm.min(ceiling);

        let selected = match mode.select {
            SensorSelect::Both => ultrasonic.min(lidar),
            SensorSelect::LidarOnly => lidar,
            SensorSelect::UltrasonicOnly => ultrasonic,
        };

        f64::from(selected) * (-FEEDBACK_MAX / f64::from(ceiling)) + FEEDBACK_MAX
    }
}

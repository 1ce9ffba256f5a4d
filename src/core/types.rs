//! Shared data model for the control loop
//!
//! These types flow between the sensor pollers, the fusion/stage policies
//! and the orchestrator. They are deliberately small and `Copy` where
//! possible: everything here is overwrite-in-place shared state, not
//! queued messages.

/// Distance reported before the first real measurement arrives, and by the
/// fail-safe paths that map an untrustworthy reading to "no obstacle".
pub const NO_OBSTACLE_MM: u16 = 9999;

/// Transport-level fault classes a sensor driver can report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// Bus or serial read/write failure
    Io,
    /// No valid frame within the read deadline
    Timeout,
}

/// One distance measurement as published by a sensor poller
///
/// All transport errors are absorbed at the driver boundary: a failed poll
/// produces `valid: false` with a fault, never a crash. `value_mm` is always
/// within the producing sensor's documented range (or the reserved 0 /
/// max-range values described by the driver rules).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DistanceSample {
    /// Distance in millimeters
    pub value_mm: u16,
    /// False when this poll failed at the transport level
    pub valid: bool,
    /// Fault class for invalid samples
    pub fault: Option<FaultKind>,
    /// Raw signal strength, for sensors that report one
    pub strength: Option<u16>,
}

impl DistanceSample {
    /// Valid measurement
    pub fn valid(value_mm: u16) -> Self {
        Self {
            value_mm,
            valid: true,
            fault: None,
            strength: None,
        }
    }

    /// Valid measurement with a signal-strength word
    pub fn with_strength(value_mm: u16, strength: u16) -> Self {
        Self {
            value_mm,
            valid: true,
            fault: None,
            strength: Some(strength),
        }
    }

    /// Failed poll; the distance holds the fail-safe "no obstacle" value so
    /// fusion keeps producing quiet feedback until escalation happens
    pub fn faulted(fault: FaultKind) -> Self {
        Self {
            value_mm: NO_OBSTACLE_MM,
            valid: false,
            fault: Some(fault),
            strength: None,
        }
    }

    /// Startup value of a sample cell: far away, nothing to report
    pub fn no_obstacle() -> Self {
        Self::valid(NO_OBSTACLE_MM)
    }
}

/// Distance ceiling class selected by the range button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeClass {
    /// Short ceiling, indoor use
    Near,
    /// Long ceiling, open spaces
    Far,
}

impl RangeClass {
    /// Flip between the two ceilings
    pub fn toggled(self) -> Self {
        match self {
            RangeClass::Near => RangeClass::Far,
            RangeClass::Far => RangeClass::Near,
        }
    }
}

/// Which sensors feed the fused distance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorSelect {
    /// Lidar reading only
    LidarOnly,
    /// Nearer of the two readings
    Both,
    /// Ultrasonic reading only
    UltrasonicOnly,
}

impl SensorSelect {
    /// Map a switch state (0..=2) to a selector
    pub fn from_switch(state: u8) -> Self {
        match state {
            0 => SensorSelect::LidarOnly,
            2 => SensorSelect::UltrasonicOnly,
            _ => SensorSelect::Both,
        }
    }
}

/// Operating mode mutated by the input layer, read every cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatingMode {
    /// Mute flag: forces stage 0 and holds the actuators in standby
    pub mute: bool,
    /// Distance ceiling class
    pub range: RangeClass,
    /// Active sensor selector, driven by the switch
    pub select: SensorSelect,
}

impl Default for OperatingMode {
    fn default() -> Self {
        Self {
            mute: false,
            range: RangeClass::Near,
            select: SensorSelect::Both,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_faulted_sample_reads_far() {
        let s = DistanceSample::faulted(FaultKind::Timeout);
        assert!(!s.valid);
        assert_eq!(s.value_mm, NO_OBSTACLE_MM);
        assert_eq!(s.fault, Some(FaultKind::Timeout));
    }

    #[test]
    fn test_selector_from_switch() {
        assert_eq!(SensorSelect::from_switch(0), SensorSelect::LidarOnly);
        assert_eq!(SensorSelect::from_switch(1), SensorSelect::Both);
        assert_eq!(SensorSelect::from_switch(2), SensorSelect::UltrasonicOnly);
    }

    #[test]
    fn test_default_mode() {
        let mode = OperatingMode::default();
        assert!(!mode.mute);
        assert_eq!(mode.range, RangeClass::Near);
        assert_eq!(mode.select, SensorSelect::Both);
    }
}

//! DistanceSensor trait definition

use crate::core::types::DistanceSample;

/// Distance sensor driver trait
///
/// One implementation per sensor type. `poll` performs a complete
/// measurement transaction and never fails at the call boundary: transport
/// errors are converted into invalid samples so the orchestrator can detect
/// and escalate them without tearing down other subsystems uncontrolled.
pub trait DistanceSensor: Send {
    /// Sensor name used for logging and the measurement protocol
    fn name(&self) -> &'static str;

    /// Perform one measurement
    fn poll(&mut self) -> DistanceSample;
}

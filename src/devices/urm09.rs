//! URM09 ultrasonic ranging sensor (I2C, passive trigger)
//!
//! Configured once for passive measurement at the 300 cm range setting.
//! Each poll strobes the command register and reads the two-byte distance
//! result, high byte first, in cm.

use crate::core::driver::DistanceSensor;
use crate::core::types::{DistanceSample, FaultKind};
use crate::error::Result;
use crate::transport::SharedBus;

/// Factory-default device address
pub const DEFAULT_ADDR: u8 = 0x11;
/// Lower bound of the rated measuring range (mm)
pub const DISTANCE_MIN_MM: u16 = 20;
/// Upper bound of the rated measuring range (mm)
pub const DISTANCE_MAX_MM: u16 = 5000;

/// Distance result, high byte first
const REG_DISTANCE: u8 = 0x03;
/// Measurement configuration register
const REG_CONFIG: u8 = 0x07;
/// Command register, strobed per measurement
const REG_COMMAND: u8 = 0x08;

/// Passive trigger mode, 300 cm range setting
const CONFIG_PASSIVE_300CM: u8 = 0x10;
/// Start one measurement
const CMD_MEASURE: u8 = 0x01;

/// Decode the distance result, applying the rated-range rules
///
/// Readings above the rated maximum clamp to it; readings below the rated
/// minimum are unreliable and report as maximum range.
pub fn decode_distance(result: [u8; 2]) -> u16 {
    let raw_cm = u16::from_be_bytes(result);
    let distance = raw_cm.saturating_mul(10).min(DISTANCE_MAX_MM);
    if distance < DISTANCE_MIN_MM {
        return DISTANCE_MAX_MM;
    }
    distance
}

/// URM09 driver over the shared register bus
pub struct Urm09 {
    bus: SharedBus,
    addr: u8,
}

impl Urm09 {
    /// Create the driver and configure passive measurement
    pub fn new(bus: SharedBus, addr: u8) -> Result<Self> {
        {
            let mut port = bus.lock();
            port.write_reg(addr, REG_CONFIG, CONFIG_PASSIVE_300CM)?;
        }
        log::info!("URM09 at {:#04x}: passive mode set", addr);

        Ok(Urm09 { bus, addr })
    }

    fn measure(&mut self) -> Result<[u8; 2]> {
        let mut result = [0u8; 2];
        let mut port = self.bus.lock();
        port.write_reg(self.addr, REG_COMMAND, CMD_MEASURE)?;
        port.read_block(self.addr, REG_DISTANCE, &mut result)?;
        Ok(result)
    }
}

impl DistanceSensor for Urm09 {
    fn name(&self) -> &'static str {
        "URM09"
    }

    fn poll(&mut self) -> DistanceSample {
        match self.measure() {
            Ok(result) => DistanceSample::valid(decode_distance(result)),
            Err(e) => {
                log::warn!("URM09: poll failed: {}", e);
                DistanceSample::faulted(FaultKind::Io)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::{BusOp, MockRegisterBus};
    use crate::transport::shared_bus;

    #[test]
    fn test_decode_distance() {
        // 0x012C = 300 cm
        assert_eq!(decode_distance([0x01, 0x2C]), 3000);
        assert_eq!(decode_distance([0x00, 0x64]), 1000);
    }

    #[test]
    fn test_decode_range_rules() {
        // above max clamps
        assert_eq!(decode_distance([0x02, 0x58]), DISTANCE_MAX_MM);
        // below min reads far
        assert_eq!(decode_distance([0x00, 0x01]), DISTANCE_MAX_MM);
        // zero reads far
        assert_eq!(decode_distance([0x00, 0x00]), DISTANCE_MAX_MM);
        // exactly min passes through
        assert_eq!(decode_distance([0x00, 0x02]), DISTANCE_MIN_MM);
    }

    #[test]
    fn test_new_configures_passive_mode() {
        let mock = MockRegisterBus::new();
        let bus = shared_bus(Box::new(mock.clone()));
        let _sensor = Urm09::new(bus, DEFAULT_ADDR).unwrap();

        assert_eq!(
            mock.ops(),
            vec![BusOp::WriteReg {
                addr: DEFAULT_ADDR,
                reg: REG_CONFIG,
                value: CONFIG_PASSIVE_300CM,
            }]
        );
    }

    #[test]
    fn test_poll_strobes_then_reads() {
        let mock = MockRegisterBus::new();
        let bus = shared_bus(Box::new(mock.clone()));
        mock.set_block(DEFAULT_ADDR, REG_DISTANCE, &[0x00, 0x96]);

        let mut sensor = Urm09::new(bus, DEFAULT_ADDR).unwrap();
        mock.clear_ops();

        let sample = sensor.poll();
        assert!(sample.valid);
        assert_eq!(sample.value_mm, 1500);
        assert_eq!(sample.strength, None);
        assert_eq!(
            mock.ops(),
            vec![
                BusOp::WriteReg {
                    addr: DEFAULT_ADDR,
                    reg: REG_COMMAND,
                    value: CMD_MEASURE,
                },
                BusOp::ReadBlock {
                    addr: DEFAULT_ADDR,
                    reg: REG_DISTANCE,
                    len: 2,
                },
            ]
        );
    }

    #[test]
    fn test_poll_absorbs_bus_failure() {
        let mock = MockRegisterBus::new();
        let bus = shared_bus(Box::new(mock.clone()));
        let mut sensor = Urm09::new(bus, DEFAULT_ADDR).unwrap();

        mock.set_fail_io(true);
        let sample = sensor.poll();
        assert!(!sample.valid);
        assert_eq!(sample.fault, Some(FaultKind::Io));
    }
}

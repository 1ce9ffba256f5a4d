//! TF-Luna lidar ranging sensor (I2C, trigger mode)
//!
//! Measurement frame (6 bytes from register 0x00):
//! [DIST_L] [DIST_H] [AMP_L] [AMP_H] [TEMP_L] [TEMP_H]
//!
//! Distance is reported in cm; signal amplitude below `strength_min` marks
//! the reading unreliable. The sensor is put into trigger mode at startup
//! and strobed once per poll, so the frame always reflects a fresh
//! measurement.

use crate::core::driver::DistanceSensor;
use crate::core::types::{DistanceSample, FaultKind};
use crate::error::Result;
use crate::transport::SharedBus;

/// Factory-default device address
pub const DEFAULT_ADDR: u8 = 0x10;
/// Lower bound of the rated measuring range (mm)
pub const DISTANCE_MIN_MM: u16 = 200;
/// Upper bound of the rated measuring range (mm)
pub const DISTANCE_MAX_MM: u16 = 8000;

/// Ranging mode register: 0 = continuous, 1 = trigger
const REG_RANGING_MODE: u8 = 0x23;
/// Trigger strobe register, write 1 for one measurement
const REG_TRIGGER: u8 = 0x24;
/// Start of the measurement frame
const REG_FRAME: u8 = 0x00;
/// Measurement frame length
const FRAME_LEN: usize = 6;

const MODE_TRIGGER: u8 = 1;
const TRIGGER_ONCE: u8 = 1;

/// Decode a measurement frame, applying the reliability rules
///
/// Readings above the rated maximum clamp to it. A reading below the rated
/// minimum, or one whose amplitude is below `strength_min`, is untrustworthy
/// and reports as maximum range.
pub fn decode_frame(frame: &[u8; FRAME_LEN], strength_min: u16) -> (u16, u16) {
    let raw_cm = u16::from_le_bytes([frame[0], frame[1]]);
    let strength = u16::from_le_bytes([frame[2], frame[3]]);

    let mut distance = raw_cm.saturating_mul(10).min(DISTANCE_MAX_MM);
    if distance < DISTANCE_MIN_MM || strength < strength_min {
        distance = DISTANCE_MAX_MM;
    }

    (distance, strength)
}

/// TF-Luna driver over the shared register bus
pub struct TfLuna {
    bus: SharedBus,
    addr: u8,
    strength_min: u16,
}

impl TfLuna {
    /// Create the driver and switch the sensor into trigger mode
    pub fn new(bus: SharedBus, addr: u8, strength_min: u16) -> Result<Self> {
        {
            let mut port = bus.lock();
            port.write_reg(addr, REG_RANGING_MODE, MODE_TRIGGER)?;
        }
        log::info!("TF-Luna at {:#04x}: trigger mode set", addr);

        Ok(TfLuna {
            bus,
            addr,
            strength_min,
        })
    }

    fn read_frame(&mut self) -> Result<[u8; FRAME_LEN]> {
        let mut frame = [0u8; FRAME_LEN];
        let mut port = self.bus.lock();
        port.write_reg(self.addr, REG_TRIGGER, TRIGGER_ONCE)?;
        port.read_block(self.addr, REG_FRAME, &mut frame)?;
        Ok(frame)
    }
}

impl DistanceSensor for TfLuna {
    fn name(&self) -> &'static str {
        "TFLUNA"
    }

    fn poll(&mut self) -> DistanceSample {
        match self.read_frame() {
            Ok(frame) => {
                let (distance, strength) = decode_frame(&frame, self.strength_min);
                DistanceSample::with_strength(distance, strength)
            }
            Err(e) => {
                log::warn!("TF-Luna: poll failed: {}", e);
                DistanceSample::faulted(FaultKind::Io)
            }
        }
    }
}

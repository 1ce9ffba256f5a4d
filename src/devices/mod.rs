//! Device implementations

pub mod drv2605;
pub mod me007ys;
pub mod tfluna;
pub mod urm09;

use crate::config::UltrasonicConfig;
use crate::core::driver::DistanceSensor;
use crate::error::{Error, Result};
use crate::transport::{SerialTransport, SharedBus};
use me007ys::Me007ys;
use urm09::Urm09;

use std::time::Duration;

/// Create the ultrasonic sensor driver selected by configuration
///
/// The ME007YS streams frames over its own serial line; the URM09 shares
/// the register bus with the rest of the I2C devices.
pub fn create_ultrasonic(
    config: &UltrasonicConfig,
    bus: &SharedBus,
) -> Result<Box<dyn DistanceSensor>> {
    match config.kind.as_str() {
        "me007ys" => {
            let transport = SerialTransport::open(&config.port, config.baud_rate)?;
            let sensor = Me007ys::new(
                Box::new(transport),
                Duration::from_millis(config.read_deadline_ms),
            );
            Ok(Box::new(sensor))
        }
        "urm09" => {
            let sensor = Urm09::new(bus.clone(), config.i2c_address)?;
            Ok(Box::new(sensor))
        }
        _ => Err(Error::UnknownSensor(config.kind.clone())),
    }
}

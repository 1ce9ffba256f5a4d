//! 3-position slide switch
//!
//! One pin per position, active-low and mechanically exclusive. A read
//! scans the pins in fixed priority order and reports the first active
//! position. Mid-travel the wiper touches no contact, so an all-inactive
//! scan keeps the last known position instead of snapping to a default.

use crate::gpio::GpioInput;

/// Position carried at startup, before the first conclusive read
const INITIAL_STATE: u8 = 1;

/// 3-position switch reader with a persistent last-known position
pub struct Switch {
    gpio: Box<dyn GpioInput>,
    pins: [u32; 3],
    state: u8,
}

impl Switch {
    /// Create a reader over `pins`, one per position
    pub fn new(gpio: Box<dyn GpioInput>, pins: [u32; 3]) -> Self {
        Switch {
            gpio,
            pins,
            state: INITIAL_STATE,
        }
    }

    /// Current position without touching the pins
    pub fn state(&self) -> u8 {
        self.state
    }

    /// Scan the pins and return the position
    ///
    /// Read errors on a pin are logged and treated as inactive, so a
    /// flaky pin degrades to the persistence behavior.
    pub fn read(&mut self) -> u8 {
        for (position, &pin) in self.pins.iter().enumerate() {
            match self.gpio.read_pin(pin) {
                Ok(false) => {
                    let position = position as u8;
                    if position != self.state {
                        log::info!("Switch position {} -> {}", self.state, position);
                    }
                    self.state = position;
                    return self.state;
                }
                Ok(true) => {}
                Err(e) => {
                    log::warn!("Switch pin {}: read failed: {}", pin, e);
                }
            }
        }
        self.state
    }
}

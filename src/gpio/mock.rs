//! Mock GPIO for testing

use super::GpioInput;
use crate::error::Result;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Mock GPIO input with externally settable levels
///
/// Pins default to high, matching the pull-up idle state of the real
/// hardware. Clones share state, so a test can flip levels while a watcher
/// thread holds its own handle.
#[derive(Clone)]
pub struct MockGpio {
    levels: Arc<Mutex<HashMap<u32, bool>>>,
}

impl MockGpio {
    /// Create a new mock with all pins high
    pub fn new() -> Self {
        MockGpio {
            levels: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Set the level of a pin
    pub fn set_level(&self, pin: u32, high: bool) {
        let mut levels = self.levels.lock().unwrap();
        levels.insert(pin, high);
    }
}

impl GpioInput for MockGpio {
    fn read_pin(&mut self, pin: u32) -> Result<bool> {
        let levels = self.levels.lock().unwrap();
        Ok(levels.get(&pin).copied().unwrap_or(true))
    }
}

impl Default for MockGpio {
    fn default() -> Self {
        Self::new()
    }
}

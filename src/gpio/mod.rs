//! GPIO input abstraction
//!
//! Buttons and the range switch are plain level reads; edge detection and
//! debouncing happen in the input layer. The sysfs backend covers the
//! target board, the mock backend drives tests.

use crate::error::Result;

pub mod mock;
mod sysfs;

pub use mock::MockGpio;
pub use sysfs::SysfsGpio;

/// Pin-level input trait
///
/// `true` = high. All pins in this system idle high (internal pull-ups) and
/// read low when active.
pub trait GpioInput: Send {
    /// Read the current level of a pin
    fn read_pin(&mut self, pin: u32) -> Result<bool>;
}

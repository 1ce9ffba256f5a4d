//! Transport layer for I/O abstraction
//!
//! Two traits: `Transport` for byte streams (the framed-serial ultrasonic
//! sensor) and `RegisterBus` for address+register devices (the I2C sensors,
//! the multiplexer and the actuator drivers). The register bus is shared
//! between the sensor pollers and the control loop, so it travels as
//! `SharedBus` and is locked per transaction, never across a sleep.

use crate::error::Result;
use parking_lot::Mutex;
use std::sync::Arc;

mod i2c;
pub mod mock;
mod serial;

pub use i2c::I2cBus;
pub use serial::SerialTransport;

/// Transport trait for byte-stream device communication
pub trait Transport: Send {
    /// Read data into buffer, returns number of bytes read
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize>;

    /// Write data from buffer, returns number of bytes written
    fn write(&mut self, data: &[u8]) -> Result<usize>;

    /// Flush any pending writes (blocking until complete)
    fn flush(&mut self) -> Result<()>;

    /// Check if data is available to read
    fn available(&mut self) -> Result<usize> {
        Ok(0) // Default implementation
    }
}

/// Register-level bus trait (I2C-class devices)
pub trait RegisterBus: Send {
    /// Write raw bytes to a device address (no register prefix)
    fn write_raw(&mut self, addr: u8, data: &[u8]) -> Result<()>;

    /// Write one byte to a register
    fn write_reg(&mut self, addr: u8, reg: u8, value: u8) -> Result<()>;

    /// Read a block of bytes starting at a register
    fn read_block(&mut self, addr: u8, reg: u8, buf: &mut [u8]) -> Result<()>;

    /// Read one register byte
    fn read_reg(&mut self, addr: u8, reg: u8) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.read_block(addr, reg, &mut buf)?;
        Ok(buf[0])
    }
}

/// Shared handle to the physical register bus
pub type SharedBus = Arc<Mutex<Box<dyn RegisterBus>>>;

/// Wrap a bus implementation into the shared handle
pub fn shared_bus(bus: Box<dyn RegisterBus>) -> SharedBus {
    Arc::new(Mutex::new(bus))
}

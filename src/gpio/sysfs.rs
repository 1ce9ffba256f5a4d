//! Sysfs GPIO backend

use super::GpioInput;
use crate::error::Result;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;
use std::thread;
use std::time::Duration;

/// GPIO input reading `/sys/class/gpio` value files
pub struct SysfsGpio;

impl SysfsGpio {
    /// Export the given pins as inputs
    ///
    /// Already-exported pins are left alone. Freshly exported pins get a
    /// short settle delay before the direction write so udev can fix up
    /// permissions.
    pub fn open(pins: &[u32]) -> Result<Self> {
        for &pin in pins {
            let pin_dir = format!("/sys/class/gpio/gpio{}", pin);
            if !Path::new(&pin_dir).exists() {
                fs::write("/sys/class/gpio/export", pin.to_string())?;
                thread::sleep(Duration::from_millis(50));
            }
            fs::write(format!("{}/direction", pin_dir), "in")?;
        }
        log::info!("Configured GPIO inputs: {:?}", pins);
        Ok(SysfsGpio)
    }
}

impl GpioInput for SysfsGpio {
    fn read_pin(&mut self, pin: u32) -> Result<bool> {
        let mut content = String::new();
        File::open(format!("/sys/class/gpio/gpio{}/value", pin))?.read_to_string(&mut content)?;
        let value: u8 = content
            .trim()
            .parse()
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "Invalid GPIO value"))?;
        Ok(value != 0)
    }
}

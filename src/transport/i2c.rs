//! Linux I2C bus implementation
//!
//! Speaks to `/dev/i2c-*` directly through `libc`: one `I2C_SLAVE` ioctl to
//! address a device, then plain `read`/`write` calls. Register reads are a
//! register-pointer write followed by a read, which every device on this bus
//! accepts.

use super::RegisterBus;
use crate::error::{Error, Result};
use std::ffi::CString;
use std::io;
use std::os::unix::io::RawFd;

/// ioctl request selecting the active slave address
const I2C_SLAVE: libc::c_ulong = 0x0703;

/// Register bus backed by a Linux I2C character device
pub struct I2cBus {
    fd: RawFd,
    path: String,
    /// Last address selected via ioctl, to skip redundant selects
    active_addr: Option<u8>,
}

impl I2cBus {
    /// Open an I2C character device
    ///
    /// # Arguments
    /// * `path` - Bus device path (e.g., "/dev/i2c-1")
    pub fn open(path: &str) -> Result<Self> {
        let c_path = CString::new(path)
            .map_err(|_| Error::InvalidParameter(format!("bus path: {}", path)))?;

        let fd = unsafe { libc::open(c_path.as_ptr(), libc::O_RDWR) };
        if fd < 0 {
            return Err(io::Error::last_os_error().into());
        }

        log::info!("Opened I2C bus: {}", path);

        Ok(I2cBus {
            fd,
            path: path.to_string(),
            active_addr: None,
        })
    }

    fn select(&mut self, addr: u8) -> Result<()> {
        if self.active_addr == Some(addr) {
            return Ok(());
        }
        let ret = unsafe { libc::ioctl(self.fd, I2C_SLAVE, libc::c_int::from(addr)) };
        if ret < 0 {
            return Err(io::Error::last_os_error().into());
        }
        self.active_addr = Some(addr);
        Ok(())
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        let ret = unsafe { libc::write(self.fd, data.as_ptr() as *const libc::c_void, data.len()) };
        if ret < 0 {
            return Err(io::Error::last_os_error().into());
        }
        if ret as usize != data.len() {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("short I2C write on {}", self.path),
            )));
        }
        Ok(())
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<()> {
        let ret = unsafe { libc::read(self.fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len()) };
        if ret < 0 {
            return Err(io::Error::last_os_error().into());
        }
        if ret as usize != buf.len() {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("short I2C read on {}", self.path),
            )));
        }
        Ok(())
    }
}

impl RegisterBus for I2cBus {
    fn write_raw(&mut self, addr: u8, data: &[u8]) -> Result<()> {
        self.select(addr)?;
        self.write_bytes(data)
    }

    fn write_reg(&mut self, addr: u8, reg: u8, value: u8) -> Result<()> {
        self.select(addr)?;
        self.write_bytes(&[reg, value])
    }

    fn read_block(&mut self, addr: u8, reg: u8, buf: &mut [u8]) -> Result<()> {
        self.select(addr)?;
        self.write_bytes(&[reg])?;
        self.read_bytes(buf)
    }
}

impl Drop for I2cBus {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.fd);
        }
        log::debug!("Closed I2C bus: {}", self.path);
    }
}

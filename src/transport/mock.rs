//! Mock transports for testing
//!
//! `MockTransport` replays injected bytes for the framed-serial driver;
//! `MockRegisterBus` records every register transaction and serves
//! programmable register contents, so driver tests can assert on exact bus
//! traffic without hardware.

use super::{RegisterBus, Transport};
use crate::error::{Error, Result};
use std::collections::{HashMap, HashSet, VecDeque};
use std::io;
use std::sync::{Arc, Mutex};

/// Mock byte-stream transport for unit testing
#[derive(Clone)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

struct MockTransportInner {
    read_buffer: VecDeque<u8>,
    write_buffer: Vec<u8>,
}

impl MockTransport {
    /// Create a new mock transport
    pub fn new() -> Self {
        MockTransport {
            inner: Arc::new(Mutex::new(MockTransportInner {
                read_buffer: VecDeque::new(),
                write_buffer: Vec::new(),
            })),
        }
    }

    /// Inject data to be read
    pub fn inject_read(&self, data: &[u8]) {
        let mut inner = self.inner.lock().unwrap();
        inner.read_buffer.extend(data);
    }

    /// Get all written data
    pub fn get_written(&self) -> Vec<u8> {
        let inner = self.inner.lock().unwrap();
        inner.write_buffer.clone()
    }

    /// Clear read buffer
    pub fn clear_read(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.read_buffer.clear();
    }
}

impl Transport for MockTransport {
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        let mut inner = self.inner.lock().unwrap();
        let available = inner.read_buffer.len().min(buffer.len());

        for item in buffer.iter_mut().take(available) {
            *item = inner.read_buffer.pop_front().unwrap();
        }

        Ok(available)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        let mut inner = self.inner.lock().unwrap();
        inner.write_buffer.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn available(&mut self) -> Result<usize> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.read_buffer.len())
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

/// One recorded register-bus transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusOp {
    /// Raw write (multiplexer channel selects)
    WriteRaw { addr: u8, data: Vec<u8> },
    /// Single register write
    WriteReg { addr: u8, reg: u8, value: u8 },
    /// Block read
    ReadBlock { addr: u8, reg: u8, len: usize },
}

/// Mock register bus for unit testing
#[derive(Clone)]
pub struct MockRegisterBus {
    inner: Arc<Mutex<MockBusInner>>,
}

struct MockBusInner {
    /// Register contents, written values land here too
    regs: HashMap<(u8, u8), u8>,
    /// Block-read replies taking priority over per-register contents
    blocks: HashMap<(u8, u8), Vec<u8>>,
    /// Registers that read back 0 after any write (self-clearing strobes)
    auto_clear: HashSet<(u8, u8)>,
    ops: Vec<BusOp>,
    fail_io: bool,
}

impl MockRegisterBus {
    /// Create a new mock register bus
    pub fn new() -> Self {
        MockRegisterBus {
            inner: Arc::new(Mutex::new(MockBusInner {
                regs: HashMap::new(),
                blocks: HashMap::new(),
                auto_clear: HashSet::new(),
                ops: Vec::new(),
                fail_io: false,
            })),
        }
    }

    /// Preload a register value
    pub fn set_reg(&self, addr: u8, reg: u8, value: u8) {
        let mut inner = self.inner.lock().unwrap();
        inner.regs.insert((addr, reg), value);
    }

    /// Preload a block-read reply starting at a register
    pub fn set_block(&self, addr: u8, reg: u8, data: &[u8]) {
        let mut inner = self.inner.lock().unwrap();
        inner.blocks.insert((addr, reg), data.to_vec());
    }

    /// Mark a register as self-clearing: writes store 0 instead of the value
    pub fn set_auto_clear(&self, addr: u8, reg: u8) {
        let mut inner = self.inner.lock().unwrap();
        inner.auto_clear.insert((addr, reg));
    }

    /// Make every subsequent transaction fail with an I/O error
    pub fn set_fail_io(&self, fail: bool) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_io = fail;
    }

    /// All transactions recorded so far
    pub fn ops(&self) -> Vec<BusOp> {
        let inner = self.inner.lock().unwrap();
        inner.ops.clone()
    }

    /// Forget recorded transactions
    pub fn clear_ops(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.ops.clear();
    }

    /// Count register writes of a given value to one register
    pub fn count_writes(&self, addr: u8, reg: u8, value: u8) -> usize {
        let inner = self.inner.lock().unwrap();
        inner
            .ops
            .iter()
            .filter(|op| {
                matches!(op, BusOp::WriteReg { addr: a, reg: r, value: v }
                    if *a == addr && *r == reg && *v == value)
            })
            .count()
    }
}

fn mock_io_error() -> Error {
    Error::Io(io::Error::new(io::ErrorKind::Other, "injected bus failure"))
}

impl RegisterBus for MockRegisterBus {
    fn write_raw(&mut self, addr: u8, data: &[u8]) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_io {
            return Err(mock_io_error());
        }
        inner.ops.push(BusOp::WriteRaw {
            addr,
            data: data.to_vec(),
        });
        Ok(())
    }

    fn write_reg(&mut self, addr: u8, reg: u8, value: u8) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_io {
            return Err(mock_io_error());
        }
        inner.ops.push(BusOp::WriteReg { addr, reg, value });
        let stored = if inner.auto_clear.contains(&(addr, reg)) {
            0
        } else {
            value
        };
        inner.regs.insert((addr, reg), stored);
        Ok(())
    }

    fn read_block(&mut self, addr: u8, reg: u8, buf: &mut [u8]) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_io {
            return Err(mock_io_error());
        }
        inner.ops.push(BusOp::ReadBlock {
            addr,
            reg,
            len: buf.len(),
        });
        if let Some(block) = inner.blocks.get(&(addr, reg)) {
            for (i, byte) in buf.iter_mut().enumerate() {
                *byte = block.get(i).copied().unwrap_or(0);
            }
        } else {
            for (i, byte) in buf.iter_mut().enumerate() {
                *byte = inner
                    .regs
                    .get(&(addr, reg.wrapping_add(i as u8)))
                    .copied()
                    .unwrap_or(0);
            }
        }
        Ok(())
    }
}

impl Default for MockRegisterBus {
    fn default() -> Self {
        Self::new()
    }
}

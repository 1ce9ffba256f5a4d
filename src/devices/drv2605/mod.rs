//! TI DRV2605 haptic driver behind a TCA9548A multiplexer channel
//!
//! All DRV2605 devices share one device address, so every register
//! transaction first selects this driver's multiplexer channel. Select and
//! register access happen under a single bus lock so concurrent channels
//! cannot interleave between them.

mod registers;

pub use registers::*;

use crate::error::{Error, Result};
use crate::transport::{RegisterBus, SharedBus};

use std::thread;
use std::time::Duration;

/// Auto-calibration GO-bit poll cadence
const GO_POLL_INTERVAL: Duration = Duration::from_millis(10);
/// Poll attempts before declaring the calibration hung
const GO_POLL_LIMIT: u32 = 500;

/// Supported LRA exciter models with their drive parameters
///
/// Register values follow the rated-voltage and overdrive-clamp equations
/// of the SLOS854D datasheet for each exciter's data sheet figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExciterKind {
    /// EXS2608L-03A coin exciter
    Exs2608,
    /// EXS241408WB bar exciter
    Exs241408,
}

impl ExciterKind {
    /// Parse the configuration name for an exciter model
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "exs2608" => Ok(ExciterKind::Exs2608),
            "exs241408" => Ok(ExciterKind::Exs241408),
            _ => Err(Error::UnknownExciter(name.to_string())),
        }
    }

    /// RATED_VOLTAGE register value
    pub fn rated_voltage(self) -> u8 {
        match self {
            ExciterKind::Exs2608 => 0x58,
            ExciterKind::Exs241408 => 0x75,
        }
    }

    /// OD_CLAMP register value
    pub fn od_clamp(self) -> u8 {
        match self {
            ExciterKind::Exs2608 => 0x63,
            ExciterKind::Exs241408 => 0x89,
        }
    }

    /// DRIVE_TIME field for the exciter's resonant half-period
    pub fn drive_time(self) -> u8 {
        match self {
            ExciterKind::Exs2608 => 31,
            ExciterKind::Exs241408 => 23,
        }
    }
}

/// One DRV2605 on a multiplexer channel
pub struct Drv2605 {
    bus: SharedBus,
    mux_addr: u8,
    mux_channel: u8,
    addr: u8,
    exciter: ExciterKind,
    resonant_hz: Option<f64>,
}

impl Drv2605 {
    /// Create a driver for the device behind `mux_channel`
    pub fn new(
        bus: SharedBus,
        mux_addr: u8,
        mux_channel: u8,
        addr: u8,
        exciter: ExciterKind,
    ) -> Self {
        Drv2605 {
            bus,
            mux_addr,
            mux_channel,
            addr,
            exciter,
            resonant_hz: None,
        }
    }

    /// Multiplexer channel this device sits behind
    pub fn mux_channel(&self) -> u8 {
        self.mux_channel
    }

    /// Resonant frequency measured by the last successful calibration
    pub fn resonant_hz(&self) -> Option<f64> {
        self.resonant_hz
    }

    /// Run `op` with this channel selected, under one bus lock
    fn with_bus<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&mut dyn RegisterBus) -> Result<T>,
    {
        let mut bus = self.bus.lock();
        bus.write_raw(self.mux_addr, &[1 << self.mux_channel])?;
        op(bus.as_mut())
    }

    fn write_register(&self, reg: u8, value: u8) -> Result<()> {
        self.with_bus(|bus| bus.write_reg(self.addr, reg, value))
    }

    fn read_register(&self, reg: u8) -> Result<u8> {
        self.with_bus(|bus| bus.read_reg(self.addr, reg))
    }

    /// Read-modify-write a register field: `(current & keep) | set`
    fn update_register(&self, reg: u8, keep: u8, set: u8) -> Result<()> {
        self.with_bus(|bus| {
            let current = bus.read_reg(self.addr, reg)?;
            bus.write_reg(self.addr, reg, (current & keep) | set)
        })
    }

    /// Baseline configuration: out of standby, LRA library selected,
    /// playback amplitude zeroed
    pub fn configure_lra(&self) -> Result<()> {
        self.write_register(REG_MODE, MODE_INTERNAL_TRIGGER)?;
        self.write_register(REG_RTP_INPUT, 0)?;
        self.write_register(REG_LIBRARY, LIBRARY_LRA)?;
        self.update_register(REG_FEEDBACK, 0xFF, FEEDBACK_N_ERM_LRA)?;
        log::debug!("DRV2605 ch{}: LRA configured", self.mux_channel);
        Ok(())
    }

    /// Run auto-calibration, retrying up to `retries` attempts
    ///
    /// On success the measured resonant frequency is retained and returned.
    /// Register transport errors count as failed attempts.
    pub fn auto_calibrate(&mut self, retries: u32) -> Result<f64> {
        let mut failures = 0;
        loop {
            match self.calibration_attempt() {
                Ok(hz) => {
                    self.resonant_hz = Some(hz);
                    log::info!(
                        "DRV2605 ch{}: calibration converged at {:.1} Hz",
                        self.mux_channel,
                        hz
                    );
                    return Ok(hz);
                }
                Err(e) => {
                    failures += 1;
                    log::warn!(
                        "DRV2605 ch{}: calibration attempt {} failed: {}",
                        self.mux_channel,
                        failures,
                        e
                    );
                    if failures >= retries {
                        return Err(Error::CalibrationFailed {
                            channel: self.mux_channel,
                            attempts: failures,
                        });
                    }
                }
            }
        }
    }

    /// One pass of the SLOS854D auto-calibration procedure
    fn calibration_attempt(&self) -> Result<f64> {
        self.write_register(REG_MODE, MODE_AUTO_CAL)?;
        self.update_register(REG_FEEDBACK, 0xFF, FEEDBACK_N_ERM_LRA)?;
        // FB_BRAKE_FACTOR = 2
        self.update_register(REG_FEEDBACK, 0b1000_1111, 0b0010_0000)?;
        // LOOP_GAIN = 2
        self.update_register(REG_FEEDBACK, 0b1111_0011, 0b0000_1000)?;
        self.write_register(REG_RATED_VOLTAGE, self.exciter.rated_voltage())?;
        self.write_register(REG_OD_CLAMP, self.exciter.od_clamp())?;
        // AUTO_CAL_TIME = 3
        self.update_register(REG_CONTROL4, 0b1100_1111, 0b0011_0000)?;
        self.update_register(REG_CONTROL1, 0b1110_0000, self.exciter.drive_time())?;
        // SAMPLE_TIME = 3
        self.update_register(REG_CONTROL2, 0b1100_1111, 0b0011_0000)?;
        // BLANKING_TIME = 1
        self.update_register(REG_CONTROL2, 0b1111_0011, 0b0000_0100)?;
        // IDISS_TIME = 1
        self.update_register(REG_CONTROL2, 0b1111_1100, 0b0000_0001)?;
        // ZC_DET_TIME = 0
        self.update_register(REG_CONTROL4, 0b0011_1111, 0)?;

        self.write_register(REG_GO, GO_BIT)?;
        self.wait_go_clear()?;

        let status = self.read_register(REG_STATUS)?;
        if status & STATUS_DIAG_FAILED != 0 {
            return Err(Error::InitializationFailed(format!(
                "diagnostic failed, status {:#04x}",
                status
            )));
        }

        let period = self.read_register(REG_LRA_RESONANCE_PERIOD)?;
        if period == 0 {
            return Err(Error::InitializationFailed(
                "resonance period read back zero".to_string(),
            ));
        }
        Ok(resonance_hz(period))
    }

    /// Poll the GO bit until the device clears it
    fn wait_go_clear(&self) -> Result<()> {
        for _ in 0..GO_POLL_LIMIT {
            if self.read_register(REG_GO)? & GO_BIT == 0 {
                return Ok(());
            }
            thread::sleep(GO_POLL_INTERVAL);
        }
        Err(Error::Timeout)
    }

    /// Switch to open-loop LRA drive so the carrier frequency can be set
    /// directly
    pub fn set_open_loop(&self) -> Result<()> {
        self.update_register(REG_FEEDBACK, 0xFF, FEEDBACK_N_ERM_LRA)?;
        self.update_register(REG_CONTROL3, 0xFF, CONTROL3_LRA_OPEN_LOOP)?;
        log::debug!("DRV2605 ch{}: open-loop drive", self.mux_channel);
        Ok(())
    }

    /// Set the open-loop carrier frequency
    pub fn set_frequency(&self, hz: f64) -> Result<()> {
        // top bit is not part of the period field
        self.update_register(REG_OL_LRA_PERIOD, 0b1000_0000, ol_period_for_hz(hz))
    }

    /// Load a library effect into the first sequencer slot and return to
    /// internal-trigger mode
    pub fn load_effect(&self, effect: u8) -> Result<()> {
        self.with_bus(|bus| {
            bus.write_reg(self.addr, REG_WAVESEQ1, effect & 0x7F)?;
            bus.write_reg(self.addr, REG_MODE, MODE_INTERNAL_TRIGGER)
        })
    }

    /// Strobe playback of the loaded effect
    pub fn play(&self) -> Result<()> {
        self.write_register(REG_GO, GO_BIT)
    }

    /// Halt any running effect
    pub fn stop(&self) -> Result<()> {
        self.write_register(REG_GO, 0)
    }

    /// Enter real-time playback with the amplitude zeroed
    pub fn enter_realtime(&self) -> Result<()> {
        self.with_bus(|bus| {
            bus.write_reg(self.addr, REG_RTP_INPUT, 0)?;
            bus.write_reg(self.addr, REG_MODE, MODE_REALTIME)
        })
    }

    /// Set the real-time playback amplitude
    pub fn set_realtime_value(&self, value: u8) -> Result<()> {
        self.write_register(REG_RTP_INPUT, value.min(RTP_MAX))
    }

    /// Engage or release the standby bit
    pub fn set_standby(&self, engaged: bool) -> Result<()> {
        let mode = if engaged {
            MODE_STANDBY
        } else {
            MODE_INTERNAL_TRIGGER
        };
        self.write_register(REG_MODE, mode)
    }
}

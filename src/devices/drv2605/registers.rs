//! DRV2605 register map and conversion constants
//!
//! Addresses and field layouts from the TI SLOS854D datasheet. Only the
//! registers this system touches are listed. Field update masks follow the
//! read-modify-write convention: `keep` is ANDed with the current value
//! before the field bits are ORed in.

// ===== Register Addresses =====

/// Status register (device ID, diagnostic result)
pub const REG_STATUS: u8 = 0x00;
/// Mode register (standby bit, trigger/RTP/calibration mode)
pub const REG_MODE: u8 = 0x01;
/// Real-time playback amplitude
pub const REG_RTP_INPUT: u8 = 0x02;
/// Waveform library selector
pub const REG_LIBRARY: u8 = 0x03;
/// First waveform sequencer slot
pub const REG_WAVESEQ1: u8 = 0x04;
/// GO strobe, self-clearing
pub const REG_GO: u8 = 0x0C;
/// Rated voltage for closed-loop drive
pub const REG_RATED_VOLTAGE: u8 = 0x16;
/// Overdrive clamp voltage
pub const REG_OD_CLAMP: u8 = 0x17;
/// Feedback control (ERM/LRA select, brake factor, loop gain)
pub const REG_FEEDBACK: u8 = 0x1A;
/// Control1 (drive time)
pub const REG_CONTROL1: u8 = 0x1B;
/// Control2 (sample time, blanking time, current dissipation time)
pub const REG_CONTROL2: u8 = 0x1C;
/// Control3 (open-loop LRA enable)
pub const REG_CONTROL3: u8 = 0x1D;
/// Control4 (auto-calibration time, zero-crossing detect time)
pub const REG_CONTROL4: u8 = 0x1E;
/// Open-loop LRA period
pub const REG_OL_LRA_PERIOD: u8 = 0x20;
/// Measured resonance period readback after auto-calibration
pub const REG_LRA_RESONANCE_PERIOD: u8 = 0x22;

// ===== MODE Register Values =====

/// Internal trigger: GO strobes the loaded waveform
pub const MODE_INTERNAL_TRIGGER: u8 = 0x00;
/// Real-time playback: amplitude follows RTP_INPUT
pub const MODE_REALTIME: u8 = 0x05;
/// Auto-calibration procedure
pub const MODE_AUTO_CAL: u8 = 0x07;
/// Standby bit: output stage off, registers retained
pub const MODE_STANDBY: u8 = 0x40;

// ===== Field Bits =====

/// STATUS bit set when the last auto-calibration or diagnostic faulted
pub const STATUS_DIAG_FAILED: u8 = 0b0000_1000;
/// FEEDBACK bit selecting LRA behavior
pub const FEEDBACK_N_ERM_LRA: u8 = 0b1000_0000;
/// CONTROL3 bit enabling open-loop LRA drive
pub const CONTROL3_LRA_OPEN_LOOP: u8 = 0b0000_0001;
/// GO strobe bit
pub const GO_BIT: u8 = 0x01;

/// Waveform library holding the LRA-tuned effects
pub const LIBRARY_LRA: u8 = 6;
/// Maximum RTP amplitude in unsigned-interpretation positive range
pub const RTP_MAX: u8 = 127;

// ===== Waveform Library Effects =====

/// Strong click, 100% strength
pub const EFFECT_STRONG_CLICK: u8 = 1;
/// Sharp click, 100% strength
pub const EFFECT_SHARP_CLICK: u8 = 4;
/// Triple click, 100% strength
pub const EFFECT_TRIPLE_CLICK: u8 = 12;

// ===== Period Conversions =====

/// Seconds per LSB of the resonance-period readback
pub const LRA_PERIOD_S: f64 = 98.46e-6;
/// Seconds per LSB of the open-loop period register
pub const OL_PERIOD_S: f64 = 98.49e-6;
/// Usable maximum of the open-loop period field; at this value the
/// carrier bottoms out near 161 Hz
pub const OL_LRA_PERIOD_MAX: u8 = 63;

/// Open-loop period register value for a target carrier frequency
///
/// Clamps to the usable field maximum, so carriers below ~161 Hz all land
/// on the floor value.
pub fn ol_period_for_hz(hz: f64) -> u8 {
    let period = (1.0 / (hz * OL_PERIOD_S)) as u32;
    period.min(OL_LRA_PERIOD_MAX as u32) as u8
}

/// Resonant frequency in Hz from the calibration readback register
pub fn resonance_hz(period: u8) -> f64 {
    1.0 / (f64::from(period) * LRA_PERIOD_S)
}

//! Haptic actuator bank
//!
//! Drives every configured DRV2605 channel as one unit: all channels play
//! the same stage pattern at the same carrier frequency. Stage 0 and the
//! constant stage are edge-triggered through a latch so silence and
//! constant drive are commanded once per transition; pulsed stages replay
//! every control cycle and own the cycle cadence through their pulse sleep.
//!
//! Mute engages the device standby bit. Silencing (stage 0) only strobes
//! GO and zeroes the playback amplitude, it never touches the mode
//! register, so a standby engaged in the same cycle stays engaged.

use crate::config::HapticsConfig;
use crate::devices::drv2605::{
    Drv2605, ExciterKind, EFFECT_SHARP_CLICK, EFFECT_STRONG_CLICK, EFFECT_TRIPLE_CLICK,
};
use crate::error::{Error, Result};
use crate::stage::{StagePolicy, STAGE_CONSTANT};
use crate::transport::SharedBus;

use std::thread;
use std::time::Duration;

/// Orientation pause before an announcement cue
const CUE_LEAD_IN: Duration = Duration::from_millis(500);
/// Announcement pacing (Hz)
const CUE_PACE_HZ: f64 = 0.5;

/// Cue effect announcing a binary mode bit
///
/// The raised state (unmuted, long range class) announces as a triple
/// click, the lowered state as a single sharp click.
pub fn cue_effect(raised: bool) -> u8 {
    if raised {
        EFFECT_TRIPLE_CLICK
    } else {
        EFFECT_SHARP_CLICK
    }
}

/// All haptic channels, driven in lockstep
pub struct HapticBank {
    channels: Vec<Drv2605>,
    calibration_retries: u32,
    carrier_hz: [f64; 3],
    max_intensity: u8,
    stage_latch: Option<u8>,
    carrier_latch: Option<u8>,
    muted: bool,
}

impl HapticBank {
    /// Build the bank from configuration
    ///
    /// Validates channel layout and exciter names; does not touch the bus.
    pub fn new(bus: &SharedBus, config: &HapticsConfig) -> Result<Self> {
        if config.channels.is_empty() {
            return Err(Error::InvalidParameter(
                "no haptic channels configured".to_string(),
            ));
        }

        let mut channels = Vec::with_capacity(config.channels.len());
        for channel in &config.channels {
            if channel.mux_channel > 7 {
                return Err(Error::InvalidParameter(format!(
                    "multiplexer channel {} out of range",
                    channel.mux_channel
                )));
            }
            let exciter = ExciterKind::from_name(&channel.exciter)?;
            channels.push(Drv2605::new(
                bus.clone(),
                config.mux_address,
                channel.mux_channel,
                config.device_address,
                exciter,
            ));
        }

        Ok(HapticBank {
            channels,
            calibration_retries: config.calibration_retries,
            carrier_hz: config.carrier_hz,
            max_intensity: config.max_intensity,
            stage_latch: None,
            carrier_latch: None,
            muted: false,
        })
    }

    /// Number of channels in the bank
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Calibrate and configure every channel for open-loop LRA drive
    ///
    /// A channel whose calibration exhausts its retry budget keeps its
    /// factory drive parameters and stays in service; register transport
    /// failures outside calibration abort initialization.
    pub fn initialize(&mut self) -> Result<()> {
        for channel in &mut self.channels {
            match channel.auto_calibrate(self.calibration_retries) {
                Ok(_) => {}
                Err(e @ Error::CalibrationFailed { .. }) => {
                    log::warn!("{}, driving uncalibrated", e);
                }
                Err(e) => return Err(e),
            }
        }
        for channel in &self.channels {
            channel.configure_lra()?;
            channel.set_open_loop()?;
        }
        log::info!("Haptic bank ready: {} channel(s)", self.channels.len());
        Ok(())
    }

    /// Drive the bank for one control cycle at `stage`
    ///
    /// Pulsed stages sleep one pulse period before returning, which paces
    /// the caller's loop.
    pub fn drive(&mut self, stage: u8, policy: &StagePolicy) -> Result<()> {
        match stage {
            0 => {
                if self.stage_latch != Some(0) {
                    for channel in &self.channels {
                        channel.stop().map_err(|e| fault(channel, e))?;
                    }
                    for channel in &self.channels {
                        channel.set_realtime_value(0).map_err(|e| fault(channel, e))?;
                    }
                    self.stage_latch = Some(0);
                }
            }
            STAGE_CONSTANT => {
                if self.stage_latch != Some(STAGE_CONSTANT) {
                    self.constant(self.max_intensity)?;
                    self.stage_latch = Some(STAGE_CONSTANT);
                }
            }
            pulsed => {
                for channel in &self.channels {
                    channel
                        .load_effect(EFFECT_STRONG_CLICK)
                        .map_err(|e| fault(channel, e))?;
                }
                for channel in &self.channels {
                    channel.play().map_err(|e| fault(channel, e))?;
                }
                if let Some(hz) = policy.pulse_hz(pulsed) {
                    thread::sleep(Duration::from_secs_f64(1.0 / hz));
                }
                self.stage_latch = Some(pulsed);
            }
        }
        Ok(())
    }

    /// Play an announcement cue on every channel
    ///
    /// Blocks through the lead-in pause and one announcement period, so
    /// cues cannot pile up when the user mashes a button.
    pub fn play_cue(&mut self, effect: u8) -> Result<()> {
        thread::sleep(CUE_LEAD_IN);
        for channel in &self.channels {
            channel.load_effect(effect).map_err(|e| fault(channel, e))?;
        }
        for channel in &self.channels {
            channel.play().map_err(|e| fault(channel, e))?;
        }
        thread::sleep(Duration::from_secs_f64(1.0 / CUE_PACE_HZ));
        // the sequencer mode change invalidates the stage latch
        self.stage_latch = None;
        Ok(())
    }

    /// Retune the open-loop carrier for a switch state, latched
    pub fn set_carrier_state(&mut self, state: u8) -> Result<()> {
        if self.carrier_latch == Some(state) {
            return Ok(());
        }
        let hz = self.carrier_hz[usize::from(state.min(2))];
        for channel in &self.channels {
            channel.set_frequency(hz).map_err(|e| fault(channel, e))?;
        }
        self.carrier_latch = Some(state);
        log::debug!("Carrier set to {:.0} Hz", hz);
        Ok(())
    }

    /// Engage or release standby on every channel
    pub fn set_muted(&mut self, muted: bool) -> Result<()> {
        if self.muted == muted {
            return Ok(());
        }
        for channel in &self.channels {
            channel.set_standby(muted).map_err(|e| fault(channel, e))?;
        }
        self.muted = muted;
        // leaving standby rewrites the mode register
        if !muted {
            self.stage_latch = None;
        }
        log::info!("Actuators {}", if muted { "muted" } else { "unmuted" });
        Ok(())
    }

    /// Constant drive at an explicit amplitude
    ///
    /// Bench-testing entry point. Leaves the stage latch clear so the next
    /// `drive` call re-commands whatever stage the control cycle selects.
    pub fn constant(&mut self, amplitude: u8) -> Result<()> {
        for channel in &self.channels {
            channel.enter_realtime().map_err(|e| fault(channel, e))?;
        }
        for channel in &self.channels {
            channel
                .set_realtime_value(amplitude)
                .map_err(|e| fault(channel, e))?;
        }
        self.stage_latch = None;
        Ok(())
    }

    /// Retune the carrier to an explicit frequency
    ///
    /// Bench-testing entry point; clears the carrier latch so the next
    /// switch-state tune is applied unconditionally.
    pub fn set_carrier_hz(&mut self, hz: f64) -> Result<()> {
        for channel in &self.channels {
            channel.set_frequency(hz).map_err(|e| fault(channel, e))?;
        }
        self.carrier_latch = None;
        Ok(())
    }

    /// Best-effort zeroing for shutdown paths
    ///
    /// Every channel is stopped and its playback amplitude cleared even if
    /// some writes fail; failures are logged, never propagated.
    pub fn zero_all(&mut self) {
        for channel in &self.channels {
            if let Err(e) = channel.stop() {
                log::warn!("Shutdown zeroing: {}", fault(channel, e));
            }
            if let Err(e) = channel.set_realtime_value(0) {
                log::warn!("Shutdown zeroing: {}", fault(channel, e));
            }
        }
        self.stage_latch = Some(0);
    }
}

fn fault(channel: &Drv2605, e: Error) -> Error {
    Error::ChannelFault(format!("ch{}: {}", channel.mux_channel(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HapticChannelConfig, HapticsConfig};
    use crate::devices::drv2605::{
        ol_period_for_hz, MODE_AUTO_CAL, MODE_INTERNAL_TRIGGER, MODE_REALTIME, MODE_STANDBY,
        REG_GO, REG_LIBRARY, REG_MODE, REG_OL_LRA_PERIOD, REG_RTP_INPUT, REG_STATUS,
        STATUS_DIAG_FAILED,
    };
    use crate::transport::mock::{BusOp, MockRegisterBus};
    use crate::transport::shared_bus;

    const DEV: u8 = 0x5A;

    fn config(channels: &[u8]) -> HapticsConfig {
        HapticsConfig {
            mux_address: 0x70,
            device_address: DEV,
            channels: channels
                .iter()
                .map(|&mux_channel| HapticChannelConfig {
                    mux_channel,
                    exciter: "exs2608".to_string(),
                })
                .collect(),
            calibration_retries: 1,
            carrier_hz: [150.0, 200.0, 250.0],
            max_intensity: 127,
        }
    }

    // pulse sleeps shortened so cycle-replay tests stay fast
    fn fast_policy() -> StagePolicy {
        StagePolicy {
            thresholds: [10.0, 200.0, 400.0, 600.0, 800.0],
            pulse_hz: [200.0, 200.0, 200.0, 200.0],
        }
    }

    fn bank(mock: &MockRegisterBus, channels: &[u8]) -> HapticBank {
        let bus = shared_bus(Box::new(mock.clone()));
        HapticBank::new(&bus, &config(channels)).unwrap()
    }

    #[test]
    fn test_rejects_bad_channel_layout() {
        let mock = MockRegisterBus::new();
        let bus = shared_bus(Box::new(mock.clone()));

        assert!(matches!(
            HapticBank::new(&bus, &config(&[])),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            HapticBank::new(&bus, &config(&[8])),
            Err(Error::InvalidParameter(_))
        ));

        let mut bad_exciter = config(&[0]);
        bad_exciter.channels[0].exciter = "none".to_string();
        assert!(matches!(
            HapticBank::new(&bus, &bad_exciter),
            Err(Error::UnknownExciter(_))
        ));
    }

    #[test]
    fn test_initialize_survives_calibration_giveup() {
        let mock = MockRegisterBus::new();
        mock.set_auto_clear(DEV, REG_GO);
        mock.set_reg(DEV, REG_STATUS, STATUS_DIAG_FAILED);
        let mut bank = bank(&mock, &[0]);

        bank.initialize().unwrap();
        // one failed attempt, then the channel was still configured
        assert_eq!(mock.count_writes(DEV, REG_MODE, MODE_AUTO_CAL), 1);
        assert_eq!(mock.count_writes(DEV, REG_LIBRARY, 6), 1);
    }

    #[test]
    fn test_silence_commanded_once() {
        let mock = MockRegisterBus::new();
        let mut bank = bank(&mock, &[0]);
        let policy = fast_policy();

        bank.drive(3, &policy).unwrap();
        mock.clear_ops();

        bank.drive(0, &policy).unwrap();
        bank.drive(0, &policy).unwrap();
        assert_eq!(mock.count_writes(DEV, REG_GO, 0), 1);
        assert_eq!(mock.count_writes(DEV, REG_RTP_INPUT, 0), 1);
    }

    #[test]
    fn test_constant_stage_commanded_once() {
        let mock = MockRegisterBus::new();
        let mut bank = bank(&mock, &[0]);
        let policy = fast_policy();

        bank.drive(5, &policy).unwrap();
        bank.drive(5, &policy).unwrap();
        assert_eq!(mock.count_writes(DEV, REG_MODE, MODE_REALTIME), 1);
        assert_eq!(mock.count_writes(DEV, REG_RTP_INPUT, 127), 1);
    }

    #[test]
    fn test_constant_stage_two_pass_over_channels() {
        let mock = MockRegisterBus::new();
        let mut bank = bank(&mock, &[0, 1]);
        let policy = fast_policy();

        bank.drive(5, &policy).unwrap();
        let rtp_values: Vec<u8> = mock
            .ops()
            .iter()
            .filter_map(|op| match op {
                BusOp::WriteReg { reg, value, .. } if *reg == REG_RTP_INPUT => Some(*value),
                _ => None,
            })
            .collect();
        // both channels armed at zero before either goes loud
        assert_eq!(rtp_values, vec![0, 0, 127, 127]);
    }

    #[test]
    fn test_pulsed_stage_replays_each_cycle() {
        let mock = MockRegisterBus::new();
        let mut bank = bank(&mock, &[0]);
        let policy = fast_policy();

        bank.drive(2, &policy).unwrap();
        bank.drive(2, &policy).unwrap();
        assert_eq!(mock.count_writes(DEV, REG_GO, 1), 2);
    }

    #[test]
    fn test_constant_stage_resumes_after_silence() {
        let mock = MockRegisterBus::new();
        let mut bank = bank(&mock, &[0]);
        let policy = fast_policy();

        bank.drive(5, &policy).unwrap();
        bank.drive(0, &policy).unwrap();
        bank.drive(5, &policy).unwrap();
        assert_eq!(mock.count_writes(DEV, REG_RTP_INPUT, 127), 2);
    }

    #[test]
    fn test_carrier_latched_per_switch_state() {
        let mock = MockRegisterBus::new();
        let mut bank = bank(&mock, &[0]);

        bank.set_carrier_state(1).unwrap();
        bank.set_carrier_state(1).unwrap();
        let writes_after_first = mock
            .ops()
            .iter()
            .filter(|op| {
                matches!(op, BusOp::WriteReg { reg, .. } if *reg == REG_OL_LRA_PERIOD)
            })
            .count();
        assert_eq!(writes_after_first, 1);

        bank.set_carrier_state(2).unwrap();
        // 1 / (250 Hz * 98.49 us) = 40
        assert_eq!(mock.count_writes(DEV, REG_OL_LRA_PERIOD, 40), 1);
    }

    #[test]
    fn test_mute_standby_survives_silencing() {
        let mock = MockRegisterBus::new();
        let mut bank = bank(&mock, &[0]);
        let policy = fast_policy();

        bank.drive(3, &policy).unwrap();
        mock.clear_ops();

        bank.set_muted(true).unwrap();
        bank.drive(0, &policy).unwrap();
        assert_eq!(mock.count_writes(DEV, REG_MODE, MODE_STANDBY), 1);
        // silencing must not rewrite the mode register
        assert_eq!(mock.count_writes(DEV, REG_MODE, MODE_INTERNAL_TRIGGER), 0);
        assert_eq!(mock.count_writes(DEV, REG_MODE, MODE_REALTIME), 0);
        assert_eq!(mock.count_writes(DEV, REG_RTP_INPUT, 0), 1);
    }

    #[test]
    fn test_unmute_releases_standby() {
        let mock = MockRegisterBus::new();
        let mut bank = bank(&mock, &[0]);

        bank.set_muted(true).unwrap();
        bank.set_muted(false).unwrap();
        assert_eq!(mock.count_writes(DEV, REG_MODE, MODE_STANDBY), 1);
        assert_eq!(mock.count_writes(DEV, REG_MODE, MODE_INTERNAL_TRIGGER), 1);
    }

    #[test]
    fn test_zero_all_swallows_bus_failure() {
        let mock = MockRegisterBus::new();
        let mut bank = bank(&mock, &[0, 1]);

        mock.set_fail_io(true);
        bank.zero_all();
    }

    #[test]
    fn test_cue_effects() {
        assert_eq!(cue_effect(true), EFFECT_TRIPLE_CLICK);
        assert_eq!(cue_effect(false), EFFECT_SHARP_CLICK);
    }

    #[test]
    fn test_drive_escalates_channel_fault() {
        let mock = MockRegisterBus::new();
        let mut bank = bank(&mock, &[0]);
        let policy = fast_policy();

        mock.set_fail_io(true);
        assert!(matches!(
            bank.drive(2, &policy),
            Err(Error::ChannelFault(_))
        ));
    }

    #[test]
    fn test_explicit_constant_clears_stage_latch() {
        let mock = MockRegisterBus::new();
        let mut bank = bank(&mock, &[0]);
        let policy = fast_policy();

        bank.drive(5, &policy).unwrap();
        bank.constant(64).unwrap();
        assert_eq!(mock.count_writes(DEV, REG_RTP_INPUT, 64), 1);

        // the manual override forces the next stage-5 drive to re-command
        bank.drive(5, &policy).unwrap();
        assert_eq!(mock.count_writes(DEV, REG_RTP_INPUT, 127), 2);
    }

    #[test]
    fn test_explicit_carrier_clears_state_latch() {
        let mock = MockRegisterBus::new();
        let mut bank = bank(&mock, &[0]);

        bank.set_carrier_state(1).unwrap();
        bank.set_carrier_hz(300.0).unwrap();
        bank.set_carrier_state(1).unwrap();

        // the 200 Hz state tune lands twice around the explicit 300 Hz tune
        let expected = ol_period_for_hz(200.0);
        assert_eq!(mock.count_writes(DEV, REG_OL_LRA_PERIOD, expected), 2);
    }
}

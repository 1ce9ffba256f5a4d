//! Control Cycle Scenario Tests
//!
//! Synthetic end-to-end scenarios composing fusion, staging, input and the
//! haptic bank against mock transports, without hardware. Covers:
//! - a close obstacle escalating to constant drive, commanded exactly once
//! - quiet far-field cycles staying silent after a single zeroing pass
//! - a mute long-press silencing an active stage through standby
//! - switch-state persistence across indeterminate reads
//! - the range toggle changing both the announcement cue and the ceiling
//!
//! Run with: `cargo test --test control_loop`

use danda_io::config::{CaneConfig, HapticChannelConfig, HapticsConfig};
use danda_io::core::types::{OperatingMode, RangeClass, SensorSelect, NO_OBSTACLE_MM};
use danda_io::devices::drv2605::{
    ol_period_for_hz, EFFECT_TRIPLE_CLICK, MODE_REALTIME, MODE_STANDBY, REG_GO, REG_MODE,
    REG_OL_LRA_PERIOD, REG_RTP_INPUT, REG_WAVESEQ1,
};
use danda_io::fusion::Fusion;
use danda_io::gpio::MockGpio;
use danda_io::haptics::{cue_effect, HapticBank};
use danda_io::input::{EdgeLedger, Press, Switch};
use danda_io::stage::StagePolicy;
use danda_io::transport::mock::MockRegisterBus;
use danda_io::transport::shared_bus;

use std::thread;
use std::time::Duration;

const DEV: u8 = 0x5A;

// ============================================================================
// Scenario plumbing
// ============================================================================

/// Policy with the deployed thresholds but fast pulses, so pulsed-stage
/// cycles do not slow the suite down
fn fast_policy() -> StagePolicy {
    StagePolicy {
        thresholds: [10.0, 200.0, 400.0, 600.0, 800.0],
        pulse_hz: [200.0, 200.0, 200.0, 200.0],
    }
}

fn v2_fusion() -> Fusion {
    Fusion::from_config(&CaneConfig::v2_defaults().fusion)
}

fn bench_bank(mock: &MockRegisterBus) -> HapticBank {
    let bus = shared_bus(Box::new(mock.clone()));
    let config = HapticsConfig {
        mux_address: 0x70,
        device_address: DEV,
        calibration_retries: 1,
        carrier_hz: [150.0, 200.0, 250.0],
        max_intensity: 127,
        channels: vec![HapticChannelConfig {
            mux_channel: 0,
            exciter: "exs2608".to_string(),
        }],
    };
    HapticBank::new(&bus, &config).unwrap()
}

/// One control cycle: fuse, stage, drive
fn run_cycle(
    fusion: &Fusion,
    policy: &StagePolicy,
    bank: &mut HapticBank,
    mode: OperatingMode,
    ultrasonic_mm: u16,
    lidar_mm: u16,
) -> u8 {
    let feedback = fusion.feedback(ultrasonic_mm, lidar_mm, mode);
    let stage = policy.stage(feedback, mode.mute);
    bank.drive(stage, policy).unwrap();
    stage
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_close_obstacle_drives_constant_once() {
    let mock = MockRegisterBus::new();
    let mut bank = bench_bank(&mock);
    let fusion = v2_fusion();
    let policy = fast_policy();
    let mode = OperatingMode::default();

    // 150 mm ultrasonic, 300 mm lidar, short range class: the nearer
    // reading dominates and lands deep in the constant band
    let feedback = fusion.feedback(150, 300, mode);
    assert!((feedback - 900.0).abs() < 1e-9);

    let stage = run_cycle(&fusion, &policy, &mut bank, mode, 150, 300);
    assert_eq!(stage, 5);
    run_cycle(&fusion, &policy, &mut bank, mode, 150, 300);
    run_cycle(&fusion, &policy, &mut bank, mode, 155, 300);

    // three cycles in the constant band, the bank is armed exactly once
    assert_eq!(mock.count_writes(DEV, REG_MODE, MODE_REALTIME), 1);
    assert_eq!(mock.count_writes(DEV, REG_RTP_INPUT, 127), 1);
}

#[test]
fn test_far_field_stays_silent_after_one_zeroing() {
    let mock = MockRegisterBus::new();
    let mut bank = bench_bank(&mock);
    let fusion = v2_fusion();
    let policy = fast_policy();
    let mode = OperatingMode::default();

    for _ in 0..3 {
        let stage = run_cycle(
            &fusion,
            &policy,
            &mut bank,
            mode,
            NO_OBSTACLE_MM,
            NO_OBSTACLE_MM,
        );
        assert_eq!(stage, 0);
    }

    // the initial zeroing stops playback once, then the latch holds
    assert_eq!(mock.count_writes(DEV, REG_GO, 0), 1);
    assert_eq!(mock.count_writes(DEV, REG_RTP_INPUT, 0), 1);
}

#[test]
fn test_mute_long_press_silences_active_stage() {
    let mock = MockRegisterBus::new();
    let mut bank = bench_bank(&mock);
    let fusion = v2_fusion();
    let policy = fast_policy();
    let mut mode = OperatingMode::default();

    // obstacle at 700 mm in the short class: stage 3 pulses
    let stage = run_cycle(&fusion, &policy, &mut bank, mode, 700, 900);
    assert_eq!(stage, 3);

    // hold the mute button past the threshold (1 us here, so a real
    // sleep is enough to classify as long)
    let ledger = EdgeLedger::new(2);
    ledger.record_fall(1);
    thread::sleep(Duration::from_millis(2));
    ledger.record_rise(1);
    assert_eq!(ledger.consume(1, 1), Some(Press::Long));

    mode.mute = true;
    bank.set_muted(true).unwrap();
    mock.clear_ops();

    // muted cycles stay in stage 0 and leave standby alone
    for _ in 0..3 {
        let stage = run_cycle(&fusion, &policy, &mut bank, mode, 700, 900);
        assert_eq!(stage, 0);
    }
    assert_eq!(mock.count_writes(DEV, REG_GO, 0), 1);
    assert_eq!(mock.count_writes(DEV, REG_MODE, MODE_REALTIME), 0);
    assert_eq!(mock.count_writes(DEV, REG_MODE, MODE_STANDBY), 0);
}

#[test]
fn test_switch_state_persists_and_latches_carrier() {
    let mock = MockRegisterBus::new();
    let mut bank = bench_bank(&mock);

    let gpio = MockGpio::new();
    let mut switch = Switch::new(Box::new(gpio.clone()), [23, 24, 25]);

    // middle position active: both sensors, 200 Hz carrier
    gpio.set_level(24, false);
    let state = switch.read();
    assert_eq!(state, 1);
    assert_eq!(SensorSelect::from_switch(state), SensorSelect::Both);
    bank.set_carrier_state(state).unwrap();
    let period_200 = ol_period_for_hz(200.0);
    assert_eq!(mock.count_writes(DEV, REG_OL_LRA_PERIOD, period_200), 1);

    // between detents every pin reads high; the state holds and the
    // latched carrier is not rewritten
    gpio.set_level(24, true);
    let state = switch.read();
    assert_eq!(state, 1);
    bank.set_carrier_state(state).unwrap();
    assert_eq!(mock.count_writes(DEV, REG_OL_LRA_PERIOD, period_200), 1);

    // third position: ultrasonic only, 250 Hz carrier
    gpio.set_level(25, false);
    let state = switch.read();
    assert_eq!(state, 2);
    assert_eq!(SensorSelect::from_switch(state), SensorSelect::UltrasonicOnly);
    bank.set_carrier_state(state).unwrap();
    let period_250 = ol_period_for_hz(250.0);
    assert_eq!(mock.count_writes(DEV, REG_OL_LRA_PERIOD, period_250), 1);

    // with the lidar deselected a close lidar reading contributes nothing
    let fusion = v2_fusion();
    let mut mode = OperatingMode::default();
    mode.select = SensorSelect::from_switch(state);
    let feedback = fusion.feedback(NO_OBSTACLE_MM, 300, mode);
    assert_eq!(feedback, 0.0);
}

#[test]
fn test_range_toggle_changes_cue_and_ceiling() {
    let mock = MockRegisterBus::new();
    let mut bank = bench_bank(&mock);
    let fusion = v2_fusion();
    let policy = fast_policy();
    let mut mode = OperatingMode::default();

    // 2000 mm is beyond the short ceiling: silent
    let stage = run_cycle(&fusion, &policy, &mut bank, mode, NO_OBSTACLE_MM, 2000);
    assert_eq!(stage, 0);

    // long press toggles to the long class; the announcement is the
    // raised cue
    mode.range = mode.range.toggled();
    assert_eq!(mode.range, RangeClass::Far);
    let effect = cue_effect(mode.range == RangeClass::Far);
    assert_eq!(effect, EFFECT_TRIPLE_CLICK);
    bank.play_cue(effect).unwrap();
    assert_eq!(mock.count_writes(DEV, REG_WAVESEQ1, EFFECT_TRIPLE_CLICK), 1);

    // the same obstacle now reports in the long class
    let feedback = fusion.feedback(NO_OBSTACLE_MM, 2000, mode);
    assert!((feedback - 1000.0 / 3.0).abs() < 1e-9);
    let stage = run_cycle(&fusion, &policy, &mut bank, mode, NO_OBSTACLE_MM, 2000);
    assert_eq!(stage, 2);
}

//! Bench check for the haptic bank
//!
//! Runs a scripted sweep over calibration, carrier tuning, staged pulses
//! and announcement cues, then drops into an interactive console for
//! manual probing. Intended for exciter bring-up on the assembled handle.

use danda_io::config::CaneConfig;
use danda_io::devices::drv2605::{EFFECT_SHARP_CLICK, EFFECT_TRIPLE_CLICK};
use danda_io::error::{Error, Result};
use danda_io::haptics::HapticBank;
use danda_io::stage::StagePolicy;
use danda_io::transport::{shared_bus, I2cBus};

use std::io::{self, BufRead, Write};
use std::thread;
use std::time::Duration;

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    log::info!("=== DandaIO Haptic Bench Check ===");

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/etc/danda-io.toml".to_string());
    let config = match CaneConfig::from_file(&config_path) {
        Ok(config) => {
            log::info!("Using config: {}", config_path);
            config
        }
        Err(e) => {
            log::warn!("Config {} not usable ({}), using V.2 defaults", config_path, e);
            CaneConfig::v2_defaults()
        }
    };
    let policy = StagePolicy::from_config(&config.stage);

    // Step 1: Open the bus and calibrate every channel
    log::info!(
        "Step 1: Initializing haptic bank ({} channels behind mux {:#04x})...",
        config.haptics.channels.len(),
        config.haptics.mux_address
    );
    let bus = shared_bus(Box::new(I2cBus::open(&config.bus.device)?));
    let mut bank = HapticBank::new(&bus, &config.haptics)?;
    bank.initialize()?;
    log::info!("✓ Bank initialized");

    // Step 2: Constant drive at each switch-state carrier
    log::info!("Step 2: Carrier sweep with constant drive...");
    for state in 0..3u8 {
        log::info!(
            "  Carrier state {} ({:.0} Hz), 1 second burst",
            state,
            config.haptics.carrier_hz[usize::from(state)]
        );
        bank.set_carrier_state(state)?;
        bank.constant(config.haptics.max_intensity)?;
        thread::sleep(Duration::from_secs(1));
        bank.constant(0)?;
        thread::sleep(Duration::from_millis(300));
    }
    bank.drive(0, &policy)?;
    log::info!("✓ Carrier sweep done");

    // Step 3: A few pulses of each pulsed stage
    log::info!("Step 3: Staged pulses...");
    for stage in 1..=4u8 {
        log::info!(
            "  Stage {} ({:.0} Hz pulse rate)",
            stage,
            policy.pulse_hz(stage).unwrap_or(0.0)
        );
        for _ in 0..6 {
            bank.drive(stage, &policy)?;
        }
    }
    bank.drive(0, &policy)?;
    log::info!("✓ Staged pulses done");

    // Step 4: Both announcement cues
    log::info!("Step 4: Announcement cues...");
    log::info!("  Flat cue (sharp click)");
    bank.play_cue(EFFECT_SHARP_CLICK)?;
    log::info!("  Raised cue (triple click)");
    bank.play_cue(EFFECT_TRIPLE_CLICK)?;
    log::info!("✓ Cues done");

    console(&mut bank, &policy)
}

/// Interactive probing console
fn console(bank: &mut HapticBank, policy: &StagePolicy) -> Result<()> {
    println!();
    println!("Interactive console. Commands:");
    println!("  stage <0-5>     drive one cycle of a stage");
    println!("  const <0-127>   constant drive at an amplitude");
    println!("  freq <160-1000> retune the open-loop carrier, Hz");
    println!("  cue <1-123>     play a waveform library effect");
    println!("  stop            silence all channels");
    println!("  quit            exit");

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "quit" || line == "exit" {
            break;
        }

        if let Err(e) = run_command(bank, policy, line) {
            log::warn!("{}", e);
        }
    }

    bank.zero_all();
    log::info!("Haptic bench check finished");
    Ok(())
}

fn run_command(bank: &mut HapticBank, policy: &StagePolicy, line: &str) -> Result<()> {
    let mut parts = line.split_whitespace();
    let command = parts.next().unwrap_or("");

    match command {
        "stop" => bank.drive(0, policy),
        "stage" => {
            let stage: u8 = parse_arg(parts.next(), line)?;
            if stage > 5 {
                return Err(Error::InvalidParameter(format!(
                    "stage {} out of range 0-5",
                    stage
                )));
            }
            bank.drive(stage, policy)
        }
        "const" => {
            let amplitude: u8 = parse_arg(parts.next(), line)?;
            if amplitude > 127 {
                return Err(Error::InvalidParameter(format!(
                    "amplitude {} out of range 0-127",
                    amplitude
                )));
            }
            bank.constant(amplitude)
        }
        "freq" => {
            let hz: f64 = parse_arg(parts.next(), line)?;
            if !(160.0..=1000.0).contains(&hz) {
                return Err(Error::InvalidParameter(format!(
                    "frequency {} out of range 160-1000 Hz",
                    hz
                )));
            }
            bank.set_carrier_hz(hz)
        }
        "cue" => {
            let effect: u8 = parse_arg(parts.next(), line)?;
            if effect == 0 || effect > 123 {
                return Err(Error::InvalidParameter(format!(
                    "effect {} out of range 1-123",
                    effect
                )));
            }
            bank.play_cue(effect)
        }
        _ => Err(Error::UnclassifiedInput(line.to_string())),
    }
}

fn parse_arg<T: std::str::FromStr>(arg: Option<&str>, line: &str) -> Result<T> {
    arg.and_then(|a| a.parse().ok())
        .ok_or_else(|| Error::UnclassifiedInput(line.to_string()))
}

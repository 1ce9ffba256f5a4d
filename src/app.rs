//! Application orchestration for the DandaIO daemon
//!
//! Wires the sensor pollers, button/switch input and the haptic bank into
//! the control cycle, and owns startup and graceful shutdown.
//!
//! Cycle order matters and mirrors the handle's behavior model:
//! 1. fuse the freshest samples into a feedback value (using the mode
//!    settled in the previous cycle),
//! 2. escalate sustained sensor faults into a full shutdown,
//! 3. consume button presses (range first, then mute),
//! 4. read the switch, retune the carrier, update the sensor selector,
//! 5. stage the feedback and drive the actuators,
//! 6. record the cycle to the measurement protocol.
//!
//! Mode edits therefore take effect on the next cycle's feedback, never
//! mid-cycle.

use crate::config::CaneConfig;
use crate::core::driver::DistanceSensor;
use crate::core::types::{OperatingMode, RangeClass, SensorSelect};
use crate::datalog::{Datalog, MeasureStatus};
use crate::devices::create_ultrasonic;
use crate::devices::tfluna::TfLuna;
use crate::error::{Error, Result};
use crate::fusion::Fusion;
use crate::gpio::{GpioInput, SysfsGpio};
use crate::haptics::{cue_effect, HapticBank};
use crate::input::{edge_watch_loop, EdgeLedger, Press, Switch};
use crate::pollers::{sensor_loop, SampleCell};
use crate::stage::StagePolicy;
use crate::transport::{shared_bus, I2cBus};

use log::{debug, error, info, warn};
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Loop pacing for cycles where the drive stage does not sleep itself
/// (silence and constant drive)
const CYCLE_IDLE: Duration = Duration::from_millis(20);

/// Button slot of the range-class button
const RANGE_BUTTON: usize = 0;
/// Button slot of the mute button
const MUTE_BUTTON: usize = 1;

/// Main application structure that manages all components
pub struct CaneApp {
    config: CaneConfig,
    haptics: HapticBank,
    fusion: Fusion,
    stage_policy: StagePolicy,
    switch: Switch,
    ledger: Arc<EdgeLedger>,
    ultrasonic_cell: Arc<SampleCell>,
    lidar_cell: Arc<SampleCell>,
    datalog: Arc<Datalog>,
    mode: OperatingMode,
    long_press_us: u64,
    series: u64,
    ultrasonic_name: &'static str,
    lidar_name: &'static str,
    // moved into their threads by run()
    ultrasonic: Option<Box<dyn DistanceSensor>>,
    lidar: Option<Box<dyn DistanceSensor>>,
    button_gpio: Option<Box<dyn GpioInput>>,
    threads: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl CaneApp {
    /// Create new CaneApp instance
    ///
    /// Opens the buses, initializes and calibrates the haptic bank, and
    /// constructs both sensor drivers. Nothing is polled yet.
    pub fn new(config: CaneConfig) -> Result<Self> {
        info!("Initializing DandaIO application");

        info!("Opening I2C bus {}", config.bus.device);
        let bus = shared_bus(Box::new(I2cBus::open(&config.bus.device)?));

        info!(
            "Initializing haptic bank ({} channels behind mux {:#04x})",
            config.haptics.channels.len(),
            config.haptics.mux_address
        );
        let mut haptics = HapticBank::new(&bus, &config.haptics)?;
        haptics.initialize()?;

        info!("Initializing TF-Luna at {:#04x}", config.lidar.i2c_address);
        let lidar = TfLuna::new(
            bus.clone(),
            config.lidar.i2c_address,
            config.lidar.strength_min,
        )?;
        let lidar: Box<dyn DistanceSensor> = Box::new(lidar);

        info!("Initializing ultrasonic sensor ({})", config.ultrasonic.kind);
        let ultrasonic = create_ultrasonic(&config.ultrasonic, &bus)?;

        let button_gpio = SysfsGpio::open(&config.input.button_pins)?;
        let switch_gpio = SysfsGpio::open(&config.input.switch_pins)?;
        let switch = Switch::new(Box::new(switch_gpio), config.input.switch_pins);

        let ledger = Arc::new(EdgeLedger::new(config.input.button_pins.len()));
        let datalog = Arc::new(Datalog::new(&config.logging.protocol_dir));
        if datalog.enabled() {
            info!(
                "Measurement protocol recording to {}",
                config.logging.protocol_dir
            );
        }

        let long_press_us = (config.input.long_press_secs * 1_000_000.0) as u64;

        info!("✓ Hardware initialized successfully");

        Ok(Self {
            fusion: Fusion::from_config(&config.fusion),
            stage_policy: StagePolicy::from_config(&config.stage),
            haptics,
            switch,
            ledger,
            ultrasonic_cell: Arc::new(SampleCell::new()),
            lidar_cell: Arc::new(SampleCell::new()),
            datalog,
            mode: OperatingMode::default(),
            long_press_us,
            series: 1,
            ultrasonic_name: ultrasonic.name(),
            lidar_name: lidar.name(),
            ultrasonic: Some(ultrasonic),
            lidar: Some(lidar),
            button_gpio: Some(Box::new(button_gpio)),
            threads: Vec::new(),
            shutdown: Arc::new(AtomicBool::new(false)),
            config,
        })
    }

    /// Start all background threads and run the control cycle
    ///
    /// Returns when a shutdown signal arrives or a cycle fails. A failed
    /// cycle is recorded to the exception log before the error is
    /// propagated; shutdown runs in both cases.
    pub fn run(&mut self) -> Result<()> {
        info!("Starting application threads");

        self.setup_signal_handler();
        self.start_button_watcher()?;
        self.start_pollers()?;

        info!("✓ All threads started successfully");
        info!("Press Ctrl+C to stop");

        let mut result = Ok(());
        while !self.shutdown.load(Ordering::Relaxed) {
            if let Err(e) = self.cycle() {
                error!("Control cycle failed: {}", e);
                self.datalog.record_exception(&e);
                result = Err(e);
                break;
            }
        }

        self.stop_all_threads();
        result
    }

    /// One pass of the control cycle
    fn cycle(&mut self) -> Result<()> {
        let ultrasonic = self.ultrasonic_cell.load();
        let lidar = self.lidar_cell.load();

        let feedback = self
            .fusion
            .feedback(ultrasonic.value_mm, lidar.value_mm, self.mode);

        // a faulted sample means the poller lost its transport
        if ultrasonic.fault.is_some() {
            return Err(Error::SensorLost(self.ultrasonic_name));
        }
        if lidar.fault.is_some() {
            return Err(Error::SensorLost(self.lidar_name));
        }

        self.process_button(RANGE_BUTTON)?;
        self.process_button(MUTE_BUTTON)?;

        let state = self.switch.read();
        self.haptics.set_carrier_state(state)?;
        self.mode.select = SensorSelect::from_switch(state);

        let stage = self.stage_policy.stage(feedback, self.mode.mute);
        self.haptics.drive(stage, &self.stage_policy)?;
        if self.stage_policy.pulse_hz(stage).is_none() {
            // silence and constant drive have no pulse sleep to pace the loop
            std::thread::sleep(CYCLE_IDLE);
        }

        self.datalog.record(
            "Main",
            &format!("0.{}", self.series),
            MeasureStatus::Ok,
            feedback as i64,
            None,
            None,
        );
        self.series += 1;

        Ok(())
    }

    /// Apply one pending press of the given button slot, if any
    ///
    /// Short presses announce the current mode with a confirmation cue;
    /// long presses toggle the mode and announce the new one. The raised
    /// cue (triple click) stands for far range / unmuted, the flat cue
    /// (sharp click) for near range / muted.
    fn process_button(&mut self, slot: usize) -> Result<()> {
        let Some(press) = self.ledger.consume(slot, self.long_press_us) else {
            return Ok(());
        };

        match (slot, press) {
            (RANGE_BUTTON, Press::Short) => {
                info!("Range button: announcing {:?}", self.mode.range);
                self.play_cue_audible(cue_effect(self.mode.range == RangeClass::Far))?;
            }
            (RANGE_BUTTON, Press::Long) => {
                self.mode.range = self.mode.range.toggled();
                info!("Range class switched to {:?}", self.mode.range);
                self.play_cue_audible(cue_effect(self.mode.range == RangeClass::Far))?;
            }
            (MUTE_BUTTON, Press::Short) => {
                info!(
                    "Mute button: announcing {}",
                    if self.mode.mute { "muted" } else { "unmuted" }
                );
                self.play_cue_audible(cue_effect(!self.mode.mute))?;
            }
            (MUTE_BUTTON, Press::Long) => {
                if self.mode.mute {
                    // leave standby before the cue so the cue is felt
                    self.mode.mute = false;
                    self.haptics.set_muted(false)?;
                    self.play_cue_audible(cue_effect(true))?;
                } else {
                    // cue while still armed, then enter standby
                    self.play_cue_audible(cue_effect(false))?;
                    self.mode.mute = true;
                    self.haptics.set_muted(true)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Play a confirmation cue even while muted
    ///
    /// Mute keeps the drivers in standby, which would swallow the cue, so
    /// standby is released around the playback and re-engaged after.
    fn play_cue_audible(&mut self, effect: u8) -> Result<()> {
        if self.mode.mute {
            self.haptics.set_muted(false)?;
            self.haptics.play_cue(effect)?;
            self.haptics.set_muted(true)?;
        } else {
            self.haptics.play_cue(effect)?;
        }
        Ok(())
    }

    /// Start the button edge watcher thread
    fn start_button_watcher(&mut self) -> Result<()> {
        let Some(gpio) = self.button_gpio.take() else {
            return Err(Error::Other("button watcher already started".to_string()));
        };

        let pins = self.config.input.button_pins.to_vec();
        let ledger = Arc::clone(&self.ledger);
        let debounce = Duration::from_millis(self.config.input.debounce_ms);
        let poll = Duration::from_millis(self.config.input.gpio_poll_ms);
        let shutdown = Arc::clone(&self.shutdown);

        let handle = std::thread::Builder::new()
            .name("button-watcher".to_string())
            .spawn(move || edge_watch_loop(gpio, pins, ledger, debounce, poll, shutdown))?;
        self.threads.push(handle);

        info!("✓ Button watcher started");
        Ok(())
    }

    /// Start one poller thread per ranging sensor
    fn start_pollers(&mut self) -> Result<()> {
        let Some(ultrasonic) = self.ultrasonic.take() else {
            return Err(Error::Other("pollers already started".to_string()));
        };
        let Some(lidar) = self.lidar.take() else {
            return Err(Error::Other("pollers already started".to_string()));
        };

        let cell = Arc::clone(&self.ultrasonic_cell);
        let shutdown = Arc::clone(&self.shutdown);
        let datalog = Arc::clone(&self.datalog);
        let period = Duration::from_millis(self.config.ultrasonic.poll_interval_ms);
        let handle = std::thread::Builder::new()
            .name("ultrasonic-poller".to_string())
            .spawn(move || sensor_loop(ultrasonic, cell, period, shutdown, datalog))?;
        self.threads.push(handle);

        let cell = Arc::clone(&self.lidar_cell);
        let shutdown = Arc::clone(&self.shutdown);
        let datalog = Arc::clone(&self.datalog);
        let period = Duration::from_millis(self.config.lidar.poll_interval_ms);
        let handle = std::thread::Builder::new()
            .name("lidar-poller".to_string())
            .spawn(move || sensor_loop(lidar, cell, period, shutdown, datalog))?;
        self.threads.push(handle);

        info!("✓ Sensor pollers started");
        Ok(())
    }

    /// Setup signal handler for graceful shutdown
    fn setup_signal_handler(&self) {
        let shutdown = Arc::clone(&self.shutdown);

        std::thread::Builder::new()
            .name("signal-handler".to_string())
            .spawn(move || {
                let mut signals =
                    Signals::new([SIGINT, SIGTERM]).expect("Failed to register signal handlers");

                if let Some(sig) = signals.forever().next() {
                    info!("Received signal {:?}, initiating shutdown...", sig);
                    shutdown.store(true, Ordering::Relaxed);
                }
            })
            .expect("Failed to spawn signal handler thread");
    }

    /// Stop all background threads and silence the actuators
    fn stop_all_threads(&mut self) {
        info!("Stopping all threads...");

        self.shutdown.store(true, Ordering::Relaxed);
        for handle in self.threads.drain(..) {
            if handle.join().is_err() {
                warn!("Worker thread panicked during shutdown");
            }
        }

        self.haptics.zero_all();

        info!("✓ All threads stopped");
    }
}

impl Drop for CaneApp {
    fn drop(&mut self) {
        debug!("CaneApp cleaning up...");

        // Ensure shutdown is signaled even on an early exit path
        self.shutdown.store(true, Ordering::Relaxed);
        self.stop_all_threads();
    }
}

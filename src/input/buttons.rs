//! Button edge capture and press classification
//!
//! A watcher thread polls the button pins and stamps press-start (falling
//! edge, buttons are active-low) and press-end (rising edge) times into a
//! shared ledger. The control loop classifies and resets a button's pair
//! once per cycle. Timestamps are microseconds from the ledger's creation;
//! zero marks an empty slot, so real stamps are clamped to at least 1.
//!
//! The ledger is read-then-reset shared state, not a queue: an edge landing
//! while a classification is in flight can be lost. Presses are human-paced
//! and the watcher restamps on the next press, so the loss window does not
//! matter in practice.

use crate::gpio::GpioInput;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Classified button press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Press {
    /// Shorter than the long-press threshold
    Short,
    /// Longer than the long-press threshold
    Long,
}

/// Classify a press from its edge timestamps
///
/// Needs both stamps present. A zero duration or a duration exactly equal
/// to the threshold classifies as nothing.
pub fn classify(fall_us: u64, rise_us: u64, threshold_us: u64) -> Option<Press> {
    if fall_us == 0 || rise_us == 0 {
        return None;
    }
    let duration = fall_us.abs_diff(rise_us);
    if duration == 0 || duration == threshold_us {
        return None;
    }
    if duration < threshold_us {
        Some(Press::Short)
    } else {
        Some(Press::Long)
    }
}

struct EdgePair {
    fall_us: AtomicU64,
    rise_us: AtomicU64,
}

/// Shared per-button edge timestamps
pub struct EdgeLedger {
    epoch: Instant,
    pairs: Vec<EdgePair>,
}

impl EdgeLedger {
    /// Create a ledger for `count` buttons
    pub fn new(count: usize) -> Self {
        EdgeLedger {
            epoch: Instant::now(),
            pairs: (0..count)
                .map(|_| EdgePair {
                    fall_us: AtomicU64::new(0),
                    rise_us: AtomicU64::new(0),
                })
                .collect(),
        }
    }

    /// Number of buttons tracked
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// True when no buttons are tracked
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    fn now_micros(&self) -> u64 {
        (self.epoch.elapsed().as_micros() as u64).max(1)
    }

    /// Stamp a press-start edge
    pub fn record_fall(&self, idx: usize) {
        if let Some(pair) = self.pairs.get(idx) {
            pair.fall_us.store(self.now_micros(), Ordering::Relaxed);
        }
    }

    /// Stamp a press-end edge
    pub fn record_rise(&self, idx: usize) {
        if let Some(pair) = self.pairs.get(idx) {
            pair.rise_us.store(self.now_micros(), Ordering::Relaxed);
        }
    }

    /// Classify and reset one button's edge pair
    ///
    /// Resets only when both stamps are present, so a press still in
    /// flight (fall recorded, rise pending) survives to the next cycle.
    pub fn consume(&self, idx: usize, threshold_us: u64) -> Option<Press> {
        let pair = self.pairs.get(idx)?;
        let fall = pair.fall_us.load(Ordering::Relaxed);
        let rise = pair.rise_us.load(Ordering::Relaxed);
        if fall == 0 || rise == 0 {
            return None;
        }
        pair.fall_us.store(0, Ordering::Relaxed);
        pair.rise_us.store(0, Ordering::Relaxed);
        classify(fall, rise, threshold_us)
    }
}

/// Poll button pins and stamp edges into the ledger until shutdown
///
/// Pins idle high (pull-up); a high-to-low change stamps press-start and a
/// low-to-high change stamps press-end. A change arriving inside the
/// debounce window of the last accepted edge is ignored outright; the pin
/// re-reads on the next poll, so contact bounce never stamps. Read errors
/// on one pin are logged and do not stall the other pins.
pub fn edge_watch_loop(
    mut gpio: Box<dyn GpioInput>,
    pins: Vec<u32>,
    ledger: Arc<EdgeLedger>,
    debounce: Duration,
    poll_interval: Duration,
    shutdown: Arc<AtomicBool>,
) {
    let mut last_level = vec![true; pins.len()];
    let mut last_change = vec![Instant::now(); pins.len()];

    while !shutdown.load(Ordering::Relaxed) {
        for (idx, &pin) in pins.iter().enumerate() {
            let level = match gpio.read_pin(pin) {
                Ok(level) => level,
                Err(e) => {
                    log::warn!("Button pin {}: read failed: {}", pin, e);
                    continue;
                }
            };

            if level == last_level[idx] {
                continue;
            }
            if last_change[idx].elapsed() < debounce {
                continue;
            }

            if level {
                ledger.record_rise(idx);
            } else {
                ledger.record_fall(idx);
            }
            last_level[idx] = level;
            last_change[idx] = Instant::now();
        }

        thread::sleep(poll_interval);
    }
}

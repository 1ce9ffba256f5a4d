//! Feedback staging: the continuous closeness value into discrete
//! vibration stages
//!
//! Stage 0 is silence, stages 1 through 4 are pulse trains of rising
//! repetition rate, stage 5 is constant vibration. The stage boundaries
//! partition the feedback scale into half-open bands, closed at the lower
//! edge, so every feedback value maps to exactly one stage.

use crate::config::StageConfig;
use crate::fusion::FEEDBACK_MAX;

/// Highest stage, constant vibration
pub const STAGE_CONSTANT: u8 = 5;

/// Staging policy: band boundaries and per-stage pulse rates
#[derive(Debug, Clone)]
pub struct StagePolicy {
    /// Lower bounds of stages 1 through 5 on the feedback scale
    pub thresholds: [f64; 5],
    /// Pulse repetition rate of stages 1 through 4 (Hz)
    pub pulse_hz: [f64; 4],
}

impl StagePolicy {
    /// Create from config
    pub fn from_config(config: &StageConfig) -> Self {
        Self {
            thresholds: config.thresholds,
            pulse_hz: config.pulse_hz,
        }
    }

    /// Map a feedback value to a stage
    ///
    /// Mute wins over any feedback. Out-of-scale values are clamped before
    /// banding, so a fused reading can never select an undefined stage.
    pub fn stage(&self, feedback: f64, mute: bool) -> u8 {
        if mute {
            return 0;
        }

        let feedback = feedback.clamp(0.0, FEEDBACK_MAX);
        for (i, threshold) in self.thresholds.iter().enumerate().rev() {
            if feedback >= *threshold {
                return (i + 1) as u8;
            }
        }
        0
    }

    /// Pulse repetition rate for a pulsed stage
    ///
    /// Stages 0 and 5 have no pulse rate: nothing plays in silence, and
    /// constant vibration does not pause between pulses.
    pub fn pulse_hz(&self, stage: u8) -> Option<f64> {
        match stage {
            1..=4 => Some(self.pulse_hz[usize::from(stage) - 1]),
            _ => None,
        }
    }
}

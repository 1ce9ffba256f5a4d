//! Measurement protocol and exception log
//!
//! Test instrumentation for field measurement runs: every sample source
//! appends to its own CSV file, one line per sample:
//!
//! `{series},{YYYY-MM-DD},{HH:MM:SS:mmm},{value_or_error},{unit}[,{strength}][,{temp}]`
//!
//! Fatal daemon errors append to `exception_log.csv` in the same directory.
//! Recording is disabled (every call a no-op) when no protocol directory is
//! configured, which is the production default. Write failures are logged
//! and never propagate into the control path.

use crate::core::types::{DistanceSample, FaultKind};
use crate::error::Error;

use chrono::Local;
use parking_lot::Mutex;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

/// Sample status recorded in the value column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasureStatus {
    /// Valid measurement, the value column carries the distance
    Ok,
    /// Frame discarded for a checksum mismatch
    ChecksumError,
    /// Transport could not be read at all
    SerialFailed,
    /// Reading above the sensor's rated maximum
    AboveLimit,
    /// Reading below the sensor's rated minimum
    BelowLimit,
    /// No data arrived within the read deadline
    NoData,
}

impl MeasureStatus {
    /// Value column text for this status
    pub fn value_string(self, distance_mm: i64) -> String {
        match self {
            MeasureStatus::Ok => format!("{}", distance_mm),
            MeasureStatus::ChecksumError => "ERROR".to_string(),
            MeasureStatus::SerialFailed => "Serial open failed!".to_string(),
            MeasureStatus::AboveLimit => format!("Above the upper limit: {}", distance_mm),
            MeasureStatus::BelowLimit => format!("Below the lower limit: {}", distance_mm),
            MeasureStatus::NoData => "No data!".to_string(),
        }
    }
}

/// Appending CSV recorder, one file per sample source
pub struct Datalog {
    dir: Option<PathBuf>,
    files: Mutex<HashMap<String, File>>,
}

impl Datalog {
    /// Create a recorder writing into `protocol_dir`
    ///
    /// An empty directory string disables recording entirely.
    pub fn new(protocol_dir: &str) -> Self {
        let dir = if protocol_dir.is_empty() {
            None
        } else {
            Some(PathBuf::from(protocol_dir))
        };
        Datalog {
            dir,
            files: Mutex::new(HashMap::new()),
        }
    }

    /// True when recording is configured
    pub fn enabled(&self) -> bool {
        self.dir.is_some()
    }

    /// Append one measurement line to the source's file
    pub fn record(
        &self,
        source: &str,
        series: &str,
        status: MeasureStatus,
        distance_mm: i64,
        strength: Option<u16>,
        temp: Option<i16>,
    ) {
        let Some(dir) = &self.dir else {
            return;
        };

        let now = Local::now();
        let mut line = format!(
            "{},{},{},{},mm",
            series,
            now.format("%Y-%m-%d"),
            now.format("%H:%M:%S:%3f"),
            status.value_string(distance_mm),
        );
        if let Some(strength) = strength.filter(|s| *s > 0) {
            line.push_str(&format!(",{}", strength));
        }
        if let Some(temp) = temp.filter(|t| *t > 0) {
            line.push_str(&format!(",{}", temp));
        }
        line.push('\n');

        let path = dir.join(format!("{}.csv", source));
        let mut files = self.files.lock();
        let file = match files.entry(source.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                match OpenOptions::new().create(true).append(true).open(&path) {
                    Ok(file) => entry.insert(file),
                    Err(e) => {
                        log::warn!("Protocol file {:?}: open failed: {}", path, e);
                        return;
                    }
                }
            }
        };
        if let Err(e) = file.write_all(line.as_bytes()).and_then(|_| file.flush()) {
            log::warn!("Protocol file {:?}: write failed: {}", path, e);
        }
    }

    /// Append one sample, mapping its fault class to a protocol status
    pub fn record_sample(&self, source: &str, series: &str, sample: &DistanceSample) {
        let status = match sample.fault {
            None => MeasureStatus::Ok,
            Some(FaultKind::Timeout) => MeasureStatus::NoData,
            Some(FaultKind::Io) => MeasureStatus::SerialFailed,
        };
        self.record(
            source,
            series,
            status,
            i64::from(sample.value_mm),
            sample.strength,
            None,
        );
    }

    /// Append the terminating error to the exception log
    pub fn record_exception(&self, error: &Error) {
        let Some(dir) = &self.dir else {
            return;
        };

        let now = Local::now();
        let line = format!(
            "{},{},{},{}\n",
            now.format("%Y-%m-%d"),
            now.format("%H:%M:%S:%3f"),
            error.kind_name(),
            error,
        );

        let path = dir.join("exception_log.csv");
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .and_then(|mut f| f.write_all(line.as_bytes()));
        if let Err(e) = result {
            log::warn!("Exception log {:?}: write failed: {}", path, e);
        }
    }
}

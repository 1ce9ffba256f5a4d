//! ME007YS waterproof ultrasonic ranging sensor
//!
//! Frame format: [0xFF] [DIST_H] [DIST_L] [CHECKSUM]
//!
//! Checksum: low byte of the sum of the first three frame bytes.
//! The sensor streams frames continuously at its own cadence; polling
//! waits for a complete frame and discards anything left in the buffer
//! so the next poll starts on a frame boundary.

use crate::core::driver::DistanceSensor;
use crate::core::types::{DistanceSample, FaultKind};
use crate::error::{Error, Result};
use crate::transport::Transport;

use std::thread;
use std::time::{Duration, Instant};

/// Frame start byte
pub const FRAME_HEADER: u8 = 0xFF;
/// Frame length in bytes
pub const FRAME_LEN: usize = 4;
/// Lower bound of the rated measuring range (mm)
pub const DISTANCE_MIN_MM: u16 = 280;
/// Upper bound of the rated measuring range (mm)
pub const DISTANCE_MAX_MM: u16 = 4500;

/// Idle wait between buffer checks while a frame accumulates
const FRAME_WAIT: Duration = Duration::from_millis(5);

/// Validate a frame and extract the raw distance in mm
pub fn decode_frame(frame: &[u8; FRAME_LEN]) -> Result<u16> {
    if frame[0] != FRAME_HEADER {
        return Err(Error::InvalidFrame(format!(
            "bad header {:#04x}",
            frame[0]
        )));
    }

    let expected = (frame[0] as u16 + frame[1] as u16 + frame[2] as u16) as u8;
    if expected != frame[3] {
        return Err(Error::ChecksumError {
            expected,
            actual: frame[3],
        });
    }

    Ok(u16::from(frame[2]) + u16::from(frame[1]) * 256)
}

/// Apply the rated-range rules to a raw reading
///
/// Readings above the rated maximum clamp to it. Readings below the
/// rated minimum are unreliable echoes and report as maximum range,
/// except a reading of exactly the minimum, which the sensor emits for
/// a contact-distance obstacle and which reports as zero.
pub fn apply_range(raw_mm: u16) -> u16 {
    if raw_mm > DISTANCE_MAX_MM {
        return DISTANCE_MAX_MM;
    }
    if raw_mm == DISTANCE_MIN_MM {
        return 0;
    }
    if raw_mm < DISTANCE_MIN_MM {
        return DISTANCE_MAX_MM;
    }
    raw_mm
}

/// ME007YS driver over a byte-stream transport
pub struct Me007ys {
    transport: Box<dyn Transport>,
    read_deadline: Duration,
}

impl Me007ys {
    /// Create a driver reading frames from `transport`
    ///
    /// `read_deadline` bounds how long a single poll waits for a valid
    /// frame before reporting a timeout fault.
    pub fn new(transport: Box<dyn Transport>, read_deadline: Duration) -> Self {
        Me007ys {
            transport,
            read_deadline,
        }
    }

    /// Try to read one frame
    ///
    /// Returns Ok(Some(distance)) when a valid frame was decoded,
    /// Ok(None) if no complete frame is buffered yet or the buffered
    /// frame failed validation, Err(_) on transport error.
    fn try_read_frame(&mut self) -> Result<Option<u16>> {
        if self.transport.available()? < FRAME_LEN {
            return Ok(None);
        }

        let mut frame = [0u8; FRAME_LEN];
        let read = self.transport.read(&mut frame)?;

        // Drop any partial follow-on frame so the next read starts
        // on a frame boundary.
        self.drain()?;

        if read < FRAME_LEN {
            return Ok(None);
        }

        match decode_frame(&frame) {
            Ok(raw) => Ok(Some(apply_range(raw))),
            Err(e) => {
                log::debug!("ME007YS: discarding frame: {}", e);
                Ok(None)
            }
        }
    }

    fn drain(&mut self) -> Result<()> {
        let mut scratch = [0u8; 64];
        while self.transport.available()? > 0 {
            if self.transport.read(&mut scratch)? == 0 {
                break;
            }
        }
        Ok(())
    }
}

impl DistanceSensor for Me007ys {
    fn name(&self) -> &'static str {
        "ME007YS"
    }

    fn poll(&mut self) -> DistanceSample {
        let start = Instant::now();
        loop {
            match self.try_read_frame() {
                Ok(Some(mm)) => return DistanceSample::valid(mm),
                Ok(None) => {}
                Err(e) => {
                    log::warn!("ME007YS: read error: {}", e);
                    return DistanceSample::faulted(FaultKind::Io);
                }
            }

            if start.elapsed() >= self.read_deadline {
                log::warn!(
                    "ME007YS: no valid frame within {}ms",
                    self.read_deadline.as_millis()
                );
                return DistanceSample::faulted(FaultKind::Timeout);
            }

            thread::sleep(FRAME_WAIT);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockTransport;

    fn frame(distance_mm: u16) -> [u8; 4] {
        let hi = (distance_mm / 256) as u8;
        let lo = (distance_mm % 256) as u8;
        let sum = (FRAME_HEADER as u16 + hi as u16 + lo as u16) as u8;
        [FRAME_HEADER, hi, lo, sum]
    }

    fn driver(transport: MockTransport) -> Me007ys {
        Me007ys::new(Box::new(transport), Duration::from_millis(30))
    }

    #[test]
    fn test_decode_valid_frame() {
        assert_eq!(decode_frame(&frame(1234)).unwrap(), 1234);
        assert_eq!(decode_frame(&frame(300)).unwrap(), 300);
    }

    #[test]
    fn test_decode_rejects_bad_header() {
        let mut f = frame(1000);
        f[0] = 0x55;
        assert!(matches!(decode_frame(&f), Err(Error::InvalidFrame(_))));
    }

    #[test]
    fn test_decode_rejects_bad_checksum() {
        let mut f = frame(1000);
        f[3] = f[3].wrapping_add(1);
        assert!(matches!(
            decode_frame(&f),
            Err(Error::ChecksumError { .. })
        ));
    }

    #[test]
    fn test_range_rules() {
        // in range passes through
        assert_eq!(apply_range(1000), 1000);
        assert_eq!(apply_range(DISTANCE_MAX_MM), DISTANCE_MAX_MM);
        // above max clamps
        assert_eq!(apply_range(5000), DISTANCE_MAX_MM);
        // exactly min means contact distance
        assert_eq!(apply_range(DISTANCE_MIN_MM), 0);
        // below min is an unreliable echo
        assert_eq!(apply_range(100), DISTANCE_MAX_MM);
        assert_eq!(apply_range(DISTANCE_MIN_MM - 1), DISTANCE_MAX_MM);
    }

    #[test]
    fn test_poll_returns_valid_sample() {
        let transport = MockTransport::new();
        transport.inject_read(&frame(1500));
        let mut sensor = driver(transport);

        let sample = sensor.poll();
        assert!(sample.valid);
        assert_eq!(sample.value_mm, 1500);
        assert!(sample.fault.is_none());
    }

    #[test]
    fn test_poll_drains_trailing_bytes() {
        let transport = MockTransport::new();
        let mut bytes = frame(1500).to_vec();
        // partial next frame left in the buffer
        bytes.extend_from_slice(&[FRAME_HEADER, 0x01]);
        transport.inject_read(&bytes);
        let mut probe = transport.clone();
        let mut sensor = driver(transport);

        let sample = sensor.poll();
        assert!(sample.valid);
        assert_eq!(sample.value_mm, 1500);
        assert_eq!(probe.available().unwrap(), 0);
    }

    #[test]
    fn test_poll_times_out_without_data() {
        let transport = MockTransport::new();
        let mut sensor = driver(transport);

        let sample = sensor.poll();
        assert!(!sample.valid);
        assert_eq!(sample.fault, Some(FaultKind::Timeout));
        assert_eq!(sample.value_mm, crate::core::types::NO_OBSTACLE_MM);
    }

    #[test]
    fn test_poll_times_out_on_corrupt_frames() {
        let transport = MockTransport::new();
        let mut f = frame(1500);
        f[3] ^= 0xFF;
        transport.inject_read(&f);
        let mut sensor = driver(transport);

        let sample = sensor.poll();
        assert!(!sample.valid);
        assert_eq!(sample.fault, Some(FaultKind::Timeout));
    }
}

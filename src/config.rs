//! Configuration for the DandaIO daemon
//!
//! Loads configuration from a TOML file covering the bus devices, both
//! ranging sensors, the feedback policies and the haptic channel layout.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Top-level application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CaneConfig {
    pub bus: BusConfig,
    pub ultrasonic: UltrasonicConfig,
    pub lidar: LidarConfig,
    pub fusion: FusionConfig,
    pub stage: StageConfig,
    pub input: InputConfig,
    pub logging: LoggingConfig,
    pub haptics: HapticsConfig,
}

/// Shared I2C bus
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BusConfig {
    /// I2C character device shared by the lidar, the I2C ultrasonic
    /// variant and the actuator multiplexer
    pub device: String,
}

/// Ultrasonic ranging sensor
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UltrasonicConfig {
    /// Sensor variant: "urm09" (I2C) or "me007ys" (serial)
    pub kind: String,
    /// Serial device, me007ys only
    pub port: String,
    /// Serial baud rate, me007ys only
    pub baud_rate: u32,
    /// Longest wait for a valid serial frame before the poll is
    /// reported as timed out, me007ys only
    pub read_deadline_ms: u64,
    /// Device address, urm09 only
    pub i2c_address: u8,
    /// Poller cycle period
    pub poll_interval_ms: u64,
}

/// Lidar ranging sensor (TF-Luna)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LidarConfig {
    /// Device address
    pub i2c_address: u8,
    /// Readings with a signal-strength word below this are unreliable
    /// and get mapped to maximum range
    pub strength_min: u16,
    /// Poller cycle period
    pub poll_interval_ms: u64,
}

/// Proximity fusion policy
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FusionConfig {
    /// Distance ceiling of the short range class, millimeters
    pub near_ceiling_mm: u16,
    /// Distance ceiling of the long range class, millimeters
    pub far_ceiling_mm: u16,
}

/// Feedback staging policy
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StageConfig {
    /// Lower feedback bound of stages 1 through 5; below the first
    /// threshold the output is silent
    pub thresholds: [f64; 5],
    /// Pulse repetition rate of stages 1 through 4, hertz
    pub pulse_hz: [f64; 4],
}

/// Button and switch wiring
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InputConfig {
    /// BCM pins of the range button and the mute button, active low
    pub button_pins: [u32; 2],
    /// BCM pins of the 3-position switch, active low, one per position
    pub switch_pins: [u32; 3],
    /// Edges within this window of the last accepted edge are bounce
    pub debounce_ms: u64,
    /// Presses held at least this long toggle the mode
    pub long_press_secs: f64,
    /// Button edge sampling period
    pub gpio_poll_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Directory for measurement protocol CSV files; empty disables
    /// protocol recording
    pub protocol_dir: String,
}

/// Haptic actuator bank behind the TCA9548A multiplexer
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HapticsConfig {
    /// Multiplexer device address
    pub mux_address: u8,
    /// DRV2605 device address, identical on every channel
    pub device_address: u8,
    /// Auto-calibration attempts per channel before driving with
    /// default compensation
    pub calibration_retries: u32,
    /// Carrier frequency per switch position, hertz
    pub carrier_hz: [f64; 3],
    /// Amplitude of the constant-drive stage, 0 to 127
    pub max_intensity: u8,
    /// Populated multiplexer channels
    pub channels: Vec<HapticChannelConfig>,
}

/// One DRV2605 channel
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HapticChannelConfig {
    /// Multiplexer channel, 0 to 7
    pub mux_channel: u8,
    /// Exciter model: "exs2608" or "exs241408"
    pub exciter: String,
}

impl CaneConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: CaneConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Default configuration for the V.2 handle build
    ///
    /// One EXS 2608L-03A exciter on multiplexer channel 0, URM09 and
    /// TF-Luna on the shared I2C bus. Suitable for testing and
    /// development; deployments should use a TOML configuration file.
    pub fn v2_defaults() -> Self {
        Self {
            bus: BusConfig {
                device: "/dev/i2c-1".to_string(),
            },
            ultrasonic: UltrasonicConfig {
                kind: "urm09".to_string(),
                port: "/dev/serial0".to_string(),
                baud_rate: 9600,
                read_deadline_ms: 1000,
                i2c_address: 0x11,
                poll_interval_ms: 50,
            },
            lidar: LidarConfig {
                i2c_address: 0x10,
                strength_min: 100,
                poll_interval_ms: 20,
            },
            fusion: FusionConfig {
                near_ceiling_mm: 1500,
                far_ceiling_mm: 3000,
            },
            stage: StageConfig {
                thresholds: [10.0, 200.0, 400.0, 600.0, 800.0],
                pulse_hz: [3.0, 5.0, 8.0, 13.0],
            },
            input: InputConfig {
                button_pins: [17, 27],
                switch_pins: [23, 24, 25],
                debounce_ms: 50,
                long_press_secs: 1.0,
                gpio_poll_ms: 5,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                protocol_dir: String::new(),
            },
            haptics: HapticsConfig {
                mux_address: 0x70,
                device_address: 0x5A,
                calibration_retries: 9,
                carrier_hz: [150.0, 200.0, 250.0],
                max_intensity: 127,
                channels: vec![HapticChannelConfig {
                    mux_channel: 0,
                    exciter: "exs2608".to_string(),
                }],
            },
        }
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }
}

impl Default for CaneConfig {
    fn default() -> Self {
        Self::v2_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CaneConfig::v2_defaults();
        assert_eq!(config.bus.device, "/dev/i2c-1");
        assert_eq!(config.ultrasonic.kind, "urm09");
        assert_eq!(config.lidar.i2c_address, 0x10);
        assert_eq!(config.fusion.near_ceiling_mm, 1500);
        assert_eq!(config.fusion.far_ceiling_mm, 3000);
        assert_eq!(config.stage.thresholds, [10.0, 200.0, 400.0, 600.0, 800.0]);
        assert_eq!(config.stage.pulse_hz, [3.0, 5.0, 8.0, 13.0]);
        assert_eq!(config.input.button_pins, [17, 27]);
        assert_eq!(config.input.switch_pins, [23, 24, 25]);
        assert_eq!(config.haptics.channels.len(), 1);
        assert_eq!(config.haptics.channels[0].mux_channel, 0);
    }

    #[test]
    fn test_toml_serialization() {
        let config = CaneConfig::v2_defaults();
        let toml_string = toml::to_string_pretty(&config).unwrap();

        // Should contain all sections
        assert!(toml_string.contains("[bus]"));
        assert!(toml_string.contains("[ultrasonic]"));
        assert!(toml_string.contains("[lidar]"));
        assert!(toml_string.contains("[fusion]"));
        assert!(toml_string.contains("[stage]"));
        assert!(toml_string.contains("[input]"));
        assert!(toml_string.contains("[logging]"));
        assert!(toml_string.contains("[[haptics.channels]]"));

        // Should contain key values
        assert!(toml_string.contains("kind = \"urm09\""));
        assert!(toml_string.contains("near_ceiling_mm = 1500"));
        assert!(toml_string.contains("exciter = \"exs2608\""));
    }

    #[test]
    fn test_toml_deserialization() {
        let toml_content = r#"
[bus]
device = "/dev/i2c-5"

[ultrasonic]
kind = "me007ys"
port = "/dev/ttyUSB0"
baud_rate = 9600
read_deadline_ms = 500
i2c_address = 0x11
poll_interval_ms = 50

[lidar]
i2c_address = 0x10
strength_min = 150
poll_interval_ms = 20

[fusion]
near_ceiling_mm = 1200
far_ceiling_mm = 2400

[stage]
thresholds = [10.0, 200.0, 400.0, 600.0, 800.0]
pulse_hz = [3.0, 5.0, 8.0, 13.0]

[input]
button_pins = [17, 27]
switch_pins = [23, 24, 25]
debounce_ms = 50
long_press_secs = 1.5
gpio_poll_ms = 5

[logging]
level = "debug"
protocol_dir = "/tmp/protocol"

[haptics]
mux_address = 0x70
device_address = 0x5A
calibration_retries = 3
carrier_hz = [150.0, 200.0, 250.0]
max_intensity = 100

[[haptics.channels]]
mux_channel = 0
exciter = "exs2608"

[[haptics.channels]]
mux_channel = 3
exciter = "exs241408"
"#;

        let config: CaneConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.bus.device, "/dev/i2c-5");
        assert_eq!(config.ultrasonic.kind, "me007ys");
        assert_eq!(config.fusion.near_ceiling_mm, 1200);
        assert_eq!(config.input.long_press_secs, 1.5);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.haptics.channels.len(), 2);
        assert_eq!(config.haptics.channels[1].mux_channel, 3);
        assert_eq!(config.haptics.channels[1].exciter, "exs241408");
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("danda-io.toml");

        let config = CaneConfig::v2_defaults();
        config.to_file(&path).unwrap();
        let loaded = CaneConfig::from_file(&path).unwrap();

        assert_eq!(loaded.ultrasonic.kind, config.ultrasonic.kind);
        assert_eq!(loaded.stage.thresholds, config.stage.thresholds);
        assert_eq!(
            loaded.haptics.channels[0].exciter,
            config.haptics.channels[0].exciter
        );

        assert!(CaneConfig::from_file(dir.path().join("missing.toml")).is_err());
    }
}

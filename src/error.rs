//! Error types for DandaIO

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// DandaIO error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Serial port error
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration parse error
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration serialize error
    #[error("Config write error: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    /// Device initialization failed
    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    /// Communication timeout
    #[error("Communication timeout")]
    Timeout,

    /// Invalid frame or response
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    /// Checksum mismatch
    #[error("Checksum error: expected {expected:#04x}, got {actual:#04x}")]
    ChecksumError {
        /// Expected checksum value
        expected: u8,
        /// Actual checksum value
        actual: u8,
    },

    /// Auto-calibration gave up after the retry budget
    #[error("Calibration failed on channel {channel} after {attempts} attempts")]
    CalibrationFailed {
        /// Multiplexer channel of the actuator
        channel: u8,
        /// Attempts made before giving up
        attempts: u32,
    },

    /// Sensor poller reported a sustained transport fault
    #[error("Sensor lost: {0}")]
    SensorLost(&'static str),

    /// Actuator channel transport failure outside calibration
    #[error("Actuator channel fault: {0}")]
    ChannelFault(String),

    /// Unknown sensor type in configuration
    #[error("Unknown sensor type: {0}")]
    UnknownSensor(String),

    /// Unknown exciter type in configuration
    #[error("Unknown exciter type: {0}")]
    UnknownExciter(String),

    /// Malformed command in manual test tooling
    #[error("Unclassified input: {0}")]
    UnclassifiedInput(String),

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Short variant name, used by the exception log
    pub fn kind_name(&self) -> &'static str {
        match self {
            Error::Serial(_) => "Serial",
            Error::Io(_) => "Io",
            Error::ConfigParse(_) => "ConfigParse",
            Error::ConfigWrite(_) => "ConfigWrite",
            Error::InitializationFailed(_) => "InitializationFailed",
            Error::Timeout => "Timeout",
            Error::InvalidFrame(_) => "InvalidFrame",
            Error::ChecksumError { .. } => "ChecksumError",
            Error::CalibrationFailed { .. } => "CalibrationFailed",
            Error::SensorLost(_) => "SensorLost",
            Error::ChannelFault(_) => "ChannelFault",
            Error::UnknownSensor(_) => "UnknownSensor",
            Error::UnknownExciter(_) => "UnknownExciter",
            Error::UnclassifiedInput(_) => "UnclassifiedInput",
            Error::InvalidParameter(_) => "InvalidParameter",
            Error::Other(_) => "Other",
        }
    }
}

//! DandaIO - Hardware I/O library for the smart cane handle
//!
//! This library provides the components of the assistive navigation
//! daemon: ranging sensor drivers, proximity fusion, feedback staging,
//! the haptic actuator bank and the button/switch input layer.
//!
//! The `app` module ties them into the control cycle; the binary in
//! `main.rs` is a thin wrapper around it.

pub mod app;
pub mod config;
pub mod core;
pub mod datalog;
pub mod devices;
pub mod error;
pub mod fusion;
pub mod gpio;
pub mod haptics;
pub mod input;
pub mod pollers;
pub mod stage;
pub mod transport;

// Re-export commonly used types
pub use config::CaneConfig;
pub use error::{Error, Result};

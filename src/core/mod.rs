//! Core types and driver traits

pub mod driver;
pub mod types;

//! File-system storage for configuration and calibration data.

pub mod calibration;
pub mod config;

//! Domain layer for projtouch-hub.
//!
//! Pure configuration types with no dependencies on I/O, networking, or
//! external frameworks. The infrastructure layer populates these from the
//! TOML config file and CLI arguments; tests construct them directly.

pub mod config;

pub use config::{DetectionConfig, HubConfig, TapConfig};

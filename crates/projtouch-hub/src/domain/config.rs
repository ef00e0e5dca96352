//! Hub configuration types.
//!
//! [`HubConfig`] is the single source of truth for runtime settings. It is
//! deserialized from a TOML file by `infrastructure::storage::config`, with
//! every field individually defaulted so a partial (or absent) file works on
//! first run:
//!
//! ```toml
//! bind_addr = "0.0.0.0:8765"
//! calibration_path = "calibration.json"
//!
//! [tap]
//! test_mode = true
//!
//! [detection]
//! min_confidence = 0.6
//! target_fps = 10.0
//! ```
//!
//! Keeping configuration as a plain struct (no global state, no environment
//! reads inside the domain) makes the hub easy to embed in tests.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level hub configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HubConfig {
    /// Address the subscriber WebSocket server binds to. `0.0.0.0` accepts
    /// connections from any interface; use `127.0.0.1` for local-only setups.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Where the calibration homography is persisted. Relative paths resolve
    /// against the working directory of the daemon.
    #[serde(default = "default_calibration_path")]
    pub calibration_path: PathBuf,

    /// Tap/touch worker settings.
    #[serde(default)]
    pub tap: TapConfig,

    /// Object-detection worker settings.
    #[serde(default)]
    pub detection: DetectionConfig,
}

/// Settings for the tap sensing worker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TapConfig {
    /// When `true`, the worker replays a fixed synthetic tap cycle instead of
    /// opening the camera. Useful for exercising display clients without
    /// hardware.
    #[serde(default)]
    pub test_mode: bool,

    /// Index of the capture device the sensing-mode loop opens.
    #[serde(default)]
    pub camera_index: u32,
}

/// Settings for the object-detection sensing worker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectionConfig {
    /// When `false`, start-all skips the detection worker entirely.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// When `true`, the worker runs against the built-in synthetic frame
    /// source and scripted model instead of real hardware.
    #[serde(default)]
    pub synthetic: bool,

    /// Index of the capture device.
    #[serde(default)]
    pub camera_index: u32,

    /// Model weights identifier handed to the detection backend.
    #[serde(default = "default_model")]
    pub model: String,

    /// Detections below this confidence are dropped before broadcasting.
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,

    /// Target detection cycles per second; the worker sleeps away the
    /// remainder of each period after capture + inference.
    #[serde(default = "default_target_fps")]
    pub target_fps: f64,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_bind_addr() -> String {
    "0.0.0.0:8765".to_string()
}
fn default_calibration_path() -> PathBuf {
    PathBuf::from("calibration.json")
}
fn default_true() -> bool {
    true
}
fn default_model() -> String {
    "yolov8n.pt".to_string()
}
fn default_min_confidence() -> f64 {
    0.5
}
fn default_target_fps() -> f64 {
    5.0
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            calibration_path: default_calibration_path(),
            tap: TapConfig::default(),
            detection: DetectionConfig::default(),
        }
    }
}

impl Default for TapConfig {
    fn default() -> Self {
        Self {
            test_mode: false,
            camera_index: 0,
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            synthetic: false,
            camera_index: 0,
            model: default_model(),
            min_confidence: default_min_confidence(),
            target_fps: default_target_fps(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

//! Configuration file loading.
//!
//! The hub reads a single TOML file at startup. A missing file is not an
//! error: the hub runs on defaults so a fresh install needs no setup step.
//! A file that exists but fails to parse is an error, so a typo cannot
//! silently revert a deployment to defaults.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::domain::config::HubConfig;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads the hub configuration from `path`.
///
/// Returns defaults when the file does not exist.
pub fn load_config(path: &Path) -> Result<HubConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(toml::from_str(&text)?),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "no config file found, using defaults");
            Ok(HubConfig::default())
        }
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use uuid::Uuid;

    fn temp_config_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("projtouch_config_{}_{}.toml", tag, Uuid::new_v4()))
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        // Arrange
        let path = temp_config_path("missing");

        // Act
        let config = load_config(&path).expect("load failed");

        // Assert
        assert_eq!(config, HubConfig::default());
    }

    #[test]
    fn test_load_parses_full_file() {
        // Arrange
        let path = temp_config_path("full");
        fs::write(
            &path,
            r#"
bind_addr = "127.0.0.1:9000"
calibration_path = "/var/lib/projtouch/calibration.json"

[tap]
test_mode = true
camera_index = 2

[detection]
enabled = false
synthetic = true
camera_index = 1
model = "yolov8s.pt"
min_confidence = 0.25
target_fps = 10.0
"#,
        )
        .expect("write failed");

        // Act
        let config = load_config(&path).expect("load failed");
        fs::remove_file(&path).ok();

        // Assert
        assert_eq!(config.bind_addr, "127.0.0.1:9000");
        assert_eq!(
            config.calibration_path,
            PathBuf::from("/var/lib/projtouch/calibration.json")
        );
        assert!(config.tap.test_mode);
        assert_eq!(config.tap.camera_index, 2);
        assert!(!config.detection.enabled);
        assert!(config.detection.synthetic);
        assert_eq!(config.detection.camera_index, 1);
        assert_eq!(config.detection.model, "yolov8s.pt");
        assert_eq!(config.detection.min_confidence, 0.25);
        assert_eq!(config.detection.target_fps, 10.0);
    }

    #[test]
    fn test_load_partial_file_keeps_defaults_for_the_rest() {
        // Arrange
        let path = temp_config_path("partial");
        fs::write(&path, "bind_addr = \"0.0.0.0:9100\"\n").expect("write failed");

        // Act
        let config = load_config(&path).expect("load failed");
        fs::remove_file(&path).ok();

        // Assert
        assert_eq!(config.bind_addr, "0.0.0.0:9100");
        assert_eq!(config.detection, HubConfig::default().detection);
        assert_eq!(config.tap, HubConfig::default().tap);
    }

    #[test]
    fn test_load_malformed_file_is_an_error() {
        // Arrange
        let path = temp_config_path("malformed");
        fs::write(&path, "bind_addr = [this is not toml").expect("write failed");

        // Act
        let result = load_config(&path);
        fs::remove_file(&path).ok();

        // Assert
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}

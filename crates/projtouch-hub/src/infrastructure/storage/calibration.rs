//! Calibration persistence.
//!
//! The transform is stored as a small JSON document with a single `"H"` key
//! holding the 3x3 matrix, row by row. Loading is deliberately forgiving: a
//! missing, unreadable, or malformed file all mean "not calibrated", never a
//! startup failure.

use std::path::{Path, PathBuf};

use projtouch_core::Homography;
use serde::{Deserialize, Serialize};

/// On-disk layout of the calibration file.
#[derive(Debug, Serialize, Deserialize)]
struct StoredCalibration {
    #[serde(rename = "H")]
    h: Vec<Vec<f64>>,
}

/// Error type for calibration persistence.
#[derive(Debug, thiserror::Error)]
pub enum CalibrationStoreError {
    #[error("failed to write calibration file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize calibration: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// File-backed store for the projection calibration.
pub struct CalibrationStore {
    path: PathBuf,
}

impl CalibrationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persists the transform, replacing any previous file.
    pub fn save(&self, homography: &Homography) -> Result<(), CalibrationStoreError> {
        let stored = StoredCalibration {
            h: homography.matrix().iter().map(|row| row.to_vec()).collect(),
        };
        let payload = serde_json::to_string(&stored)?;
        std::fs::write(&self.path, payload).map_err(|source| CalibrationStoreError::Io {
            path: self.path.clone(),
            source,
        })?;
        tracing::info!(path = %self.path.display(), "calibration saved");
        Ok(())
    }

    /// Loads the persisted transform.
    ///
    /// Returns `None` when the file is missing or does not hold a 3x3 matrix.
    /// Bad files are logged and treated as not calibrated.
    pub fn load(&self) -> Option<Homography> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "failed to read calibration file");
                return None;
            }
        };
        let stored: StoredCalibration = match serde_json::from_str(&text) {
            Ok(stored) => stored,
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "calibration file is not valid JSON");
                return None;
            }
        };
        match matrix_from_rows(&stored.h) {
            Some(m) => Some(Homography::from_matrix(m)),
            None => {
                tracing::warn!(path = %self.path.display(), "calibration file does not hold a 3x3 matrix");
                None
            }
        }
    }

    /// Deletes the persisted calibration. Succeeds when no file exists.
    pub fn clear(&self) -> Result<(), CalibrationStoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::info!(path = %self.path.display(), "calibration cleared");
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(CalibrationStoreError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

fn matrix_from_rows(rows: &[Vec<f64>]) -> Option<[[f64; 3]; 3]> {
    if rows.len() != 3 {
        return None;
    }
    let mut m = [[0.0; 3]; 3];
    for (i, row) in rows.iter().enumerate() {
        if row.len() != 3 {
            return None;
        }
        m[i].copy_from_slice(row);
    }
    Some(m)
}

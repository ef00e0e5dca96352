//! Calibration service.
//!
//! Owns the live transform shared with the event normalizer and keeps it in
//! step with the persisted calibration file. A new calibration is activated
//! only after persistence succeeds, so the live state never gets ahead of
//! disk; clearing drops the live state even if the file was already gone.

use std::sync::Arc;

use projtouch_core::{Homography, HomographyError};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::infrastructure::storage::calibration::{CalibrationStore, CalibrationStoreError};

/// Live projection transform shared across the hub.
///
/// `None` means not calibrated; detections pass through unmapped.
pub type SharedTransform = Arc<RwLock<Option<Homography>>>;

/// Error type for calibration operations.
#[derive(Debug, Error)]
pub enum CalibrateError {
    #[error(transparent)]
    Invalid(#[from] HomographyError),
    #[error(transparent)]
    Store(#[from] CalibrationStoreError),
}

/// Service managing the projection calibration.
pub struct CalibrationService {
    transform: SharedTransform,
    store: CalibrationStore,
}

impl CalibrationService {
    pub fn new(store: CalibrationStore) -> Self {
        Self {
            transform: Arc::new(RwLock::new(None)),
            store,
        }
    }

    /// Handle to the live transform, shared with the event normalizer.
    pub fn transform(&self) -> SharedTransform {
        Arc::clone(&self.transform)
    }

    /// Loads any persisted calibration into the live transform.
    ///
    /// Called once at startup. A missing or bad file leaves the hub
    /// uncalibrated.
    pub async fn load_persisted(&self) {
        if let Some(homography) = self.store.load() {
            *self.transform.write().await = Some(homography);
            tracing::info!(path = %self.store.path().display(), "calibration restored");
        }
    }

    /// Computes, persists, and activates a calibration from four camera
    /// points ordered top-left, top-right, bottom-right, bottom-left.
    ///
    /// Rejected points leave the current calibration untouched.
    pub async fn set_points(&self, points: &[(f64, f64)]) -> Result<(), CalibrateError> {
        let homography = Homography::from_camera_points(points)?;
        self.store.save(&homography)?;
        *self.transform.write().await = Some(homography);
        tracing::info!("calibration updated");
        Ok(())
    }

    /// Drops the active calibration and deletes the persisted file.
    pub async fn clear(&self) -> Result<(), CalibrateError> {
        let mut transform = self.transform.write().await;
        *transform = None;
        self.store.clear()?;
        tracing::info!("calibration cleared");
        Ok(())
    }

    /// `true` when a transform is currently active.
    pub async fn is_calibrated(&self) -> bool {
        self.transform.read().await.is_some()
    }
}

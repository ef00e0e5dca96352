//! Sensing lifecycle control.
//!
//! One controller owns the sensing workers, the event queue feeding the
//! normalizer, and the shared last-frame slot. Start is idempotent per
//! worker; stop joins each worker with a bounded timeout so a wedged device
//! cannot hang shutdown. Workers can end on their own when a device
//! disappears, so `status` reports observed liveness, not requested state.

use std::sync::{Arc, Mutex};

use projtouch_core::SensorEvent;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::application::calibrate::SharedTransform;
use crate::application::normalize_events::spawn_normalizer;
use crate::domain::config::HubConfig;
use crate::infrastructure::network::registry::SubscriberRegistry;
use crate::infrastructure::sensing::objects::{DetectionOptions, DetectionWorker};
use crate::infrastructure::sensing::tap::{TapOptions, TapWorker};
use crate::infrastructure::sensing::{CameraFrame, FrameSlot, SensingBackend};

/// Observed liveness of the sensing workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SensingStatus {
    pub tap_running: bool,
    pub detection_running: bool,
}

/// Owns the sensing workers and the event pipeline they feed.
pub struct SensingController {
    events_tx: mpsc::UnboundedSender<SensorEvent>,
    normalizer: JoinHandle<()>,
    tap: Option<TapWorker>,
    detection: Option<DetectionWorker>,
    last_frame: FrameSlot,
}

impl SensingController {
    /// Creates the controller and spawns its event normalizer task.
    ///
    /// Must run inside a Tokio runtime.
    pub fn new(transform: SharedTransform, registry: Arc<SubscriberRegistry>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let normalizer = spawn_normalizer(events_rx, transform, registry);
        Self {
            events_tx,
            normalizer,
            tap: None,
            detection: None,
            last_frame: Arc::new(Mutex::new(None)),
        }
    }

    /// Starts the configured sensing workers.
    ///
    /// Idempotent per worker: a worker observed alive is left alone, while a
    /// dead or never-started one is spawned fresh. The detection worker is
    /// skipped entirely when disabled in config.
    pub fn start_all(&mut self, config: &HubConfig, backend: Arc<dyn SensingBackend>) {
        if self.tap.as_ref().map(TapWorker::is_running).unwrap_or(false) {
            tracing::debug!("tap worker already running");
        } else {
            let options = TapOptions {
                test_mode: config.tap.test_mode,
                camera_index: config.tap.camera_index,
                ..TapOptions::default()
            };
            self.tap = Some(TapWorker::spawn(
                options,
                Arc::clone(&backend),
                self.events_tx.clone(),
            ));
            tracing::info!(test_mode = config.tap.test_mode, "tap worker started");
        }

        if !config.detection.enabled {
            tracing::debug!("detection worker disabled in config");
        } else if self
            .detection
            .as_ref()
            .map(DetectionWorker::is_running)
            .unwrap_or(false)
        {
            tracing::debug!("detection worker already running");
        } else {
            let options = DetectionOptions {
                camera_index: config.detection.camera_index,
                model: config.detection.model.clone(),
                min_confidence: config.detection.min_confidence,
                target_fps: config.detection.target_fps,
            };
            self.detection = Some(DetectionWorker::spawn(
                options,
                backend,
                self.events_tx.clone(),
                Arc::clone(&self.last_frame),
            ));
            tracing::info!(model = %config.detection.model, "detection worker started");
        }
    }

    /// Stops every worker, joining each with a bounded timeout.
    pub fn stop_all(&mut self) {
        let mut stopped = 0;
        if let Some(tap) = self.tap.take() {
            tap.stop();
            stopped += 1;
        }
        if let Some(detection) = self.detection.take() {
            detection.stop();
            stopped += 1;
        }
        if stopped > 0 {
            tracing::info!(stopped, "sensing workers stopped");
        }
    }

    /// Observed liveness of both workers.
    pub fn status(&self) -> SensingStatus {
        SensingStatus {
            tap_running: self.tap.as_ref().map(TapWorker::is_running).unwrap_or(false),
            detection_running: self
                .detection
                .as_ref()
                .map(DetectionWorker::is_running)
                .unwrap_or(false),
        }
    }

    /// Clone of the most recent camera frame, once the detection worker has
    /// published one.
    pub fn snapshot(&self) -> Option<CameraFrame> {
        self.last_frame.lock().expect("lock poisoned").clone()
    }

    /// Sender for injecting sensor events from producers outside the managed
    /// workers.
    pub fn event_sender(&self) -> mpsc::UnboundedSender<SensorEvent> {
        self.events_tx.clone()
    }

    /// Stops the workers and tears down the normalizer task.
    pub fn shutdown(&mut self) {
        self.stop_all();
        self.normalizer.abort();
    }
}

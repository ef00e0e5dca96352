//! Object-detection sensing worker.
//!
//! Each cycle captures a frame, runs inference, filters and normalizes the
//! detections, and emits one batch. Every completed cycle emits, detections
//! or not; consumers decide what an empty batch means. The most recent frame
//! is published to a shared slot for snapshot queries.
//!
//! Transient failures never kill the loop: a failed frame read retries after
//! a short pause, and a failed inference backs off and skips the cycle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use projtouch_core::{DetectedObject, DetectionBatch, SensorEvent};
use tokio::sync::mpsc;

use super::{
    sleep_with_stop, DetectionModel, FrameSlot, FrameSource, RawDetection, SensingBackend,
    WorkerThread, WORKER_STOP_TIMEOUT,
};

/// Pause before retrying after a failed frame read.
const FRAME_POLL_SLEEP: Duration = Duration::from_millis(10);

/// Backoff after a failed inference call.
const INFERENCE_BACKOFF: Duration = Duration::from_millis(50);

/// Floor keeping the pacing math finite for zero or negative configs.
const MIN_TARGET_FPS: f64 = 0.1;

/// Spawn-time options for the detection worker.
#[derive(Debug, Clone)]
pub struct DetectionOptions {
    /// Camera device index.
    pub camera_index: u32,
    /// Model identifier passed to the backend.
    pub model: String,
    /// Detections with confidence strictly below this floor are dropped.
    pub min_confidence: f64,
    /// Target full cycles per second.
    pub target_fps: f64,
}

impl Default for DetectionOptions {
    fn default() -> Self {
        Self {
            camera_index: 0,
            model: "yolov8n.pt".to_string(),
            min_confidence: 0.5,
            target_fps: 5.0,
        }
    }
}

/// Handle to a running detection worker.
pub struct DetectionWorker {
    inner: WorkerThread,
}

impl DetectionWorker {
    /// Spawns the detection worker on a dedicated thread.
    ///
    /// The worker owns its camera device and model for its whole lifetime.
    /// Failure to acquire either ends the thread without an error event;
    /// callers observe the gap through [`DetectionWorker::is_running`].
    pub fn spawn(
        options: DetectionOptions,
        backend: Arc<dyn SensingBackend>,
        events: mpsc::UnboundedSender<SensorEvent>,
        last_frame: FrameSlot,
    ) -> Self {
        let inner = WorkerThread::spawn(move |stop| {
            run(options, backend.as_ref(), &events, &last_frame, &stop);
        });
        Self { inner }
    }

    /// `true` while the worker thread is alive.
    pub fn is_running(&self) -> bool {
        self.inner.is_running()
    }

    /// Requests shutdown and waits up to [`WORKER_STOP_TIMEOUT`] for it.
    pub fn stop(self) {
        self.inner.stop(WORKER_STOP_TIMEOUT);
    }
}

fn run(
    options: DetectionOptions,
    backend: &dyn SensingBackend,
    events: &mpsc::UnboundedSender<SensorEvent>,
    last_frame: &FrameSlot,
    stop: &AtomicBool,
) {
    let mut source = match backend.open_frame_source(options.camera_index) {
        Ok(source) => source,
        Err(err) => {
            tracing::debug!(
                camera_index = options.camera_index,
                error = %err,
                "detection worker exiting: camera unavailable"
            );
            return;
        }
    };
    let mut model = match backend.load_detection_model(&options.model) {
        Ok(model) => model,
        Err(err) => {
            tracing::debug!(
                model = %options.model,
                error = %err,
                "detection worker exiting: model unavailable"
            );
            return;
        }
    };

    let period = Duration::from_secs_f64(1.0 / options.target_fps.max(MIN_TARGET_FPS));
    tracing::info!(
        camera_index = options.camera_index,
        model = %options.model,
        target_fps = options.target_fps,
        "detection loop started"
    );

    while !stop.load(Ordering::Relaxed) {
        let cycle_start = Instant::now();

        let frame = match source.capture() {
            Ok(frame) => frame,
            Err(err) => {
                tracing::debug!(error = %err, "frame read failed; retrying");
                sleep_with_stop(stop, FRAME_POLL_SLEEP);
                continue;
            }
        };
        *last_frame.lock().expect("lock poisoned") = Some(frame.clone());

        let raw = match model.infer(&frame) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::debug!(error = %err, "inference failed; backing off");
                sleep_with_stop(stop, INFERENCE_BACKOFF);
                continue;
            }
        };

        let batch = DetectionBatch {
            source: model.source().to_string(),
            frame_width: frame.width,
            frame_height: frame.height,
            objects: normalize_detections(raw, frame.width, frame.height, options.min_confidence),
        };
        if events.send(SensorEvent::Detections(batch)).is_err() {
            tracing::debug!("detection loop exiting: event channel closed");
            break;
        }

        let elapsed = cycle_start.elapsed();
        if elapsed < period {
            sleep_with_stop(stop, period - elapsed);
        }
    }
    tracing::info!("detection loop stopped");
}

/// Drops low-confidence detections and converts boxes to normalized
/// frame-relative coordinates clamped to `[0, 1]`.
fn normalize_detections(
    raw: Vec<RawDetection>,
    frame_width: u32,
    frame_height: u32,
    min_confidence: f64,
) -> Vec<DetectedObject> {
    let w = f64::from(frame_width).max(1.0);
    let h = f64::from(frame_height).max(1.0);
    raw.into_iter()
        .filter(|detection| detection.confidence >= min_confidence)
        .map(|detection| DetectedObject {
            label: detection.label,
            confidence: detection.confidence,
            x1: (detection.x1 / w).clamp(0.0, 1.0),
            y1: (detection.y1 / h).clamp(0.0, 1.0),
            x2: (detection.x2 / w).clamp(0.0, 1.0),
            y2: (detection.y2 / h).clamp(0.0, 1.0),
        })
        .collect()
}

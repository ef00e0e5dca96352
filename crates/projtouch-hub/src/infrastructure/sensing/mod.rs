//! Sensing infrastructure for the hub application.
//!
//! Sensing workers own camera devices and inference models outright and run on
//! dedicated OS threads, because device reads and model inference are blocking
//! calls that must not stall the async runtime. Events flow out of each worker
//! through an unbounded channel consumed by the event normalizer.
//!
//! # Worker lifecycle
//!
//! Device acquisition happens inside the worker thread, after spawn. A missing
//! device ends the worker quietly; the controller's status query is how
//! callers find out. Shutdown is a stop flag plus a bounded join: a worker
//! stuck in a blocking device call is abandoned after [`WORKER_STOP_TIMEOUT`]
//! rather than hanging its caller.
//!
//! # Testability
//!
//! The [`SensingBackend`] trait abstracts device and model acquisition. The
//! production [`DeviceBackend`] reports what the host actually offers; tests
//! and demo deployments use [`mock::SyntheticBackend`] to drive the full
//! pipeline without hardware.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

pub mod mock;
pub mod objects;
pub mod tap;

/// How long a worker's `stop` waits for shutdown confirmation before
/// abandoning the thread.
pub const WORKER_STOP_TIMEOUT: Duration = Duration::from_secs(2);

/// Granularity of interruptible sleeps inside worker loops.
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A single frame captured from a camera device.
#[derive(Debug, Clone)]
pub struct CameraFrame {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Raw pixel data, row-major. Layout is backend-defined.
    pub pixels: Vec<u8>,
}

/// Shared slot holding the most recent frame read by the detection worker.
///
/// Overwritten on every successful capture. Readers clone whatever frame was
/// live at the time of the query.
pub type FrameSlot = Arc<Mutex<Option<CameraFrame>>>;

/// One detection produced by a model, in pixel coordinates of the input frame.
#[derive(Debug, Clone)]
pub struct RawDetection {
    /// Class label reported by the model.
    pub label: String,
    /// Model confidence in `[0, 1]`.
    pub confidence: f64,
    /// Bounding box corners, `(x1, y1)` top-left and `(x2, y2)` bottom-right.
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

/// Error type for sensing operations.
#[derive(Debug, thiserror::Error)]
pub enum SensingError {
    #[error("camera device {index} unavailable: {reason}")]
    DeviceUnavailable { index: u32, reason: String },
    #[error("detection model unavailable: {0}")]
    ModelUnavailable(String),
    #[error("frame capture failed: {0}")]
    FrameUnavailable(String),
    #[error("inference failed: {0}")]
    Inference(String),
}

/// Trait abstracting a camera device that yields frames on demand.
pub trait FrameSource: Send {
    /// Reads the next frame, blocking until one is available or the read fails.
    fn capture(&mut self) -> Result<CameraFrame, SensingError>;
}

/// Trait abstracting an object-detection model.
pub trait DetectionModel: Send {
    /// Runs inference on one frame and returns detections in pixel space.
    fn infer(&mut self, frame: &CameraFrame) -> Result<Vec<RawDetection>, SensingError>;

    /// Identifier stamped on every batch this model produces (e.g. `"yolo"`).
    fn source(&self) -> &str;
}

/// Factory for frame sources and detection models.
pub trait SensingBackend: Send + Sync {
    /// Opens the camera device with the given index.
    fn open_frame_source(&self, camera_index: u32) -> Result<Box<dyn FrameSource>, SensingError>;

    /// Loads the named detection model.
    fn load_detection_model(&self, model: &str) -> Result<Box<dyn DetectionModel>, SensingError>;
}

/// Camera-device backend.
///
/// This build carries no device or model bindings, so every acquisition fails
/// with [`SensingError::DeviceUnavailable`] or [`SensingError::ModelUnavailable`].
/// A worker handed this backend exits during startup and the gap shows up in
/// the controller's status query. Integrations with real capture stacks
/// implement [`SensingBackend`] and are swapped in at wiring time.
#[derive(Debug, Default)]
pub struct DeviceBackend;

impl SensingBackend for DeviceBackend {
    fn open_frame_source(&self, camera_index: u32) -> Result<Box<dyn FrameSource>, SensingError> {
        Err(SensingError::DeviceUnavailable {
            index: camera_index,
            reason: "no capture bindings in this build".to_string(),
        })
    }

    fn load_detection_model(&self, model: &str) -> Result<Box<dyn DetectionModel>, SensingError> {
        Err(SensingError::ModelUnavailable(format!(
            "no inference bindings in this build (requested {model})"
        )))
    }
}

/// Sleeps for `total`, waking early once `stop` is raised.
pub(crate) fn sleep_with_stop(stop: &AtomicBool, total: Duration) {
    let mut remaining = total;
    while remaining > Duration::ZERO && !stop.load(Ordering::Relaxed) {
        let slice = remaining.min(STOP_POLL_INTERVAL);
        thread::sleep(slice);
        remaining = remaining.saturating_sub(slice);
    }
}

/// Sends the done signal when the worker body returns or unwinds.
struct DoneSignal(mpsc::Sender<()>);

impl Drop for DoneSignal {
    fn drop(&mut self) {
        let _ = self.0.send(());
    }
}

/// Handle to a sensing worker thread.
///
/// Owns the stop flag and a completion channel used to bound joins.
pub(crate) struct WorkerThread {
    thread: Option<thread::JoinHandle<()>>,
    stop: Arc<AtomicBool>,
    done_rx: mpsc::Receiver<()>,
}

impl WorkerThread {
    /// Spawns `body` on a dedicated thread, passing it the shared stop flag.
    ///
    /// The body must poll the flag and return promptly once it is raised.
    pub(crate) fn spawn<F>(body: F) -> Self
    where
        F: FnOnce(Arc<AtomicBool>) + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let (done_tx, done_rx) = mpsc::channel();
        let thread_stop = Arc::clone(&stop);
        let thread = thread::spawn(move || {
            let _done = DoneSignal(done_tx);
            body(thread_stop);
        });
        Self {
            thread: Some(thread),
            stop,
            done_rx,
        }
    }

    /// `true` while the worker body is still executing.
    pub(crate) fn is_running(&self) -> bool {
        self.thread
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Raises the stop flag and waits up to `timeout` for the worker to
    /// confirm shutdown.
    ///
    /// A worker that does not confirm in time is abandoned: the handle is
    /// dropped and the thread, if it ever wakes, exits on its next stop-flag
    /// check.
    pub(crate) fn stop(mut self, timeout: Duration) {
        self.stop.store(true, Ordering::Relaxed);
        match self.done_rx.recv_timeout(timeout) {
            Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => {
                if let Some(handle) = self.thread.take() {
                    if handle.join().is_err() {
                        tracing::warn!("sensing worker thread panicked");
                    }
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                tracing::warn!(
                    timeout_ms = timeout.as_millis() as u64,
                    "sensing worker did not confirm shutdown in time; abandoning thread"
                );
            }
        }
    }
}

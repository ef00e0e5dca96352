//! Tap sensing worker.
//!
//! Two operating modes, selected at spawn:
//!
//! * **Test mode** cycles through three fixed display-space points, emitting a
//!   tap every [`TEST_TAP_INTERVAL`] with source `"test"`. Used to exercise
//!   the full event path without hardware.
//! * **Sensing mode** opens the configured camera and services it without
//!   emitting. Touch extraction from camera frames is an open integration
//!   point; today the loop reads and discards.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use projtouch_core::{SensorEvent, TapEvent};
use tokio::sync::mpsc;

use super::{sleep_with_stop, FrameSource, SensingBackend, WorkerThread, WORKER_STOP_TIMEOUT};

/// Interval between synthetic taps in test mode.
pub const TEST_TAP_INTERVAL: Duration = Duration::from_secs(3);

/// Display-space points emitted in a fixed cycle by test mode.
pub const TEST_POINTS: [(f64, f64); 3] = [(0.2, 0.5), (0.5, 0.5), (0.8, 0.5)];

/// Source tag stamped on every test-mode tap.
pub const TEST_TAP_SOURCE: &str = "test";

/// Pause between camera reads in sensing mode.
const FRAME_POLL_SLEEP: Duration = Duration::from_millis(10);

/// Spawn-time options for the tap worker.
#[derive(Debug, Clone)]
pub struct TapOptions {
    /// When `true`, emit the synthetic tap cycle instead of opening a camera.
    pub test_mode: bool,
    /// Camera device index used in sensing mode.
    pub camera_index: u32,
    /// Interval between test-mode taps.
    pub test_interval: Duration,
}

impl Default for TapOptions {
    fn default() -> Self {
        Self {
            test_mode: false,
            camera_index: 0,
            test_interval: TEST_TAP_INTERVAL,
        }
    }
}

/// Handle to a running tap worker.
pub struct TapWorker {
    inner: WorkerThread,
}

impl TapWorker {
    /// Spawns the tap worker on a dedicated thread.
    ///
    /// The worker owns its camera device for its whole lifetime. Failure to
    /// open the device ends the thread without an error event; callers observe
    /// the gap through [`TapWorker::is_running`].
    pub fn spawn(
        options: TapOptions,
        backend: Arc<dyn SensingBackend>,
        events: mpsc::UnboundedSender<SensorEvent>,
    ) -> Self {
        let inner = WorkerThread::spawn(move |stop| {
            if options.test_mode {
                run_test_loop(options.test_interval, &events, &stop);
            } else {
                run_sensing_loop(options.camera_index, backend.as_ref(), &stop);
            }
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

/// Emits the fixed three-point cycle until stopped or the channel closes.
fn run_test_loop(
    interval: Duration,
    events: &mpsc::UnboundedSender<SensorEvent>,
    stop: &AtomicBool,
) {
    tracing::info!(interval_ms = interval.as_millis() as u64, "tap test loop started");
    for &(x, y) in TEST_POINTS.iter().cycle() {
        if stop.load(Ordering::Relaxed) {
            break;
        }
        let event = SensorEvent::Tap(TapEvent {
            x,
            y,
            source: TEST_TAP_SOURCE.to_string(),
        });
        if events.send(event).is_err() {
            tracing::debug!("tap test loop exiting: event channel closed");
            break;
        }
        sleep_with_stop(stop, interval);
    }
    tracing::info!("tap test loop stopped");
}

/// Services the camera without emitting until stopped or the device fails.
fn run_sensing_loop(camera_index: u32, backend: &dyn SensingBackend, stop: &AtomicBool) {
    let mut source = match backend.open_frame_source(camera_index) {
        Ok(source) => source,
        Err(err) => {
            tracing::debug!(camera_index, error = %err, "tap worker exiting: camera unavailable");
            return;
        }
    };
    tracing::info!(camera_index, "tap sensing loop started");
    while !stop.load(Ordering::Relaxed) {
        match source.capture() {
            Ok(_frame) => {
                sleep_with_stop(stop, FRAME_POLL_SLEEP);
            }
            Err(err) => {
                tracing::debug!(error = %err, "tap worker exiting: capture failed");
                break;
            }
        }
    }
    tracing::info!("tap sensing loop stopped");
}

#[cfg(test)]
mod tests {
    use super::super::mock::SyntheticBackend;
    use super::super::DeviceBackend;
    use super::*;
    use std::thread;
    use std::time::Instant;

    fn make_options(test_mode: bool, test_interval: Duration) -> TapOptions {
        TapOptions {
            test_mode,
            camera_index: 0,
            test_interval,
        }
    }

    fn collect_taps(
        rx: &mut mpsc::UnboundedReceiver<SensorEvent>,
        count: usize,
        deadline: Duration,
    ) -> Vec<TapEvent> {
        let start = Instant::now();
        let mut taps = Vec::new();
        while taps.len() < count && start.elapsed() < deadline {
            match rx.try_recv() {
                Ok(SensorEvent::Tap(tap)) => taps.push(tap),
                Ok(other) => panic!("unexpected event: {other:?}"),
                Err(_) => thread::sleep(Duration::from_millis(5)),
            }
        }
        taps
    }

    #[test]
    fn test_test_mode_emits_three_point_cycle_in_order() {
        // Arrange
        let (tx, mut rx) = mpsc::unbounded_channel();
        let backend = Arc::new(SyntheticBackend::default());

        // Act: fast interval so several full cycles fit in the deadline.
        let worker = TapWorker::spawn(
            make_options(true, Duration::from_millis(10)),
            backend,
            tx,
        );
        let taps = collect_taps(&mut rx, 7, Duration::from_secs(2));
        worker.stop();

        // Assert: points repeat in declaration order, all tagged "test".
        assert_eq!(taps.len(), 7);
        for (i, tap) in taps.iter().enumerate() {
            let (x, y) = TEST_POINTS[i % TEST_POINTS.len()];
            assert_eq!((tap.x, tap.y), (x, y));
            assert_eq!(tap.source, TEST_TAP_SOURCE);
        }
    }

    #[test]
    fn test_test_mode_stop_interrupts_long_interval() {
        // Arrange: an interval far longer than the stop timeout.
        let (tx, mut rx) = mpsc::unbounded_channel();
        let backend = Arc::new(SyntheticBackend::default());
        let worker = TapWorker::spawn(make_options(true, Duration::from_secs(60)), backend, tx);
        let first = collect_taps(&mut rx, 1, Duration::from_secs(2));
        assert_eq!(first.len(), 1);

        // Act
        let start = Instant::now();
        worker.stop();

        // Assert: the sleep was interrupted, not waited out.
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_sensing_mode_reads_frames_without_emitting() {
        // Arrange
        let (tx, mut rx) = mpsc::unbounded_channel();
        let backend = Arc::new(SyntheticBackend::default());

        // Act
        let worker = TapWorker::spawn(
            make_options(false, TEST_TAP_INTERVAL),
            Arc::clone(&backend) as Arc<dyn SensingBackend>,
            tx,
        );
        thread::sleep(Duration::from_millis(100));
        let still_running = worker.is_running();
        let captures = backend.captures();
        worker.stop();

        // Assert: frames were read, nothing was emitted.
        assert!(still_running);
        assert!(captures > 0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_worker_exits_quietly_when_camera_unavailable() {
        // Arrange: a backend with no devices.
        let (tx, mut rx) = mpsc::unbounded_channel();
        let backend = Arc::new(DeviceBackend);

        // Act
        let worker = TapWorker::spawn(make_options(false, TEST_TAP_INTERVAL), backend, tx);
        let deadline = Instant::now() + Duration::from_secs(1);
        while worker.is_running() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }

        // Assert: the thread ended on its own and emitted nothing.
        assert!(!worker.is_running());
        assert!(rx.try_recv().is_err());
        worker.stop();
    }

    #[test]
    fn test_test_mode_exits_when_receiver_dropped() {
        // Arrange
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let backend = Arc::new(SyntheticBackend::default());

        // Act
        let worker = TapWorker::spawn(make_options(true, Duration::from_millis(10)), backend, tx);
        let deadline = Instant::now() + Duration::from_secs(1);
        while worker.is_running() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }

        // Assert
        assert!(!worker.is_running());
        worker.stop();
    }
}

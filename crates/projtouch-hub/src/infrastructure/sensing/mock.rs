//! Synthetic sensing backend for tests and hardware-free deployments.
//!
//! Mirrors the production trait surface: frames come from a generated pattern
//! and detections from a repeating script. The backend records how many
//! frames were captured so tests can assert the loops actually ran.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::{
    CameraFrame, DetectionModel, FrameSource, RawDetection, SensingBackend, SensingError,
};

/// Source tag stamped on every scripted detection batch.
pub const SYNTHETIC_SOURCE: &str = "synthetic";

/// Backend producing frames and detections without hardware.
///
/// The default detection script is a single centered box at 90% confidence,
/// sized so its midpoint lands on the frame center.
pub struct SyntheticBackend {
    frame_width: u32,
    frame_height: u32,
    captures: Arc<AtomicUsize>,
    script: Vec<Vec<RawDetection>>,
}

impl SyntheticBackend {
    pub fn new(frame_width: u32, frame_height: u32) -> Self {
        let script = vec![vec![RawDetection {
            label: "box".to_string(),
            confidence: 0.9,
            x1: f64::from(frame_width) * 0.3,
            y1: f64::from(frame_height) * 0.3,
            x2: f64::from(frame_width) * 0.7,
            y2: f64::from(frame_height) * 0.7,
        }]];
        Self {
            frame_width,
            frame_height,
            captures: Arc::new(AtomicUsize::new(0)),
            script,
        }
    }

    /// Replaces the detection script.
    ///
    /// The model cycles through the steps, one per inference call. An empty
    /// script means no detections, ever.
    pub fn with_script(mut self, script: Vec<Vec<RawDetection>>) -> Self {
        self.script = script;
        self
    }

    /// Total frames captured across all sources opened on this backend.
    pub fn captures(&self) -> usize {
        self.captures.load(Ordering::Relaxed)
    }
}

impl Default for SyntheticBackend {
    fn default() -> Self {
        Self::new(640, 480)
    }
}

impl SensingBackend for SyntheticBackend {
    fn open_frame_source(&self, _camera_index: u32) -> Result<Box<dyn FrameSource>, SensingError> {
        Ok(Box::new(SyntheticFrameSource {
            width: self.frame_width,
            height: self.frame_height,
            frame_index: 0,
            captures: Arc::clone(&self.captures),
        }))
    }

    fn load_detection_model(&self, _model: &str) -> Result<Box<dyn DetectionModel>, SensingError> {
        Ok(Box::new(ScriptedDetectionModel::new(self.script.clone())))
    }
}

/// Frame source yielding flat grayscale frames whose shade advances per
/// capture.
pub struct SyntheticFrameSource {
    width: u32,
    height: u32,
    frame_index: usize,
    captures: Arc<AtomicUsize>,
}

impl SyntheticFrameSource {
    /// Standalone source with its own capture counter.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            frame_index: 0,
            captures: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl FrameSource for SyntheticFrameSource {
    fn capture(&mut self) -> Result<CameraFrame, SensingError> {
        self.captures.fetch_add(1, Ordering::Relaxed);
        let shade = (self.frame_index % 256) as u8;
        self.frame_index = self.frame_index.wrapping_add(1);
        Ok(CameraFrame {
            width: self.width,
            height: self.height,
            pixels: vec![shade; self.width as usize * self.height as usize],
        })
    }
}

/// Model replaying a fixed script of detections.
pub struct ScriptedDetectionModel {
    script: Vec<Vec<RawDetection>>,
    cursor: usize,
}

impl ScriptedDetectionModel {
    pub fn new(script: Vec<Vec<RawDetection>>) -> Self {
        Self { script, cursor: 0 }
    }
}

impl DetectionModel for ScriptedDetectionModel {
    fn infer(&mut self, _frame: &CameraFrame) -> Result<Vec<RawDetection>, SensingError> {
        if self.script.is_empty() {
            return Ok(Vec::new());
        }
        let step = self.script[self.cursor % self.script.len()].clone();
        self.cursor += 1;
        Ok(step)
    }

    fn source(&self) -> &str {
        SYNTHETIC_SOURCE
    }
}

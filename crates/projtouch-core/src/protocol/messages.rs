//! Event and message types for the ProjTouch hub.
//!
//! Two families of types live here:
//!
//! - **[`SensorEvent`]**: what sensing workers push into the hub's inbound
//!   channel. Workers run on their own threads and only ever hold the send
//!   half of that channel; they never talk to subscribers directly.
//!
//! - **[`OutboundMessage`]**: what the hub broadcasts to display subscribers
//!   as JSON text frames. The `#[serde(tag = "type")]` attribute produces the
//!   externally visible `{"type": "tap", ...}` shape that display clients
//!   switch on.
//!
//! The normalizer (in the hub crate) is the only component that converts one
//! into the other, exactly one outbound message per inbound event.

use serde::{Deserialize, Serialize};

// ── Inbound sensor events ─────────────────────────────────────────────────────

/// A tap on the projected surface.
///
/// Coordinates are already display-normalized (`[0, 1]` on both axes) when
/// the producer emits them, so the hub broadcasts taps without applying the
/// calibration transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TapEvent {
    /// Horizontal position, 0.0 = left edge of the projection, 1.0 = right.
    pub x: f64,
    /// Vertical position, 0.0 = top edge of the projection, 1.0 = bottom.
    pub y: f64,
    /// Which producer emitted the tap (`"test"` for the synthetic cycle,
    /// `"detector"` for camera-driven detection).
    pub source: String,
}

/// One bounding box produced by the object-detection model.
///
/// Corners are camera-frame-normalized: each coordinate is a fraction of the
/// frame width/height in `[0, 1]`. Producers emit `x1 <= x2` and `y1 <= y2`
/// but consumers tolerate either order because the only derived quantity is
/// the box center.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedObject {
    /// Model class label, e.g. `"cup"`.
    pub label: String,
    /// Model confidence in `[0, 1]`.
    pub confidence: f64,
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl DetectedObject {
    /// Returns the box center in camera pixel coordinates for a frame of the
    /// given dimensions. This is the point that gets mapped through the
    /// calibration homography.
    pub fn center_px(&self, frame_width: u32, frame_height: u32) -> (f64, f64) {
        (
            ((self.x1 + self.x2) / 2.0) * f64::from(frame_width),
            ((self.y1 + self.y2) / 2.0) * f64::from(frame_height),
        )
    }
}

/// Everything the detection worker saw in a single captured frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionBatch {
    /// Which model produced the batch (e.g. `"yolo"`), carried through to
    /// subscribers verbatim.
    pub source: String,
    /// Width of the captured frame in pixels.
    pub frame_width: u32,
    /// Height of the captured frame in pixels.
    pub frame_height: u32,
    /// Detections in model output order.
    pub objects: Vec<DetectedObject>,
}

/// An event flowing from a sensing worker into the hub's inbound channel.
///
/// `Raw` is the open seam for producers that do not speak one of the modeled
/// shapes yet; the normalizer turns such events into
/// [`OutboundMessage::Unknown`] rather than dropping them, so the
/// one-in/one-out accounting holds for every producer.
#[derive(Debug, Clone, PartialEq)]
pub enum SensorEvent {
    Tap(TapEvent),
    Detections(DetectionBatch),
    Raw(serde_json::Value),
}

// ── Outbound subscriber messages ──────────────────────────────────────────────

/// Frame dimensions as broadcast to subscribers.
///
/// Serialized with the short keys `w`/`h` that display clients expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSize {
    pub w: u32,
    pub h: u32,
}

/// A detected object reduced to its display-space center.
///
/// Present in a `detections` message only when a calibration is loaded:
/// `(cx, cy)` is the box center mapped into the normalized display plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappedObject {
    pub label: String,
    pub confidence: f64,
    pub cx: f64,
    pub cy: f64,
}

/// A message broadcast to every connected display subscriber, serialized as
/// a JSON object tagged with `"type"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutboundMessage {
    /// A tap at a display-normalized position. Forwarded exactly as the
    /// producer emitted it.
    Tap { x: f64, y: f64, source: String },

    /// Detections from one camera frame. `objects` always carries the raw
    /// camera-normalized boxes; `objects_mapped` and `projector_mapped` are
    /// attached only when a calibration transform is loaded.
    Detections {
        source: String,
        frame_size: FrameSize,
        objects: Vec<DetectedObject>,
        #[serde(skip_serializing_if = "Option::is_none")]
        objects_mapped: Option<Vec<MappedObject>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        projector_mapped: Option<bool>,
    },

    /// Fallback for inbound events the normalizer does not recognize.
    Unknown,
}

impl OutboundMessage {
    /// Short variant name for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            OutboundMessage::Tap { .. } => "tap",
            OutboundMessage::Detections { .. } => "detections",
            OutboundMessage::Unknown => "unknown",
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

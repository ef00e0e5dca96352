//! # projtouch-core
//!
//! Shared library for ProjTouch containing the subscriber-facing event
//! protocol and the camera-to-display homography domain type.
//!
//! This crate is used by the hub daemon and by anything else that needs to
//! speak the event protocol (test harnesses, future admin tooling).
//! It has zero dependencies on OS APIs, async runtimes, or network sockets.
//!
//! ProjTouch turns a projected image into an interactive surface: a camera
//! watches the projection, sensing workers detect taps and objects, and the
//! hub broadcasts the resulting events to display clients over WebSocket.
//! This crate defines:
//!
//! - **`protocol`** – The event types that travel through the hub: raw sensor
//!   events produced by workers, and the tagged JSON messages delivered to
//!   subscribers.
//!
//! - **`domain`** – Pure business logic with no I/O. The central piece is
//!   [`Homography`]: the 3×3 projective transform that maps camera pixel
//!   coordinates onto the normalized display plane, established once by an
//!   operator calibration step.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `projtouch_core::Homography` instead of the full module path.
pub use domain::homography::{Homography, HomographyError, DISPLAY_CORNERS};
pub use protocol::messages::{
    DetectedObject, DetectionBatch, FrameSize, MappedObject, OutboundMessage, SensorEvent,
    TapEvent,
};

//! Application layer for the hub.
//!
//! Services orchestrating the pipeline: calibration management, event
//! normalization, and sensing lifecycle control. These hold the shared state
//! the rest of the hub works against; wiring them to real devices and the
//! network happens in `main`.

pub mod calibrate;
pub mod manage_sensing;
pub mod normalize_events;

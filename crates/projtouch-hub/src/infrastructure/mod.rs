//! Infrastructure layer for the hub application.
//!
//! Contains device- and OS-facing adapters: sensing worker threads that own
//! camera devices, the WebSocket fan-out server, and file-system storage for
//! configuration and calibration data.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `projtouch_core`, but MUST NOT be imported by the `application` or domain
//! layers.

pub mod network;
pub mod sensing;
pub mod storage;

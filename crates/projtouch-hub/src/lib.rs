//! projtouch-hub library crate.
//!
//! The hub is the real-time core of ProjTouch: it collects spatial events
//! from background sensing workers, maps detection coordinates into display
//! space through the calibration homography, and broadcasts the results to
//! every connected display client.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! camera threads                       display clients (WebSocket)
//!      │                                        ▲
//!      ▼                                        │
//! [projtouch-hub]                               │
//!   ├── domain/           HubConfig and its defaults
//!   ├── application/      calibration service, sensing lifecycle,
//!   │                     event normalizer (the single consumer)
//!   └── infrastructure/
//!         ├── sensing/    worker threads + capture/model seams
//!         ├── network/    subscriber registry + WebSocket server
//!         └── storage/    TOML config file, JSON calibration record
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O, no async, no frameworks.
//! - `application` depends on `domain`, `projtouch-core`, and the
//!   infrastructure seams it orchestrates.
//! - `infrastructure` owns all sockets, threads, and files.
//!
//! Everything is re-exported as a library so the integration tests in
//! `tests/` and the binary in `main.rs` share one module tree.

/// Domain layer: configuration types (no I/O).
pub mod domain;

/// Application layer: calibration, lifecycle, and normalization use cases.
pub mod application;

/// Infrastructure layer: sensing threads, WebSocket server, file storage.
pub mod infrastructure;

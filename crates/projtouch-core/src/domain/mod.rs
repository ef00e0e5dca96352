//! Domain entities for ProjTouch.
//!
//! This module contains pure business logic with no infrastructure
//! dependencies: no file I/O, no async runtime, no sockets. Everything here
//! can be compiled and tested on any platform without external setup.
//!
//! The core domain concept is the calibration [`homography::Homography`]: the
//! projective correspondence between what the camera sees (pixel coordinates)
//! and what the projector draws (the normalized unit square). Outer layers
//! depend on this module; it depends on nothing above it.

/// Camera-to-display projective transform.
///
/// See [`homography::Homography`] for the main type.
pub mod homography;

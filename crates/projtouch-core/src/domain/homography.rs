//! Camera-to-display homography.
//!
//! The projector draws into a normalized unit square: `(0,0)` is the top-left
//! corner of the projected image and `(1,1)` the bottom-right. The camera
//! watches that same surface from an arbitrary angle, so a point on the
//! surface appears at some pixel `(x, y)` in the camera frame. Calibration
//! establishes the projective transform between the two planes: the operator
//! clicks the four projected corners in a camera snapshot, and those four
//! correspondences determine a unique 3×3 homography `H` with
//!
//! ```text
//! [u, v, w]^T = H * [x, y, 1]^T        display point = (u/w, v/w)
//! ```
//!
//! Once calibrated, any camera-space point (a detected object's box center)
//! can be mapped into display space so the renderer can draw feedback at the
//! physical location of the object.
//!
//! # Solving for H
//!
//! With the scale fixed by `h33 = 1`, the four point correspondences yield
//! eight linear equations in the eight remaining entries. The system is
//! solved by Gaussian elimination with partial pivoting; a vanishing pivot
//! means the camera points are degenerate (collinear or coincident) and no
//! homography exists.

use thiserror::Error;

/// The fixed destination corners of the display plane, in calibration order:
/// top-left, top-right, bottom-right, bottom-left.
///
/// Camera points supplied to [`Homography::from_camera_points`] must follow
/// this same order.
pub const DISPLAY_CORNERS: [(f64, f64); 4] = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)];

/// Pivots smaller than this are treated as zero during elimination.
///
/// Camera coordinates are pixel-scale (hundreds to low thousands), so a
/// genuine pivot is many orders of magnitude above this threshold.
const PIVOT_EPSILON: f64 = 1e-9;

/// Error type for homography construction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HomographyError {
    /// Calibration needs exactly four correspondence points.
    #[error("calibration requires exactly 4 camera points, got {0}")]
    WrongPointCount(usize),

    /// The supplied points do not determine a projective transform
    /// (collinear or coincident points make the linear system singular).
    #[error("camera points are degenerate; no homography exists for them")]
    DegeneratePoints,
}

/// A 3×3 projective transform from camera pixel space to the normalized
/// display plane.
///
/// Values are immutable once constructed; replacing a calibration means
/// building a new `Homography`. The type is `Copy` so the hub can hand out
/// torn-free snapshots of the current calibration by value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homography {
    /// Row-major matrix entries.
    m: [[f64; 3]; 3],
}

impl Homography {
    /// Builds the homography mapping `camera_points` onto [`DISPLAY_CORNERS`],
    /// in order.
    ///
    /// The result is deterministic: the same four points always produce the
    /// same matrix.
    ///
    /// # Errors
    ///
    /// - [`HomographyError::WrongPointCount`] unless exactly 4 points are given.
    /// - [`HomographyError::DegeneratePoints`] when the points are collinear
    ///   or coincident and the solve is singular.
    pub fn from_camera_points(camera_points: &[(f64, f64)]) -> Result<Self, HomographyError> {
        if camera_points.len() != 4 {
            return Err(HomographyError::WrongPointCount(camera_points.len()));
        }

        // Two equations per correspondence (x,y) -> (u,v), unknowns ordered
        // [h11 h12 h13 h21 h22 h23 h31 h32], h33 fixed at 1:
        //
        //   h11*x + h12*y + h13 - u*h31*x - u*h32*y = u
        //   h21*x + h22*y + h23 - v*h31*x - v*h32*y = v
        let mut system = [[0.0f64; 9]; 8];
        for (i, (&(x, y), &(u, v))) in camera_points.iter().zip(DISPLAY_CORNERS.iter()).enumerate()
        {
            system[2 * i] = [x, y, 1.0, 0.0, 0.0, 0.0, -u * x, -u * y, u];
            system[2 * i + 1] = [0.0, 0.0, 0.0, x, y, 1.0, -v * x, -v * y, v];
        }

        let h = solve_8x8(system).ok_or(HomographyError::DegeneratePoints)?;

        Ok(Self {
            m: [
                [h[0], h[1], h[2]],
                [h[3], h[4], h[5]],
                [h[6], h[7], 1.0],
            ],
        })
    }

    /// Reconstructs a homography from a stored row-major matrix.
    ///
    /// Used when loading a persisted calibration; no validation beyond shape
    /// is performed, matching the save/load contract (storage validates the
    /// shape, calibration quality was validated at compute time).
    pub fn from_matrix(m: [[f64; 3]; 3]) -> Self {
        Self { m }
    }

    /// Returns the row-major matrix entries, e.g. for persistence.
    pub fn matrix(&self) -> [[f64; 3]; 3] {
        self.m
    }

    /// Maps a camera-space point into normalized display space.
    ///
    /// Never fails: when the homogeneous scale `w` vanishes (the point lies
    /// on the transform's line at infinity, which only happens for points far
    /// outside a sane calibration region) the result is `(0.0, 0.0)` rather
    /// than an error. Calibration quality is the operator's responsibility,
    /// not this function's.
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        let u = self.m[0][0] * x + self.m[0][1] * y + self.m[0][2];
        let v = self.m[1][0] * x + self.m[1][1] * y + self.m[1][2];
        let w = self.m[2][0] * x + self.m[2][1] * y + self.m[2][2];

        if w.abs() < f64::EPSILON {
            return (0.0, 0.0);
        }

        (u / w, v / w)
    }
}

// ── Linear solver ─────────────────────────────────────────────────────────────

/// Solves an 8×8 linear system given as an augmented 8×9 matrix, by Gaussian
/// elimination with partial pivoting. Returns `None` when the system is
/// singular (some pivot below [`PIVOT_EPSILON`]).
fn solve_8x8(mut a: [[f64; 9]; 8]) -> Option<[f64; 8]> {
    for col in 0..8 {
        // Pick the largest remaining entry in this column as the pivot.
        let mut pivot_row = col;
        for row in (col + 1)..8 {
            if a[row][col].abs() > a[pivot_row][col].abs() {
                pivot_row = row;
            }
        }
        if a[pivot_row][col].abs() < PIVOT_EPSILON {
            return None;
        }
        a.swap(col, pivot_row);

        // Eliminate the column below the pivot.
        for row in (col + 1)..8 {
            let factor = a[row][col] / a[col][col];
            for k in col..9 {
                a[row][k] -= factor * a[col][k];
            }
        }
    }

    // Back substitution.
    let mut x = [0.0f64; 8];
    for row in (0..8).rev() {
        let mut sum = a[row][8];
        for k in (row + 1)..8 {
            sum -= a[row][k] * x[k];
        }
        x[row] = sum / a[row][row];
    }
    Some(x)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

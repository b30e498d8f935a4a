//! Camera calibration data

use std::fmt;

use serde::{Deserialize, Serialize};

/// Checkerboard inner-corner pattern used for calibration
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridPattern {
    pub cols: u32,
    pub rows: u32,
}

impl GridPattern {
    pub fn new(cols: u32, rows: u32) -> Self {
        Self { cols, rows }
    }

    /// Number of inner corners the pattern yields per image
    pub fn point_count(&self) -> u32 {
        self.cols * self.rows
    }
}

impl Default for GridPattern {
    /// The 8x6 checkerboard shipped with the device
    fn default() -> Self {
        Self { cols: 8, rows: 6 }
    }
}

impl fmt::Display for GridPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.cols, self.rows)
    }
}

/// Result of calibrating one camera
///
/// The intrinsic matrix and distortion coefficients describe the lens; the
/// per-image rotation and translation vectors are the extrinsics of each
/// calibration shot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraCalibration {
    /// 3x3 intrinsic camera matrix
    pub camera_matrix: [[f64; 3]; 3],

    /// Lens distortion coefficients (k1, k2, p1, p2, k3)
    pub distortion: [f64; 5],

    /// Rotation vector per calibration image
    pub rotation_vectors: Vec<[f64; 3]>,

    /// Translation vector per calibration image
    pub translation_vectors: Vec<[f64; 3]>,
}

impl CameraCalibration {
    /// Focal lengths in pixel units, straight off the matrix diagonal
    pub fn focal_lengths(&self) -> (f64, f64) {
        (self.camera_matrix[0][0], self.camera_matrix[1][1])
    }
}

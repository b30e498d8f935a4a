//! Calibration collaborator interface and artifact persistence
//!
//! The calibration numerics (checkerboard detection, intrinsics solving)
//! live behind the [`Calibrator`] trait; the device crate only decides
//! when to calibrate and where the combined artifact goes.

use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::info;

use balltrack_types::{CameraCalibration, GridPattern};

pub type Result<T> = std::result::Result<T, CalibrationError>;

#[derive(Debug, thiserror::Error)]
pub enum CalibrationError {
    #[error("Calibration failed: {0}")]
    Failed(String),

    #[error("Insufficient calibration images in {dir}: found {found}, need {needed}")]
    InsufficientImages {
        dir: PathBuf,
        found: usize,
        needed: usize,
    },

    #[error("Calibration artifact {path} does not hold a JSON object")]
    MalformedArtifact { path: PathBuf },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Solves one camera's calibration from a directory of checkerboard shots
pub trait Calibrator: Send + Sync {
    fn calibrate(&self, image_dir: &Path, pattern: GridPattern) -> Result<CameraCalibration>;
}

/// Merge both cameras' results into the artifact at `path`
///
/// The artifact is a JSON object shared with other tools; only the
/// `left_camera` and `right_camera` keys are replaced, everything else in
/// the file survives. A missing file starts from an empty object.
pub fn save_calibration(
    path: &Path,
    left: &CameraCalibration,
    right: &CameraCalibration,
) -> Result<()> {
    let mut root: Value = match std::fs::read_to_string(path) {
        Ok(contents) => serde_json::from_str(&contents)?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => Value::Object(Default::default()),
        Err(e) => return Err(e.into()),
    };

    let Value::Object(map) = &mut root else {
        return Err(CalibrationError::MalformedArtifact {
            path: path.to_path_buf(),
        });
    };
    map.insert("left_camera".to_string(), serde_json::to_value(left)?);
    map.insert("right_camera".to_string(), serde_json::to_value(right)?);

    std::fs::write(path, serde_json::to_string_pretty(&root)?)?;
    info!("Calibration artifact saved to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample(focal: f64) -> CameraCalibration {
        CameraCalibration {
            camera_matrix: [[focal, 0.0, 376.0], [0.0, focal, 240.0], [0.0, 0.0, 1.0]],
            distortion: [0.1, -0.2, 0.0, 0.0, 0.05],
            rotation_vectors: vec![[0.01, 0.02, 0.03]],
            translation_vectors: vec![[1.0, 2.0, 3.0]],
        }
    }

    #[test]
    fn test_save_creates_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calibration.json");

        save_calibration(&path, &sample(800.0), &sample(810.0)).unwrap();

        let root: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(root.get("left_camera").is_some());
        assert!(root.get("right_camera").is_some());
    }

    #[test]
    fn test_save_preserves_unrelated_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calibration.json");
        std::fs::write(&path, r#"{"device_serial": "BT-0042", "left_camera": "stale"}"#).unwrap();

        save_calibration(&path, &sample(800.0), &sample(810.0)).unwrap();

        let root: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(root["device_serial"], "BT-0042");
        // The stale entry is replaced by the real record
        assert!(root["left_camera"].is_object());

        let left: CameraCalibration = serde_json::from_value(root["left_camera"].clone()).unwrap();
        assert_eq!(left, sample(800.0));
    }

    #[test]
    fn test_save_rejects_non_object_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calibration.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();

        let result = save_calibration(&path, &sample(800.0), &sample(810.0));
        assert!(matches!(
            result,
            Err(CalibrationError::MalformedArtifact { .. })
        ));
    }
}

//! Device configuration
//!
//! Loaded from a TOML file; every deployment parameter the protocol layer
//! does not own lives here (endpoints, calibration paths, court geometry).

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use balltrack_core::Point3D;
use balltrack_types::GridPattern;

use crate::error::Result;

/// Top-level device configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub network: NetworkConfig,
    pub calibration: CalibrationConfig,
    #[serde(default)]
    pub court: CourtConfig,
}

/// Control and camera-feed endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Address the server binds and the client dials
    pub host: String,
    /// Request/reply control channel port
    pub ctrl_port: u16,
    /// Push/pull camera-feed channel port
    pub camera_feed_port: u16,
}

/// Calibration image locations and output artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// Directory of left-camera checkerboard shots
    pub left_images_dir: PathBuf,
    /// Directory of right-camera checkerboard shots
    pub right_images_dir: PathBuf,
    /// Checkerboard inner-corner columns
    pub grid_cols: u32,
    /// Checkerboard inner-corner rows
    pub grid_rows: u32,
    /// JSON file the combined calibration merges into
    pub output_path: PathBuf,
}

impl CalibrationConfig {
    pub fn grid_pattern(&self) -> GridPattern {
        GridPattern::new(self.grid_cols, self.grid_rows)
    }
}

/// Court geometry, when surveyed
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CourtConfig {
    /// The four court corners, if a survey has produced them
    pub corners: Option<[Point3D; 4]>,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }
}

impl Default for Config {
    /// Loopback endpoints on the stock ports; fine for development
    fn default() -> Self {
        Self {
            network: NetworkConfig {
                host: "127.0.0.1".to_string(),
                ctrl_port: 5561,
                camera_feed_port: 5562,
            },
            calibration: CalibrationConfig {
                left_images_dir: PathBuf::from("/var/lib/balltrack/calibration/left"),
                right_images_dir: PathBuf::from("/var/lib/balltrack/calibration/right"),
                grid_cols: 8,
                grid_rows: 6,
                output_path: PathBuf::from("/var/lib/balltrack/calibration.json"),
            },
            court: CourtConfig::default(),
        }
    }
}

//! Run the device server against the mock camera
//!
//! Set `BALLTRACK_CONFIG` to a TOML config path to override the loopback
//! defaults.

use std::path::Path;
use std::sync::Arc;

use balltrack::calibration::{self, Calibrator};
use balltrack::{CameraCalibration, Config, GridPattern, MockCamera, Server};

/// Canned calibration results standing in for the OpenCV pipeline
struct FixedCalibrator;

impl Calibrator for FixedCalibrator {
    fn calibrate(
        &self,
        _image_dir: &Path,
        _pattern: GridPattern,
    ) -> calibration::Result<CameraCalibration> {
        Ok(CameraCalibration {
            camera_matrix: [[800.0, 0.0, 376.0], [0.0, 800.0, 240.0], [0.0, 0.0, 1.0]],
            distortion: [0.1, -0.2, 0.0, 0.0, 0.05],
            rotation_vectors: vec![[0.01, 0.02, 0.03]],
            translation_vectors: vec![[1.0, 2.0, 3.0]],
        })
    }
}

#[tokio::main]
async fn main() -> balltrack::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let config = match std::env::var("BALLTRACK_CONFIG") {
        Ok(path) => Config::from_file(path)?,
        Err(_) => Config::default(),
    };

    let mut server = Server::new(config, Box::new(MockCamera::new()), Arc::new(FixedCalibrator));
    server.connect().await?;

    println!("Device server running, press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;

    server.disconnect().await?;
    Ok(())
}

//! High-level error types

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Protocol error: {0}")]
    Core(#[from] balltrack_core::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] balltrack_transport::Error),

    #[error("Type error: {0}")]
    Types(#[from] balltrack_types::Error),

    #[error("Camera error: {0}")]
    Camera(#[from] crate::camera::CameraError),

    #[error("Calibration error: {0}")]
    Calibration(#[from] crate::calibration::CalibrationError),

    #[error("Not connected")]
    NotConnected,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// The device answered with a failed status
    #[error("Remote command '{cmd}' failed: {msg}")]
    RemoteCommand { cmd: String, msg: String },

    /// The device answered with the wrong response kind
    #[error("Unexpected response to '{cmd}': got '{got}'")]
    UnexpectedResponse { cmd: String, got: String },
}

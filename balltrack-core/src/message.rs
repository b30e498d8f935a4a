//! Typed protocol messages
//!
//! Every message travels as a MessagePack map whose `command` key carries
//! the tag from [`Command`]; the remaining keys are the variant's fields.
//! The serde representation below IS that mapping, so encoding and decoding
//! round-trip losslessly.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::command::Command;

/// A point in court space, meters
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3D {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Requests accepted on the control channel (client to device)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command")]
pub enum Request {
    /// Start tracking the ball
    #[serde(rename = "start_tracking")]
    StartTracking,

    /// Stop tracking the ball
    #[serde(rename = "stop_tracking")]
    StopTracking,

    /// Calibrate both cameras and persist the combined artifact
    #[serde(rename = "calibrate_camera")]
    CalibrateCamera,

    /// Configure the device LED blink pattern
    #[serde(rename = "configure_led")]
    ConfigureLed {
        period_ms: u32,
        duty_cycle_percent: u32,
    },

    /// Fetch the four corners of the court
    #[serde(rename = "get_court_boundaries")]
    GetCourtBoundaries,

    /// Start streaming stereo frames on the camera-feed channel
    #[serde(rename = "start_sending_camera_feed")]
    StartSendingCameraFeed,

    /// Stop streaming stereo frames
    #[serde(rename = "stop_sending_camera_feed")]
    StopSendingCameraFeed,

    /// Capture one stereo pair and return it inline
    #[serde(rename = "get_camera_feed")]
    GetCameraFeed,

    /// Measure the camera capture rate
    #[serde(rename = "test_camera_fps")]
    TestCameraFps,
}

impl Request {
    /// Command tag of this request
    pub fn command(&self) -> Command {
        match self {
            Self::StartTracking => Command::StartTracking,
            Self::StopTracking => Command::StopTracking,
            Self::CalibrateCamera => Command::CalibrateCamera,
            Self::ConfigureLed { .. } => Command::ConfigureLed,
            Self::GetCourtBoundaries => Command::GetCourtBoundaries,
            Self::StartSendingCameraFeed => Command::StartSendingCameraFeed,
            Self::StopSendingCameraFeed => Command::StopSendingCameraFeed,
            Self::GetCameraFeed => Command::GetCameraFeed,
            Self::TestCameraFps => Command::TestCameraFps,
        }
    }
}

/// Responses and events sent by the device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command")]
pub enum Response {
    /// Outcome of a control request; `cmd_id` names the request it answers
    #[serde(rename = "status")]
    Status {
        cmd_id: String,
        successful: bool,
        msg: String,
    },

    /// One stereo pair, JPEG-encoded
    #[serde(rename = "camera_feed_data")]
    CameraFeedData {
        left_feed: Bytes,
        right_feed: Bytes,
    },

    /// Measured camera capture rate
    #[serde(rename = "test_camera_fps_result")]
    TestCameraFpsResult { fps: f64 },

    /// The four corners of the court
    #[serde(rename = "court_boundaries")]
    CourtBoundaries { corners: [Point3D; 4] },
}

impl Response {
    /// Topic the camera feed is published under on pub/sub transports
    pub const CAMERA_FEED_TOPIC: &'static str = "camera.feed";

    /// Successful status for the given request command
    pub fn ok(cmd: Command) -> Self {
        Self::Status {
            cmd_id: cmd.tag().to_string(),
            successful: true,
            msg: String::new(),
        }
    }

    /// Failed status for the given request command
    pub fn fail(cmd: Command, msg: impl Into<String>) -> Self {
        Self::Status {
            cmd_id: cmd.tag().to_string(),
            successful: false,
            msg: msg.into(),
        }
    }

    /// Command tag of this response
    pub fn command(&self) -> Command {
        match self {
            Self::Status { .. } => Command::Status,
            Self::CameraFeedData { .. } => Command::CameraFeedData,
            Self::TestCameraFpsResult { .. } => Command::TestCameraFpsResult,
            Self::CourtBoundaries { .. } => Command::CourtBoundaries,
        }
    }
}

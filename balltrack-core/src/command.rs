//! Protocol command definitions

use std::fmt;

use crate::error::{Error, Result};

/// Protocol command tags
///
/// The tag strings are the stable protocol surface shared with every
/// client implementation. They must not change.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Command {
    // Control requests (client to device)
    StartTracking,
    StopTracking,
    CalibrateCamera,
    ConfigureLed,
    GetCourtBoundaries,

    // Debug requests
    StartSendingCameraFeed,
    StopSendingCameraFeed,
    GetCameraFeed,
    TestCameraFps,

    // Responses (device to client)
    Status,
    CameraFeedData,
    TestCameraFpsResult,
    CourtBoundaries,
}

impl Command {
    /// All commands, requests and responses
    pub const ALL: [Command; 13] = [
        Self::StartTracking,
        Self::StopTracking,
        Self::CalibrateCamera,
        Self::ConfigureLed,
        Self::GetCourtBoundaries,
        Self::StartSendingCameraFeed,
        Self::StopSendingCameraFeed,
        Self::GetCameraFeed,
        Self::TestCameraFps,
        Self::Status,
        Self::CameraFeedData,
        Self::TestCameraFpsResult,
        Self::CourtBoundaries,
    ];

    /// Wire tag for this command
    pub fn tag(self) -> &'static str {
        match self {
            Self::StartTracking => "start_tracking",
            Self::StopTracking => "stop_tracking",
            Self::CalibrateCamera => "calibrate_camera",
            Self::ConfigureLed => "configure_led",
            Self::GetCourtBoundaries => "get_court_boundaries",
            Self::StartSendingCameraFeed => "start_sending_camera_feed",
            Self::StopSendingCameraFeed => "stop_sending_camera_feed",
            Self::GetCameraFeed => "get_camera_feed",
            Self::TestCameraFps => "test_camera_fps",
            Self::Status => "status",
            Self::CameraFeedData => "camera_feed_data",
            Self::TestCameraFpsResult => "test_camera_fps_result",
            Self::CourtBoundaries => "court_boundaries",
        }
    }

    /// Check if this is a request command (client to device)
    pub fn is_request(self) -> bool {
        !self.is_response()
    }

    /// Check if this is a response command (device to client)
    pub fn is_response(self) -> bool {
        matches!(
            self,
            Self::Status
                | Self::CameraFeedData
                | Self::TestCameraFpsResult
                | Self::CourtBoundaries
        )
    }
}

impl TryFrom<&str> for Command {
    type Error = Error;

    fn try_from(tag: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|cmd| cmd.tag() == tag)
            .ok_or_else(|| Error::UnknownCommand(tag.to_string()))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_round_trip() {
        for cmd in Command::ALL {
            assert_eq!(Command::try_from(cmd.tag()).unwrap(), cmd);
        }
    }

    #[test]
    fn test_unknown_tag() {
        let result = Command::try_from("open_pod_bay_doors");
        assert!(matches!(result, Err(Error::UnknownCommand(_))));
    }

    #[test]
    fn test_request_response_split() {
        assert!(Command::Status.is_response());
        assert!(Command::CameraFeedData.is_response());
        assert!(!Command::StartTracking.is_response());
        assert!(Command::ConfigureLed.is_request());
    }
}

//! Typed client facade
//!
//! One method per command. Each sends the request on the control channel,
//! blocks for the reply, and surfaces a failed status as
//! [`Error::RemoteCommand`]. Streamed frames arrive through
//! [`process_camera_feed`](Client::process_camera_feed) on the feed
//! channel.

use bytes::Bytes;
use tracing::{debug, info};

use balltrack_core::{Command, Point3D, Request, Response};
use balltrack_transport::{PullSession, RequestSession, Session};

use crate::config::Config;
use crate::error::{Error, Result};

/// Client for one balltrack device
pub struct Client {
    ctrl_session: RequestSession,
    feed_session: PullSession,
    connected: bool,
}

impl Client {
    /// Create a disconnected client for the given ports
    pub fn new(ctrl_port: u16, camera_feed_port: u16) -> Self {
        Self {
            ctrl_session: RequestSession::new(ctrl_port),
            feed_session: PullSession::new(camera_feed_port),
            connected: false,
        }
    }

    /// Create a disconnected client from a device config
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.network.ctrl_port, config.network.camera_feed_port)
    }

    /// Check if both channels are up
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Connect both channels to the device; idempotent
    pub async fn connect(&mut self, host: &str) -> Result<()> {
        if self.connected {
            return Ok(());
        }
        self.ctrl_session.start(host).await?;
        self.feed_session.start(host).await?;
        self.connected = true;
        info!("Connected to device at {host}");
        Ok(())
    }

    /// Release both channels; idempotent
    pub async fn disconnect(&mut self) -> Result<()> {
        if !self.connected {
            return Ok(());
        }
        self.ctrl_session.stop().await?;
        self.feed_session.stop().await?;
        self.connected = false;
        info!("Disconnected from device");
        Ok(())
    }

    /// Start ball tracking
    pub async fn start_tracking(&mut self) -> Result<()> {
        let response = self.issue(Request::StartTracking).await?;
        Self::expect_status(Command::StartTracking, response)
    }

    /// Stop ball tracking
    pub async fn stop_tracking(&mut self) -> Result<()> {
        let response = self.issue(Request::StopTracking).await?;
        Self::expect_status(Command::StopTracking, response)
    }

    /// Calibrate both cameras and persist the combined artifact
    pub async fn calibrate_camera(&mut self) -> Result<()> {
        let response = self.issue(Request::CalibrateCamera).await?;
        Self::expect_status(Command::CalibrateCamera, response)
    }

    /// Configure the device LED blink pattern
    pub async fn configure_led(&mut self, period_ms: u32, duty_cycle_percent: u32) -> Result<()> {
        let response = self
            .issue(Request::ConfigureLed {
                period_ms,
                duty_cycle_percent,
            })
            .await?;
        Self::expect_status(Command::ConfigureLed, response)
    }

    /// Fetch the four corners of the court
    pub async fn get_court_boundaries(&mut self) -> Result<[Point3D; 4]> {
        match self.issue(Request::GetCourtBoundaries).await? {
            Response::CourtBoundaries { corners } => Ok(corners),
            other => Err(Self::unexpected(Command::GetCourtBoundaries, other)),
        }
    }

    /// Start the device streaming frames on the feed channel
    pub async fn start_sending_camera_feed(&mut self) -> Result<()> {
        let response = self.issue(Request::StartSendingCameraFeed).await?;
        Self::expect_status(Command::StartSendingCameraFeed, response)
    }

    /// Stop the feed stream
    pub async fn stop_sending_camera_feed(&mut self) -> Result<()> {
        let response = self.issue(Request::StopSendingCameraFeed).await?;
        Self::expect_status(Command::StopSendingCameraFeed, response)
    }

    /// Capture one stereo pair inline, bypassing the feed channel
    pub async fn get_camera_feed(&mut self) -> Result<(Bytes, Bytes)> {
        match self.issue(Request::GetCameraFeed).await? {
            Response::CameraFeedData {
                left_feed,
                right_feed,
            } => Ok((left_feed, right_feed)),
            other => Err(Self::unexpected(Command::GetCameraFeed, other)),
        }
    }

    /// Measure the device's camera capture rate
    pub async fn test_camera_fps(&mut self) -> Result<f64> {
        match self.issue(Request::TestCameraFps).await? {
            Response::TestCameraFpsResult { fps } => Ok(fps),
            other => Err(Self::unexpected(Command::TestCameraFps, other)),
        }
    }

    /// Block for the next streamed stereo pair on the feed channel
    pub async fn process_camera_feed(&mut self) -> Result<(Bytes, Bytes)> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        match self.feed_session.recv::<Response>().await? {
            Response::CameraFeedData {
                left_feed,
                right_feed,
            } => Ok((left_feed, right_feed)),
            other => Err(Self::unexpected(Command::CameraFeedData, other)),
        }
    }

    async fn issue(&mut self, request: Request) -> Result<Response> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        let cmd = request.command();
        debug!("Issuing '{cmd}'");
        let response: Response = self.ctrl_session.send_receive(&request).await?;
        Ok(response)
    }

    /// A status response either confirms the command or carries the
    /// device's failure message
    fn expect_status(cmd: Command, response: Response) -> Result<()> {
        match response {
            Response::Status {
                successful: true, ..
            } => Ok(()),
            Response::Status { msg, .. } => Err(Error::RemoteCommand {
                cmd: cmd.tag().to_string(),
                msg,
            }),
            other => Err(Self::unexpected(cmd, other)),
        }
    }

    fn unexpected(cmd: Command, got: Response) -> Error {
        match got {
            // A failed status in place of a payload response carries the
            // device's own explanation; pass it through
            Response::Status {
                successful: false,
                msg,
                ..
            } => Error::RemoteCommand {
                cmd: cmd.tag().to_string(),
                msg,
            },
            other => Error::UnexpectedResponse {
                cmd: cmd.tag().to_string(),
                got: other.command().tag().to_string(),
            },
        }
    }
}

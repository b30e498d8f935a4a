//! Device-side command dispatch
//!
//! The server owns two channels: the reply session answering control
//! requests and the push session streaming camera frames. Each runs its
//! own task; they share nothing but the run flags and the camera lock.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use balltrack_core::{Command, Point3D, Request, Response, codec};
use balltrack_transport::{PushSession, ReplySession, Session};
use balltrack_types::{FrameView, GridPattern};

use crate::calibration::{Calibrator, save_calibration};
use crate::camera::FrameSource;
use crate::config::Config;
use crate::error::Result;

/// How often the loops check their run flags between receives
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Frames captured per fps measurement
const FPS_TEST_FRAMES: u32 = 100;

/// How long disconnect waits for each loop before aborting it
const JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// The device's control-plane server
///
/// Answers typed requests on the control channel while independently
/// streaming camera frames on the feed channel. One client at a time.
pub struct Server {
    config: Config,
    connected: Arc<AtomicBool>,
    streaming_feed: Arc<AtomicBool>,
    camera: Arc<Mutex<Box<dyn FrameSource>>>,
    calibrator: Arc<dyn Calibrator>,
    workers: Vec<JoinHandle<()>>,
}

impl Server {
    /// Create a disconnected server around its two collaborators
    pub fn new(config: Config, camera: Box<dyn FrameSource>, calibrator: Arc<dyn Calibrator>) -> Self {
        Self {
            config,
            connected: Arc::new(AtomicBool::new(false)),
            streaming_feed: Arc::new(AtomicBool::new(false)),
            camera: Arc::new(Mutex::new(camera)),
            calibrator,
            workers: Vec::new(),
        }
    }

    /// Check if the server is serving
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Check if the feed loop is currently streaming
    pub fn is_streaming_feed(&self) -> bool {
        self.streaming_feed.load(Ordering::Acquire)
    }

    /// Bind both channels and spawn the control and feed loops; idempotent
    pub async fn connect(&mut self) -> Result<()> {
        if self.is_connected() {
            return Ok(());
        }

        let host = self.config.network.host.clone();

        let mut ctrl_session = ReplySession::new(self.config.network.ctrl_port);
        ctrl_session.start(&host).await?;
        let mut feed_session = PushSession::new(self.config.network.camera_feed_port);
        feed_session.start(&host).await?;

        info!(
            "Server listening on {host}:{} (control) and {host}:{} (camera feed)",
            self.config.network.ctrl_port, self.config.network.camera_feed_port
        );

        self.connected.store(true, Ordering::Release);

        let control = ControlLoop {
            session: ctrl_session,
            connected: Arc::clone(&self.connected),
            streaming_feed: Arc::clone(&self.streaming_feed),
            camera: Arc::clone(&self.camera),
            calibrator: Arc::clone(&self.calibrator),
            left_images_dir: self.config.calibration.left_images_dir.clone(),
            right_images_dir: self.config.calibration.right_images_dir.clone(),
            grid_pattern: self.config.calibration.grid_pattern(),
            calibration_output: self.config.calibration.output_path.clone(),
            court_corners: self.config.court.corners,
            tracking: false,
            led: None,
        };
        let feed = FeedLoop {
            session: feed_session,
            connected: Arc::clone(&self.connected),
            streaming_feed: Arc::clone(&self.streaming_feed),
            camera: Arc::clone(&self.camera),
        };

        self.workers.push(tokio::spawn(control.run()));
        self.workers.push(tokio::spawn(feed.run()));

        Ok(())
    }

    /// Stop both loops and release the channels; idempotent
    ///
    /// Loops poll their flags every [`POLL_INTERVAL`], so shutdown latency
    /// is bounded; a loop that still overruns [`JOIN_TIMEOUT`] is aborted.
    pub async fn disconnect(&mut self) -> Result<()> {
        if !self.is_connected() {
            return Ok(());
        }

        info!("Server shutting down");
        self.connected.store(false, Ordering::Release);
        self.streaming_feed.store(false, Ordering::Release);

        for worker in self.workers.drain(..) {
            let abort = worker.abort_handle();
            match timeout(JOIN_TIMEOUT, worker).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("Server worker panicked: {e}"),
                Err(_) => {
                    warn!("Server worker did not stop within {JOIN_TIMEOUT:?}, aborting");
                    abort.abort();
                }
            }
        }

        Ok(())
    }
}

/// Capture one stereo pair and package it for the wire
///
/// Every capture in the process goes through this lock; the driver is not
/// reentrant-safe.
async fn capture_feed_data(camera: &Mutex<Box<dyn FrameSource>>) -> Result<Response> {
    let mut camera = camera.lock().await;
    let stereo = camera.capture().await?;
    let left_feed = camera.encode_jpeg(&stereo.left, FrameView::All)?;
    let right_feed = camera.encode_jpeg(&stereo.right, FrameView::All)?;
    Ok(Response::CameraFeedData {
        left_feed,
        right_feed,
    })
}

#[derive(Debug, Clone, Copy)]
struct LedConfig {
    period_ms: u32,
    duty_cycle_percent: u32,
}

/// Receive-dispatch-respond loop on the control channel
struct ControlLoop {
    session: ReplySession,
    connected: Arc<AtomicBool>,
    streaming_feed: Arc<AtomicBool>,
    camera: Arc<Mutex<Box<dyn FrameSource>>>,
    calibrator: Arc<dyn Calibrator>,
    left_images_dir: PathBuf,
    right_images_dir: PathBuf,
    grid_pattern: GridPattern,
    calibration_output: PathBuf,
    court_corners: Option<[Point3D; 4]>,
    tracking: bool,
    led: Option<LedConfig>,
}

impl ControlLoop {
    async fn run(mut self) {
        debug!("Control loop started");
        while self.connected.load(Ordering::Acquire) {
            let frame = match self.session.recv_frame_timeout(POLL_INTERVAL).await {
                Ok(Some(frame)) => frame,
                Ok(None) => continue,
                Err(e) => {
                    warn!("Control receive failed: {e}");
                    continue;
                }
            };

            let response = match codec::decode_request(&frame) {
                Ok(Some(request)) => {
                    debug!("Request received: {}", request.command());
                    Some(self.dispatch(request).await)
                }
                // A frame holding zero messages needs no answer
                Ok(None) => None,
                Err(balltrack_core::Error::UnknownCommand(tag)) => {
                    warn!("Unknown command '{tag}'");
                    Some(Response::Status {
                        cmd_id: tag,
                        successful: false,
                        msg: "unknown command".to_string(),
                    })
                }
                Err(e) => {
                    warn!("Dropping undecodable request: {e}");
                    None
                }
            };

            match response {
                Some(response) => {
                    debug!("Response sent: {}", response.command());
                    if let Err(e) = self.session.send(&response).await {
                        warn!("Control send failed: {e}");
                    }
                }
                None => {
                    // The consumed frame gets no reply; free the turn
                    if self.session.owes_reply() {
                        let _ = self.session.decline();
                    }
                }
            }
        }

        if let Err(e) = self.session.stop().await {
            warn!("Control session teardown failed: {e}");
        }
        debug!("Control loop stopped");
    }

    async fn dispatch(&mut self, request: Request) -> Response {
        match request {
            Request::StartTracking => self.start_tracking(),
            Request::StopTracking => self.stop_tracking(),
            Request::CalibrateCamera => self.calibrate_camera(),
            Request::ConfigureLed {
                period_ms,
                duty_cycle_percent,
            } => self.configure_led(period_ms, duty_cycle_percent),
            Request::GetCourtBoundaries => self.court_boundaries(),
            Request::StartSendingCameraFeed => self.start_sending_camera_feed(),
            Request::StopSendingCameraFeed => self.stop_sending_camera_feed(),
            Request::GetCameraFeed => self.get_camera_feed().await,
            Request::TestCameraFps => self.test_camera_fps().await,
        }
    }

    fn start_tracking(&mut self) -> Response {
        if self.tracking {
            debug!("Tracking already active");
        }
        self.tracking = true;
        info!("Ball tracking started");
        Response::ok(Command::StartTracking)
    }

    fn stop_tracking(&mut self) -> Response {
        self.tracking = false;
        info!("Ball tracking stopped");
        Response::ok(Command::StopTracking)
    }

    fn calibrate_camera(&mut self) -> Response {
        let left = match self
            .calibrator
            .calibrate(&self.left_images_dir, self.grid_pattern)
        {
            Ok(calibration) => calibration,
            Err(e) => {
                return Response::fail(
                    Command::CalibrateCamera,
                    format!("Failed to calibrate the left camera: {e}"),
                );
            }
        };

        let right = match self
            .calibrator
            .calibrate(&self.right_images_dir, self.grid_pattern)
        {
            Ok(calibration) => calibration,
            Err(e) => {
                return Response::fail(
                    Command::CalibrateCamera,
                    format!("Failed to calibrate the right camera: {e}"),
                );
            }
        };

        if let Err(e) = save_calibration(&self.calibration_output, &left, &right) {
            return Response::fail(
                Command::CalibrateCamera,
                format!("Failed to save the calibration data: {e}"),
            );
        }

        Response::ok(Command::CalibrateCamera)
    }

    fn configure_led(&mut self, period_ms: u32, duty_cycle_percent: u32) -> Response {
        if period_ms == 0 {
            return Response::fail(Command::ConfigureLed, "LED period must be positive");
        }
        if duty_cycle_percent > 100 {
            return Response::fail(
                Command::ConfigureLed,
                "LED duty cycle must be at most 100 percent",
            );
        }

        if let Some(previous) = self.led {
            debug!(
                "Replacing LED config ({}ms at {}%)",
                previous.period_ms, previous.duty_cycle_percent
            );
        }
        self.led = Some(LedConfig {
            period_ms,
            duty_cycle_percent,
        });
        info!("LED configured: {period_ms}ms period at {duty_cycle_percent}% duty cycle");
        Response::ok(Command::ConfigureLed)
    }

    fn court_boundaries(&self) -> Response {
        match self.court_corners {
            Some(corners) => Response::CourtBoundaries { corners },
            None => Response::fail(
                Command::GetCourtBoundaries,
                "Court boundaries are not available",
            ),
        }
    }

    fn start_sending_camera_feed(&mut self) -> Response {
        if self.streaming_feed.load(Ordering::Acquire) {
            return Response::fail(
                Command::StartSendingCameraFeed,
                "Camera feed is already running",
            );
        }
        self.streaming_feed.store(true, Ordering::Release);
        info!("Camera feed streaming started");
        Response::ok(Command::StartSendingCameraFeed)
    }

    fn stop_sending_camera_feed(&mut self) -> Response {
        if !self.streaming_feed.load(Ordering::Acquire) {
            return Response::fail(
                Command::StopSendingCameraFeed,
                "Camera feed is not currently running",
            );
        }
        self.streaming_feed.store(false, Ordering::Release);
        info!("Camera feed streaming stopped");
        Response::ok(Command::StopSendingCameraFeed)
    }

    async fn get_camera_feed(&mut self) -> Response {
        match capture_feed_data(&self.camera).await {
            Ok(response) => response,
            Err(e) => Response::fail(Command::GetCameraFeed, format!("Frame capture failed: {e}")),
        }
    }

    async fn test_camera_fps(&mut self) -> Response {
        // Hold the capture lock for the whole run so the feed loop cannot
        // interleave and skew the measurement
        let mut camera = self.camera.lock().await;
        let started = Instant::now();
        for _ in 0..FPS_TEST_FRAMES {
            if let Err(e) = camera.capture().await {
                return Response::fail(
                    Command::TestCameraFps,
                    format!("Frame capture failed: {e}"),
                );
            }
        }
        let elapsed = started.elapsed().as_secs_f64().max(1e-9);

        let fps = f64::from(FPS_TEST_FRAMES) / elapsed;
        info!("Camera fps test: {fps:.1}");
        Response::TestCameraFpsResult { fps }
    }
}

/// Fire-and-forget frame streaming on the camera-feed channel
struct FeedLoop {
    session: PushSession,
    connected: Arc<AtomicBool>,
    streaming_feed: Arc<AtomicBool>,
    camera: Arc<Mutex<Box<dyn FrameSource>>>,
}

impl FeedLoop {
    async fn run(mut self) {
        debug!("Camera feed loop started");
        while self.connected.load(Ordering::Acquire) {
            if !self.streaming_feed.load(Ordering::Acquire) {
                sleep(POLL_INTERVAL).await;
                continue;
            }

            match capture_feed_data(&self.camera).await {
                Ok(message) => {
                    // Best-effort: an absent or dead consumer costs one frame
                    if let Err(e) = self.session.send(&message).await {
                        debug!("Feed frame dropped: {e}");
                    }
                }
                Err(e) => {
                    warn!("Feed capture failed: {e}");
                    sleep(POLL_INTERVAL).await;
                }
            }
        }

        if let Err(e) = self.session.stop().await {
            warn!("Feed session teardown failed: {e}");
        }
        debug!("Camera feed loop stopped");
    }
}

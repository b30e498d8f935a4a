//! # balltrack
//!
//! Control plane for a remote stereo-camera ball tracking device.
//!
//! A [`Server`] runs on the device: it answers typed commands on a
//! request/reply channel (tracking, calibration, LED, diagnostics) and
//! streams camera frames fire-and-forget on a push channel. A [`Client`]
//! drives it from the other end of both channels.
//!
//! ## Quick start
//!
//! ```no_run
//! use balltrack::{Client, Config};
//!
//! #[tokio::main]
//! async fn main() -> balltrack::Result<()> {
//!     let config = Config::default();
//!
//!     let mut client = Client::from_config(&config);
//!     client.connect(&config.network.host).await?;
//!
//!     client.configure_led(500, 50).await?;
//!
//!     client.start_sending_camera_feed().await?;
//!     let (left, right) = client.process_camera_feed().await?;
//!     println!("Got {}+{} bytes of frame data", left.len(), right.len());
//!     client.stop_sending_camera_feed().await?;
//!
//!     client.disconnect().await?;
//!     Ok(())
//! }
//! ```

pub mod calibration;
pub mod camera;
pub mod client;
pub mod config;
pub mod error;
pub mod server;

// Re-exports
pub use calibration::{Calibrator, save_calibration};
pub use camera::{FrameSource, MockCamera};
pub use client::Client;
pub use config::Config;
pub use error::{Error, Result};
pub use server::Server;

// Re-export protocol and domain types
pub use balltrack_core::{Command, Point3D, Request, Response};
pub use balltrack_transport::{
    PublishSession, PullSession, PushSession, ReplySession, RequestSession, Session,
    SubscribeSession,
};
pub use balltrack_types::{CameraCalibration, CameraFrame, FrameView, GridPattern, StereoFrame};

//! Type definitions for balltrack devices

pub mod calibration;
pub mod error;
pub mod frame;

pub use calibration::{CameraCalibration, GridPattern};
pub use error::{Error, Result};
pub use frame::{CameraFrame, FrameView, StereoFrame};

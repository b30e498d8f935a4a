//! Camera collaborator interface
//!
//! The stereo camera is an external device behind a vendor driver; this
//! crate only ever talks to it through [`FrameSource`]. Captures are safe
//! to repeat but the driver is not reentrant, so the server serializes
//! every capture behind one lock.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;

use balltrack_types::{CameraFrame, FrameView, StereoFrame};

pub type Result<T> = std::result::Result<T, CameraError>;

#[derive(Debug, thiserror::Error)]
pub enum CameraError {
    #[error("Frame capture failed: {0}")]
    Capture(String),

    #[error("Frame encoding failed: {0}")]
    Encode(String),

    #[error(transparent)]
    Frame(#[from] balltrack_types::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A source of stereo camera frames
#[async_trait]
pub trait FrameSource: Send {
    /// Capture one stereo pair
    async fn capture(&mut self) -> Result<StereoFrame>;

    /// JPEG-encode one view of a frame for the wire
    fn encode_jpeg(&self, frame: &CameraFrame, view: FrameView) -> Result<Bytes>;

    /// Write one view of a frame to disk
    fn save_frame(&self, path: &Path, frame: &CameraFrame, view: FrameView) -> Result<()>;
}

/// Synthetic frame source for development and tests
///
/// Produces a deterministic pattern that shifts every capture, so
/// consecutive frames differ and tests can assert on capture counts.
/// The "JPEG" blobs it emits carry real SOI/EOI markers around raw view
/// bytes; they stand in for the vendor encoder, nothing decodes them.
pub struct MockCamera {
    width: usize,
    height: usize,
    captures: Arc<AtomicU64>,
}

impl MockCamera {
    /// Stand-in camera at a small test resolution
    pub fn new() -> Self {
        Self::with_resolution(64, 48)
    }

    pub fn with_resolution(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            captures: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Shared capture counter; clones stay live after the camera moves
    /// into a server
    pub fn capture_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.captures)
    }
}

impl Default for MockCamera {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FrameSource for MockCamera {
    async fn capture(&mut self) -> Result<StereoFrame> {
        let n = self.captures.fetch_add(1, Ordering::AcqRel);

        let mut packed = Vec::with_capacity(self.width * self.height * 8);
        for y in 0..self.height {
            for x in 0..self.width {
                for channel in 0..8u64 {
                    packed.push((x as u64 + y as u64 + n + channel) as u8);
                }
            }
        }

        Ok(StereoFrame::from_packed(&packed, self.width, self.height)?)
    }

    fn encode_jpeg(&self, frame: &CameraFrame, view: FrameView) -> Result<Bytes> {
        let body = frame.view(view);
        let mut blob = Vec::with_capacity(body.len() + 4);
        blob.extend_from_slice(&[0xFF, 0xD8]); // SOI
        blob.extend_from_slice(&body);
        blob.extend_from_slice(&[0xFF, 0xD9]); // EOI
        Ok(Bytes::from(blob))
    }

    fn save_frame(&self, path: &Path, frame: &CameraFrame, view: FrameView) -> Result<()> {
        std::fs::write(path, frame.view(view))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_capture_counts_and_varies() {
        let mut camera = MockCamera::with_resolution(4, 4);
        let counter = camera.capture_counter();

        let first = camera.capture().await.unwrap();
        let second = camera.capture().await.unwrap();

        assert_eq!(counter.load(Ordering::Acquire), 2);
        assert_ne!(first.left.raw(), second.left.raw());
    }

    #[tokio::test]
    async fn test_mock_jpeg_markers() {
        let mut camera = MockCamera::with_resolution(4, 4);
        let stereo = camera.capture().await.unwrap();

        let blob = camera.encode_jpeg(&stereo.left, FrameView::All).unwrap();
        assert_eq!(&blob[..2], &[0xFF, 0xD8]);
        assert_eq!(&blob[blob.len() - 2..], &[0xFF, 0xD9]);
    }

    #[tokio::test]
    async fn test_save_frame_writes_view() {
        let mut camera = MockCamera::with_resolution(4, 4);
        let stereo = camera.capture().await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("left_grey.raw");
        camera
            .save_frame(&path, &stereo.left, FrameView::Greyscale)
            .unwrap();

        let written = std::fs::read(&path).unwrap();
        assert_eq!(written.len(), 16); // one byte per pixel
    }
}

//! Stereo camera frame types
//!
//! The sensor delivers one packed buffer per capture: `height × width × 8`
//! bytes, channels 0..4 belonging to the left camera and 4..8 to the
//! right. Each camera's four channels are R, G, B and a hardware
//! greyscale plane.

use bytes::Bytes;

use crate::error::{Error, Result};

/// Native sensor width in pixels
pub const FRAME_WIDTH: usize = 752;

/// Native sensor height in pixels
pub const FRAME_HEIGHT: usize = 480;

/// Channels per camera in the packed buffer
pub const FRAME_CHANNELS: usize = 4;

/// A view over one camera's packed frame data
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FrameView {
    /// All four channels as captured
    All,
    /// The three color channels
    Rgb,
    /// Color channels with green and blue zeroed
    Red,
    /// Color channels with red and blue zeroed
    Green,
    /// Color channels with red and green zeroed
    Blue,
    /// The hardware greyscale plane
    Greyscale,
}

/// One camera's frame: `height × width × 4` interleaved bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraFrame {
    data: Bytes,
    width: usize,
    height: usize,
}

impl CameraFrame {
    /// Wrap packed 4-channel data, validating its size
    pub fn new(data: Bytes, width: usize, height: usize) -> Result<Self> {
        let expected = width * height * FRAME_CHANNELS;
        if data.len() != expected {
            return Err(Error::InvalidFrameSize {
                expected,
                actual: data.len(),
                width,
                height,
            });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// The packed 4-channel data as captured
    pub fn raw(&self) -> &Bytes {
        &self.data
    }

    /// Extract the requested view as a fresh buffer
    ///
    /// `All` and `Greyscale` keep their native channel counts (4 and 1);
    /// every color view is `height × width × 3`.
    pub fn view(&self, view: FrameView) -> Vec<u8> {
        match view {
            FrameView::All => self.data.to_vec(),
            FrameView::Rgb => self.color_view([true, true, true]),
            FrameView::Red => self.color_view([true, false, false]),
            FrameView::Green => self.color_view([false, true, false]),
            FrameView::Blue => self.color_view([false, false, true]),
            FrameView::Greyscale => self
                .data
                .chunks_exact(FRAME_CHANNELS)
                .map(|px| px[3])
                .collect(),
        }
    }

    fn color_view(&self, keep: [bool; 3]) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.width * self.height * 3);
        for px in self.data.chunks_exact(FRAME_CHANNELS) {
            for (channel, &kept) in keep.iter().enumerate() {
                out.push(if kept { px[channel] } else { 0 });
            }
        }
        out
    }
}

/// One capture from both cameras
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StereoFrame {
    pub left: CameraFrame,
    pub right: CameraFrame,
}

impl StereoFrame {
    /// Split one packed 8-channel sensor buffer into the two camera frames
    pub fn from_packed(data: &[u8], width: usize, height: usize) -> Result<Self> {
        let expected = width * height * 2 * FRAME_CHANNELS;
        if data.len() != expected {
            return Err(Error::InvalidFrameSize {
                expected,
                actual: data.len(),
                width,
                height,
            });
        }

        let pixels = width * height;
        let mut left = Vec::with_capacity(pixels * FRAME_CHANNELS);
        let mut right = Vec::with_capacity(pixels * FRAME_CHANNELS);
        for px in data.chunks_exact(2 * FRAME_CHANNELS) {
            left.extend_from_slice(&px[..FRAME_CHANNELS]);
            right.extend_from_slice(&px[FRAME_CHANNELS..]);
        }

        Ok(Self {
            left: CameraFrame::new(Bytes::from(left), width, height)?,
            right: CameraFrame::new(Bytes::from(right), width, height)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tiny_frame() -> CameraFrame {
        // 2x1 pixels: (R,G,B,Grey) = (1,2,3,4) and (5,6,7,8)
        CameraFrame::new(Bytes::from_static(&[1, 2, 3, 4, 5, 6, 7, 8]), 2, 1).unwrap()
    }

    #[test]
    fn test_size_validation() {
        let result = CameraFrame::new(Bytes::from_static(&[0; 7]), 2, 1);
        assert!(matches!(result, Err(Error::InvalidFrameSize { .. })));
    }

    #[test]
    fn test_rgb_view_drops_grey_plane() {
        assert_eq!(tiny_frame().view(FrameView::Rgb), vec![1, 2, 3, 5, 6, 7]);
    }

    #[test]
    fn test_single_channel_views_zero_the_rest() {
        let frame = tiny_frame();
        assert_eq!(frame.view(FrameView::Red), vec![1, 0, 0, 5, 0, 0]);
        assert_eq!(frame.view(FrameView::Green), vec![0, 2, 0, 0, 6, 0]);
        assert_eq!(frame.view(FrameView::Blue), vec![0, 0, 3, 0, 0, 7]);
    }

    #[test]
    fn test_greyscale_view() {
        assert_eq!(tiny_frame().view(FrameView::Greyscale), vec![4, 8]);
    }

    #[test]
    fn test_stereo_split() {
        // One pixel per camera, interleaved left then right
        let packed = [1, 2, 3, 4, 11, 12, 13, 14];
        let stereo = StereoFrame::from_packed(&packed, 1, 1).unwrap();

        assert_eq!(stereo.left.raw().as_ref(), &[1, 2, 3, 4]);
        assert_eq!(stereo.right.raw().as_ref(), &[11, 12, 13, 14]);
    }

    #[test]
    fn test_stereo_split_rejects_bad_size() {
        let result = StereoFrame::from_packed(&[0; 9], 1, 1);
        assert!(matches!(result, Err(Error::InvalidFrameSize { .. })));
    }
}

//! Frame container handed from ingest to detection.
//!
//! - `Frame`: 3-channel RGB image plus capture metadata.
//!
//! A frame is owned by exactly one pipeline iteration. Sources build it, the detector
//! consumes it, and nothing keeps it past the end of that iteration.

use image::{GrayImage, Rgb, RgbImage};
use std::time::SystemTime;

use crate::error::DetectError;

/// A color frame captured from a source.
#[derive(Clone, Debug)]
pub struct Frame {
    image: RgbImage,

    /// Position of this frame in its stream, starting at 1.
    pub sequence: u64,

    /// Wall-clock capture time. Drives the timestamp overlay.
    pub captured_at: SystemTime,
}

impl Frame {
    /// Build a frame from packed RGB24 bytes.
    ///
    /// Fails with `InvalidFrame` when `data` does not hold exactly `width * height * 3` bytes.
    pub fn from_rgb(width: u32, height: u32, data: Vec<u8>) -> Result<Self, DetectError> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| DetectError::InvalidFrame("frame dimensions overflow".into()))?;
        if data.len() != expected {
            return Err(DetectError::InvalidFrame(format!(
                "RGB frame length mismatch: expected {}, got {}",
                expected,
                data.len()
            )));
        }
        let image = RgbImage::from_raw(width, height, data).ok_or_else(|| {
            DetectError::InvalidFrame(format!("cannot wrap {}x{} RGB buffer", width, height))
        })?;
        Ok(Self::from_image(image))
    }

    pub fn from_image(image: RgbImage) -> Self {
        Self {
            image,
            sequence: 0,
            captured_at: SystemTime::now(),
        }
    }

    /// Build a color frame whose three channels all carry the given intensities.
    pub fn from_gray(gray: &GrayImage) -> Self {
        let image = RgbImage::from_fn(gray.width(), gray.height(), |x, y| {
            let v = gray.get_pixel(x, y).0[0];
            Rgb([v, v, v])
        });
        Self::from_image(image)
    }

    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn with_capture_time(mut self, captured_at: SystemTime) -> Self {
        self.captured_at = captured_at;
        self
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// True when the frame has no pixels.
    pub fn is_empty(&self) -> bool {
        self.image.width() == 0 || self.image.height() == 0
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_constructor_validates_length() {
        let err = Frame::from_rgb(4, 4, vec![0u8; 10]).unwrap_err();
        assert!(matches!(err, DetectError::InvalidFrame(_)));

        let frame = Frame::from_rgb(4, 2, vec![7u8; 24]).unwrap();
        assert_eq!(frame.width(), 4);
        assert_eq!(frame.height(), 2);
        assert!(!frame.is_empty());
    }

    #[test]
    fn zero_sized_frame_is_empty() {
        let frame = Frame::from_rgb(0, 0, Vec::new()).unwrap();
        assert!(frame.is_empty());
    }

    #[test]
    fn gray_frames_replicate_channels() {
        let gray = GrayImage::from_pixel(3, 3, image::Luma([42]));
        let frame = Frame::from_gray(&gray).with_sequence(9);
        assert_eq!(frame.sequence, 9);
        assert!(frame.image().pixels().all(|p| p.0 == [42, 42, 42]));
    }
}

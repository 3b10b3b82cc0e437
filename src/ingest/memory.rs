//! In-memory frame source.
//!
//! Hands out a prepared list of frames, then reports end-of-stream. Useful for
//! embedding the detector behind another capture stack and for tests.

use anyhow::Result;
use std::collections::VecDeque;

use super::{FrameSource, SourceStats};
use crate::frame::Frame;

pub struct MemorySource {
    frames: VecDeque<Frame>,
    delivered: u64,
    live: bool,
}

impl MemorySource {
    /// Frames are delivered in order. Sequences of 0 are renumbered from 1.
    pub fn new(frames: impl IntoIterator<Item = Frame>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
            delivered: 0,
            live: false,
        }
    }

    /// Report the source as live, as a camera would.
    pub fn live(mut self) -> Self {
        self.live = true;
        self
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource for MemorySource {
    fn connect(&mut self) -> Result<()> {
        log::debug!("MemorySource: {} frames queued", self.frames.len());
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let Some(mut frame) = self.frames.pop_front() else {
            return Ok(None);
        };
        self.delivered += 1;
        if frame.sequence == 0 {
            frame.sequence = self.delivered;
        }
        Ok(Some(frame))
    }

    fn is_live(&self) -> bool {
        self.live
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.delivered,
            origin: "memory".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GrayImage;

    #[test]
    fn delivers_frames_in_order_then_ends() -> Result<()> {
        let frames = (0..3u8).map(|v| Frame::from_gray(&GrayImage::from_pixel(2, 2, image::Luma([v]))));
        let mut source = MemorySource::new(frames);
        source.connect()?;

        for expected in 1..=3u64 {
            let frame = source.next_frame()?.expect("queued frame");
            assert_eq!(frame.sequence, expected);
            assert_eq!(frame.image().get_pixel(0, 0).0[0], (expected - 1) as u8);
        }
        assert!(source.next_frame()?.is_none());
        assert_eq!(source.stats().frames_captured, 3);
        assert_eq!(source.remaining(), 0);
        Ok(())
    }

    #[test]
    fn explicit_sequences_are_kept() -> Result<()> {
        let frame = Frame::from_gray(&GrayImage::new(1, 1)).with_sequence(42);
        let mut source = MemorySource::new([frame]).live();
        assert!(source.is_live());
        assert_eq!(source.next_frame()?.map(|f| f.sequence), Some(42));
        Ok(())
    }
}

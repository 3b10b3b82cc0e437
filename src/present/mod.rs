//! Display sinks.
//!
//! The pipeline hands every classified frame to a `Presenter` on four channels:
//! the annotated color frame, the blurred grayscale frame, the dilated threshold
//! mask and the raw difference mask. Presenters never block the loop; to end a run
//! they raise the pipeline's `StopFlag`.

mod headless;
#[cfg(feature = "display-minifb")]
mod window;

use anyhow::Result;
use image::{GrayImage, RgbImage};

pub use headless::{LogPresenter, NullPresenter};
#[cfg(feature = "display-minifb")]
pub use window::WindowPresenter;

/// Named output channels, one window each.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
    SecurityFeed,
    Gray,
    Thresh,
    FrameDelta,
}

impl Channel {
    pub const ALL: [Channel; 4] = [
        Channel::SecurityFeed,
        Channel::Gray,
        Channel::Thresh,
        Channel::FrameDelta,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Channel::SecurityFeed => "Security_Feed",
            Channel::Gray => "Gray",
            Channel::Thresh => "Thresh",
            Channel::FrameDelta => "Frame_Delta",
        }
    }

    /// Default top-left window position on screen.
    pub fn position(self) -> (isize, isize) {
        match self {
            Channel::SecurityFeed => (900, 30),
            Channel::Gray => (1400, 30),
            Channel::Thresh => (900, 500),
            Channel::FrameDelta => (1400, 500),
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Channel::SecurityFeed => 0,
            Channel::Gray => 1,
            Channel::Thresh => 2,
            Channel::FrameDelta => 3,
        }
    }
}

/// Borrowed image for one channel.
#[derive(Clone, Copy, Debug)]
pub enum DisplayImage<'a> {
    Color(&'a RgbImage),
    Gray(&'a GrayImage),
}

impl DisplayImage<'_> {
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            DisplayImage::Color(image) => image.dimensions(),
            DisplayImage::Gray(image) => image.dimensions(),
        }
    }

    /// Packed `0RGB` pixels, row-major.
    pub fn to_argb(&self) -> Vec<u32> {
        match self {
            DisplayImage::Color(image) => image
                .pixels()
                .map(|p| ((p.0[0] as u32) << 16) | ((p.0[1] as u32) << 8) | p.0[2] as u32)
                .collect(),
            DisplayImage::Gray(image) => image
                .pixels()
                .map(|p| {
                    let v = p.0[0] as u32;
                    (v << 16) | (v << 8) | v
                })
                .collect(),
        }
    }
}

/// A sink for the pipeline's per-frame output.
pub trait Presenter {
    fn show(&mut self, channel: Channel, image: DisplayImage<'_>) -> Result<()>;

    /// Tear down any windows. Called once when the pipeline exits.
    fn close(&mut self) {}
}

impl<P: Presenter + ?Sized> Presenter for Box<P> {
    fn show(&mut self, channel: Channel, image: DisplayImage<'_>) -> Result<()> {
        (**self).show(channel, image)
    }

    fn close(&mut self) {
        (**self).close()
    }
}

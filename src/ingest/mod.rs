//! Frame ingestion sources.
//!
//! This module provides the sources a pipeline can pull frames from:
//! - Live cameras (V4L2, feature: ingest-v4l2)
//! - Local video files (feature: ingest-file-ffmpeg) and still-image sequences
//! - In-memory frame lists (embedding, tests)
//! - Synthetic `stub://` scenes (demo, tests)
//!
//! All sources produce `Frame` instances. A source is pull-based: `next_frame`
//! returns `Ok(None)` once the stream has ended. Live sources never end on their own.

pub mod camera;
pub mod file;
#[cfg(feature = "ingest-file-ffmpeg")]
pub(crate) mod file_ffmpeg;
pub mod memory;
mod synthetic;

use anyhow::Result;

use crate::frame::Frame;

pub use camera::CameraSource;
pub use file::FileSource;
pub use memory::MemorySource;

/// A pull-based producer of frames for one stream.
///
/// Implementations own their device or file handle and must free it in `release`.
/// The pipeline calls `release` exactly once, on every exit path.
pub trait FrameSource {
    /// Open the underlying device or file.
    fn connect(&mut self) -> Result<()>;

    /// Capture the next frame. `Ok(None)` means end-of-stream.
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// Live sources are unbounded; file-backed ones are finite.
    fn is_live(&self) -> bool;

    /// Check if the source is healthy.
    fn is_healthy(&self) -> bool {
        true
    }

    fn stats(&self) -> SourceStats;

    /// Free the device or file handle. Idempotent.
    fn release(&mut self) {}
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn connect(&mut self) -> Result<()> {
        (**self).connect()
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        (**self).next_frame()
    }

    fn is_live(&self) -> bool {
        (**self).is_live()
    }

    fn is_healthy(&self) -> bool {
        (**self).is_healthy()
    }

    fn stats(&self) -> SourceStats {
        (**self).stats()
    }

    fn release(&mut self) {
        (**self).release()
    }
}

/// Statistics for a frame source.
#[derive(Clone, Debug)]
pub struct SourceStats {
    pub frames_captured: u64,
    /// Device node, file path or stub URL.
    pub origin: String,
}

/// Which source a pipeline should read from.
#[derive(Clone, Debug)]
pub enum SourceSelection {
    Camera(camera::CameraConfig),
    File(file::FileConfig),
}

/// Build the configured source. The source still needs `connect()`.
pub fn open_source(selection: &SourceSelection) -> Result<Box<dyn FrameSource + Send>> {
    match selection {
        SourceSelection::Camera(config) => Ok(Box::new(CameraSource::new(config.clone())?)),
        SourceSelection::File(config) => Ok(Box::new(FileSource::new(config.clone())?)),
    }
}

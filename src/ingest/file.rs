//! Local file frame source.
//!
//! This module provides `FileSource` for ingesting frames from local files.
//! The file source is responsible for:
//! - Reading frames from a local video file, a still image, or a directory of stills
//! - Decoding frames in-memory
//! - Reporting end-of-stream after the last frame
//!
//! The file source MUST NOT fetch remote URLs.

use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};

#[cfg(feature = "ingest-file-ffmpeg")]
use super::file_ffmpeg::FfmpegFileSource;
use super::synthetic::SyntheticScene;
use super::{FrameSource, SourceStats};
use crate::error::DetectError;
use crate::frame::Frame;

/// Length of the clip produced by a `stub://` file source.
pub const SYNTHETIC_CLIP_FRAMES: u64 = 150;

const STILL_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// Configuration for a local file source.
#[derive(Clone, Debug, Default)]
pub struct FileConfig {
    /// Local path (e.g., "/var/lib/motion/hallway.mp4"), or `stub://<name>`.
    pub path: String,
}

/// Local file frame source.
///
/// After `release` the backend is gone: reads return end-of-stream and
/// `connect` fails.
pub struct FileSource {
    origin: String,
    backend: Option<FileBackend>,
    frames_before_release: u64,
}

enum FileBackend {
    Synthetic(SyntheticFileSource),
    Stills(StillSequenceSource),
    #[cfg(feature = "ingest-file-ffmpeg")]
    Ffmpeg(FfmpegFileSource),
}

impl FileSource {
    pub fn new(config: FileConfig) -> Result<Self> {
        if !is_local_file_path(&config.path) {
            return Err(anyhow!(
                "file ingestion only supports local paths (no URL schemes)"
            ));
        }
        let origin = config.path.clone();
        if config.path.starts_with("stub://") {
            let backend = FileBackend::Synthetic(SyntheticFileSource::new(config));
            return Ok(Self::with_backend(origin, backend));
        }

        let path = Path::new(&config.path);
        if path.is_dir() || is_still_image(path) {
            let backend = FileBackend::Stills(StillSequenceSource::new(config)?);
            return Ok(Self::with_backend(origin, backend));
        }

        #[cfg(feature = "ingest-file-ffmpeg")]
        {
            let backend = FileBackend::Ffmpeg(FfmpegFileSource::new(config)?);
            Ok(Self::with_backend(origin, backend))
        }
        #[cfg(not(feature = "ingest-file-ffmpeg"))]
        {
            Err(anyhow!(
                "video file '{}' requires the ingest-file-ffmpeg feature",
                config.path
            ))
        }
    }

    fn with_backend(origin: String, backend: FileBackend) -> Self {
        Self {
            origin,
            backend: Some(backend),
            frames_before_release: 0,
        }
    }
}

impl FrameSource for FileSource {
    fn connect(&mut self) -> Result<()> {
        match &mut self.backend {
            Some(FileBackend::Synthetic(source)) => source.connect(),
            Some(FileBackend::Stills(source)) => source.connect(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            Some(FileBackend::Ffmpeg(source)) => source.connect(),
            None => Err(anyhow!("file source {} was released", self.origin)),
        }
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        match &mut self.backend {
            Some(FileBackend::Synthetic(source)) => source.next_frame(),
            Some(FileBackend::Stills(source)) => source.next_frame(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            Some(FileBackend::Ffmpeg(source)) => source.next_frame(),
            None => Ok(None),
        }
    }

    fn is_live(&self) -> bool {
        false
    }

    fn is_healthy(&self) -> bool {
        match &self.backend {
            Some(FileBackend::Synthetic(_)) => true,
            Some(FileBackend::Stills(source)) => source.last_error.is_none(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            Some(FileBackend::Ffmpeg(source)) => source.is_healthy(),
            None => false,
        }
    }

    fn stats(&self) -> SourceStats {
        match &self.backend {
            Some(FileBackend::Synthetic(source)) => source.stats(),
            Some(FileBackend::Stills(source)) => source.stats(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            Some(FileBackend::Ffmpeg(source)) => source.stats(),
            None => SourceStats {
                frames_captured: self.frames_before_release,
                origin: self.origin.clone(),
            },
        }
    }

    fn release(&mut self) {
        if self.backend.is_none() {
            return;
        }
        self.frames_before_release = self.stats().frames_captured;
        // Dropping the backend closes the decoder and any open file.
        self.backend = None;
        log::info!("FileSource: released {}", self.origin);
    }
}

// ----------------------------------------------------------------------------
// Synthetic source (stub://) for tests and demos
// ----------------------------------------------------------------------------

struct SyntheticFileSource {
    config: FileConfig,
    scene: SyntheticScene,
}

impl SyntheticFileSource {
    fn new(config: FileConfig) -> Self {
        Self {
            config,
            scene: SyntheticScene::new(640, 480),
        }
    }

    fn connect(&mut self) -> Result<()> {
        log::info!("FileSource: connected to {} (synthetic)", self.config.path);
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.scene.frames_generated() >= SYNTHETIC_CLIP_FRAMES {
            return Ok(None);
        }
        Ok(Some(self.scene.next_frame()?))
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.scene.frames_generated(),
            origin: self.config.path.clone(),
        }
    }
}

// ----------------------------------------------------------------------------
// Still images decoded with the `image` crate
// ----------------------------------------------------------------------------

struct StillSequenceSource {
    config: FileConfig,
    paths: Vec<PathBuf>,
    cursor: usize,
    last_error: Option<String>,
}

impl StillSequenceSource {
    fn new(config: FileConfig) -> Result<Self> {
        let root = Path::new(&config.path);
        let paths = if root.is_dir() {
            let mut paths = Vec::new();
            for entry in std::fs::read_dir(root)
                .with_context(|| format!("read image directory {}", config.path))?
            {
                let path = entry?.path();
                if path.is_file() && is_still_image(&path) {
                    paths.push(path);
                }
            }
            paths.sort();
            paths
        } else {
            vec![root.to_path_buf()]
        };

        Ok(Self {
            config,
            paths,
            cursor: 0,
            last_error: None,
        })
    }

    fn connect(&mut self) -> Result<()> {
        if self.paths.is_empty() {
            anyhow::bail!("no still images found in {}", self.config.path);
        }
        log::info!(
            "FileSource: connected to {} ({} stills)",
            self.config.path,
            self.paths.len()
        );
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let Some(path) = self.paths.get(self.cursor) else {
            return Ok(None);
        };
        self.cursor += 1;

        let image = image::open(path).map_err(|err| {
            self.last_error = Some(err.to_string());
            anyhow::Error::new(DetectError::from(err))
                .context(format!("decode {}", path.display()))
        })?;
        self.last_error = None;
        Ok(Some(
            Frame::from_image(image.to_rgb8()).with_sequence(self.cursor as u64),
        ))
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.cursor as u64,
            origin: self.config.path.clone(),
        }
    }
}

fn is_still_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            STILL_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

fn is_local_file_path(path: &str) -> bool {
    if path.trim().is_empty() {
        return false;
    }
    if path.starts_with("stub://") {
        return true;
    }
    !path.contains("://")
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn config(path: &str) -> FileConfig {
        FileConfig {
            path: path.to_string(),
        }
    }

    #[test]
    fn rejects_remote_and_empty_paths() {
        assert!(FileSource::new(config("rtsp://camera.local/stream")).is_err());
        assert!(FileSource::new(config("https://example.com/clip.mp4")).is_err());
        assert!(FileSource::new(config("   ")).is_err());
    }

    #[test]
    fn synthetic_clip_ends() -> Result<()> {
        let mut source = FileSource::new(config("stub://clip"))?;
        source.connect()?;
        let mut count = 0;
        while let Some(frame) = source.next_frame()? {
            count += 1;
            assert_eq!(frame.sequence, count);
        }
        assert_eq!(count, SYNTHETIC_CLIP_FRAMES);
        assert!(source.next_frame()?.is_none());
        assert!(!source.is_live());
        Ok(())
    }

    #[test]
    fn release_ends_the_stream_once() -> Result<()> {
        let mut source = FileSource::new(config("stub://clip"))?;
        source.connect()?;
        assert!(source.next_frame()?.is_some());

        source.release();
        source.release();
        assert!(source.next_frame()?.is_none());
        assert!(!source.is_healthy());
        assert!(source.connect().is_err());

        let stats = source.stats();
        assert_eq!(stats.frames_captured, 1);
        assert_eq!(stats.origin, "stub://clip");
        Ok(())
    }

    #[test]
    fn image_directory_is_read_in_name_order() -> Result<()> {
        let dir = tempfile::tempdir()?;
        for (name, shade) in [("b.png", 20u8), ("a.png", 10), ("c.bmp", 30)] {
            RgbImage::from_pixel(8, 6, Rgb([shade, shade, shade])).save(dir.path().join(name))?;
        }
        std::fs::write(dir.path().join("notes.txt"), "not an image")?;

        let mut source = FileSource::new(config(&dir.path().display().to_string()))?;
        source.connect()?;
        let mut shades = Vec::new();
        while let Some(frame) = source.next_frame()? {
            assert_eq!((frame.width(), frame.height()), (8, 6));
            shades.push(frame.image().get_pixel(0, 0).0[0]);
        }
        assert_eq!(shades, vec![10, 20, 30]);
        assert_eq!(source.stats().frames_captured, 3);
        Ok(())
    }

    #[test]
    fn single_image_yields_one_frame() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("still.png");
        RgbImage::new(4, 4).save(&path)?;

        let mut source = FileSource::new(config(&path.display().to_string()))?;
        source.connect()?;
        assert!(source.next_frame()?.is_some());
        assert!(source.next_frame()?.is_none());
        Ok(())
    }

    #[test]
    fn empty_directory_fails_to_connect() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut source = FileSource::new(config(&dir.path().display().to_string()))?;
        assert!(source.connect().is_err());
        Ok(())
    }

    #[test]
    fn corrupt_still_is_an_invalid_frame() -> Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("broken.png"), b"definitely not a png")?;

        let mut source = FileSource::new(config(&dir.path().display().to_string()))?;
        source.connect()?;
        let err = source.next_frame().expect_err("corrupt image");
        assert!(matches!(
            err.downcast_ref::<DetectError>(),
            Some(DetectError::InvalidFrame(_))
        ));
        assert!(!source.is_healthy());
        Ok(())
    }
}

//! Live camera frame source.
//!
//! This module provides `CameraSource` for ingesting frames from a local camera.
//!
//! The camera source is responsible for:
//! - Opening a local device node (e.g., /dev/video0)
//! - Waiting for the sensor to settle before handing out the first frame
//! - Capturing RGB frames in-memory
//!
//! A camera never reports end-of-stream; capture failures surface as errors so the
//! pipeline can apply its retry budget.

use anyhow::Result;
#[cfg(feature = "ingest-v4l2")]
use anyhow::Context;
#[cfg(feature = "ingest-v4l2")]
use ouroboros::self_referencing;
use std::time::Duration;
#[cfg(feature = "ingest-v4l2")]
use std::time::Instant;

use super::synthetic::SyntheticScene;
use super::{FrameSource, SourceStats};
use crate::frame::Frame;

/// Configuration for a camera source.
#[derive(Clone, Debug)]
pub struct CameraConfig {
    /// Device path (e.g., "/dev/video0"), or `stub://<name>` for a synthetic scene.
    pub device: String,
    /// Target frame rate (frames per second).
    pub target_fps: u32,
    /// Preferred frame width.
    pub width: u32,
    /// Preferred frame height.
    pub height: u32,
    /// Settle time after opening the device.
    pub warmup: Duration,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: "/dev/video0".to_string(),
            target_fps: 30,
            width: 640,
            height: 480,
            warmup: Duration::from_secs(2),
        }
    }
}

/// Camera frame source.
///
/// Uses libv4l for real devices, with a synthetic fallback for `stub://` paths.
pub struct CameraSource {
    backend: CameraBackend,
}

enum CameraBackend {
    Synthetic(SyntheticCamera),
    #[cfg(feature = "ingest-v4l2")]
    Device(DeviceCamera),
}

impl CameraSource {
    pub fn new(config: CameraConfig) -> Result<Self> {
        if config.device.starts_with("stub://") {
            Ok(Self {
                backend: CameraBackend::Synthetic(SyntheticCamera::new(config)),
            })
        } else {
            #[cfg(feature = "ingest-v4l2")]
            {
                Ok(Self {
                    backend: CameraBackend::Device(DeviceCamera::new(config)),
                })
            }
            #[cfg(not(feature = "ingest-v4l2"))]
            {
                anyhow::bail!(
                    "camera '{}' requires the ingest-v4l2 feature",
                    config.device
                )
            }
        }
    }
}

impl FrameSource for CameraSource {
    fn connect(&mut self) -> Result<()> {
        match &mut self.backend {
            CameraBackend::Synthetic(source) => source.connect(),
            #[cfg(feature = "ingest-v4l2")]
            CameraBackend::Device(source) => source.connect(),
        }
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        match &mut self.backend {
            CameraBackend::Synthetic(source) => source.next_frame().map(Some),
            #[cfg(feature = "ingest-v4l2")]
            CameraBackend::Device(source) => source.next_frame().map(Some),
        }
    }

    fn is_live(&self) -> bool {
        true
    }

    fn is_healthy(&self) -> bool {
        match &self.backend {
            CameraBackend::Synthetic(_) => true,
            #[cfg(feature = "ingest-v4l2")]
            CameraBackend::Device(source) => source.is_healthy(),
        }
    }

    fn stats(&self) -> SourceStats {
        match &self.backend {
            CameraBackend::Synthetic(source) => source.stats(),
            #[cfg(feature = "ingest-v4l2")]
            CameraBackend::Device(source) => source.stats(),
        }
    }

    fn release(&mut self) {
        match &mut self.backend {
            CameraBackend::Synthetic(source) => source.release(),
            #[cfg(feature = "ingest-v4l2")]
            CameraBackend::Device(source) => source.release(),
        }
    }
}

// ----------------------------------------------------------------------------
// Synthetic source (stub://) for tests and demos
// ----------------------------------------------------------------------------

struct SyntheticCamera {
    config: CameraConfig,
    scene: SyntheticScene,
}

impl SyntheticCamera {
    fn new(config: CameraConfig) -> Self {
        Self {
            scene: SyntheticScene::new(config.width, config.height),
            config,
        }
    }

    /// Synthetic cameras are always "connected".
    fn connect(&mut self) -> Result<()> {
        if !self.config.warmup.is_zero() {
            std::thread::sleep(self.config.warmup);
        }
        log::info!("CameraSource: connected to {} (synthetic)", self.config.device);
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Frame> {
        Ok(self.scene.next_frame()?)
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.scene.frames_generated(),
            origin: self.config.device.clone(),
        }
    }

    fn release(&mut self) {
        log::info!("CameraSource: released {} (synthetic)", self.config.device);
    }
}

// ----------------------------------------------------------------------------
// Production V4L2 source using libv4l
// ----------------------------------------------------------------------------

#[cfg(feature = "ingest-v4l2")]
struct DeviceCamera {
    config: CameraConfig,
    state: Option<DeviceCameraState>,
    frame_count: u64,
    last_frame_at: Option<Instant>,
    last_error: Option<String>,
    active_width: u32,
    active_height: u32,
}

#[cfg(feature = "ingest-v4l2")]
#[self_referencing]
struct DeviceCameraState {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

#[cfg(feature = "ingest-v4l2")]
impl DeviceCamera {
    fn new(config: CameraConfig) -> Self {
        Self {
            active_width: config.width,
            active_height: config.height,
            config,
            state: None,
            frame_count: 0,
            last_frame_at: None,
            last_error: None,
        }
    }

    fn connect(&mut self) -> Result<()> {
        use v4l::buffer::Type;
        use v4l::video::Capture;

        let mut device = v4l::Device::with_path(&self.config.device)
            .with_context(|| format!("open v4l2 device {}", self.config.device))?;
        let mut format = device.format().context("read v4l2 format")?;
        format.width = self.config.width;
        format.height = self.config.height;
        format.fourcc = v4l::FourCC::new(b"RGB3");

        let format = match device.set_format(&format) {
            Ok(format) => format,
            Err(err) => {
                log::warn!(
                    "CameraSource: failed to set format on {}: {}",
                    self.config.device,
                    err
                );
                device
                    .format()
                    .context("read v4l2 format after set failure")?
            }
        };
        if format.fourcc != v4l::FourCC::new(b"RGB3") {
            anyhow::bail!(
                "camera {} does not deliver RGB24 frames (negotiated {})",
                self.config.device,
                format.fourcc
            );
        }

        if self.config.target_fps > 0 {
            let params = v4l::video::capture::Parameters::with_fps(self.config.target_fps);
            if let Err(err) = device.set_params(&params) {
                log::warn!(
                    "CameraSource: failed to set fps on {}: {}",
                    self.config.device,
                    err
                );
            }
        }

        self.active_width = format.width;
        self.active_height = format.height;
        self.last_error = None;

        let state = DeviceCameraStateBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, 4)
                    .map_err(|err| anyhow::Error::new(err).context("create v4l2 buffer stream"))
            },
        }
        .try_build()
        .map_err(|err| {
            self.last_error = Some(err.to_string());
            err
        })?;
        self.state = Some(state);

        if !self.config.warmup.is_zero() {
            std::thread::sleep(self.config.warmup);
        }

        log::info!(
            "CameraSource: connected to {} ({}x{})",
            self.config.device,
            self.active_width,
            self.active_height
        );
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Frame> {
        use v4l::io::traits::CaptureStream;

        let state = self.state.as_mut().context("v4l2 device not connected")?;
        let (buf, _meta) = state
            .with_mut(|fields| fields.stream.next())
            .map_err(|err| {
                self.last_error = Some(err.to_string());
                anyhow::Error::new(err).context("capture v4l2 frame")
            })?;
        let pixels = buf.to_vec();

        self.frame_count += 1;
        self.last_frame_at = Some(Instant::now());
        self.last_error = None;

        let frame = Frame::from_rgb(self.active_width, self.active_height, pixels)?;
        Ok(frame.with_sequence(self.frame_count))
    }

    fn is_healthy(&self) -> bool {
        if self.last_error.is_some() {
            return false;
        }
        let Some(last_frame_at) = self.last_frame_at else {
            return true;
        };
        last_frame_at.elapsed() <= self.health_grace()
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            origin: self.config.device.clone(),
        }
    }

    fn release(&mut self) {
        if self.state.take().is_some() {
            log::info!("CameraSource: released {}", self.config.device);
        }
    }

    fn health_grace(&self) -> Duration {
        let base_ms = if self.config.target_fps == 0 {
            2_000
        } else {
            (1000 / self.config.target_fps).saturating_mul(6)
        };
        Duration::from_millis(base_ms.max(2_000) as u64)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

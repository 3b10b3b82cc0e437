use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::detect::DetectorSettings;
use crate::ingest::camera::CameraConfig;
use crate::ingest::file::FileConfig;
use crate::ingest::SourceSelection;
use crate::pipeline::PipelineSettings;

const DEFAULT_DEVICE: &str = "/dev/video0";
const DEFAULT_TARGET_FPS: u32 = 30;
const DEFAULT_WIDTH: u32 = 640;
const DEFAULT_HEIGHT: u32 = 480;
const DEFAULT_WARMUP_MS: u64 = 2_000;

#[derive(Debug, Deserialize, Default)]
struct WatchConfigFile {
    source: Option<SourceConfigFile>,
    detector: Option<DetectorConfigFile>,
    runtime: Option<RuntimeConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct SourceConfigFile {
    kind: Option<SourceKind>,
    device: Option<String>,
    path: Option<String>,
    target_fps: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
    warmup_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    min_area: Option<f64>,
    working_width: Option<u32>,
    blur_kernel: Option<u32>,
    threshold_cutoff: Option<u8>,
    dilate_iterations: Option<u32>,
    rebaseline_every: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct RuntimeConfigFile {
    max_source_retries: Option<u32>,
    retry_backoff_ms: Option<u64>,
    max_invalid_frames: Option<u32>,
    display: Option<bool>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Camera,
    File,
}

/// Fully resolved configuration for one watch run.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub source: SourceSettings,
    pub detector: DetectorSettings,
    pub runtime: RuntimeSettings,
}

#[derive(Debug, Clone)]
pub struct SourceSettings {
    pub kind: SourceKind,
    pub device: String,
    pub path: String,
    pub target_fps: u32,
    pub width: u32,
    pub height: u32,
    /// Camera settle time. `None` means 2 s for devices and none for `stub://`.
    pub warmup: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    pub pipeline: PipelineSettings,
    /// Open on-screen windows when the display feature is built in.
    pub display: bool,
}

impl SourceSettings {
    /// Switch to a video file, image directory or `stub://` clip.
    pub fn use_file(&mut self, path: impl Into<String>) {
        self.kind = SourceKind::File;
        self.path = path.into();
    }

    pub fn use_camera(&mut self, device: impl Into<String>) {
        self.kind = SourceKind::Camera;
        self.device = device.into();
    }

    pub fn selection(&self) -> SourceSelection {
        match self.kind {
            SourceKind::Camera => {
                let warmup = self.warmup.unwrap_or_else(|| {
                    if self.device.starts_with("stub://") {
                        Duration::ZERO
                    } else {
                        Duration::from_millis(DEFAULT_WARMUP_MS)
                    }
                });
                SourceSelection::Camera(CameraConfig {
                    device: self.device.clone(),
                    target_fps: self.target_fps,
                    width: self.width,
                    height: self.height,
                    warmup,
                })
            }
            SourceKind::File => SourceSelection::File(FileConfig {
                path: self.path.clone(),
            }),
        }
    }
}

impl WatchConfig {
    /// Config file named by `MOTION_WATCH_CONFIG`, then defaults, then env overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("MOTION_WATCH_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: WatchConfigFile) -> Self {
        let source = file.source.unwrap_or_default();
        let detector = file.detector.unwrap_or_default();
        let runtime = file.runtime.unwrap_or_default();
        let detector_defaults = DetectorSettings::default();
        let pipeline_defaults = PipelineSettings::default();

        Self {
            source: SourceSettings {
                kind: source.kind.unwrap_or_default(),
                device: source
                    .device
                    .unwrap_or_else(|| DEFAULT_DEVICE.to_string()),
                path: source.path.unwrap_or_default(),
                target_fps: source.target_fps.unwrap_or(DEFAULT_TARGET_FPS),
                width: source.width.unwrap_or(DEFAULT_WIDTH),
                height: source.height.unwrap_or(DEFAULT_HEIGHT),
                warmup: source.warmup_ms.map(Duration::from_millis),
            },
            detector: DetectorSettings {
                min_area: detector.min_area.unwrap_or(detector_defaults.min_area),
                working_width: detector
                    .working_width
                    .unwrap_or(detector_defaults.working_width),
                blur_kernel: detector.blur_kernel.unwrap_or(detector_defaults.blur_kernel),
                threshold_cutoff: detector
                    .threshold_cutoff
                    .unwrap_or(detector_defaults.threshold_cutoff),
                dilate_iterations: detector
                    .dilate_iterations
                    .unwrap_or(detector_defaults.dilate_iterations),
                rebaseline_every: detector
                    .rebaseline_every
                    .filter(|every| *every > 0)
                    .or(detector_defaults.rebaseline_every),
            },
            runtime: RuntimeSettings {
                pipeline: PipelineSettings {
                    max_source_retries: runtime
                        .max_source_retries
                        .unwrap_or(pipeline_defaults.max_source_retries),
                    retry_backoff: runtime
                        .retry_backoff_ms
                        .map(Duration::from_millis)
                        .unwrap_or(pipeline_defaults.retry_backoff),
                    max_invalid_frames: runtime
                        .max_invalid_frames
                        .unwrap_or(pipeline_defaults.max_invalid_frames),
                    health_log_interval: pipeline_defaults.health_log_interval,
                },
                display: runtime.display.unwrap_or(false),
            },
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(source) = std::env::var("MOTION_WATCH_SOURCE") {
            let source = source.trim();
            if source.eq_ignore_ascii_case("camera") {
                self.source.kind = SourceKind::Camera;
            } else if !source.is_empty() {
                self.source.use_file(source);
            }
        }
        if let Ok(device) = std::env::var("MOTION_WATCH_DEVICE") {
            if !device.trim().is_empty() {
                self.source.device = device;
            }
        }
        if let Some(min_area) = env_parse::<f64>("MOTION_WATCH_MIN_AREA", "a number")? {
            self.detector.min_area = min_area;
        }
        if let Some(width) = env_parse::<u32>("MOTION_WATCH_WORKING_WIDTH", "a pixel width")? {
            self.detector.working_width = width;
        }
        if let Some(cutoff) = env_parse::<u8>("MOTION_WATCH_THRESHOLD", "an integer in 0..=255")? {
            self.detector.threshold_cutoff = cutoff;
        }
        if let Some(kernel) = env_parse::<u32>("MOTION_WATCH_BLUR_KERNEL", "an odd integer")? {
            self.detector.blur_kernel = kernel;
        }
        if let Some(iterations) =
            env_parse::<u32>("MOTION_WATCH_DILATE_ITERATIONS", "an integer")?
        {
            self.detector.dilate_iterations = iterations;
        }
        if let Some(every) =
            env_parse::<u64>("MOTION_WATCH_REBASELINE_EVERY", "a frame count (0 disables)")?
        {
            self.detector.rebaseline_every = (every > 0).then_some(every);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.detector.validate()?;
        match self.source.kind {
            SourceKind::Camera if self.source.device.trim().is_empty() => {
                return Err(anyhow!("camera device must not be empty"));
            }
            SourceKind::File if self.source.path.trim().is_empty() => {
                return Err(anyhow!("file source requires a path"));
            }
            _ => {}
        }
        if self.source.width == 0 || self.source.height == 0 {
            return Err(anyhow!("source width and height must be greater than zero"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<WatchConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

fn env_parse<T: FromStr>(key: &str, expected: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| anyhow!("{} must be {}", key, expected)),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_select_the_first_camera() {
        let cfg = WatchConfig::from_file(WatchConfigFile::default());
        assert_eq!(cfg.source.kind, SourceKind::Camera);
        assert_eq!(cfg.detector, DetectorSettings::default());
        assert!(!cfg.runtime.display);
        match cfg.source.selection() {
            SourceSelection::Camera(camera) => {
                assert_eq!(camera.device, "/dev/video0");
                assert_eq!(camera.warmup, Duration::from_secs(2));
            }
            other => panic!("expected camera, got {other:?}"),
        }
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn stub_cameras_skip_warmup() {
        let mut cfg = WatchConfig::from_file(WatchConfigFile::default());
        cfg.source.use_camera("stub://lobby");
        match cfg.source.selection() {
            SourceSelection::Camera(camera) => assert!(camera.warmup.is_zero()),
            other => panic!("expected camera, got {other:?}"),
        }
    }

    #[test]
    fn file_source_needs_a_path() {
        let mut cfg = WatchConfig::from_file(WatchConfigFile::default());
        cfg.source.kind = SourceKind::File;
        assert!(cfg.validate().is_err());
        cfg.source.use_file("/srv/clips/hallway.mp4");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn toml_sections_parse() {
        let file: WatchConfigFile = toml::from_str(
            r#"
            [source]
            kind = "file"
            path = "stub://clip"

            [detector]
            min_area = 750.0
            blur_kernel = 11

            [runtime]
            retry_backoff_ms = 50
            "#,
        )
        .unwrap();
        let cfg = WatchConfig::from_file(file);
        assert_eq!(cfg.source.kind, SourceKind::File);
        assert_eq!(cfg.detector.min_area, 750.0);
        assert_eq!(cfg.detector.blur_kernel, 11);
        assert_eq!(cfg.runtime.pipeline.retry_backoff, Duration::from_millis(50));
        assert_eq!(cfg.runtime.pipeline.max_source_retries, 5);
    }

    #[test]
    fn even_blur_kernel_is_rejected() {
        let mut cfg = WatchConfig::from_file(WatchConfigFile::default());
        cfg.detector.blur_kernel = 20;
        assert!(cfg.validate().is_err());
    }
}

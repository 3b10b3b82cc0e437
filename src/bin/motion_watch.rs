//! motion_watch - room occupancy watcher
//!
//! This binary:
//! 1. Loads configuration (file, environment, then command-line flags)
//! 2. Opens a camera or a video file
//! 3. Captures the first frame as the empty-room reference
//! 4. Flags every later frame as Occupied or Unoccupied
//! 5. Shows the annotated feed and the diagnostic masks, or logs headless
//!
//! Ctrl-C, or 'q' in any window, stops the run.

use anyhow::Result;
use clap::Parser;
use std::io::IsTerminal;
use std::time::Instant;

use motion_watch::config::WatchConfig;
use motion_watch::present::NullPresenter;
use motion_watch::{
    open_source, spawn_pipeline, LogPresenter, MotionDetector, Pipeline, Presenter, StopFlag,
};

#[path = "../ui.rs"]
mod ui;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Path to a video file, still image or image directory. Omit to use the camera.
    #[arg(short, long, conflicts_with = "device")]
    video: Option<String>,
    /// Camera device node (e.g. /dev/video0, or stub://name for a synthetic scene).
    #[arg(long)]
    device: Option<String>,
    /// Minimum region area in working-resolution pixels.
    #[arg(short = 'a', long)]
    min_area: Option<f64>,
    /// Re-capture the reference after this many classified frames.
    #[arg(long)]
    rebaseline_every: Option<u64>,
    /// Show the four output windows (requires the display-minifb feature).
    #[arg(long, env = "MOTION_WATCH_DISPLAY")]
    display: bool,
    /// Discard output instead of logging it.
    #[arg(long)]
    quiet: bool,
    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let ui = ui::Ui::from_args(&args.ui, std::io::stderr().is_terminal());

    let cfg = {
        let _stage = ui.stage("Load configuration");
        let mut cfg = WatchConfig::load()?;
        if let Some(video) = args.video {
            cfg.source.use_file(video);
        }
        if let Some(device) = args.device {
            cfg.source.use_camera(device);
        }
        if let Some(min_area) = args.min_area {
            cfg.detector.min_area = min_area;
        }
        if let Some(every) = args.rebaseline_every {
            cfg.detector.rebaseline_every = (every > 0).then_some(every);
        }
        cfg.runtime.display |= args.display;
        cfg.validate()?;
        cfg
    };

    let selection = cfg.source.selection();
    let origin = match &selection {
        motion_watch::SourceSelection::Camera(camera) => camera.device.clone(),
        motion_watch::SourceSelection::File(file) => file.path.clone(),
    };
    log::info!("motion_watch: watching {}", origin);

    let stop = StopFlag::new();
    let handler_stop = stop.clone();
    ctrlc::set_handler(move || {
        handler_stop.raise();
    })
    .expect("error setting Ctrl-C handler");

    let detector_settings = cfg.detector.clone();
    let pipeline_settings = cfg.runtime.pipeline.clone();
    let display = cfg.runtime.display;
    let quiet = args.quiet;

    let started = Instant::now();
    let handle = {
        let _stage = ui.stage("Start pipeline");
        spawn_pipeline("motion-watch", stop, move |stop| {
            let source = open_source(&selection)?;
            let detector = MotionDetector::new(detector_settings)?;
            let presenter = build_presenter(display, quiet, stop);
            Ok(Pipeline::new(source, detector, presenter).with_settings(pipeline_settings))
        })?
    };

    let summary = handle.join()?;
    ui.report(&origin, &summary, started.elapsed());
    Ok(())
}

fn build_presenter(display: bool, quiet: bool, stop: StopFlag) -> Box<dyn Presenter> {
    if display {
        if let Some(windows) = window_presenter(stop) {
            return windows;
        }
    }
    if quiet {
        Box::new(NullPresenter)
    } else {
        Box::new(LogPresenter::new())
    }
}

#[cfg(feature = "display-minifb")]
fn window_presenter(stop: StopFlag) -> Option<Box<dyn Presenter>> {
    Some(Box::new(motion_watch::WindowPresenter::new(stop)))
}

#[cfg(not(feature = "display-minifb"))]
fn window_presenter(_stop: StopFlag) -> Option<Box<dyn Presenter>> {
    log::warn!("built without display-minifb; running headless");
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn video_and_device_are_mutually_exclusive() {
        let both = Args::try_parse_from([
            "motion_watch",
            "--video",
            "hallway.mp4",
            "--device",
            "/dev/video0",
        ]);
        assert!(both.is_err());

        let video = Args::try_parse_from(["motion_watch", "-v", "hallway.mp4"]).unwrap();
        assert_eq!(video.video.as_deref(), Some("hallway.mp4"));
        assert!(video.device.is_none());
    }

    #[cfg(not(feature = "display-minifb"))]
    #[test]
    fn display_falls_back_to_headless_without_windows() {
        assert!(window_presenter(StopFlag::new()).is_none());
    }
}

//! demo - end-to-end synthetic run of the motion watcher
//!
//! Plays a generated clip of an empty room that a visitor walks through, then
//! prints how many frames were flagged. `--live` swaps the clip for an endless
//! synthetic camera that runs until Ctrl-C or `--seconds` elapse.

use anyhow::Result;
use clap::Parser;
use std::io::IsTerminal;
use std::time::{Duration, Instant};

use motion_watch::{
    spawn_pipeline, CameraConfig, CameraSource, DetectorSettings, FileConfig, FileSource,
    FrameSource, LogPresenter, MotionDetector, Pipeline, StopFlag,
};

#[path = "../ui.rs"]
mod ui;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Use an endless synthetic camera instead of the finite clip.
    #[arg(long)]
    live: bool,
    /// Stop a live run after this many seconds.
    #[arg(long, default_value_t = 10)]
    seconds: u64,
    /// Minimum region area in working-resolution pixels.
    #[arg(long, default_value_t = 500.0)]
    min_area: f64,
    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let ui = ui::Ui::from_args(&args.ui, std::io::stderr().is_terminal());

    let settings = DetectorSettings {
        min_area: args.min_area,
        ..DetectorSettings::default()
    };
    settings.validate()?;

    let stop = StopFlag::new();
    let handler_stop = stop.clone();
    ctrlc::set_handler(move || {
        handler_stop.raise();
    })
    .expect("error setting Ctrl-C handler");

    let origin = if args.live {
        "stub://demo-camera"
    } else {
        "stub://demo-clip"
    };
    let live = args.live;

    let started = Instant::now();
    let handle = {
        let _stage = ui.stage("Start synthetic pipeline");
        spawn_pipeline("demo", stop, move |_stop| {
            let source: Box<dyn FrameSource> = if live {
                Box::new(CameraSource::new(CameraConfig {
                    device: origin.to_string(),
                    warmup: Duration::ZERO,
                    ..CameraConfig::default()
                })?)
            } else {
                Box::new(FileSource::new(FileConfig {
                    path: origin.to_string(),
                })?)
            };
            Ok(Pipeline::new(source, MotionDetector::new(settings)?, LogPresenter::new()))
        })?
    };

    let deadline = Duration::from_secs(args.seconds);
    while live && !handle.is_finished() && started.elapsed() < deadline {
        std::thread::sleep(Duration::from_millis(100));
    }
    let summary = if live { handle.stop()? } else { handle.join()? };

    ui.report(origin, &summary, started.elapsed());
    Ok(())
}

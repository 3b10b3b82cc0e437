//! Motion Watch
//!
//! This crate watches a video stream (live camera or file) and flags frames that
//! contain motion relative to a reference frame of the empty room.
//!
//! # Architecture
//!
//! The crate is a linear pipeline with three seams:
//!
//! 1. **Ingest**: a `FrameSource` produces `Frame`s until end-of-stream.
//! 2. **Detect**: a `MotionDetector` turns each frame into a `FrameResult`.
//! 3. **Present**: a `Presenter` receives the annotated frame and the diagnostic masks.
//!
//! The `pipeline` module drives one source, one detector and one presenter on a single
//! worker thread, checking a `StopFlag` once per iteration.
//!
//! # Module Structure
//!
//! - `frame`: The color frame type handed from ingest to detect
//! - `detect`: Reference maintenance, differencing, thresholding and contour classification
//! - `ingest`: Frame sources (camera, file, in-memory)
//! - `present`: Display sinks for the four output channels
//! - `pipeline`: The worker loop, stop flag and spawned-pipeline handle
//! - `config`: File + environment configuration

pub mod config;
pub mod detect;
pub mod error;
pub mod frame;
pub mod ingest;
pub mod pipeline;
pub mod present;

pub use config::WatchConfig;
pub use detect::{
    BoundingRect, Classification, DetectorSettings, DetectorState, FrameResult, MotionDetector,
    Region, Verdict,
};
pub use error::DetectError;
pub use frame::Frame;
pub use ingest::{
    camera::CameraConfig, file::FileConfig, open_source, CameraSource, FileSource, FrameSource,
    MemorySource, SourceSelection, SourceStats,
};
pub use pipeline::{
    spawn_pipeline, EndReason, Pipeline, PipelineHandle, PipelineSettings, RunSummary, StopFlag,
};
pub use present::{Channel, DisplayImage, LogPresenter, NullPresenter, Presenter};
#[cfg(feature = "display-minifb")]
pub use present::WindowPresenter;

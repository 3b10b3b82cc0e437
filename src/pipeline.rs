//! Frame loop: source -> detector -> presenter.
//!
//! A `Pipeline` owns one source, one detector and one presenter and runs them on
//! the calling thread until the source is exhausted, the `StopFlag` is raised, or a
//! fatal error occurs. `spawn_pipeline` runs one on a named worker thread and hands
//! back a `PipelineHandle` that can stop and join it.
//!
//! Error policy:
//! - `connect` failure is fatal (`SourceUnavailable`)
//! - transient read errors are retried with a fixed backoff, up to a budget
//! - invalid frames are skipped on live sources and fatal on files
//! - dimension mismatches are always fatal
//!
//! The source is released and the presenter closed on every exit path.

use anyhow::{anyhow, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::detect::{Classification, FrameResult, MotionDetector, Verdict};
use crate::error::DetectError;
use crate::frame::Frame;
use crate::ingest::FrameSource;
use crate::present::{Channel, DisplayImage, Presenter};

/// Cooperative cancellation shared between a pipeline and whoever may stop it.
#[derive(Clone, Debug, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Loop tuning. Detection parameters live in `DetectorSettings`.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineSettings {
    /// Consecutive failed reads tolerated before the source is declared unavailable.
    pub max_source_retries: u32,
    pub retry_backoff: Duration,
    /// Consecutive invalid frames tolerated on a live source.
    pub max_invalid_frames: u32,
    pub health_log_interval: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_source_retries: 5,
            retry_backoff: Duration::from_millis(200),
            max_invalid_frames: 30,
            health_log_interval: Duration::from_secs(5),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EndReason {
    /// The source reported end-of-stream.
    #[default]
    SourceExhausted,
    /// The stop flag was raised.
    StopRequested,
}

/// Counters for a finished run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames_read: u64,
    pub bootstrapped: u64,
    pub occupied: u64,
    pub unoccupied: u64,
    pub skipped: u64,
    pub source_retries: u64,
    pub end: EndReason,
}

impl RunSummary {
    pub fn classified(&self) -> u64 {
        self.occupied + self.unoccupied
    }
}

pub struct Pipeline<S, P> {
    source: S,
    detector: MotionDetector,
    presenter: P,
    stop: StopFlag,
    settings: PipelineSettings,
}

impl<S: FrameSource, P: Presenter> Pipeline<S, P> {
    pub fn new(source: S, detector: MotionDetector, presenter: P) -> Self {
        Self {
            source,
            detector,
            presenter,
            stop: StopFlag::new(),
            settings: PipelineSettings::default(),
        }
    }

    pub fn with_stop_flag(mut self, stop: StopFlag) -> Self {
        self.stop = stop;
        self
    }

    pub fn with_settings(mut self, settings: PipelineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn stop_flag(&self) -> StopFlag {
        self.stop.clone()
    }

    /// Run until end-of-stream, stop, or a fatal error.
    pub fn run(mut self) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        let outcome = self.drive(&mut summary);

        self.source.release();
        self.presenter.close();

        match outcome {
            Ok(end) => {
                summary.end = end;
                log::info!(
                    "pipeline finished ({:?}): {} frames, {} occupied, {} unoccupied, {} skipped",
                    end,
                    summary.frames_read,
                    summary.occupied,
                    summary.unoccupied,
                    summary.skipped
                );
                Ok(summary)
            }
            Err(err) => {
                log::error!("pipeline aborted after {} frames: {:#}", summary.frames_read, err);
                Err(err)
            }
        }
    }

    fn drive(&mut self, summary: &mut RunSummary) -> Result<EndReason> {
        self.source.connect().map_err(|err| {
            let origin = self.source.stats().origin;
            err.context(DetectError::SourceUnavailable(origin))
        })?;

        let mut last_verdict: Option<Verdict> = None;
        let mut invalid_streak = 0u32;
        let mut last_health = Instant::now();

        loop {
            if self.stop.is_raised() {
                log::info!("stop requested");
                return Ok(EndReason::StopRequested);
            }

            if last_health.elapsed() >= self.settings.health_log_interval {
                let stats = self.source.stats();
                log::info!(
                    "source {}: {} frames captured, healthy: {}",
                    stats.origin,
                    stats.frames_captured,
                    self.source.is_healthy()
                );
                last_health = Instant::now();
            }

            let frame = match self.read_frame(summary) {
                Ok(Some(frame)) => frame,
                Ok(None) => return Ok(EndReason::SourceExhausted),
                Err(err) if is_skippable(&err) => {
                    self.skip_invalid(err, &mut invalid_streak, summary)?;
                    continue;
                }
                Err(err) => return Err(err),
            };
            summary.frames_read += 1;
            let sequence = frame.sequence;

            match self.detector.process(frame) {
                Ok(FrameResult::Bootstrapping) => {
                    invalid_streak = 0;
                    summary.bootstrapped += 1;
                    log::info!("frame {}: reference captured", sequence);
                }
                Ok(FrameResult::Classified(classification)) => {
                    invalid_streak = 0;
                    let verdict = classification.verdict;
                    match verdict {
                        Verdict::Occupied => summary.occupied += 1,
                        Verdict::Unoccupied => summary.unoccupied += 1,
                    }
                    if last_verdict != Some(verdict) {
                        log::info!(
                            "frame {}: room {} ({} regions)",
                            sequence,
                            verdict.label(),
                            classification.regions.len()
                        );
                        last_verdict = Some(verdict);
                    } else {
                        log::debug!("frame {}: {}", sequence, verdict.label());
                    }
                    self.present(&classification)?;
                }
                Err(err) if !err.is_fatal() => {
                    self.skip_invalid(anyhow::Error::new(err), &mut invalid_streak, summary)?;
                }
                Err(err) => return Err(anyhow::Error::new(err)),
            }
        }
    }

    /// Read one frame, retrying transient failures.
    fn read_frame(&mut self, summary: &mut RunSummary) -> Result<Option<Frame>> {
        let mut failures = 0u32;
        loop {
            match self.source.next_frame() {
                Ok(frame) => return Ok(frame),
                Err(err) if is_skippable(&err) => return Err(err),
                Err(err) => {
                    failures += 1;
                    if failures > self.settings.max_source_retries {
                        let origin = self.source.stats().origin;
                        return Err(err.context(DetectError::SourceUnavailable(format!(
                            "{} failed {} consecutive reads",
                            origin, failures
                        ))));
                    }
                    summary.source_retries += 1;
                    log::warn!(
                        "read failed ({}/{}): {:#}",
                        failures,
                        self.settings.max_source_retries,
                        err
                    );
                    if !self.settings.retry_backoff.is_zero() {
                        std::thread::sleep(self.settings.retry_backoff);
                    }
                }
            }
        }
    }

    fn skip_invalid(
        &self,
        err: anyhow::Error,
        streak: &mut u32,
        summary: &mut RunSummary,
    ) -> Result<()> {
        if !self.source.is_live() {
            return Err(err);
        }
        *streak += 1;
        if *streak > self.settings.max_invalid_frames {
            return Err(err.context(format!(
                "more than {} consecutive invalid frames",
                self.settings.max_invalid_frames
            )));
        }
        summary.skipped += 1;
        log::warn!("skipping frame: {:#}", err);
        Ok(())
    }

    fn present(&mut self, classification: &Classification) -> Result<()> {
        self.presenter.show(
            Channel::SecurityFeed,
            DisplayImage::Color(&classification.annotated_frame),
        )?;
        self.presenter
            .show(Channel::Gray, DisplayImage::Gray(&classification.gray_frame))?;
        self.presenter.show(
            Channel::Thresh,
            DisplayImage::Gray(&classification.threshold_mask),
        )?;
        self.presenter.show(
            Channel::FrameDelta,
            DisplayImage::Gray(&classification.delta_mask),
        )
    }
}

/// A source error the pipeline may skip past instead of retrying the read.
fn is_skippable(err: &anyhow::Error) -> bool {
    err.downcast_ref::<DetectError>()
        .is_some_and(|err| !err.is_fatal())
}

/// A pipeline running on its own thread.
///
/// Dropping the handle raises the stop flag and waits for the thread.
#[must_use = "dropping the handle stops the pipeline"]
pub struct PipelineHandle {
    name: String,
    stop: StopFlag,
    join: Option<JoinHandle<Result<RunSummary>>>,
}

impl PipelineHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stop_flag(&self) -> StopFlag {
        self.stop.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.join.as_ref().map_or(true, |join| join.is_finished())
    }

    /// Raise the stop flag and wait for the pipeline to wind down.
    pub fn stop(mut self) -> Result<RunSummary> {
        self.stop.raise();
        self.wait()
    }

    /// Wait for the pipeline to finish on its own.
    pub fn join(mut self) -> Result<RunSummary> {
        self.wait()
    }

    fn wait(&mut self) -> Result<RunSummary> {
        let join = self
            .join
            .take()
            .ok_or_else(|| anyhow!("pipeline {} already joined", self.name))?;
        join.join()
            .map_err(|_| anyhow!("pipeline thread {} panicked", self.name))?
    }
}

impl Drop for PipelineHandle {
    fn drop(&mut self) {
        if let Some(join) = self.join.take() {
            self.stop.raise();
            if join.join().is_err() {
                log::error!("pipeline thread {} panicked", self.name);
            }
        }
    }
}

/// Build and run a pipeline on a named worker thread.
///
/// `build` runs on the worker thread, so the source and presenter may hold
/// thread-bound handles such as windows. The pipeline is wired to `stop`.
pub fn spawn_pipeline<S, P, F>(name: &str, stop: StopFlag, build: F) -> Result<PipelineHandle>
where
    S: FrameSource + 'static,
    P: Presenter + 'static,
    F: FnOnce(StopFlag) -> Result<Pipeline<S, P>> + Send + 'static,
{
    let worker_stop = stop.clone();
    let join = std::thread::Builder::new()
        .name(name.to_string())
        .spawn(move || -> Result<RunSummary> {
            let pipeline = build(worker_stop.clone())?;
            pipeline.with_stop_flag(worker_stop).run()
        })?;

    Ok(PipelineHandle {
        name: name.to_string(),
        stop,
        join: Some(join),
    })
}

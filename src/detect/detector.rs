use anyhow::{anyhow, Result};
use image::GrayImage;

use super::annotate::annotate;
use super::contours::find_external_contours;
use super::imageops::{absdiff, dilate, gaussian_blur, resize_to_width, threshold_binary, to_luma};
use super::result::{Classification, DetectorState, FrameResult, Region, Verdict};
use crate::error::DetectError;
use crate::frame::Frame;

pub const DEFAULT_MIN_AREA: f64 = 500.0;
pub const DEFAULT_WORKING_WIDTH: u32 = 500;
pub const DEFAULT_BLUR_KERNEL: u32 = 21;
pub const DEFAULT_THRESHOLD_CUTOFF: u8 = 25;
pub const DEFAULT_DILATE_ITERATIONS: u32 = 2;

/// Construction-time detector parameters. Immutable once the detector exists.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectorSettings {
    /// Regions with a smaller outer-boundary area are discarded.
    pub min_area: f64,
    /// Frames are resized to this width before any other step.
    pub working_width: u32,
    /// Odd Gaussian kernel size. 1 disables blurring.
    pub blur_kernel: u32,
    /// Delta values strictly above this become motion candidates.
    pub threshold_cutoff: u8,
    pub dilate_iterations: u32,
    /// Replace the reference after this many classified frames. `None` keeps the
    /// first reference for the whole run.
    pub rebaseline_every: Option<u64>,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            min_area: DEFAULT_MIN_AREA,
            working_width: DEFAULT_WORKING_WIDTH,
            blur_kernel: DEFAULT_BLUR_KERNEL,
            threshold_cutoff: DEFAULT_THRESHOLD_CUTOFF,
            dilate_iterations: DEFAULT_DILATE_ITERATIONS,
            rebaseline_every: None,
        }
    }
}

impl DetectorSettings {
    pub fn validate(&self) -> Result<()> {
        if !self.min_area.is_finite() || self.min_area < 0.0 {
            return Err(anyhow!("min_area must be a non-negative number"));
        }
        if self.working_width == 0 {
            return Err(anyhow!("working_width must be greater than zero"));
        }
        if self.blur_kernel == 0 || self.blur_kernel % 2 == 0 {
            return Err(anyhow!(
                "blur_kernel must be an odd positive integer (got {})",
                self.blur_kernel
            ));
        }
        if self.rebaseline_every == Some(0) {
            return Err(anyhow!("rebaseline_every must be at least 1 when set"));
        }
        Ok(())
    }
}

/// Reference-frame motion detector for a single stream.
///
/// The first frame becomes the reference ("empty room"). Every later frame is
/// compared against it and classified as occupied when a large enough region differs.
///
/// `process` takes `&mut self`, so a detector cannot be driven from two threads at
/// once. Give each stream its own instance:
///
/// ```compile_fail
/// use std::sync::Arc;
/// use motion_watch::{Frame, MotionDetector};
///
/// let shared = Arc::new(MotionDetector::default());
/// let frame = Frame::from_image(image::RgbImage::new(500, 375));
/// shared.process(frame).unwrap();
/// ```
#[derive(Debug, Default)]
pub struct MotionDetector {
    settings: DetectorSettings,
    reference: Option<GrayImage>,
    classified_since_reference: u64,
}

impl MotionDetector {
    pub fn new(settings: DetectorSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            settings,
            reference: None,
            classified_since_reference: 0,
        })
    }

    pub fn settings(&self) -> &DetectorSettings {
        &self.settings
    }

    pub fn state(&self) -> DetectorState {
        if self.reference.is_some() {
            DetectorState::Tracking
        } else {
            DetectorState::AwaitingReference
        }
    }

    /// The stored reference frame, once bootstrapped.
    pub fn reference(&self) -> Option<&GrayImage> {
        self.reference.as_ref()
    }

    /// Score one frame against the reference.
    ///
    /// The first successful call stores the reference and returns `Bootstrapping`.
    pub fn process(&mut self, frame: Frame) -> Result<FrameResult, DetectError> {
        if frame.is_empty() {
            return Err(DetectError::InvalidFrame(format!(
                "frame {} has zero dimensions ({}x{})",
                frame.sequence,
                frame.width(),
                frame.height()
            )));
        }
        let captured_at = frame.captured_at;
        let color = resize_to_width(frame.image(), self.settings.working_width);
        let gray = gaussian_blur(&to_luma(&color), self.settings.blur_kernel);

        let Some(reference) = self.reference.as_ref() else {
            log::debug!(
                "reference frame set from frame {} ({}x{})",
                frame.sequence,
                gray.width(),
                gray.height()
            );
            self.reference = Some(gray);
            self.classified_since_reference = 0;
            return Ok(FrameResult::Bootstrapping);
        };

        if reference.dimensions() != gray.dimensions() {
            return Err(DetectError::DimensionMismatch {
                expected: reference.dimensions(),
                actual: gray.dimensions(),
            });
        }

        let delta_mask = absdiff(reference, &gray);
        let threshold_mask = dilate(
            &threshold_binary(&delta_mask, self.settings.threshold_cutoff),
            self.settings.dilate_iterations,
        );

        let regions: Vec<Region> = find_external_contours(&threshold_mask)
            .iter()
            .filter(|contour| contour.area() >= self.settings.min_area)
            .map(|contour| Region {
                rect: contour.bounding_rect(),
                area: contour.area(),
            })
            .collect();
        let verdict = if regions.is_empty() {
            Verdict::Unoccupied
        } else {
            Verdict::Occupied
        };

        let annotated_frame = annotate(&color, &regions, verdict, captured_at);

        self.classified_since_reference += 1;
        let rebaseline = self
            .settings
            .rebaseline_every
            .is_some_and(|every| self.classified_since_reference >= every);
        if rebaseline {
            log::debug!(
                "re-baselining reference after {} classified frames",
                self.classified_since_reference
            );
            self.reference = Some(gray.clone());
            self.classified_since_reference = 0;
        }

        Ok(FrameResult::Classified(Classification {
            verdict,
            regions,
            annotated_frame,
            gray_frame: gray,
            threshold_mask,
            delta_mask,
        }))
    }
}

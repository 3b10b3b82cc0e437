mod annotate;
pub mod contours;
mod detector;
pub mod imageops;
mod result;

pub use detector::{DetectorSettings, MotionDetector};
pub use result::{BoundingRect, Classification, DetectorState, FrameResult, Region, Verdict};

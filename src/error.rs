use std::fmt;

/// Failure taxonomy for the detection pipeline.
///
/// Outer layers carry these inside `anyhow::Error`; use `downcast_ref::<DetectError>()`
/// to recover the variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectError {
    /// Empty, zero-sized or corrupt frame.
    InvalidFrame(String),
    /// A frame's normalized size differs from the stored reference.
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },
    /// The frame source could not be opened or stopped producing frames.
    SourceUnavailable(String),
}

impl DetectError {
    /// Returns true when the pipeline must abort rather than skip the frame.
    ///
    /// End of stream is not an error; sources report it as `Ok(None)`.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, DetectError::InvalidFrame(_))
    }
}

impl fmt::Display for DetectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectError::InvalidFrame(msg) => write!(f, "invalid frame: {msg}"),
            DetectError::DimensionMismatch { expected, actual } => write!(
                f,
                "dimension mismatch: reference is {}x{}, frame is {}x{}",
                expected.0, expected.1, actual.0, actual.1
            ),
            DetectError::SourceUnavailable(msg) => write!(f, "source unavailable: {msg}"),
        }
    }
}

impl std::error::Error for DetectError {}

impl From<image::ImageError> for DetectError {
    fn from(err: image::ImageError) -> Self {
        DetectError::InvalidFrame(err.to_string())
    }
}

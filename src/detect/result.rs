use image::{GrayImage, RgbImage};

/// Room classification for one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Verdict {
    #[default]
    Unoccupied,
    Occupied,
}

impl Verdict {
    pub fn label(self) -> &'static str {
        match self {
            Verdict::Unoccupied => "Unoccupied",
            Verdict::Occupied => "Occupied",
        }
    }
}

/// Axis-aligned bounding rectangle in working-resolution pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundingRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingRect {
    /// True when `other` lies entirely inside this rectangle.
    pub fn contains(&self, other: &BoundingRect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.x + other.width <= self.x + self.width
            && other.y + other.height <= self.y + self.height
    }
}

/// A connected cluster of above-threshold pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct Region {
    pub rect: BoundingRect,
    /// Area enclosed by the traced outer boundary.
    pub area: f64,
}

/// Everything the detector produces for a scored frame.
#[derive(Clone, Debug)]
pub struct Classification {
    pub verdict: Verdict,
    /// Surviving regions in contour traversal order.
    pub regions: Vec<Region>,
    pub annotated_frame: RgbImage,
    pub gray_frame: GrayImage,
    pub threshold_mask: GrayImage,
    pub delta_mask: GrayImage,
}

#[derive(Clone, Debug)]
pub enum FrameResult {
    /// The frame became the reference; no verdict.
    Bootstrapping,
    Classified(Classification),
}

impl FrameResult {
    pub fn verdict(&self) -> Option<Verdict> {
        match self {
            FrameResult::Bootstrapping => None,
            FrameResult::Classified(c) => Some(c.verdict),
        }
    }

    pub fn classification(&self) -> Option<&Classification> {
        match self {
            FrameResult::Bootstrapping => None,
            FrameResult::Classified(c) => Some(c),
        }
    }
}

/// Detector lifecycle. `Tracking` is terminal for the life of the detector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DetectorState {
    AwaitingReference,
    Tracking,
}

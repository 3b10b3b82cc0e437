use rand::Rng;

use crate::error::DetectError;
use crate::frame::Frame;

/// Frames per synthetic scene cycle: half empty room, half visitor.
const CYCLE_FRAMES: u64 = 100;
const VISITOR_SIZE: u32 = 80;

/// Generates a static room with a visitor crossing it.
///
/// - Frames `0..50` of every cycle show only the background
/// - Frames `50..100` show a bright block walking left to right
///
/// A little sensor noise is added so the blur stage has something to do.
pub(crate) struct SyntheticScene {
    width: u32,
    height: u32,
    frame_count: u64,
}

impl SyntheticScene {
    pub(crate) fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            frame_count: 0,
        }
    }

    pub(crate) fn frames_generated(&self) -> u64 {
        self.frame_count
    }

    pub(crate) fn next_frame(&mut self) -> Result<Frame, DetectError> {
        let phase = self.frame_count % CYCLE_FRAMES;
        let visitor = (phase >= CYCLE_FRAMES / 2).then(|| {
            let step = phase - CYCLE_FRAMES / 2;
            let travel = self.width.saturating_sub(VISITOR_SIZE) as u64;
            let x = (travel * step / (CYCLE_FRAMES / 2)) as u32;
            let y = self.height.saturating_sub(VISITOR_SIZE) / 2;
            (x, y)
        });
        self.frame_count += 1;

        let pixels = self.generate_pixels(visitor);
        Ok(Frame::from_rgb(self.width, self.height, pixels)?.with_sequence(self.frame_count))
    }

    fn generate_pixels(&self, visitor: Option<(u32, u32)>) -> Vec<u8> {
        let mut rng = rand::thread_rng();
        let mut pixels = Vec::with_capacity((self.width * self.height * 3) as usize);
        for y in 0..self.height {
            for x in 0..self.width {
                let inside = visitor.is_some_and(|(vx, vy)| {
                    x >= vx && x < vx + VISITOR_SIZE && y >= vy && y < vy + VISITOR_SIZE
                });
                let base = if inside {
                    [230u8, 210, 190]
                } else {
                    // Soft wall gradient.
                    let shade = 60 + ((x + y) % 64) as u8;
                    [shade, shade, shade.saturating_add(10)]
                };
                let noise: i16 = rng.gen_range(-2..=2);
                for channel in base {
                    pixels.push((channel as i16 + noise).clamp(0, 255) as u8);
                }
            }
        }
        pixels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{FrameResult, MotionDetector, Verdict};

    #[test]
    fn scene_starts_empty_then_gains_a_visitor() {
        let mut scene = SyntheticScene::new(320, 240);
        let mut detector = MotionDetector::default();

        let mut verdicts = Vec::new();
        for _ in 0..CYCLE_FRAMES {
            let frame = scene.next_frame().unwrap();
            if let FrameResult::Classified(c) = detector.process(frame).unwrap() {
                verdicts.push(c.verdict);
            }
        }

        assert_eq!(scene.frames_generated(), CYCLE_FRAMES);
        assert_eq!(verdicts.len() as u64, CYCLE_FRAMES - 1);
        assert!(verdicts[..48].iter().all(|v| *v == Verdict::Unoccupied));
        assert!(verdicts[49..].iter().all(|v| *v == Verdict::Occupied));
    }
}

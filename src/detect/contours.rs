//! Outer contour extraction from a binary mask.
//!
//! Borders come from `imageproc`'s Suzuki-Abe follower (8-connected foreground).
//! Only outermost borders are kept: holes are dropped and so are components sitting
//! inside another component's hole. Straight runs are compressed to their end points.

use image::GrayImage;
use imageproc::contours::{self, BorderType};

use super::result::BoundingRect;

pub type Point = imageproc::point::Point<i32>;

/// Closed outer boundary of one connected component.
#[derive(Clone, Debug, PartialEq)]
pub struct Contour {
    points: Vec<Point>,
}

impl Contour {
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Shoelace area of the boundary polygon through pixel centres.
    ///
    /// A filled `w x h` block has area `(w - 1) * (h - 1)`; lines and single pixels have 0.
    pub fn area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let twice: i64 = (0..n)
            .map(|i| {
                let a = self.points[i];
                let b = self.points[(i + 1) % n];
                a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64
            })
            .sum();
        twice.abs() as f64 / 2.0
    }

    pub fn bounding_rect(&self) -> BoundingRect {
        let min_x = self.points.iter().map(|p| p.x).min().unwrap_or(0);
        let max_x = self.points.iter().map(|p| p.x).max().unwrap_or(-1);
        let min_y = self.points.iter().map(|p| p.y).min().unwrap_or(0);
        let max_y = self.points.iter().map(|p| p.y).max().unwrap_or(-1);
        BoundingRect {
            x: min_x.max(0) as u32,
            y: min_y.max(0) as u32,
            width: (max_x - min_x + 1).max(0) as u32,
            height: (max_y - min_y + 1).max(0) as u32,
        }
    }

    /// Raster position (row, column) of the component's top-left boundary pixel.
    fn raster_start(&self) -> (i32, i32) {
        self.points
            .iter()
            .map(|p| (p.y, p.x))
            .min()
            .unwrap_or((i32::MAX, i32::MAX))
    }
}

/// Find the outer contours of `mask`, ordered by the raster position of each
/// component's first pixel. Any non-zero pixel is foreground.
pub fn find_external_contours(mask: &GrayImage) -> Vec<Contour> {
    let mut found: Vec<Contour> = contours::find_contours::<i32>(mask)
        .into_iter()
        .filter(|c| matches!(c.border_type, BorderType::Outer) && c.parent.is_none())
        .map(|c| Contour {
            points: compress_runs(c.points),
        })
        .collect();
    found.sort_by_key(Contour::raster_start);
    found
}

fn compress_runs(mut points: Vec<Point>) -> Vec<Point> {
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    let n = points.len();
    if n < 3 {
        return points;
    }
    (0..n)
        .filter(|&i| {
            let prev = points[(i + n - 1) % n];
            let cur = points[i];
            let next = points[(i + 1) % n];
            (cur.x - prev.x, cur.y - prev.y) != (next.x - cur.x, next.y - cur.y)
        })
        .map(|i| points[i])
        .collect()
}

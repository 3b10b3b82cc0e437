use std::convert::Infallible;
use std::time::SystemTime;

use chrono::{DateTime, Local};
use embedded_graphics::{
    draw_target::DrawTarget,
    mono_font::{
        ascii::{FONT_5X8, FONT_6X10},
        MonoFont, MonoTextStyle,
    },
    pixelcolor::Rgb888,
    prelude::*,
    primitives::{PrimitiveStyleBuilder, Rectangle, StrokeAlignment},
    text::{Baseline, Text},
};
use image::{Rgb, RgbImage};

use super::result::{Region, Verdict};

const TIMESTAMP_FORMAT: &str = "%A %d %B %Y %I:%M:%S%p";
const REGION_COLOR: Rgb888 = Rgb888::GREEN;
const TEXT_COLOR: Rgb888 = Rgb888::RED;
const REGION_STROKE: u32 = 2;

/// Adapts an `RgbImage` to embedded-graphics. Off-canvas pixels are dropped.
struct Canvas<'a>(&'a mut RgbImage);

impl OriginDimensions for Canvas<'_> {
    fn size(&self) -> Size {
        Size::new(self.0.width(), self.0.height())
    }
}

impl DrawTarget for Canvas<'_> {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let (width, height) = self.0.dimensions();
        for Pixel(point, color) in pixels {
            let (Ok(x), Ok(y)) = (u32::try_from(point.x), u32::try_from(point.y)) else {
                continue;
            };
            if x < width && y < height {
                self.0.put_pixel(x, y, Rgb([color.r(), color.g(), color.b()]));
            }
        }
        Ok(())
    }
}

pub(crate) fn format_timestamp(at: SystemTime) -> String {
    DateTime::<Local>::from(at).format(TIMESTAMP_FORMAT).to_string()
}

/// Copy `frame` and overlay region boxes, the room status and the timestamp.
pub(crate) fn annotate(
    frame: &RgbImage,
    regions: &[Region],
    verdict: Verdict,
    captured_at: SystemTime,
) -> RgbImage {
    let mut annotated = frame.clone();
    let height = annotated.height() as i32;
    let mut canvas = Canvas(&mut annotated);

    let box_style = PrimitiveStyleBuilder::new()
        .stroke_color(REGION_COLOR)
        .stroke_width(REGION_STROKE)
        .stroke_alignment(StrokeAlignment::Center)
        .build();
    for region in regions {
        let rect = Rectangle::new(
            Point::new(region.rect.x as i32, region.rect.y as i32),
            Size::new(region.rect.width, region.rect.height),
        );
        match rect.into_styled(box_style).draw(&mut canvas) {
            Ok(_) => {}
            Err(infallible) => match infallible {},
        }
    }

    let status = format!("Room Status: {}", verdict.label());
    draw_label(&mut canvas, &status, Point::new(10, 20), &FONT_6X10);
    let timestamp = format_timestamp(captured_at);
    draw_label(&mut canvas, &timestamp, Point::new(10, height - 10), &FONT_5X8);

    annotated
}

fn draw_label(
    canvas: &mut Canvas<'_>,
    text: &str,
    origin: Point,
    font: &MonoFont<'_>,
) {
    let style = MonoTextStyle::new(font, TEXT_COLOR);
    match Text::with_baseline(text, origin, style, Baseline::Alphabetic).draw(canvas) {
        Ok(_) => {}
        Err(infallible) => match infallible {},
    }
}

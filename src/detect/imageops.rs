//! Pixel operations for the detection stages.
//!
//! All functions take and return `image` buffers. Callers are responsible for
//! passing non-empty images of matching sizes where two inputs are involved.

use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, RgbImage};
use imageproc::distance_transform::Norm;
use imageproc::{filter, morphology};

/// Resize to `width`, preserving aspect ratio, with linear interpolation.
pub fn resize_to_width(image: &RgbImage, width: u32) -> RgbImage {
    if image.width() == width {
        return image.clone();
    }
    let height = (image.height() as u64 * width as u64 / image.width() as u64).max(1) as u32;
    imageops::resize(image, width, height, FilterType::Triangle)
}

/// BT.601 luma.
pub fn to_luma(image: &RgbImage) -> GrayImage {
    let mut gray = GrayImage::new(image.width(), image.height());
    for (dst, src) in gray.pixels_mut().zip(image.pixels()) {
        let [r, g, b] = src.0;
        let y = 0.299_f32 * r as f32 + 0.587_f32 * g as f32 + 0.114_f32 * b as f32;
        *dst = Luma([clamp_to_u8(y)]);
    }
    gray
}

/// Gaussian sigma for an odd kernel size, using the same rule OpenCV applies when
/// sigma is left at zero.
pub fn gaussian_sigma(kernel_size: u32) -> f32 {
    0.3 * ((kernel_size as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Gaussian blur sized by `kernel_size`. A kernel size of 1 is a copy.
pub fn gaussian_blur(gray: &GrayImage, kernel_size: u32) -> GrayImage {
    if kernel_size <= 1 {
        return gray.clone();
    }
    filter::gaussian_blur_f32(gray, gaussian_sigma(kernel_size))
}

/// Per-pixel absolute difference.
pub fn absdiff(a: &GrayImage, b: &GrayImage) -> GrayImage {
    let mut out = GrayImage::new(a.width(), a.height());
    for ((dst, pa), pb) in out.pixels_mut().zip(a.pixels()).zip(b.pixels()) {
        *dst = Luma([pa.0[0].abs_diff(pb.0[0])]);
    }
    out
}

/// Pixels strictly above `cutoff` become 255, everything else 0.
pub fn threshold_binary(delta: &GrayImage, cutoff: u8) -> GrayImage {
    let mut out = GrayImage::new(delta.width(), delta.height());
    for (dst, src) in out.pixels_mut().zip(delta.pixels()) {
        *dst = Luma([if src.0[0] > cutoff { 255 } else { 0 }]);
    }
    out
}

/// Dilation with a 3x3 rectangular element, applied `iterations` times.
///
/// Repeated 3x3 dilation is a single dilation by the chessboard distance, and pixels
/// outside the image never contribute.
pub fn dilate(mask: &GrayImage, iterations: u32) -> GrayImage {
    if iterations == 0 {
        return mask.clone();
    }
    let radius = u8::try_from(iterations).unwrap_or(u8::MAX);
    morphology::dilate(mask, Norm::LInf, radius)
}

fn clamp_to_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn resize_preserves_aspect_ratio() {
        let image = RgbImage::from_pixel(1000, 750, Rgb([10, 20, 30]));
        let resized = resize_to_width(&image, 500);
        assert_eq!(resized.dimensions(), (500, 375));

        let odd = RgbImage::new(640, 481);
        assert_eq!(resize_to_width(&odd, 500).dimensions(), (500, 375));
    }

    #[test]
    fn resize_is_identity_at_working_width() {
        let image = RgbImage::from_fn(500, 10, |x, y| Rgb([x as u8, y as u8, 0]));
        assert_eq!(resize_to_width(&image, 500), image);
    }

    #[test]
    fn luma_uses_bt601_weights() {
        let image = RgbImage::from_fn(3, 1, |x, _| match x {
            0 => Rgb([255, 0, 0]),
            1 => Rgb([0, 255, 0]),
            _ => Rgb([0, 0, 255]),
        });
        let gray = to_luma(&image);
        assert_eq!(gray.get_pixel(0, 0).0[0], 76);
        assert_eq!(gray.get_pixel(1, 0).0[0], 150);
        assert_eq!(gray.get_pixel(2, 0).0[0], 29);
    }

    #[test]
    fn sigma_follows_kernel_size() {
        assert!((gaussian_sigma(21) - 3.5).abs() < 1e-6);
        assert!((gaussian_sigma(3) - 0.8).abs() < 1e-6);
        assert!(gaussian_sigma(7) < gaussian_sigma(21));
    }

    #[test]
    fn blur_keeps_uniform_images_uniform() {
        let gray = GrayImage::from_pixel(40, 30, Luma([117]));
        let blurred = gaussian_blur(&gray, 21);
        assert!(blurred.pixels().all(|p| p.0[0].abs_diff(117) <= 1));
        assert_eq!(gaussian_blur(&gray, 1), gray);
    }

    #[test]
    fn blur_spreads_a_point() {
        let mut gray = GrayImage::new(31, 31);
        gray.put_pixel(15, 15, Luma([255]));
        let blurred = gaussian_blur(&gray, 5);
        assert!(blurred.get_pixel(15, 15).0[0] < 255);
        assert!(blurred.get_pixel(16, 15).0[0] > 0);
        assert_eq!(blurred.get_pixel(0, 0).0[0], 0);
    }

    #[test]
    fn threshold_is_strictly_greater() {
        let delta = GrayImage::from_fn(3, 1, |x, _| Luma([24 + x as u8]));
        let mask = threshold_binary(&delta, 25);
        let values: Vec<u8> = mask.pixels().map(|p| p.0[0]).collect();
        assert_eq!(values, vec![0, 0, 255]);
    }

    #[test]
    fn absdiff_is_symmetric() {
        let a = GrayImage::from_pixel(2, 2, Luma([10]));
        let b = GrayImage::from_pixel(2, 2, Luma([200]));
        assert_eq!(absdiff(&a, &b), absdiff(&b, &a));
        assert!(absdiff(&a, &b).pixels().all(|p| p.0[0] == 190));
    }

    #[test]
    fn dilate_grows_by_one_pixel_per_iteration() {
        let mut mask = GrayImage::new(11, 11);
        mask.put_pixel(5, 5, Luma([255]));

        let once = dilate(&mask, 1);
        assert_eq!(once.pixels().filter(|p| p.0[0] == 255).count(), 9);

        let twice = dilate(&mask, 2);
        assert_eq!(twice.pixels().filter(|p| p.0[0] == 255).count(), 25);
        assert_eq!(twice.get_pixel(3, 3).0[0], 255);
        assert_eq!(twice.get_pixel(2, 5).0[0], 0);

        assert_eq!(dilate(&mask, 0), mask);
    }

    #[test]
    fn dilate_clips_at_borders() {
        let mut mask = GrayImage::new(4, 4);
        mask.put_pixel(0, 0, Luma([255]));
        let grown = dilate(&mask, 1);
        assert_eq!(grown.pixels().filter(|p| p.0[0] == 255).count(), 4);
    }
}

//! Sharpness estimate for incoming photos.
//!
//! Blur hides the texture and edge cues the detectors rely on, so callers get a
//! Laplacian-variance score to warn on. Nothing here rejects an image.

use image::{RgbImage, imageops::FilterType};
use ndarray::Array2;

use crate::color::rec601_luma;

/// Laplacian variance below which a photo is reported as blurry.
pub const BLUR_THRESHOLD: f64 = 100.0;

/// Longest side analyzed; larger photos are downscaled first.
const MAX_SIDE: u32 = 512;

/// Variance of the 4-neighbour Laplacian of the luma plane.
///
/// Only interior pixels contribute. Images narrower or shorter than 3 pixels
/// score 0.
pub fn laplacian_variance(image: &RgbImage) -> f64 {
    let (w, h) = image.dimensions();
    let scaled;
    let image = if w > MAX_SIDE || h > MAX_SIDE {
        let factor = MAX_SIDE as f64 / w.max(h) as f64;
        let nw = ((w as f64 * factor).round() as u32).max(1);
        let nh = ((h as f64 * factor).round() as u32).max(1);
        scaled = image::imageops::resize(image, nw, nh, FilterType::Triangle);
        &scaled
    } else {
        image
    };

    let (w, h) = (image.width() as usize, image.height() as usize);
    if w < 3 || h < 3 {
        return 0.0;
    }

    let luma = Array2::from_shape_fn((h, w), |(y, x)| {
        let p = image.get_pixel(x as u32, y as u32);
        rec601_luma(p[0], p[1], p[2]) as f64
    });

    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let lap = luma[[y - 1, x]] + luma[[y + 1, x]] + luma[[y, x - 1]] + luma[[y, x + 1]]
                - 4.0 * luma[[y, x]];
            sum += lap;
            sum_sq += lap * lap;
        }
    }
    let n = ((w - 2) * (h - 2)) as f64;
    let mean = sum / n;
    (sum_sq / n - mean * mean).max(0.0)
}

/// Sharpness score together with the blur verdict.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sharpness {
    pub variance: f64,
    pub blurry: bool,
}

pub fn assess_sharpness(image: &RgbImage) -> Sharpness {
    let variance = laplacian_variance(image);
    Sharpness {
        variance,
        blurry: variance < BLUR_THRESHOLD,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn checkerboard(size: u32, cell: u32) -> RgbImage {
        RgbImage::from_fn(size, size, |x, y| {
            if ((x / cell) + (y / cell)) % 2 == 0 {
                Rgb([230, 230, 230])
            } else {
                Rgb([20, 20, 20])
            }
        })
    }

    #[test]
    fn flat_image_is_blurry() {
        let sharpness = assess_sharpness(&RgbImage::from_pixel(64, 64, Rgb([180, 150, 130])));
        assert_eq!(sharpness.variance, 0.0);
        assert!(sharpness.blurry);
    }

    #[test]
    fn fine_detail_is_sharp() {
        let sharpness = assess_sharpness(&checkerboard(64, 2));
        assert!(sharpness.variance > 10_000.0, "{}", sharpness.variance);
        assert!(!sharpness.blurry);
    }

    #[test]
    fn blurring_lowers_the_score_below_threshold() {
        let sharp = checkerboard(96, 4);
        let blurred = image::imageops::blur(&sharp, 6.0);
        let before = laplacian_variance(&sharp);
        let after = laplacian_variance(&blurred);
        assert!(after < before);
        assert!(assess_sharpness(&blurred).blurry, "variance {after}");
    }

    #[test]
    fn tiny_and_large_images_are_handled() {
        assert_eq!(laplacian_variance(&RgbImage::new(2, 40)), 0.0);
        let large = checkerboard(1200, 8);
        assert!(!assess_sharpness(&large).blurry);
    }
}

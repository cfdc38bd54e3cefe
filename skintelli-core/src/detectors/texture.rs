use image::RgbImage;
use rayon::prelude::*;
use skintelli_utils::config::TextureSettings;

use super::{FeatureDetector, ramp};
use crate::color_space::ColorPlanes;
use crate::error::AnalysisResult;
use crate::score_map::{Feature, ScoreMap};

/// 5-tap binomial kernel applied separably before edge detection.
const BINOMIAL: [f32; 5] = [1.0 / 16.0, 4.0 / 16.0, 6.0 / 16.0, 4.0 / 16.0, 1.0 / 16.0];

/// Local roughness: variance of the Laplacian response within a square window.
///
/// Smooth skin produces a near-constant Laplacian, scaling and rough patches a
/// highly variable one. Luma is lightly blurred first so sensor noise and JPEG
/// blocking do not count as texture.
#[derive(Debug, Clone)]
pub struct TextureDetector {
    settings: TextureSettings,
}

impl TextureDetector {
    pub fn new(settings: TextureSettings) -> Self {
        Self { settings }
    }
}

impl FeatureDetector for TextureDetector {
    fn feature(&self) -> Feature {
        Feature::Texture
    }

    fn detect(&self, _image: &RgbImage, planes: &ColorPlanes) -> AnalysisResult<ScoreMap> {
        let (width, height) = planes.dimensions();
        let (w, h) = (width as usize, height as usize);
        let luma: Vec<f32> = planes.luma.iter().copied().collect();

        let smoothed = binomial_blur(&luma, w, h);
        let response = laplacian(&smoothed, w, h);
        let variance = local_variance(&response, w, h, self.settings.window.max(1));

        let (baseline, range) = (self.settings.baseline, self.settings.range);
        let scores = variance
            .into_par_iter()
            .map(|v| ramp(v, baseline, range))
            .collect();
        ScoreMap::from_vec(width, height, scores)
    }
}

/// Separable 5-tap blur with replicated borders.
fn binomial_blur(src: &[f32], w: usize, h: usize) -> Vec<f32> {
    let tap = |i: usize, k: usize, len: usize| (i + k).saturating_sub(2).min(len - 1);

    let mut horizontal = vec![0.0f32; w * h];
    horizontal
        .par_chunks_mut(w)
        .zip(src.par_chunks(w))
        .for_each(|(out, row)| {
            for (x, value) in out.iter_mut().enumerate() {
                *value = BINOMIAL
                    .iter()
                    .enumerate()
                    .map(|(k, weight)| weight * row[tap(x, k, w)])
                    .sum();
            }
        });

    let mut out = vec![0.0f32; w * h];
    out.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
        for (x, value) in row.iter_mut().enumerate() {
            *value = BINOMIAL
                .iter()
                .enumerate()
                .map(|(k, weight)| weight * horizontal[tap(y, k, h) * w + x])
                .sum();
        }
    });
    out
}

/// 4-neighbour Laplacian `[[0, 1, 0], [1, -4, 1], [0, 1, 0]]`; border pixels are 0.
fn laplacian(src: &[f32], w: usize, h: usize) -> Vec<f32> {
    let mut out = vec![0.0f32; w * h];
    if w < 3 || h < 3 {
        return out;
    }
    out.par_chunks_mut(w)
        .enumerate()
        .skip(1)
        .take(h - 2)
        .for_each(|(y, row)| {
            for x in 1..w - 1 {
                let c = y * w + x;
                row[x] = src[c - w] + src[c + w] + src[c - 1] + src[c + 1] - 4.0 * src[c];
            }
        });
    out
}

/// Population variance over a `window × window` neighbourhood clipped to the image,
/// using integral images of the values and their squares.
fn local_variance(src: &[f32], w: usize, h: usize, window: usize) -> Vec<f32> {
    let stride = w + 1;
    let mut sum = vec![0.0f64; stride * (h + 1)];
    let mut sum_sq = vec![0.0f64; stride * (h + 1)];
    for y in 0..h {
        let (mut row_sum, mut row_sq) = (0.0f64, 0.0f64);
        for x in 0..w {
            let v = src[y * w + x] as f64;
            row_sum += v;
            row_sq += v * v;
            let i = (y + 1) * stride + x + 1;
            sum[i] = sum[i - stride] + row_sum;
            sum_sq[i] = sum_sq[i - stride] + row_sq;
        }
    }

    let half = window / 2;
    let rect = |table: &[f64], x0: usize, y0: usize, x1: usize, y1: usize| {
        table[y1 * stride + x1] - table[y0 * stride + x1] - table[y1 * stride + x0]
            + table[y0 * stride + x0]
    };

    let mut out = vec![0.0f32; w * h];
    out.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
        let y0 = y.saturating_sub(half);
        let y1 = (y + window - half).min(h);
        for (x, value) in row.iter_mut().enumerate() {
            let x0 = x.saturating_sub(half);
            let x1 = (x + window - half).min(w);
            let n = ((x1 - x0) * (y1 - y0)) as f64;
            let s = rect(&sum, x0, y0, x1, y1);
            let sq = rect(&sum_sq, x0, y0, x1, y1);
            *value = ((sq - s * s / n) / n).max(0.0) as f32;
        }
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color_space::transform;
    use image::Rgb;

    #[test]
    fn blur_preserves_constant_signal() {
        let src = vec![7.0f32; 6 * 4];
        let out = binomial_blur(&src, 6, 4);
        assert!(out.iter().all(|v| (v - 7.0).abs() < 1e-5));
    }

    #[test]
    fn laplacian_of_single_peak() {
        let mut src = vec![0.0f32; 25];
        src[12] = 1.0;
        let lap = laplacian(&src, 5, 5);
        assert_eq!(lap[12], -4.0);
        assert_eq!(lap[7], 1.0);
        assert_eq!(lap[11], 1.0);
        assert_eq!(lap[6], 0.0);
        assert!(laplacian(&[1.0, 2.0], 2, 1).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn local_variance_matches_direct_computation() {
        let (w, h) = (5, 4);
        let src: Vec<f32> = (0..w * h).map(|i| ((i * 7) % 11) as f32).collect();
        let window = 3;
        let fast = local_variance(&src, w, h, window);

        for y in 0..h {
            for x in 0..w {
                let mut values = Vec::new();
                for yy in y.saturating_sub(1)..(y + 2).min(h) {
                    for xx in x.saturating_sub(1)..(x + 2).min(w) {
                        values.push(src[yy * w + xx] as f64);
                    }
                }
                let n = values.len() as f64;
                let mean = values.iter().sum::<f64>() / n;
                let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
                assert!((fast[y * w + x] as f64 - var).abs() < 1e-3, "({x}, {y})");
            }
        }
    }

    #[test]
    fn stripes_read_as_rough_and_flat_as_smooth() {
        let mut image = RgbImage::new(48, 48);
        for (x, _, pixel) in image.enumerate_pixels_mut() {
            let level = if (x / 3) % 2 == 0 { 30 } else { 230 };
            *pixel = Rgb([level; 3]);
        }
        let planes = transform(&image).expect("transform");
        let detector = TextureDetector::new(TextureSettings::default());
        let map = detector.detect(&image, &planes).expect("detect");
        assert!(map.get(24, 24) > 0.9, "centre score {}", map.get(24, 24));

        let flat = RgbImage::from_pixel(48, 48, Rgb([120, 100, 90]));
        let planes = transform(&flat).expect("transform");
        assert_eq!(detector.detect(&flat, &planes).expect("detect").mean(), 0.0);
    }
}

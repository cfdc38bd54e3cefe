use image::RgbImage;
use skintelli_utils::config::RednessSettings;

use super::{FeatureDetector, ramp};
use crate::color_space::ColorPlanes;
use crate::error::AnalysisResult;
use crate::score_map::{Feature, ScoreMap};

/// Flags inflamed-looking pixels: red hue, enough saturation and brightness, and a
/// red channel that clearly dominates green and blue.
///
/// The dominance margin is relative to the image's own mean dominance so a warm
/// white balance does not light up the whole frame.
#[derive(Debug, Clone)]
pub struct RednessDetector {
    settings: RednessSettings,
}

impl RednessDetector {
    pub fn new(settings: RednessSettings) -> Self {
        Self { settings }
    }

    /// Angular distance to pure red (0°), in degrees.
    fn hue_distance(hue: f32) -> f32 {
        hue.min(360.0 - hue).max(0.0)
    }
}

#[inline]
fn dominance(px: &[u8; 3]) -> f32 {
    px[0] as f32 - px[1].max(px[2]) as f32
}

impl FeatureDetector for RednessDetector {
    fn feature(&self) -> Feature {
        Feature::Redness
    }

    fn detect(&self, image: &RgbImage, planes: &ColorPlanes) -> AnalysisResult<ScoreMap> {
        let s = &self.settings;
        let (width, height) = image.dimensions();

        let total: f64 = image.pixels().map(|p| dominance(&p.0) as f64).sum();
        let mean_dominance = (total / (width as f64 * height as f64)) as f32;
        let margin = s.channel_margin + mean_dominance;
        let half_width = s.hue_half_width.max(f32::EPSILON);

        Ok(ScoreMap::from_fn(width, height, |x, y| {
            let idx = (y as usize, x as usize);
            let hue_distance = Self::hue_distance(planes.hue[idx]);
            if hue_distance > half_width
                || planes.saturation[idx] <= s.min_saturation
                || planes.value[idx] <= s.min_value
            {
                return 0.0;
            }
            let excess = dominance(&image.get_pixel(x, y).0) - margin;
            if excess <= 0.0 {
                return 0.0;
            }
            let closeness = 1.0 - hue_distance / half_width;
            0.5 * closeness + 0.5 * ramp(excess, 0.0, s.dominance_range)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color_space::transform;
    use image::Rgb;

    /// Mid-gray background with a 16×16 red patch of the given green/blue level.
    fn patch_image(gb: u8) -> RgbImage {
        let mut image = RgbImage::from_pixel(64, 64, Rgb([128, 128, 128]));
        for y in 24..40 {
            for x in 24..40 {
                image.put_pixel(x, y, Rgb([200, gb, gb]));
            }
        }
        image
    }

    fn patch_score(gb: u8) -> f32 {
        let image = patch_image(gb);
        let planes = transform(&image).expect("transform");
        let map = RednessDetector::new(RednessSettings::default())
            .detect(&image, &planes)
            .expect("detect");
        assert_eq!(map.get(0, 0), 0.0);
        map.get(30, 30)
    }

    #[test]
    fn score_grows_with_saturation() {
        // Saturation 0.4, 0.6, 0.8 at value 200/255.
        let scores = [patch_score(120), patch_score(80), patch_score(40)];
        assert!((scores[0] - 0.775).abs() < 1e-3, "{scores:?}");
        assert!((scores[1] - 0.9625).abs() < 1e-3, "{scores:?}");
        assert!((scores[2] - 1.0).abs() < 1e-6, "{scores:?}");
        assert!(scores[0] < scores[1] && scores[1] < scores[2]);
    }

    #[test]
    fn uniformly_tinted_image_is_not_flagged() {
        let image = RgbImage::from_pixel(16, 16, Rgb([220, 60, 60]));
        let planes = transform(&image).expect("transform");
        let map = RednessDetector::new(RednessSettings::default())
            .detect(&image, &planes)
            .expect("detect");
        assert_eq!(map.mean(), 0.0);
    }

    #[test]
    fn hue_band_wraps_around_zero() {
        assert_eq!(RednessDetector::hue_distance(0.0), 0.0);
        assert_eq!(RednessDetector::hue_distance(350.0), 10.0);
        assert_eq!(RednessDetector::hue_distance(10.0), 10.0);
        assert_eq!(RednessDetector::hue_distance(180.0), 180.0);
    }

    #[test]
    fn magenta_leaning_red_still_scores() {
        let mut image = RgbImage::from_pixel(64, 64, Rgb([128, 128, 128]));
        // Hue ≈ 352°: blue slightly above green.
        for y in 0..8 {
            for x in 0..8 {
                image.put_pixel(x, y, Rgb([210, 40, 64]));
            }
        }
        let planes = transform(&image).expect("transform");
        let map = RednessDetector::new(RednessSettings::default())
            .detect(&image, &planes)
            .expect("detect");
        assert!(map.get(3, 3) > 0.5);
    }
}

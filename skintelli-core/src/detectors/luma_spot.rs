use image::RgbImage;
use skintelli_utils::config::LumaSpotSettings;

use super::{FeatureDetector, ramp};
use crate::color_space::ColorPlanes;
use crate::error::AnalysisResult;
use crate::score_map::{Feature, ScoreMap};

/// Pixels notably darker than the image's mean luma (pigmentation, moles).
#[derive(Debug, Clone)]
pub struct DarkSpotDetector {
    settings: LumaSpotSettings,
}

impl DarkSpotDetector {
    pub fn new(settings: LumaSpotSettings) -> Self {
        Self { settings }
    }
}

impl FeatureDetector for DarkSpotDetector {
    fn feature(&self) -> Feature {
        Feature::DarkSpot
    }

    fn detect(&self, _image: &RgbImage, planes: &ColorPlanes) -> AnalysisResult<ScoreMap> {
        let cutoff = planes.mean_luma() - self.settings.threshold;
        let range = self.settings.range;
        Ok(luma_map(planes, |luma| ramp(cutoff - luma, 0.0, range)))
    }
}

/// Pixels notably brighter than the image's mean luma (hypopigmentation, scale).
#[derive(Debug, Clone)]
pub struct LightSpotDetector {
    settings: LumaSpotSettings,
}

impl LightSpotDetector {
    pub fn new(settings: LumaSpotSettings) -> Self {
        Self { settings }
    }
}

impl FeatureDetector for LightSpotDetector {
    fn feature(&self) -> Feature {
        Feature::LightSpot
    }

    fn detect(&self, _image: &RgbImage, planes: &ColorPlanes) -> AnalysisResult<ScoreMap> {
        let cutoff = planes.mean_luma() + self.settings.threshold;
        let range = self.settings.range;
        Ok(luma_map(planes, |luma| ramp(luma - cutoff, 0.0, range)))
    }
}

fn luma_map(planes: &ColorPlanes, score: impl Fn(f32) -> f32) -> ScoreMap {
    let (width, height) = planes.dimensions();
    ScoreMap::from_fn(width, height, |x, y| {
        score(planes.luma[(y as usize, x as usize)])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color_space::transform;
    use image::Rgb;

    fn square(background: u8, spot: u8) -> RgbImage {
        let mut image = RgbImage::from_pixel(40, 40, Rgb([background; 3]));
        for y in 10..20 {
            for x in 10..20 {
                image.put_pixel(x, y, Rgb([spot; 3]));
            }
        }
        image
    }

    #[test]
    fn dark_spot_scores_relative_to_mean() {
        let image = square(180, 60);
        let planes = transform(&image).expect("transform");
        // mean = 180 - 120 * 100 / 1600 = 172.5; cutoff 132.5; 132.5 - 60 = 72.5 > range
        let map = DarkSpotDetector::new(LumaSpotSettings::default())
            .detect(&image, &planes)
            .expect("detect");
        assert_eq!(map.get(15, 15), 1.0);
        assert_eq!(map.get(0, 0), 0.0);

        let light = LightSpotDetector::new(LumaSpotSettings::default())
            .detect(&image, &planes)
            .expect("detect");
        assert_eq!(light.mean(), 0.0);
    }

    #[test]
    fn light_spot_ramps_linearly() {
        let image = square(100, 200);
        let planes = transform(&image).expect("transform");
        // mean = 106.25; cutoff 146.25; (200 - 146.25) / 100
        let map = LightSpotDetector::new(LumaSpotSettings {
            threshold: 40.0,
            range: 100.0,
        })
        .detect(&image, &planes)
        .expect("detect");
        assert!((map.get(12, 12) - 0.5375).abs() < 1e-3);
        assert_eq!(map.get(30, 30), 0.0);
    }
}

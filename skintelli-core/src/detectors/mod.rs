//! Independent per-pixel feature detectors.
//!
//! Every detector reads the same immutable image and [`ColorPlanes`] and returns a
//! [`ScoreMap`] of its own. They share no state, so [`DetectorBank::detect_all`]
//! runs all four concurrently and joins before compositing.

mod luma_spot;
mod redness;
mod texture;

pub use luma_spot::{DarkSpotDetector, LightSpotDetector};
pub use redness::RednessDetector;
pub use texture::TextureDetector;

use image::RgbImage;
use skintelli_utils::{config::DetectorSettings, timing_guard};

use crate::color_space::ColorPlanes;
use crate::error::{AnalysisResult, ensure_same_dims};
use crate::score_map::{Feature, FeatureMaps, ScoreMap};

/// Shared contract for the heuristic detectors.
pub trait FeatureDetector: Send + Sync {
    /// The feature this detector scores.
    fn feature(&self) -> Feature;

    /// Score every pixel of `image` in `[0, 1]`.
    fn detect(&self, image: &RgbImage, planes: &ColorPlanes) -> AnalysisResult<ScoreMap>;
}

/// The four detectors configured from one [`DetectorSettings`].
#[derive(Debug, Clone)]
pub struct DetectorBank {
    redness: RednessDetector,
    dark_spot: DarkSpotDetector,
    light_spot: LightSpotDetector,
    texture: TextureDetector,
}

impl DetectorBank {
    pub fn new(settings: &DetectorSettings) -> Self {
        Self {
            redness: RednessDetector::new(settings.redness.clone()),
            dark_spot: DarkSpotDetector::new(settings.dark_spot.clone()),
            light_spot: LightSpotDetector::new(settings.light_spot.clone()),
            texture: TextureDetector::new(settings.texture.clone()),
        }
    }

    /// Run all detectors in parallel and collect their maps.
    pub fn detect_all(&self, image: &RgbImage, planes: &ColorPlanes) -> AnalysisResult<FeatureMaps> {
        ensure_same_dims("color planes vs image", image.dimensions(), planes.dimensions())?;

        let ((redness, dark_spot), (light_spot, texture)) = rayon::join(
            || {
                rayon::join(
                    || timed(&self.redness, image, planes),
                    || timed(&self.dark_spot, image, planes),
                )
            },
            || {
                rayon::join(
                    || timed(&self.light_spot, image, planes),
                    || timed(&self.texture, image, planes),
                )
            },
        );

        let maps = FeatureMaps {
            redness: redness?,
            dark_spot: dark_spot?,
            light_spot: light_spot?,
            texture: texture?,
        };
        ensure_same_dims("feature maps vs image", image.dimensions(), maps.dimensions()?)?;
        Ok(maps)
    }
}

impl Default for DetectorBank {
    fn default() -> Self {
        Self::new(&DetectorSettings::default())
    }
}

fn timed(
    detector: &dyn FeatureDetector,
    image: &RgbImage,
    planes: &ColorPlanes,
) -> AnalysisResult<ScoreMap> {
    let _guard = timing_guard(
        format!("skintelli_core::detect::{}", detector.feature()),
        log::Level::Trace,
    );
    detector.detect(image, planes)
}

/// Linear ramp: 0 at or below `start`, 1 at or above `start + range`.
#[inline]
pub(crate) fn ramp(value: f32, start: f32, range: f32) -> f32 {
    ((value - start) / range.max(f32::EPSILON)).clamp(0.0, 1.0)
}

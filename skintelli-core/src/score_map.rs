//! Per-pixel score grids and the feature vocabulary shared by every stage.

use std::fmt;

use image::GrayImage;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, AnalysisResult, ensure_same_dims};

/// The four visual cues the heuristic detectors look for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Redness,
    DarkSpot,
    LightSpot,
    Texture,
}

impl Feature {
    /// All features in their canonical (tie-breaking) order.
    pub const ALL: [Feature; 4] = [
        Feature::Redness,
        Feature::DarkSpot,
        Feature::LightSpot,
        Feature::Texture,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Feature::Redness => "redness",
            Feature::DarkSpot => "dark_spot",
            Feature::LightSpot => "light_spot",
            Feature::Texture => "texture",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Width × height grid of scores in `[0, 1]`, stored row-major as `[y, x]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreMap {
    values: Array2<f32>,
}

impl ScoreMap {
    pub fn zeros(width: u32, height: u32) -> Self {
        Self {
            values: Array2::zeros((height as usize, width as usize)),
        }
    }

    /// Build a map by evaluating `f(x, y)` for every pixel; results are clamped to `[0, 1]`.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> f32) -> Self {
        let values = Array2::from_shape_fn((height as usize, width as usize), |(y, x)| {
            clamp_unit(f(x as u32, y as u32))
        });
        Self { values }
    }

    /// Wrap a row-major vector of `width * height` scores, clamping each to `[0, 1]`.
    pub fn from_vec(width: u32, height: u32, mut data: Vec<f32>) -> AnalysisResult<Self> {
        data.iter_mut().for_each(|v| *v = clamp_unit(*v));
        let values = Array2::from_shape_vec((height as usize, width as usize), data)
            .map_err(|e| {
                AnalysisError::InternalInconsistency(format!(
                    "score buffer does not fit {width}x{height}: {e}"
                ))
            })?;
        Ok(Self { values })
    }

    pub fn width(&self) -> u32 {
        self.values.ncols() as u32
    }

    pub fn height(&self) -> u32 {
        self.values.nrows() as u32
    }

    /// `(width, height)`, matching `image::GenericImageView::dimensions`.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.values[(y as usize, x as usize)]
    }

    pub fn values(&self) -> &Array2<f32> {
        &self.values
    }

    pub fn mean(&self) -> f32 {
        self.values.mean().unwrap_or(0.0)
    }

    /// Mean over pixels where `mask` is non-zero; 0 for an empty mask.
    pub fn mean_where(&self, mask: &GrayImage) -> AnalysisResult<f32> {
        ensure_same_dims("mask vs score map", self.dimensions(), mask.dimensions())?;
        let (sum, count) = mask
            .enumerate_pixels()
            .filter(|(_, _, p)| p[0] > 0)
            .fold((0.0f64, 0u64), |(sum, count), (x, y, _)| {
                (sum + self.get(x, y) as f64, count + 1)
            });
        Ok(if count == 0 {
            0.0
        } else {
            (sum / count as f64) as f32
        })
    }
}

#[inline]
pub(crate) fn clamp_unit(v: f32) -> f32 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}

/// One score map per feature, all sharing the source image's dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMaps {
    pub redness: ScoreMap,
    pub dark_spot: ScoreMap,
    pub light_spot: ScoreMap,
    pub texture: ScoreMap,
}

impl FeatureMaps {
    pub fn get(&self, feature: Feature) -> &ScoreMap {
        match feature {
            Feature::Redness => &self.redness,
            Feature::DarkSpot => &self.dark_spot,
            Feature::LightSpot => &self.light_spot,
            Feature::Texture => &self.texture,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Feature, &ScoreMap)> {
        Feature::ALL.into_iter().map(move |f| (f, self.get(f)))
    }

    /// Shared dimensions, or `InternalInconsistency` if any map disagrees.
    pub fn dimensions(&self) -> AnalysisResult<(u32, u32)> {
        let dims = self.redness.dimensions();
        for (feature, map) in self.iter() {
            ensure_same_dims(feature.label(), dims, map.dimensions())?;
        }
        Ok(dims)
    }

    /// Mean score of each feature over the non-zero pixels of `mask`.
    pub fn aggregate(&self, mask: &GrayImage) -> AnalysisResult<FeatureScores> {
        let mut scores = FeatureScores::default();
        for (feature, map) in self.iter() {
            scores.set(feature, map.mean_where(mask)?);
        }
        Ok(scores)
    }
}

/// Feature name → aggregate score. Serializes as a flat mapping.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureScores {
    pub redness: f32,
    pub dark_spot: f32,
    pub light_spot: f32,
    pub texture: f32,
}

impl FeatureScores {
    pub fn get(&self, feature: Feature) -> f32 {
        match feature {
            Feature::Redness => self.redness,
            Feature::DarkSpot => self.dark_spot,
            Feature::LightSpot => self.light_spot,
            Feature::Texture => self.texture,
        }
    }

    pub fn set(&mut self, feature: Feature, value: f32) {
        let slot = match feature {
            Feature::Redness => &mut self.redness,
            Feature::DarkSpot => &mut self.dark_spot,
            Feature::LightSpot => &mut self.light_spot,
            Feature::Texture => &mut self.texture,
        };
        *slot = value;
    }

    /// Features sorted by score, strongest first; equal scores keep canonical order.
    pub fn ranked(&self) -> Vec<(Feature, f32)> {
        let mut ranked: Vec<(Feature, f32)> =
            Feature::ALL.iter().map(|&f| (f, self.get(f))).collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }

    /// Highest-scoring feature; ties go to the earlier feature in [`Feature::ALL`].
    pub fn strongest(&self) -> Feature {
        Feature::ALL
            .into_iter()
            .fold(Feature::Redness, |best, f| {
                if self.get(f) > self.get(best) { f } else { best }
            })
    }

    /// Strongest feature, or `None` when every score is zero.
    pub fn dominant(&self) -> Option<Feature> {
        let best = self.strongest();
        (self.get(best) > 0.0).then_some(best)
    }
}

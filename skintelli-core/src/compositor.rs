//! Combines feature maps into one severity map, cleans the candidate mask, and
//! classifies the image into a severity tier.
//!
//! Tier boundaries are fixed product constants; only the mask threshold, the
//! morphology radius and the intensity cutoff are tunable.

use std::fmt;

use image::{GrayImage, Luma};
use imageproc::{
    distance_transform::Norm,
    morphology::{close, open},
};
use serde::{Deserialize, Serialize};
use skintelli_utils::config::CompositeSettings;

use crate::error::{AnalysisResult, ensure_same_dims};
use crate::score_map::{FeatureMaps, ScoreMap};

/// Below this affected fraction an image is considered clear.
pub const NONE_BELOW: f64 = 0.01;
/// Affected fraction at which an image is at least `Medium`.
pub const MEDIUM_AT: f64 = 0.05;
/// Affected fraction at which an image is `High`.
pub const HIGH_AT: f64 = 0.15;

/// Mask value for flagged pixels.
pub const MASK_ON: u8 = 255;

/// Ordered severity buckets.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SeverityTier {
    #[default]
    None,
    Low,
    Medium,
    High,
}

impl SeverityTier {
    /// Map affected fraction and mean severity onto a tier.
    ///
    /// A small area only reaches `Medium` on its own when it is intense enough
    /// (`mean_severity >= high_intensity_cutoff`).
    pub fn classify(affected_fraction: f64, mean_severity: f64, high_intensity_cutoff: f64) -> Self {
        if affected_fraction < NONE_BELOW {
            SeverityTier::None
        } else if affected_fraction >= HIGH_AT {
            SeverityTier::High
        } else if affected_fraction >= MEDIUM_AT || mean_severity >= high_intensity_cutoff {
            SeverityTier::Medium
        } else {
            SeverityTier::Low
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SeverityTier::None => "none",
            SeverityTier::Low => "low",
            SeverityTier::Medium => "medium",
            SeverityTier::High => "high",
        }
    }
}

impl fmt::Display for SeverityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Combined scores, the cleaned mask and the statistics derived from them.
#[derive(Debug, Clone, PartialEq)]
pub struct SeverityMap {
    pub combined: ScoreMap,
    /// Cleaned binary mask: [`MASK_ON`] for flagged pixels, 0 otherwise.
    pub mask: GrayImage,
    /// Flagged pixels / total pixels.
    pub affected_fraction: f64,
    /// Mean combined score over flagged pixels; 0 when nothing is flagged.
    pub mean_severity: f64,
}

impl SeverityMap {
    pub fn dimensions(&self) -> (u32, u32) {
        self.combined.dimensions()
    }

    pub fn is_flagged(&self, x: u32, y: u32) -> bool {
        self.mask.get_pixel(x, y)[0] > 0
    }

    pub fn tier(&self, high_intensity_cutoff: f64) -> SeverityTier {
        SeverityTier::classify(self.affected_fraction, self.mean_severity, high_intensity_cutoff)
    }
}

/// Stateless compositor configured once from [`CompositeSettings`].
#[derive(Debug, Clone, Default)]
pub struct Compositor {
    settings: CompositeSettings,
}

impl Compositor {
    pub fn new(settings: CompositeSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &CompositeSettings {
        &self.settings
    }

    /// Per-pixel maximum of the four detector maps, thresholded and cleaned.
    pub fn composite(
        &self,
        redness: &ScoreMap,
        dark_spot: &ScoreMap,
        light_spot: &ScoreMap,
        texture: &ScoreMap,
    ) -> AnalysisResult<SeverityMap> {
        let dims = redness.dimensions();
        for (what, map) in [
            ("dark_spot vs redness", dark_spot),
            ("light_spot vs redness", light_spot),
            ("texture vs redness", texture),
        ] {
            ensure_same_dims(what, dims, map.dimensions())?;
        }

        let combined = ScoreMap::from_fn(dims.0, dims.1, |x, y| {
            redness
                .get(x, y)
                .max(dark_spot.get(x, y))
                .max(light_spot.get(x, y))
                .max(texture.get(x, y))
        });
        self.clean_combined(combined)
    }

    pub fn composite_maps(&self, maps: &FeatureMaps) -> AnalysisResult<SeverityMap> {
        self.composite(&maps.redness, &maps.dark_spot, &maps.light_spot, &maps.texture)
    }

    /// Threshold and clean an already combined map.
    pub fn clean_combined(&self, combined: ScoreMap) -> AnalysisResult<SeverityMap> {
        let (width, height) = combined.dimensions();
        let threshold = self.settings.mask_threshold;

        let raw = GrayImage::from_fn(width, height, |x, y| {
            Luma([if combined.get(x, y) > threshold { MASK_ON } else { 0 }])
        });
        let radius = self.settings.morph_radius;
        let mask = if radius == 0 {
            raw
        } else {
            open(&close(&raw, Norm::LInf, radius), Norm::LInf, radius)
        };
        ensure_same_dims("cleaned mask", (width, height), mask.dimensions())?;

        let total = width as f64 * height as f64;
        let flagged = mask.pixels().filter(|p| p[0] > 0).count() as f64;
        let affected_fraction = if total > 0.0 { flagged / total } else { 0.0 };
        let mean_severity = combined.mean_where(&mask)? as f64;

        Ok(SeverityMap {
            combined,
            mask,
            affected_fraction: affected_fraction.clamp(0.0, 1.0),
            mean_severity: mean_severity.clamp(0.0, 1.0),
        })
    }
}

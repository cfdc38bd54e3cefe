//! The strategy-agnostic analysis contract.
//!
//! Callers pick a strategy once through [`build_analyzer`] and afterwards only see
//! `dyn SkinAnalyzer`. Both strategies produce the same [`DetectionResult`] shape;
//! only the model strategy fills in [`DetectionResult::classification`].

use std::borrow::Cow;

use anyhow::{Context, Result};
use image::RgbImage;
use log::Level;
use skintelli_utils::{
    StageTimings,
    config::{AnalysisStrategy, AppSettings},
    timing_guard,
};

use crate::compositor::SeverityTier;
use crate::error::AnalysisResult;
use crate::heuristic::HeuristicAnalyzer;
use crate::model::{Classification, LesionClassifier};
use crate::model_analyzer::ModelAnalyzer;
use crate::regions::Region;
use crate::score_map::{Feature, FeatureScores};

/// Affected percentage above which a result is reported as having issues.
pub const ISSUE_PERCENTAGE: f64 = 1.0;

/// Everything one analysis produces. Owned by the caller; the engine keeps nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionResult {
    pub strategy: AnalysisStrategy,
    pub tier: SeverityTier,
    /// Flagged pixels / total pixels, in `[0, 1]`.
    pub affected_fraction: f64,
    /// Mean combined score over flagged pixels, in `[0, 1]`.
    pub mean_severity: f64,
    /// Largest first, then top-most, then left-most.
    pub regions: Vec<Region>,
    /// Mean detector score over flagged pixels.
    pub feature_scores: FeatureScores,
    /// Same dimensions as the analyzed image.
    pub overlay: RgbImage,
    /// Whole-image lesion classification (model strategy only).
    pub classification: Option<Classification>,
}

impl DetectionResult {
    pub fn affected_percentage(&self) -> f64 {
        self.affected_fraction * 100.0
    }

    pub fn has_issues(&self) -> bool {
        self.affected_percentage() > ISSUE_PERCENTAGE
    }

    /// Features with a non-zero score, strongest first.
    pub fn dominant_features(&self) -> Vec<(Feature, f32)> {
        self.feature_scores
            .ranked()
            .into_iter()
            .filter(|(_, score)| *score > 0.0)
            .collect()
    }
}

/// A skin-photo analyzer. Implementations are immutable after construction and
/// safe to share across threads.
pub trait SkinAnalyzer: Send + Sync {
    fn strategy(&self) -> AnalysisStrategy;

    /// Analyze one image and record per-stage durations into `timings`.
    fn analyze_with_timings(
        &self,
        image: &RgbImage,
        timings: &mut StageTimings,
    ) -> AnalysisResult<DetectionResult>;

    /// Analyze one image.
    fn analyze(&self, image: &RgbImage) -> AnalysisResult<DetectionResult> {
        self.analyze_with_timings(image, &mut StageTimings::new())
    }
}

/// Construct the analyzer selected by `settings.strategy`.
pub fn build_analyzer(settings: &AppSettings) -> Result<Box<dyn SkinAnalyzer>> {
    match settings.strategy {
        AnalysisStrategy::Heuristic => Ok(Box::new(HeuristicAnalyzer::from_settings(settings))),
        AnalysisStrategy::Model => {
            let path = settings
                .model
                .model_path
                .as_deref()
                .context("model strategy selected but no model path is configured")?;
            let classifier = LesionClassifier::load(
                path,
                (settings.model.input_width, settings.model.input_height),
            )
            .with_context(|| format!("failed to load lesion classifier from {path}"))?;
            Ok(Box::new(ModelAnalyzer::new(
                classifier,
                HeuristicAnalyzer::from_settings(settings),
                settings.model.tiles,
            )))
        }
    }
}

/// Run one pipeline stage, recording it in `timings` and in the telemetry log.
pub(crate) fn stage<T>(
    timings: &mut StageTimings,
    label: &'static str,
    f: impl FnOnce() -> T,
) -> T {
    let _guard = timing_guard(
        Cow::Owned(format!("skintelli_core::{label}")),
        Level::Debug,
    );
    timings.time(label, f)
}

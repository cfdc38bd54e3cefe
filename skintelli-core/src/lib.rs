//! Core Skintelli analysis engine.
//!
//! This crate turns one RGB skin photograph into a severity assessment: color
//! planes feed four independent feature detectors, their maps are composited
//! into a cleaned mask, connected regions are extracted, and a heatmap overlay is
//! rendered. A learned-model strategy plugs into the same [`SkinAnalyzer`]
//! contract through `tract-onnx`.

/// Analyzer trait, result type and strategy selection.
pub mod analyzer;
/// RGB to HSV/luma planes.
pub mod color_space;
/// Max-combining, mask cleanup and severity tiers.
pub mod compositor;
/// The four per-pixel feature detectors.
pub mod detectors;
/// Templated explanations backed by a knowledge base.
pub mod diagnosis;
pub mod error;
/// Severity gradient overlay rendering.
pub mod heatmap;
/// The heuristic analysis strategy.
pub mod heuristic;
/// ONNX lesion classifier loading and output decoding.
pub mod model;
/// The learned-model analysis strategy.
pub mod model_analyzer;
/// Connected-component extraction.
pub mod regions;
/// Score grids and the feature vocabulary.
pub mod score_map;

pub use analyzer::{DetectionResult, ISSUE_PERCENTAGE, SkinAnalyzer, build_analyzer};
pub use color_space::{ColorPlanes, transform};
pub use compositor::{Compositor, SeverityMap, SeverityTier};
pub use detectors::{
    DarkSpotDetector, DetectorBank, FeatureDetector, LightSpotDetector, RednessDetector,
    TextureDetector,
};
pub use diagnosis::{DiagnosisSignal, DiagnosisSynthesizer, KnowledgeBase};
pub use error::{AnalysisError, AnalysisResult};
pub use heatmap::HeatmapRenderer;
pub use heuristic::HeuristicAnalyzer;
pub use model::{Classification, LesionClass, LesionClassifier, PatchClassifier, decode_scores};
pub use model_analyzer::ModelAnalyzer;
pub use regions::{BoundingBox, ContourPoint, Region, extract};
pub use score_map::{Feature, FeatureMaps, FeatureScores, ScoreMap};

/// Returns the crate version for diagnostics.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

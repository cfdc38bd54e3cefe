//! Serializable per-image records.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use skintelli_core::{
    Classification, DetectionResult, FeatureScores, Region, SeverityTier,
};
use skintelli_utils::config::AnalysisStrategy;

#[derive(Debug, Serialize)]
pub struct ImageReport {
    pub image: String,
    pub strategy: AnalysisStrategy,
    pub tier: SeverityTier,
    pub affected_percentage: f64,
    pub mean_severity: f64,
    pub has_issues: bool,
    pub regions: Vec<Region>,
    pub feature_scores: FeatureScores,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<Classification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlay: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timings_ms: Option<BTreeMap<String, f64>>,
}

impl ImageReport {
    /// Record for `result`; optional sections are attached by the caller.
    pub fn new(image: &Path, result: DetectionResult) -> Self {
        Self {
            image: image.display().to_string(),
            strategy: result.strategy,
            tier: result.tier,
            affected_percentage: result.affected_percentage(),
            mean_severity: result.mean_severity,
            has_issues: result.has_issues(),
            feature_scores: result.feature_scores,
            regions: result.regions,
            classification: result.classification,
            overlay: None,
            explanation: None,
            timings_ms: None,
        }
    }

    pub fn with_overlay(mut self, path: Option<PathBuf>) -> Self {
        self.overlay = path.map(|p| p.display().to_string());
        self
    }
}

/// Batch summary written alongside the records.
#[derive(Debug, Serialize)]
pub struct BatchReport {
    pub analyzed: usize,
    pub failed: usize,
    pub flagged: usize,
    pub images: Vec<ImageReport>,
}

impl BatchReport {
    pub fn new(images: Vec<ImageReport>, failed: usize) -> Self {
        Self {
            analyzed: images.len(),
            failed,
            flagged: images.iter().filter(|r| r.has_issues).count(),
            images,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use skintelli_core::{HeuristicAnalyzer, SkinAnalyzer};

    #[test]
    fn optional_sections_are_omitted() {
        let image = RgbImage::from_pixel(64, 64, Rgb([200, 160, 140]));
        let result = HeuristicAnalyzer::default().analyze(&image).expect("analyze");
        let report = ImageReport::new(Path::new("skin.png"), result);
        let json = serde_json::to_value(&report).expect("json");

        assert_eq!(json["image"], "skin.png");
        assert_eq!(json["strategy"], "heuristic");
        assert_eq!(json["tier"], "none");
        assert_eq!(json["has_issues"], false);
        assert!(json["regions"].as_array().expect("regions").is_empty());
        for absent in ["classification", "overlay", "explanation", "timings_ms"] {
            assert!(json.get(absent).is_none(), "{absent} should be omitted");
        }
    }

    #[test]
    fn batch_counts_flagged_images() {
        let mut dark = RgbImage::from_pixel(128, 128, Rgb([180, 180, 180]));
        for y in 30..90 {
            for x in 30..90 {
                dark.put_pixel(x, y, Rgb([60, 60, 60]));
            }
        }
        let clear = RgbImage::from_pixel(64, 64, Rgb([180, 180, 180]));
        let analyzer = HeuristicAnalyzer::default();
        let reports = vec![
            ImageReport::new(Path::new("dark.png"), analyzer.analyze(&dark).expect("dark")),
            ImageReport::new(Path::new("clear.png"), analyzer.analyze(&clear).expect("clear")),
        ];
        let batch = BatchReport::new(reports, 1);
        assert_eq!((batch.analyzed, batch.failed, batch.flagged), (2, 1, 1));
    }
}

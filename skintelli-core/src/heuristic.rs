use image::RgbImage;
use log::debug;
use skintelli_utils::{
    StageTimings,
    config::{AnalysisStrategy, AppSettings, CompositeSettings, DetectorSettings, RenderSettings},
};

use crate::analyzer::{DetectionResult, SkinAnalyzer, stage};
use crate::color_space::transform;
use crate::compositor::{Compositor, SeverityMap};
use crate::detectors::DetectorBank;
use crate::error::AnalysisResult;
use crate::heatmap::HeatmapRenderer;
use crate::model::Classification;
use crate::regions::extract;
use crate::score_map::FeatureMaps;

/// Color, luma and texture heuristics followed by compositing, region
/// extraction and heatmap rendering.
///
/// Holds only configuration; every map is created per call.
#[derive(Debug, Clone, Default)]
pub struct HeuristicAnalyzer {
    detectors: DetectorBank,
    compositor: Compositor,
    renderer: HeatmapRenderer,
}

impl HeuristicAnalyzer {
    pub fn new(
        detectors: &DetectorSettings,
        composite: CompositeSettings,
        render: RenderSettings,
    ) -> Self {
        Self {
            detectors: DetectorBank::new(detectors),
            compositor: Compositor::new(composite),
            renderer: HeatmapRenderer::new(render),
        }
    }

    pub fn from_settings(settings: &AppSettings) -> Self {
        Self::new(
            &settings.detectors,
            settings.composite.clone(),
            settings.render.clone(),
        )
    }

    /// Transform the image and run all four detectors.
    pub(crate) fn feature_maps(
        &self,
        image: &RgbImage,
        timings: &mut StageTimings,
    ) -> AnalysisResult<FeatureMaps> {
        let planes = stage(timings, "transform", || transform(image))?;
        stage(timings, "detect", || self.detectors.detect_all(image, &planes))
    }

    pub(crate) fn compositor(&self) -> &Compositor {
        &self.compositor
    }

    /// Shared tail of both strategies: regions, attribution, tier and overlay.
    pub(crate) fn assemble(
        &self,
        strategy: AnalysisStrategy,
        image: &RgbImage,
        maps: &FeatureMaps,
        severity: SeverityMap,
        classification: Option<Classification>,
        timings: &mut StageTimings,
    ) -> AnalysisResult<DetectionResult> {
        let settings = self.compositor.settings();
        let regions = stage(timings, "regions", || {
            extract(&severity.mask, maps, settings.min_region_area)
        })?;
        let feature_scores = maps.aggregate(&severity.mask)?;
        let tier = severity.tier(settings.high_intensity_cutoff);
        let overlay = stage(timings, "render", || {
            self.renderer.render(image, &severity, &regions)
        })?;

        debug!(
            "{strategy} analysis: tier={tier} affected={:.2}% mean={:.3} regions={}",
            severity.affected_fraction * 100.0,
            severity.mean_severity,
            regions.len()
        );

        Ok(DetectionResult {
            strategy,
            tier,
            affected_fraction: severity.affected_fraction,
            mean_severity: severity.mean_severity,
            regions,
            feature_scores,
            overlay,
            classification,
        })
    }
}

impl SkinAnalyzer for HeuristicAnalyzer {
    fn strategy(&self) -> AnalysisStrategy {
        AnalysisStrategy::Heuristic
    }

    fn analyze_with_timings(
        &self,
        image: &RgbImage,
        timings: &mut StageTimings,
    ) -> AnalysisResult<DetectionResult> {
        let maps = self.feature_maps(image, timings)?;
        let severity = stage(timings, "composite", || self.compositor.composite_maps(&maps))?;
        self.assemble(AnalysisStrategy::Heuristic, image, &maps, severity, None, timings)
    }
}

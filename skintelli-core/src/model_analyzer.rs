//! Learned-model strategy: a lesion classifier localised by tiling.
//!
//! The whole image is classified once for the diagnosis. The image is then split
//! into a `tiles × tiles` grid and each tile's malignant probability becomes the
//! severity of its pixels. From there the result flows through the same
//! compositor, region extractor and renderer as the heuristic strategy, with the
//! heuristic detectors supplying per-feature attribution.

use image::{RgbImage, imageops};
use rayon::prelude::*;
use skintelli_utils::{StageTimings, config::AnalysisStrategy};

use crate::analyzer::{DetectionResult, SkinAnalyzer, stage};
use crate::color_space::ensure_valid;
use crate::error::{AnalysisError, AnalysisResult};
use crate::heuristic::HeuristicAnalyzer;
use crate::model::{LesionClassifier, PatchClassifier};
use crate::score_map::ScoreMap;

/// Pixel span `[start, end)` of tile `index` when `len` pixels are split into `count` tiles.
fn tile_span(len: u32, count: u32, index: u32) -> (u32, u32) {
    let start = (len as u64 * index as u64 / count as u64) as u32;
    let end = (len as u64 * (index as u64 + 1) / count as u64) as u32;
    (start, end)
}

/// Tile holding pixel `pos`; the inverse of [`tile_span`].
fn tile_index(len: u32, count: u32, pos: u32) -> u32 {
    (((pos as u64 + 1) * count as u64 - 1) / len as u64) as u32
}

#[derive(Debug)]
pub struct ModelAnalyzer<C: PatchClassifier = LesionClassifier> {
    classifier: C,
    heuristics: HeuristicAnalyzer,
    tiles: u32,
}

impl<C: PatchClassifier> ModelAnalyzer<C> {
    pub fn new(classifier: C, heuristics: HeuristicAnalyzer, tiles: u32) -> Self {
        Self {
            classifier,
            heuristics,
            tiles: tiles.max(1),
        }
    }

    /// Per-pixel malignant probability from tiled classification.
    fn tiled_severity(&self, image: &RgbImage) -> AnalysisResult<ScoreMap> {
        let (width, height) = image.dimensions();
        let cols = self.tiles.min(width);
        let rows = self.tiles.min(height);

        let cells: Vec<(u32, u32)> = (0..rows)
            .flat_map(|row| (0..cols).map(move |col| (col, row)))
            .collect();
        let scores = cells
            .par_iter()
            .map(|&(col, row)| {
                let (x0, x1) = tile_span(width, cols, col);
                let (y0, y1) = tile_span(height, rows, row);
                let patch = imageops::crop_imm(image, x0, y0, x1 - x0, y1 - y0).to_image();
                self.classifier
                    .classify(&patch)
                    .map(|c| c.malignant_probability())
            })
            .collect::<anyhow::Result<Vec<f32>>>()
            .map_err(AnalysisError::Inference)?;

        let col_of: Vec<u32> = (0..width).map(|x| tile_index(width, cols, x)).collect();
        let row_of: Vec<u32> = (0..height).map(|y| tile_index(height, rows, y)).collect();
        Ok(ScoreMap::from_fn(width, height, |x, y| {
            let (col, row) = (col_of[x as usize], row_of[y as usize]);
            scores[(row * cols + col) as usize]
        }))
    }
}

impl<C: PatchClassifier> SkinAnalyzer for ModelAnalyzer<C> {
    fn strategy(&self) -> AnalysisStrategy {
        AnalysisStrategy::Model
    }

    fn analyze_with_timings(
        &self,
        image: &RgbImage,
        timings: &mut StageTimings,
    ) -> AnalysisResult<DetectionResult> {
        ensure_valid(image)?;
        let classification = stage(timings, "classify", || self.classifier.classify(image))
            .map_err(AnalysisError::Inference)?;
        let combined = stage(timings, "tiles", || self.tiled_severity(image))?;
        let maps = self.heuristics.feature_maps(image, timings)?;
        let severity = stage(timings, "composite", || {
            self.heuristics.compositor().clean_combined(combined)
        })?;
        self.heuristics.assemble(
            AnalysisStrategy::Model,
            image,
            &maps,
            severity,
            Some(classification),
            timings,
        )
    }
}

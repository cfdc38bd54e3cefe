//! Heatmap overlay: severity gradient blended over the photo, region outlines on top.

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_line_segment_mut;
use rayon::prelude::*;
use skintelli_utils::{ColorRamp, config::RenderSettings};

use crate::compositor::SeverityMap;
use crate::error::{AnalysisResult, ensure_same_dims};
use crate::regions::Region;

/// Renders overlays with a fixed palette and the configured opacity.
#[derive(Debug, Clone)]
pub struct HeatmapRenderer {
    settings: RenderSettings,
    ramp: ColorRamp,
}

impl Default for HeatmapRenderer {
    fn default() -> Self {
        Self::new(RenderSettings::default())
    }
}

impl HeatmapRenderer {
    pub fn new(settings: RenderSettings) -> Self {
        Self {
            settings,
            ramp: ColorRamp::severity(),
        }
    }

    /// Opacity for a score: ramps from 0 up to `blend_alpha` over `[0, fade_in]`.
    fn alpha(&self, score: f32) -> f32 {
        let fade = (score / self.settings.fade_in.max(f32::EPSILON)).clamp(0.0, 1.0);
        self.settings.blend_alpha.clamp(0.0, 1.0) * fade
    }

    /// Blend the severity gradient over `original` and outline every region.
    pub fn render(
        &self,
        original: &RgbImage,
        severity: &SeverityMap,
        regions: &[Region],
    ) -> AnalysisResult<RgbImage> {
        ensure_same_dims("severity map vs image", original.dimensions(), severity.dimensions())?;
        let width = original.width() as usize;

        let mut overlay = original.clone();
        overlay
            .par_chunks_mut(3)
            .enumerate()
            .for_each(|(i, px)| {
                let score = severity
                    .combined
                    .get((i % width) as u32, (i / width) as u32);
                let alpha = self.alpha(score);
                if alpha <= 0.0 {
                    return;
                }
                let heat = self.ramp.sample(score).channels();
                for (channel, hot) in px.iter_mut().zip(heat) {
                    let blended = *channel as f32 * (1.0 - alpha) + hot as f32 * alpha;
                    *channel = blended.round().clamp(0.0, 255.0) as u8;
                }
            });

        let outline = Rgb(self.settings.outline_color.channels());
        for region in regions {
            draw_outline(&mut overlay, region, outline);
        }
        Ok(overlay)
    }
}

fn draw_outline(canvas: &mut RgbImage, region: &Region, color: Rgb<u8>) {
    match region.contour.as_slice() {
        [] => {}
        [only] => {
            if only.x < canvas.width() && only.y < canvas.height() {
                canvas.put_pixel(only.x, only.y, color);
            }
        }
        points => {
            let closing = points.last().zip(points.first());
            for (a, b) in points.windows(2).map(|w| (&w[0], &w[1])).chain(closing) {
                draw_line_segment_mut(
                    canvas,
                    (a.x as f32, a.y as f32),
                    (b.x as f32, b.y as f32),
                    color,
                );
            }
        }
    }
}

//! Connected regions of the cleaned severity mask.

use std::collections::HashMap;

use image::{GrayImage, Luma};
use imageproc::{
    contours::{BorderType, find_contours},
    geometry::convex_hull,
    point::Point,
    region_labelling::{Connectivity, connected_components},
};
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisResult, ensure_same_dims};
use crate::score_map::{Feature, FeatureMaps, FeatureScores};

/// A pixel on a region outline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContourPoint {
    pub x: u32,
    pub y: u32,
}

/// Axis-aligned pixel bounds; `width`/`height` are inclusive pixel counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    fn around(x: u32, y: u32) -> Self {
        Self {
            left: x,
            top: y,
            width: 1,
            height: 1,
        }
    }

    fn include(&mut self, x: u32, y: u32) {
        let right = (self.left + self.width).max(x + 1);
        let bottom = (self.top + self.height).max(y + 1);
        self.left = self.left.min(x);
        self.top = self.top.min(y);
        self.width = right - self.left;
        self.height = bottom - self.top;
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.left && x < self.left + self.width && y >= self.top && y < self.top + self.height
    }
}

/// One 8-connected component of flagged pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Ordered outer boundary.
    pub contour: Vec<ContourPoint>,
    /// Number of flagged pixels in the component.
    pub area: u32,
    pub bounds: BoundingBox,
    pub dominant_feature: Feature,
    /// Mean detector scores inside the component.
    pub feature_scores: FeatureScores,
}

#[derive(Debug)]
struct Accumulator {
    area: u32,
    bounds: BoundingBox,
    sums: [f64; 4],
}

/// Label the mask, measure each component, and return regions of at least
/// `min_area` pixels sorted by area (largest first), then top, then left.
pub fn extract(mask: &GrayImage, maps: &FeatureMaps, min_area: u32) -> AnalysisResult<Vec<Region>> {
    ensure_same_dims("feature maps vs mask", mask.dimensions(), maps.dimensions()?)?;

    let labels = connected_components(mask, Connectivity::Eight, Luma([0u8]));

    let mut components: HashMap<u32, Accumulator> = HashMap::new();
    for (x, y, label) in labels.enumerate_pixels() {
        let label = label[0];
        if label == 0 {
            continue;
        }
        let acc = components.entry(label).or_insert_with(|| Accumulator {
            area: 0,
            bounds: BoundingBox::around(x, y),
            sums: [0.0; 4],
        });
        acc.area += 1;
        acc.bounds.include(x, y);
        for (slot, feature) in acc.sums.iter_mut().zip(Feature::ALL) {
            *slot += maps.get(feature).get(x, y) as f64;
        }
    }

    components.retain(|_, acc| acc.area >= min_area);
    if components.is_empty() {
        return Ok(Vec::new());
    }

    let mut outlines: HashMap<u32, Vec<ContourPoint>> = HashMap::new();
    for contour in find_contours::<i32>(mask) {
        if !matches!(contour.border_type, BorderType::Outer) {
            continue;
        }
        let Some(first) = contour.points.first() else {
            continue;
        };
        let label = labels.get_pixel(first.x as u32, first.y as u32)[0];
        if components.contains_key(&label) {
            outlines
                .entry(label)
                .or_insert_with(|| to_contour_points(&contour.points));
        }
    }

    let mut regions: Vec<(u32, Region)> = components
        .into_iter()
        .map(|(label, acc)| {
            let mut feature_scores = FeatureScores::default();
            for (sum, feature) in acc.sums.iter().zip(Feature::ALL) {
                feature_scores.set(feature, (sum / acc.area as f64) as f32);
            }
            let contour = outlines
                .remove(&label)
                .unwrap_or_else(|| hull_of(&labels, label, &acc.bounds));
            let region = Region {
                contour,
                area: acc.area,
                bounds: acc.bounds,
                dominant_feature: feature_scores.strongest(),
                feature_scores,
            };
            (label, region)
        })
        .collect();

    // Labels follow raster order, so they settle the remaining ties.
    regions.sort_by(|(la, a), (lb, b)| {
        b.area
            .cmp(&a.area)
            .then(a.bounds.top.cmp(&b.bounds.top))
            .then(a.bounds.left.cmp(&b.bounds.left))
            .then(la.cmp(lb))
    });
    Ok(regions.into_iter().map(|(_, region)| region).collect())
}

fn to_contour_points(points: &[Point<i32>]) -> Vec<ContourPoint> {
    points
        .iter()
        .map(|p| ContourPoint {
            x: p.x.max(0) as u32,
            y: p.y.max(0) as u32,
        })
        .collect()
}

/// Convex hull of a component's pixels, used when border following yields nothing.
fn hull_of(
    labels: &image::ImageBuffer<Luma<u32>, Vec<u32>>,
    label: u32,
    bounds: &BoundingBox,
) -> Vec<ContourPoint> {
    let mut pixels = Vec::new();
    for y in bounds.top..bounds.top + bounds.height {
        for x in bounds.left..bounds.left + bounds.width {
            if labels.get_pixel(x, y)[0] == label {
                pixels.push(Point::new(x as i32, y as i32));
            }
        }
    }
    to_contour_points(&convex_hull(pixels))
}

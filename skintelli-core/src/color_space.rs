//! Per-pixel HSV and luma planes derived once per analysis and shared by every detector.

use image::RgbImage;
use ndarray::Array2;
use rayon::prelude::*;
use skintelli_utils::{rec601_luma, rgb_to_hsv};

use crate::error::{AnalysisError, AnalysisResult};

/// Derived channels of one image, each stored as `[y, x]`.
///
/// Hue is in degrees `[0, 360)`, saturation and value in `[0, 1]`, and luma on the
/// 0–255 scale (Rec.601 weights).
#[derive(Debug, Clone, PartialEq)]
pub struct ColorPlanes {
    pub hue: Array2<f32>,
    pub saturation: Array2<f32>,
    pub value: Array2<f32>,
    pub luma: Array2<f32>,
}

impl ColorPlanes {
    pub fn width(&self) -> u32 {
        self.luma.ncols() as u32
    }

    pub fn height(&self) -> u32 {
        self.luma.nrows() as u32
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    /// Mean luma over the whole image.
    pub fn mean_luma(&self) -> f32 {
        self.luma.mean().unwrap_or(0.0)
    }
}

/// Reject buffers the engine cannot reason about.
pub fn ensure_valid(image: &RgbImage) -> AnalysisResult<()> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(AnalysisError::InvalidInput(format!(
            "image has zero area ({width}x{height})"
        )));
    }
    Ok(())
}

/// Convert an RGB buffer into HSV and luma planes.
pub fn transform(image: &RgbImage) -> AnalysisResult<ColorPlanes> {
    ensure_valid(image)?;
    let (width, height) = image.dimensions();
    let shape = (height as usize, width as usize);

    let pixels: Vec<[f32; 4]> = image
        .as_raw()
        .par_chunks_exact(3)
        .map(|px| {
            let (h, s, v) = rgb_to_hsv(px[0], px[1], px[2]);
            [h, s, v, rec601_luma(px[0], px[1], px[2])]
        })
        .collect();

    if pixels.len() != shape.0 * shape.1 {
        return Err(AnalysisError::InternalInconsistency(format!(
            "expected {} pixels, decoded {}",
            shape.0 * shape.1,
            pixels.len()
        )));
    }

    let plane = |channel: usize| {
        Array2::from_shape_fn(shape, |(y, x)| pixels[y * shape.1 + x][channel])
    };

    Ok(ColorPlanes {
        hue: plane(0),
        saturation: plane(1),
        value: plane(2),
        luma: plane(3),
    })
}

//! Image loading, caller-side validation, and model tensor layout.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use log::warn;
use image::{DynamicImage, GenericImageView, RgbImage, imageops::FilterType};
use ndarray::Array4;
use thiserror::Error;

use crate::quality::assess_sharpness;

/// File extensions accepted for analysis.
pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "bmp"];

/// Bounds an image must satisfy before it is handed to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageLimits {
    pub max_file_bytes: u64,
    pub min_dimensions: (u32, u32),
    pub max_dimensions: (u32, u32),
}

impl Default for ImageLimits {
    fn default() -> Self {
        Self {
            max_file_bytes: 50 * 1024 * 1024,
            min_dimensions: (64, 64),
            max_dimensions: (4096, 4096),
        }
    }
}

/// Reasons an input file is rejected before analysis.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("unsupported format '{0}' (supported: jpg, jpeg, png, bmp)")]
    UnsupportedFormat(String),

    #[error("file is empty")]
    EmptyFile,

    #[error("file too large: {size} bytes (max {max} bytes)")]
    FileTooLarge { size: u64, max: u64 },

    #[error("image too small: {width}x{height} (min {min_width}x{min_height})")]
    TooSmall {
        width: u32,
        height: u32,
        min_width: u32,
        min_height: u32,
    },

    #[error("image too large: {width}x{height} (max {max_width}x{max_height})")]
    TooLarge {
        width: u32,
        height: u32,
        max_width: u32,
        max_height: u32,
    },
}

/// Returns `true` when the path carries one of [`SUPPORTED_EXTENSIONS`].
pub fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Check extension and file size without decoding the image.
pub fn validate_file(path: &Path, limits: &ImageLimits) -> Result<()> {
    if !has_supported_extension(path) {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_string();
        return Err(ValidationError::UnsupportedFormat(ext).into());
    }

    let size = fs::metadata(path)
        .with_context(|| format!("failed to stat {}", path.display()))?
        .len();
    if size == 0 {
        return Err(ValidationError::EmptyFile.into());
    }
    if size > limits.max_file_bytes {
        return Err(ValidationError::FileTooLarge {
            size,
            max: limits.max_file_bytes,
        }
        .into());
    }
    Ok(())
}

/// Check decoded dimensions against the limits.
pub fn validate_dimensions(
    (width, height): (u32, u32),
    limits: &ImageLimits,
) -> Result<(), ValidationError> {
    let (min_width, min_height) = limits.min_dimensions;
    let (max_width, max_height) = limits.max_dimensions;
    if width < min_width || height < min_height {
        return Err(ValidationError::TooSmall {
            width,
            height,
            min_width,
            min_height,
        });
    }
    if width > max_width || height > max_height {
        return Err(ValidationError::TooLarge {
            width,
            height,
            max_width,
            max_height,
        });
    }
    Ok(())
}

/// Load an image from disk into memory.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<DynamicImage> {
    let path_ref = path.as_ref();
    image::open(path_ref).with_context(|| format!("failed to open image {}", path_ref.display()))
}

/// Validate, decode, and convert a file into the engine's RGB input buffer.
///
/// Blurry photos are accepted with a warning.
pub fn load_validated_rgb(path: &Path, limits: &ImageLimits) -> Result<RgbImage> {
    validate_file(path, limits)?;
    let image = load_image(path)?;
    validate_dimensions(image.dimensions(), limits)
        .with_context(|| format!("rejected {}", path.display()))?;
    let rgb = image.to_rgb8();
    let sharpness = assess_sharpness(&rgb);
    if sharpness.blurry {
        warn!(
            "{} looks blurry (clarity score {:.1}); results may be unreliable",
            path.display(),
            sharpness.variance
        );
    }
    Ok(rgb)
}

/// Resize to an exact resolution (aspect ratio is not preserved).
pub fn resize_rgb(image: &RgbImage, width: u32, height: u32) -> RgbImage {
    image::imageops::resize(image, width, height, FilterType::Triangle)
}

/// Convert an RGB image into an NHWC `[1, H, W, 3]` array scaled to `[0, 1]`.
pub fn rgb_to_nhwc_unit(image: &RgbImage) -> Array4<f32> {
    let (width, height) = image.dimensions();
    let mut array = Array4::<f32>::zeros((1, height as usize, width as usize, 3));
    for (x, y, pixel) in image.enumerate_pixels() {
        for (c, value) in pixel.0.iter().enumerate() {
            array[(0, y as usize, x as usize, c)] = *value as f32 / 255.0;
        }
    }
    array
}

//! Helpers for writing overlay images and JSON reports.

use std::{
    fs::{self, File},
    io::BufWriter,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use image::{ExtendedColorType, ImageEncoder, RgbImage, codecs::jpeg::JpegEncoder};
use log::debug;
use serde::Serialize;

/// Output encodings supported for overlays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormatHint {
    #[default]
    Png,
    Jpeg,
    Bmp,
}

impl ImageFormatHint {
    /// Determine format from a path's extension, defaulting to PNG.
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse().ok())
            .unwrap_or_default()
    }
}

impl std::str::FromStr for ImageFormatHint {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "bmp" => Ok(Self::Bmp),
            other => Err(format!("unknown image format '{other}'")),
        }
    }
}

/// Build `dir/<stem><suffix>.<ext>` for a source image path.
pub fn derived_output_path(source: &Path, dir: &Path, suffix: &str, ext: &str) -> PathBuf {
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image");
    dir.join(format!("{stem}{suffix}.{ext}"))
}

/// Save an RGB image, choosing the encoder from the file extension.
pub fn save_rgb_image(image: &RgbImage, path: &Path, jpeg_quality: u8) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    match ImageFormatHint::from_path(path) {
        ImageFormatHint::Jpeg => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            let encoder = JpegEncoder::new_with_quality(BufWriter::new(file), jpeg_quality.clamp(1, 100));
            encoder
                .write_image(
                    image.as_raw(),
                    image.width(),
                    image.height(),
                    ExtendedColorType::Rgb8,
                )
                .with_context(|| format!("failed to encode JPEG {}", path.display()))?;
        }
        ImageFormatHint::Png | ImageFormatHint::Bmp => {
            image
                .save(path)
                .with_context(|| format!("failed to save image {}", path.display()))?;
        }
    }
    debug!("wrote {}", path.display());
    Ok(())
}

/// Write a value as pretty-printed JSON, creating parent directories.
pub fn write_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)
        .with_context(|| format!("failed to write JSON to {}", path.display()))?;
    Ok(())
}

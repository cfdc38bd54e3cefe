//! Common helpers shared across Skintelli crates.

/// Color conversions and the severity color ramp.
pub mod color;
/// Application settings and their JSON persistence.
pub mod config;
/// Image loading, validation and tensor layout.
pub mod image_utils;
/// Overlay and report writers.
pub mod output;
/// Blur detection by Laplacian variance.
pub mod quality;
/// Instrumentation helpers for optional performance tracing.
pub mod telemetry;

use std::path::Path;

use anyhow::Result;
use log::LevelFilter;

pub use color::{ColorRamp, RgbColor, parse_hex_color, rec601_luma, rgb_to_hsv};
pub use image_utils::{
    ImageLimits, SUPPORTED_EXTENSIONS, ValidationError, has_supported_extension,
    load_image, load_validated_rgb, resize_rgb, rgb_to_nhwc_unit, validate_dimensions,
    validate_file,
};
pub use output::{ImageFormatHint, derived_output_path, save_rgb_image, write_json};
pub use quality::{BLUR_THRESHOLD, Sharpness, assess_sharpness, laplacian_variance};
pub use telemetry::{
    StageTimings, TimingGuard, configure as configure_telemetry, telemetry_allows,
    telemetry_enabled, timing_guard,
};

/// Initialize logging once.
///
/// `RUST_LOG` takes precedence; otherwise `default_filter` applies. The telemetry
/// target is always let through so [`telemetry::configure`] alone decides whether
/// timings are printed.
pub fn init_logging(default_filter: LevelFilter) -> Result<()> {
    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_filter.as_str()),
    );
    builder.filter_module(telemetry::TELEMETRY_TARGET, LevelFilter::Trace);

    // A second call (tests, embedding apps) finds the logger already installed.
    let _ = builder.try_init();
    Ok(())
}

/// Validate that a path exists and resolve it to an absolute path.
pub fn normalize_path<P: AsRef<Path>>(path: P) -> Result<std::path::PathBuf> {
    let path = path.as_ref();
    anyhow::ensure!(path.exists(), "path does not exist: {}", path.display());
    Ok(path.canonicalize()?)
}

//! Configuration loading and CLI override logic.

use std::path::PathBuf;

use anyhow::{Context, Result};
use log::{info, warn};
use skintelli_utils::{
    RgbColor,
    config::{AppSettings, default_settings_path},
    normalize_path,
};

use crate::args::AnalyzeArgs;

/// Resolve the settings for this run.
///
/// An explicit `--config` must exist. Without one, `config/skintelli.json` is used
/// when present and the built-in defaults otherwise.
pub fn load_settings(config_path: Option<&PathBuf>) -> Result<AppSettings> {
    let source = match config_path {
        Some(path) => normalize_path(path)?,
        None => {
            let fallback = default_settings_path();
            if !fallback.is_file() {
                return Ok(AppSettings::default());
            }
            fallback
        }
    };
    let settings = AppSettings::load_from_path(&source)
        .with_context(|| format!("settings file {} is invalid", source.display()))?;
    info!("Using settings from {}", source.display());
    Ok(settings)
}

/// Apply command-line arguments to override loaded or default settings.
pub fn apply_cli_overrides(settings: &mut AppSettings, args: &AnalyzeArgs) {
    if let Some(strategy) = args.strategy {
        settings.strategy = strategy;
    }
    if let Some(model) = args.model.as_ref() {
        settings.model.model_path = Some(model.to_string_lossy().into_owned());
    }
    if let Some(tiles) = args.tiles {
        settings.model.tiles = tiles;
    }
    if let Some(threshold) = args.mask_threshold {
        settings.composite.mask_threshold = threshold;
    }
    if let Some(area) = args.min_region_area {
        settings.composite.min_region_area = area;
    }
    if let Some(ref color) = args.outline_color {
        match color.parse::<RgbColor>() {
            Ok(parsed) => settings.render.outline_color = parsed,
            Err(err) => warn!("ignoring --outline-color: {err}"),
        }
    }

    settings.telemetry.enabled |= args.telemetry;
    match args.telemetry_level.as_deref().map(str::trim) {
        Some("") | None => {}
        Some(level) if level.eq_ignore_ascii_case("off") => {
            settings.telemetry.level = "off".into();
            settings.telemetry.enabled = false;
        }
        Some(level) => settings.telemetry.level = level.to_ascii_lowercase(),
    }

    settings.sanitize();
}

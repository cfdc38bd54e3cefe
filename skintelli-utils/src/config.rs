//! Shared configuration types consumed across the Skintelli workspace.
//!
//! The per-detector thresholds below are calibration parameters: they were tuned
//! against sample captures and are expected to move. The severity tier
//! boundaries are not configurable and live next to the tier classifier in
//! `skintelli-core`.

use crate::color::RgbColor;

use anyhow::{Context, Result};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::{
    env, fmt, fs,
    path::{Path, PathBuf},
    str::FromStr,
};

/// Which analysis implementation a caller wants to construct.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStrategy {
    /// Per-pixel color/luma/texture heuristics.
    #[default]
    Heuristic,
    /// Tiled inference through an ONNX lesion classifier.
    Model,
}

impl AnalysisStrategy {
    pub fn as_label(self) -> &'static str {
        match self {
            AnalysisStrategy::Heuristic => "heuristic",
            AnalysisStrategy::Model => "model",
        }
    }
}

impl fmt::Display for AnalysisStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

impl FromStr for AnalysisStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "heuristic" | "heuristics" => Ok(AnalysisStrategy::Heuristic),
            "model" | "onnx" => Ok(AnalysisStrategy::Model),
            other => Err(format!(
                "invalid analysis strategy '{other}'; expected 'heuristic' or 'model'"
            )),
        }
    }
}

/// Redness (inflammation) detector thresholds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RednessSettings {
    /// Half width of the red hue band in degrees, measured from 0°/360°.
    pub hue_half_width: f32,
    /// Minimum HSV saturation (0..1) for a pixel to count as red.
    pub min_saturation: f32,
    /// Minimum HSV value (0..1); very dark pixels have unreliable hue.
    pub min_value: f32,
    /// Margin (8-bit units) by which red must exceed green and blue on top of the
    /// image-wide mean dominance.
    pub channel_margin: f32,
    /// Dominance excess (8-bit units) that maps to a full dominance score.
    pub dominance_range: f32,
}

impl Default for RednessSettings {
    fn default() -> Self {
        Self {
            hue_half_width: 18.0,
            min_saturation: 0.2,
            min_value: 0.2,
            channel_margin: 20.0,
            dominance_range: 100.0,
        }
    }
}

/// Thresholds for the luma-relative spot detectors (dark and light).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LumaSpotSettings {
    /// Distance from the mean luma (0..255) before the score starts rising.
    pub threshold: f32,
    /// Additional distance over which the score ramps from 0 to 1.
    pub range: f32,
}

impl Default for LumaSpotSettings {
    fn default() -> Self {
        Self {
            threshold: 40.0,
            range: 40.0,
        }
    }
}

/// Texture (roughness) detector thresholds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TextureSettings {
    /// Side length of the square window used for the local variance.
    pub window: usize,
    /// Laplacian variance below which a neighbourhood counts as smooth.
    pub baseline: f32,
    /// Variance above the baseline that maps to a full texture score.
    pub range: f32,
}

impl Default for TextureSettings {
    fn default() -> Self {
        Self {
            window: 8,
            baseline: 400.0,
            range: 1600.0,
        }
    }
}

/// Parameters for all four feature detectors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct DetectorSettings {
    pub redness: RednessSettings,
    pub dark_spot: LumaSpotSettings,
    pub light_spot: LumaSpotSettings,
    pub texture: TextureSettings,
}

/// Mask compositing, cleanup and region filtering.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CompositeSettings {
    /// Combined score a pixel must exceed to enter the candidate mask.
    pub mask_threshold: f32,
    /// Radius of the square structuring element used for closing/opening.
    pub morph_radius: u8,
    /// Mean severity at or above which an image is at least `Medium`.
    pub high_intensity_cutoff: f64,
    /// Connected components smaller than this many pixels are discarded.
    pub min_region_area: u32,
}

impl Default for CompositeSettings {
    fn default() -> Self {
        Self {
            mask_threshold: 0.3,
            morph_radius: 1,
            high_intensity_cutoff: 0.75,
            min_region_area: 100,
        }
    }
}

/// Heatmap overlay appearance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderSettings {
    /// Opacity of the heatmap at full strength (0..1).
    pub blend_alpha: f32,
    /// Scores below this value fade towards fully transparent.
    pub fade_in: f32,
    /// Color used for region outlines.
    pub outline_color: RgbColor,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            blend_alpha: 0.4,
            fade_in: 0.1,
            outline_color: RgbColor::new(0, 255, 0),
        }
    }
}

/// Settings for the ONNX classifier strategy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelSettings {
    /// Path to the ONNX classifier.
    pub model_path: Option<String>,
    /// Model input width in pixels.
    pub input_width: u32,
    /// Model input height in pixels.
    pub input_height: u32,
    /// The image is split into `tiles × tiles` patches for localisation.
    pub tiles: u32,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            model_path: Some("models/skin_disease_model.onnx".into()),
            input_width: 224,
            input_height: 224,
            tiles: 4,
        }
    }
}

/// Settings controlling optional runtime telemetry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySettings {
    /// Whether telemetry timing logs are enabled.
    pub enabled: bool,
    /// Logging level for telemetry output (error, warn, info, debug, trace).
    pub level: String,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            level: "debug".to_string(),
        }
    }
}

impl TelemetrySettings {
    /// Resolve the configured level string into a `LevelFilter`.
    pub fn level_filter(&self) -> LevelFilter {
        self.level
            .trim()
            .parse::<LevelFilter>()
            .unwrap_or(LevelFilter::Debug)
    }
}

/// Persistent settings consumed by the CLI and by analyzer construction.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppSettings {
    /// Which analyzer to build.
    pub strategy: AnalysisStrategy,
    pub detectors: DetectorSettings,
    pub composite: CompositeSettings,
    pub render: RenderSettings,
    pub model: ModelSettings,
    pub telemetry: TelemetrySettings,
}

impl AppSettings {
    /// Load settings from a JSON file. Missing sections fall back to defaults.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file {}", path.display()))?;
        let mut settings: AppSettings = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse settings JSON at {}", path.display()))?;

        if settings.model.model_path.is_none() {
            settings.model.model_path = ModelSettings::default().model_path;
        }
        settings.sanitize();

        Ok(settings)
    }

    /// Serialize settings to disk in pretty-printed JSON, overwriting any existing file.
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let payload =
            serde_json::to_string_pretty(self).context("failed to serialize settings JSON")?;
        fs::write(path, payload)
            .with_context(|| format!("failed to write settings file {}", path.display()))?;
        Ok(())
    }

    /// Clamp values that would make the pipeline degenerate.
    pub fn sanitize(&mut self) {
        let texture = &mut self.detectors.texture;
        texture.window = texture.window.max(1);
        texture.range = texture.range.max(f32::EPSILON);
        for spot in [&mut self.detectors.dark_spot, &mut self.detectors.light_spot] {
            spot.threshold = spot.threshold.max(0.0);
            spot.range = spot.range.max(f32::EPSILON);
        }
        let redness = &mut self.detectors.redness;
        redness.hue_half_width = redness.hue_half_width.clamp(f32::EPSILON, 180.0);
        redness.dominance_range = redness.dominance_range.max(f32::EPSILON);

        self.composite.mask_threshold = self.composite.mask_threshold.clamp(0.0, 1.0);
        self.render.blend_alpha = self.render.blend_alpha.clamp(0.0, 1.0);
        self.render.fade_in = self.render.fade_in.max(f32::EPSILON);
        self.model.tiles = self.model.tiles.max(1);
    }
}

/// Returns the default path for persisted settings (`config/skintelli.json`).
pub fn default_settings_path() -> PathBuf {
    env::current_dir()
        .map(|dir| dir.join("config/skintelli.json"))
        .unwrap_or_else(|_| PathBuf::from("config/skintelli.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn default_settings_round_trip() {
        let file = NamedTempFile::new().expect("tempfile");
        let settings = AppSettings::default();
        settings.save_to_path(file.path()).expect("save");

        let loaded = AppSettings::load_from_path(file.path()).expect("load");
        assert_eq!(loaded.strategy, settings.strategy);
        assert_eq!(loaded.detectors, settings.detectors);
        assert_eq!(loaded.composite, settings.composite);
        assert_eq!(loaded.render, settings.render);
        assert_eq!(loaded.model, settings.model);
        assert_eq!(loaded.telemetry.level, settings.telemetry.level);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let file = NamedTempFile::new().expect("tempfile");
        let json = r#"{
            "strategy": "model",
            "composite": { "mask_threshold": 0.45 },
            "model": { "tiles": 0 }
        }"#;
        fs::write(file.path(), json).expect("write custom settings");

        let loaded = AppSettings::load_from_path(file.path()).expect("load");
        assert_eq!(loaded.strategy, AnalysisStrategy::Model);
        assert_eq!(loaded.composite.mask_threshold, 0.45);
        assert_eq!(loaded.composite.min_region_area, 100);
        assert_eq!(loaded.detectors.texture.window, 8);
        assert_eq!(loaded.model.tiles, 1, "sanitize should clamp tiles to 1");
        assert!(loaded.model.model_path.is_some());
        assert!(!loaded.telemetry.enabled);
    }

    #[test]
    fn strategy_parses_aliases() {
        assert_eq!("Heuristic".parse::<AnalysisStrategy>(), Ok(AnalysisStrategy::Heuristic));
        assert_eq!(" onnx ".parse::<AnalysisStrategy>(), Ok(AnalysisStrategy::Model));
        assert!("random".parse::<AnalysisStrategy>().is_err());
        assert_eq!(AnalysisStrategy::Model.to_string(), "model");
    }

    #[test]
    fn telemetry_level_parses_variants() {
        let telemetry = TelemetrySettings {
            level: "TRACE".into(),
            ..TelemetrySettings::default()
        };
        assert_eq!(telemetry.level_filter(), LevelFilter::Trace);

        let telemetry = TelemetrySettings {
            level: "nonsense".into(),
            ..TelemetrySettings::default()
        };
        assert_eq!(telemetry.level_filter(), LevelFilter::Debug);
    }
}

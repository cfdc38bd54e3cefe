//! Command-line argument definitions for skintelli.

use clap::{ArgAction, Parser};
use skintelli_utils::config::AnalysisStrategy;
use std::path::PathBuf;

/// Analyze skin photographs for redness, dark and light spots, and rough texture.
#[derive(Debug, Parser)]
#[command(name = "skintelli", author, version, about)]
pub struct AnalyzeArgs {
    /// Path to an image file or a directory containing images.
    #[arg(short, long)]
    pub input: PathBuf,

    /// Optional settings JSON. Defaults to `config/skintelli.json` when present, otherwise built-in parameters.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Analysis strategy (heuristic or model). Overrides the settings file.
    #[arg(long, value_parser = parse_strategy)]
    pub strategy: Option<AnalysisStrategy>,

    /// Path to the lesion classifier ONNX model. Implies nothing about the strategy by itself.
    #[arg(short, long)]
    pub model: Option<PathBuf>,

    /// Grid size for tiled model inference.
    #[arg(long)]
    pub tiles: Option<u32>,

    /// Combined score a pixel must exceed to be flagged.
    #[arg(long)]
    pub mask_threshold: Option<f32>,

    /// Minimum area, in pixels, for a reported region.
    #[arg(long)]
    pub min_region_area: Option<u32>,

    /// Region outline color for overlays (`#RGB` or `#RRGGBB`).
    #[arg(long, value_name = "HEX")]
    pub outline_color: Option<String>,

    /// Write the JSON report to this file instead of stdout.
    #[arg(long)]
    pub json: Option<PathBuf>,

    /// Directory for heatmap overlays (`<stem>_heatmap.<ext>`). Overlays are skipped when absent.
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Overlay image format (png, jpg, bmp).
    #[arg(long, default_value = "png")]
    pub overlay_format: String,

    /// JPEG quality for overlays written as JPEG.
    #[arg(long, default_value_t = 90, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub jpeg_quality: u8,

    /// Include a plain-language explanation in each record.
    #[arg(long, action = ArgAction::SetTrue)]
    pub explain: bool,

    /// Knowledge base JSON used for explanations. Built-in entries are used otherwise.
    #[arg(long, requires = "explain")]
    pub knowledge_base: Option<PathBuf>,

    /// Include per-stage timings (milliseconds) in each record.
    #[arg(long, action = ArgAction::SetTrue)]
    pub timings: bool,

    /// Skip file size and dimension checks before analysis.
    #[arg(long, action = ArgAction::SetTrue)]
    pub no_validate: bool,

    /// Enable telemetry timing logs (defaults to settings file).
    #[arg(long, action = ArgAction::SetTrue)]
    pub telemetry: bool,

    /// Override telemetry logging level (error, warn, info, debug, trace).
    #[arg(long, value_name = "LEVEL")]
    pub telemetry_level: Option<String>,
}

fn parse_strategy(value: &str) -> Result<AnalysisStrategy, String> {
    value.parse::<AnalysisStrategy>()
}

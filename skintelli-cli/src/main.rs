mod analyzer;
mod args;
mod config;
mod input;
mod report;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use rayon::prelude::*;
use skintelli_core::{DiagnosisSignal, DiagnosisSynthesizer, KnowledgeBase, SkinAnalyzer};
use skintelli_utils::{
    ImageFormatHint, ImageLimits, StageTimings, configure_telemetry, derived_output_path,
    init_logging, load_image, load_validated_rgb, normalize_path, save_rgb_image, write_json,
};

use crate::{
    analyzer::select_analyzer,
    args::AnalyzeArgs,
    config::{apply_cli_overrides, load_settings},
    input::collect_images,
    report::{BatchReport, ImageReport},
};

/// Per-run options shared by every image.
struct RunOptions<'a> {
    limits: Option<ImageLimits>,
    overlay_dir: Option<&'a Path>,
    overlay_ext: &'static str,
    jpeg_quality: u8,
    knowledge: &'a KnowledgeBase,
    explain: bool,
    timings: bool,
}

fn main() -> Result<()> {
    init_logging(log::LevelFilter::Info)?;
    let args = AnalyzeArgs::parse();

    let input = normalize_path(&args.input)?;
    let mut settings = load_settings(args.config.as_ref())?;
    apply_cli_overrides(&mut settings, &args);
    configure_telemetry(
        settings.telemetry.enabled,
        settings.telemetry.level_filter(),
    );

    let overlay_format: ImageFormatHint = args
        .overlay_format
        .parse()
        .map_err(anyhow::Error::msg)?;
    let knowledge = match args.knowledge_base.as_ref() {
        Some(path) => KnowledgeBase::load_from_path(normalize_path(path)?)?,
        None => KnowledgeBase::default(),
    };

    let analyzer = select_analyzer(&settings);
    let images = collect_images(&input)?;
    info!("Analyzing {} image(s) from {}", images.len(), input.display());

    let options = RunOptions {
        limits: (!args.no_validate).then(ImageLimits::default),
        overlay_dir: args.output_dir.as_deref(),
        overlay_ext: overlay_extension(overlay_format),
        jpeg_quality: args.jpeg_quality,
        knowledge: &knowledge,
        explain: args.explain,
        timings: args.timings,
    };

    let outcomes: Vec<(PathBuf, Result<ImageReport>)> = images
        .par_iter()
        .map(|path| (path.clone(), analyze_image(path, analyzer.as_ref(), &options)))
        .collect();

    let mut reports = Vec::with_capacity(outcomes.len());
    let mut failed = 0usize;
    for (path, outcome) in outcomes {
        match outcome {
            Ok(report) => reports.push(report),
            Err(err) => {
                failed += 1;
                warn!("Failed to analyze {}: {err:#}", path.display());
            }
        }
    }

    if reports.is_empty() {
        anyhow::bail!("no images were analyzed successfully");
    }

    let batch = BatchReport::new(reports, failed);
    info!(
        "Analyzed {} image(s), {} flagged, {} failed",
        batch.analyzed, batch.flagged, batch.failed
    );

    if let Some(json_path) = args.json.as_ref() {
        write_json(&batch, json_path)?;
        info!("Wrote report to {}", json_path.display());
    } else {
        println!("{}", serde_json::to_string_pretty(&batch)?);
    }

    Ok(())
}

fn analyze_image(
    path: &Path,
    analyzer: &dyn SkinAnalyzer,
    options: &RunOptions<'_>,
) -> Result<ImageReport> {
    let image = match options.limits.as_ref() {
        Some(limits) => load_validated_rgb(path, limits)?,
        None => load_image(path)?.to_rgb8(),
    };

    let mut timings = StageTimings::new();
    let result = analyzer
        .analyze_with_timings(&image, &mut timings)
        .with_context(|| format!("analysis failed for {}", path.display()))?;

    let synthesizer = DiagnosisSynthesizer::new(options.knowledge);
    let signal = DiagnosisSignal::from_result(&result);
    info!("{}: {}", path.display(), synthesizer.summary(&signal));

    let overlay_path = match options.overlay_dir {
        Some(dir) => {
            let target = derived_output_path(path, dir, "_heatmap", options.overlay_ext);
            save_rgb_image(&result.overlay, &target, options.jpeg_quality)?;
            Some(target)
        }
        None => None,
    };

    let mut report = ImageReport::new(path, result).with_overlay(overlay_path);
    if options.explain {
        report.explanation = Some(synthesizer.explain(&signal));
    }
    if options.timings {
        report.timings_ms = Some(timings.to_millis());
    }
    Ok(report)
}

fn overlay_extension(format: ImageFormatHint) -> &'static str {
    match format {
        ImageFormatHint::Png => "png",
        ImageFormatHint::Jpeg => "jpg",
        ImageFormatHint::Bmp => "bmp",
    }
}

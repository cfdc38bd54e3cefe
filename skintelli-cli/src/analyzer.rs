//! Analyzer construction with heuristic fallback.

use log::{info, warn};
use skintelli_core::{HeuristicAnalyzer, SkinAnalyzer, build_analyzer};
use skintelli_utils::config::{AnalysisStrategy, AppSettings};

/// Build the configured analyzer. A model that cannot be loaded degrades to the
/// heuristic strategy instead of aborting the run.
pub fn select_analyzer(settings: &AppSettings) -> Box<dyn SkinAnalyzer> {
    match build_analyzer(settings) {
        Ok(analyzer) => {
            info!("Using {} analysis", analyzer.strategy());
            analyzer
        }
        Err(err) => {
            warn!(
                "{} strategy unavailable ({err:#}); falling back to {}",
                settings.strategy,
                AnalysisStrategy::Heuristic
            );
            Box::new(HeuristicAnalyzer::from_settings(settings))
        }
    }
}

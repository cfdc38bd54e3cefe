//! Plain-language explanations of an analysis result.
//!
//! The synthesizer is pure templating over a [`KnowledgeBase`] that the caller
//! owns and passes in; there is no global lookup table.

use std::{
    collections::BTreeMap,
    fmt::Write,
    fs,
    path::Path,
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::analyzer::DetectionResult;
use crate::compositor::SeverityTier;
use crate::model::{Classification, LesionClass};
use crate::score_map::Feature;

/// Reference text for one lesion class.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConditionInfo {
    pub description: String,
    pub characteristics: Vec<String>,
    pub risk_factors: Vec<String>,
    pub recommendation: String,
}

/// Findings and advice for one severity tier.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TierGuidance {
    pub findings: Vec<String>,
    pub recommendation: String,
}

/// Text the synthesizer draws from. Loadable from JSON; missing sections fall
/// back to the built-in entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeBase {
    /// Keyed by lesion class display name (e.g. `"Basal Cell Carcinoma"`).
    pub conditions: BTreeMap<String, ConditionInfo>,
    pub tiers: BTreeMap<SeverityTier, TierGuidance>,
    /// Short phrase describing each visual cue.
    pub features: BTreeMap<Feature, String>,
    pub healthy_message: String,
    pub disclaimer: String,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn condition(
    description: &str,
    characteristics: &[&str],
    risk_factors: &[&str],
    recommendation: &str,
) -> ConditionInfo {
    ConditionInfo {
        description: description.into(),
        characteristics: strings(characteristics),
        risk_factors: strings(risk_factors),
        recommendation: recommendation.into(),
    }
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        let conditions = BTreeMap::from([
            (
                LesionClass::Melanoma.name().to_string(),
                condition(
                    "Most serious type of skin cancer with the highest mortality rate.",
                    &[
                        "Irregular borders",
                        "Multiple colors (brown, black, tan, red)",
                        "Size larger than a pencil eraser",
                        "Asymmetrical shape",
                    ],
                    &["Excessive sun exposure", "Fair skin tone", "Family history"],
                    "Urgent dermatology consultation recommended.",
                ),
            ),
            (
                LesionClass::BasalCellCarcinoma.name().to_string(),
                condition(
                    "Most common type of skin cancer; grows slowly.",
                    &[
                        "Waxy, translucent bump",
                        "Pearly appearance",
                        "Bleeding or oozing center",
                    ],
                    &["Chronic sun exposure", "Light skin", "Age over 40"],
                    "Schedule a dermatology appointment. Usually treatable with a high success rate.",
                ),
            ),
            (
                LesionClass::SquamousCellCarcinoma.name().to_string(),
                condition(
                    "Second most common skin cancer; may spread if untreated.",
                    &[
                        "Red or pink bump",
                        "Scaly or crusted surface",
                        "Tender when touched",
                    ],
                    &["Sun exposure", "Immunosuppression", "Age over 50"],
                    "Medical evaluation recommended. Early treatment improves outcomes.",
                ),
            ),
            (
                LesionClass::BenignKeratosis.name().to_string(),
                condition(
                    "Common, non-cancerous skin growth.",
                    &[
                        "Brown, black or tan waxy bumps",
                        "Raised and scaly appearance",
                        "Well-defined borders",
                    ],
                    &["Age", "Genetics", "Sun exposure"],
                    "Generally benign; no treatment necessary unless for cosmetic reasons.",
                ),
            ),
            (
                LesionClass::Nevus.name().to_string(),
                condition(
                    "Common mole, typically benign.",
                    &[
                        "Brown, tan or flesh-colored",
                        "Round or oval shape",
                        "Uniform color",
                    ],
                    &["Genetics", "Sun exposure"],
                    "Regular monitoring recommended. Watch for changes in size, color or shape.",
                ),
            ),
        ]);

        let tiers = BTreeMap::from([
            (
                SeverityTier::Low,
                TierGuidance {
                    findings: strings(&[
                        "Slight redness or irritation",
                        "Minor discoloration",
                        "Small blemishes or spots",
                    ]),
                    recommendation: "Monitor the area. Consult a dermatologist if symptoms persist or worsen."
                        .into(),
                },
            ),
            (
                SeverityTier::Medium,
                TierGuidance {
                    findings: strings(&[
                        "Inflammation or redness",
                        "Texture irregularities",
                        "Visible lesions or rash",
                        "Color variations",
                    ]),
                    recommendation: "Medical evaluation recommended. Please consult a dermatologist."
                        .into(),
                },
            ),
            (
                SeverityTier::High,
                TierGuidance {
                    findings: strings(&[
                        "Extensive inflammation",
                        "Large affected areas",
                        "Multiple concerning features",
                    ]),
                    recommendation: "URGENT: seek immediate medical attention from a dermatologist."
                        .into(),
                },
            ),
        ]);

        let features = BTreeMap::from([
            (Feature::Redness, "redness or inflammation".to_string()),
            (Feature::DarkSpot, "darker pigmented spots".to_string()),
            (Feature::LightSpot, "lighter, depigmented patches".to_string()),
            (Feature::Texture, "rough or irregular texture".to_string()),
        ]);

        Self {
            conditions,
            tiers,
            features,
            healthy_message: "No significant skin abnormalities detected. Skin appears healthy."
                .into(),
            disclaimer: "Note: this is an automated preliminary analysis. Always consult a qualified healthcare professional for diagnosis and treatment."
                .into(),
        }
    }
}

impl KnowledgeBase {
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read knowledge base {}", path.display()))?;
        serde_json::from_str(&data)
            .with_context(|| format!("failed to parse knowledge base {}", path.display()))
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
        let data = serde_json::to_string_pretty(self)?;
        fs::write(path, data)
            .with_context(|| format!("failed to write knowledge base {}", path.display()))?;
        Ok(())
    }

    pub fn condition(&self, class: LesionClass) -> Option<&ConditionInfo> {
        self.conditions.get(class.name())
    }
}

/// The parts of a result an explanation is built from.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosisSignal {
    pub tier: SeverityTier,
    pub affected_percentage: f64,
    pub region_count: usize,
    /// Non-zero features, strongest first.
    pub dominant_features: Vec<(Feature, f32)>,
    pub classification: Option<Classification>,
}

impl DiagnosisSignal {
    pub fn from_result(result: &DetectionResult) -> Self {
        Self {
            tier: result.tier,
            affected_percentage: result.affected_percentage(),
            region_count: result.regions.len(),
            dominant_features: result.dominant_features(),
            classification: result.classification.clone(),
        }
    }
}

/// Renders explanations from a borrowed knowledge base.
#[derive(Debug, Clone, Copy)]
pub struct DiagnosisSynthesizer<'kb> {
    kb: &'kb KnowledgeBase,
}

impl<'kb> DiagnosisSynthesizer<'kb> {
    pub fn new(kb: &'kb KnowledgeBase) -> Self {
        Self { kb }
    }

    /// Full multi-paragraph explanation.
    pub fn explain(&self, signal: &DiagnosisSignal) -> String {
        let mut out = String::new();
        if signal.tier == SeverityTier::None {
            out.push_str(&self.kb.healthy_message);
        } else {
            self.write_severity(&mut out, signal);
        }

        if let Some(classification) = &signal.classification {
            out.push_str("\n\n");
            self.write_classification(&mut out, classification);
        }

        if signal.tier != SeverityTier::None || signal.classification.is_some() {
            let _ = write!(out, "\n\n{}", self.kb.disclaimer);
        }
        out
    }

    /// One line suitable for logs and tables.
    pub fn summary(&self, signal: &DiagnosisSignal) -> String {
        let mut line = format!(
            "{} severity, {:.1}% affected",
            signal.tier, signal.affected_percentage
        );
        if let Some((feature, _)) = signal.dominant_features.first() {
            let _ = write!(line, ", mostly {}", self.feature_phrase(*feature));
        }
        if let Some(c) = &signal.classification {
            let _ = write!(line, "; {} ({:.1}%)", c.diagnosis, c.confidence * 100.0);
        }
        line
    }

    fn feature_phrase(&self, feature: Feature) -> &str {
        self.kb
            .features
            .get(&feature)
            .map(String::as_str)
            .unwrap_or(feature.label())
    }

    fn write_severity(&self, out: &mut String, signal: &DiagnosisSignal) {
        let _ = writeln!(
            out,
            "Detected potential skin abnormalities in {:.1}% of the examined area ({} region{}).",
            signal.affected_percentage,
            signal.region_count,
            if signal.region_count == 1 { "" } else { "s" }
        );
        let _ = writeln!(out, "\nSeverity: {}", signal.tier.label().to_uppercase());

        let guidance = self.kb.tiers.get(&signal.tier);
        if let Some(guidance) = guidance.filter(|g| !g.findings.is_empty()) {
            out.push_str("Findings may include:\n");
            for finding in &guidance.findings {
                let _ = writeln!(out, "- {finding}");
            }
        }

        if !signal.dominant_features.is_empty() {
            out.push_str("Most prominent cues:\n");
            for (feature, score) in &signal.dominant_features {
                let _ = writeln!(out, "- {} (score {:.2})", self.feature_phrase(*feature), score);
            }
        }

        if let Some(guidance) = guidance.filter(|g| !g.recommendation.is_empty()) {
            let _ = write!(out, "\nRecommendation: {}", guidance.recommendation);
        }
        let trimmed = out.trim_end().len();
        out.truncate(trimmed);
    }

    fn write_classification(&self, out: &mut String, classification: &Classification) {
        let _ = write!(
            out,
            "The classifier identified this lesion as {} with {:.1}% confidence.",
            classification.diagnosis,
            classification.confidence * 100.0
        );
        let Some(info) = self.kb.condition(classification.diagnosis) else {
            return;
        };
        if !info.description.is_empty() {
            let _ = write!(out, "\n{}", info.description);
        }
        if !info.characteristics.is_empty() {
            out.push_str("\nKey characteristics:");
            for item in info.characteristics.iter().take(3) {
                let _ = write!(out, "\n- {item}");
            }
        }
        if !info.risk_factors.is_empty() {
            out.push_str("\nRisk factors:");
            for item in info.risk_factors.iter().take(2) {
                let _ = write!(out, "\n- {item}");
            }
        }
        if !info.recommendation.is_empty() {
            let _ = write!(out, "\nRecommendation: {}", info.recommendation);
        }
    }
}

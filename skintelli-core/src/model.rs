use std::{collections::BTreeMap, fmt, path::Path};

use anyhow::{Context, Result};
use image::RgbImage;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use skintelli_utils::{resize_rgb, rgb_to_nhwc_unit};
use tract_onnx::prelude::{
    Framework, Graph, InferenceModelExt, IntoTensor, SimplePlan, Tensor, TypedFact, TypedOp, tvec,
};

type RunnableModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Lesion classes in the order the classifier emits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LesionClass {
    Melanoma,
    #[serde(rename = "Basal Cell Carcinoma")]
    BasalCellCarcinoma,
    #[serde(rename = "Squamous Cell Carcinoma")]
    SquamousCellCarcinoma,
    #[serde(rename = "Benign Keratosis")]
    BenignKeratosis,
    Nevus,
}

impl LesionClass {
    pub const ALL: [LesionClass; 5] = [
        LesionClass::Melanoma,
        LesionClass::BasalCellCarcinoma,
        LesionClass::SquamousCellCarcinoma,
        LesionClass::BenignKeratosis,
        LesionClass::Nevus,
    ];

    pub fn name(self) -> &'static str {
        match self {
            LesionClass::Melanoma => "Melanoma",
            LesionClass::BasalCellCarcinoma => "Basal Cell Carcinoma",
            LesionClass::SquamousCellCarcinoma => "Squamous Cell Carcinoma",
            LesionClass::BenignKeratosis => "Benign Keratosis",
            LesionClass::Nevus => "Nevus",
        }
    }

    pub fn is_malignant(self) -> bool {
        matches!(
            self,
            LesionClass::Melanoma
                | LesionClass::BasalCellCarcinoma
                | LesionClass::SquamousCellCarcinoma
        )
    }
}

impl fmt::Display for LesionClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Classifier verdict for one image or patch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub diagnosis: LesionClass,
    pub confidence: f32,
    pub probabilities: BTreeMap<LesionClass, f32>,
}

impl Classification {
    /// Probability mass on malignant classes, clamped to `[0, 1]`.
    pub fn malignant_probability(&self) -> f32 {
        let mass: f32 = self
            .probabilities
            .iter()
            .filter(|(class, _)| class.is_malignant())
            .map(|(_, p)| *p)
            .sum();
        if mass.is_finite() { mass.clamp(0.0, 1.0) } else { 0.0 }
    }
}

/// Fixed class distributions for single-output (risk score) models, keyed by the
/// upper bound of each risk band.
const RISK_BANDS: [(f32, LesionClass, [f32; 5]); 5] = [
    (0.2, LesionClass::Nevus, [0.05, 0.03, 0.02, 0.25, 0.65]),
    (0.4, LesionClass::BenignKeratosis, [0.05, 0.12, 0.03, 0.45, 0.35]),
    (0.6, LesionClass::BasalCellCarcinoma, [0.18, 0.42, 0.08, 0.28, 0.04]),
    (0.8, LesionClass::Melanoma, [0.48, 0.32, 0.12, 0.06, 0.02]),
    (f32::INFINITY, LesionClass::Melanoma, [0.62, 0.12, 0.22, 0.03, 0.01]),
];

/// Interpret raw classifier output.
///
/// A single value is a risk score mapped through fixed bands; two or more values
/// are per-class scores in [`LesionClass::ALL`] order (extra values are ignored).
pub fn decode_scores(scores: &[f32]) -> Result<Classification> {
    match scores {
        [] => anyhow::bail!("classifier produced an empty output"),
        [risk] => {
            let risk = if risk.is_finite() { *risk } else { 0.0 };
            let (_, diagnosis, distribution) = RISK_BANDS
                .iter()
                .find(|(upper, _, _)| risk < *upper)
                .copied()
                .unwrap_or(RISK_BANDS[RISK_BANDS.len() - 1]);
            let probabilities: BTreeMap<LesionClass, f32> =
                LesionClass::ALL.into_iter().zip(distribution).collect();
            let confidence = probabilities.get(&diagnosis).copied().unwrap_or_default();
            Ok(Classification {
                diagnosis,
                confidence,
                probabilities,
            })
        }
        many => {
            if many.len() > LesionClass::ALL.len() {
                debug!(
                    "classifier emitted {} scores; using the first {}",
                    many.len(),
                    LesionClass::ALL.len()
                );
            }
            let probabilities: BTreeMap<LesionClass, f32> = LesionClass::ALL
                .into_iter()
                .zip(many.iter().map(|s| if s.is_finite() { *s } else { 0.0 }))
                .collect();
            let (diagnosis, confidence) = LesionClass::ALL
                .into_iter()
                .filter_map(|class| probabilities.get(&class).map(|p| (class, *p)))
                .fold(None, |best: Option<(LesionClass, f32)>, (class, p)| match best {
                    Some((_, best_p)) if best_p >= p => best,
                    _ => Some((class, p)),
                })
                .context("classifier output has no usable scores")?;
            Ok(Classification {
                diagnosis,
                confidence,
                probabilities,
            })
        }
    }
}

/// Anything that can classify an RGB patch. The ONNX classifier is the production
/// implementation; the seam keeps tiling logic testable without a model file.
pub trait PatchClassifier: Send + Sync {
    fn classify(&self, patch: &RgbImage) -> Result<Classification>;
}

/// Wrapper around an ONNX lesion classifier run through `tract`.
#[derive(Debug)]
pub struct LesionClassifier {
    runnable: RunnableModel,
    input_size: (u32, u32),
}

impl LesionClassifier {
    /// Load and optimize the classifier graph for a fixed `(width, height)` input.
    pub fn load<P: AsRef<Path>>(model_path: P, input_size: (u32, u32)) -> Result<Self> {
        let path = model_path.as_ref();
        anyhow::ensure!(path.exists(), "model file not found: {}", path.display());
        anyhow::ensure!(
            input_size.0 > 0 && input_size.1 > 0,
            "model input size must be non-zero"
        );

        // Fall back to the decluttered plan when optimization fails.
        let runnable = compile(path, Plan::Optimized).or_else(|err| {
            warn!(
                "classifier {} could not be optimized ({err:#}); using the decluttered plan",
                path.display()
            );
            compile(path, Plan::Decluttered)
        })?;
        debug!(
            "loaded classifier {} for {}x{} input",
            path.display(),
            input_size.0,
            input_size.1
        );

        Ok(Self {
            runnable,
            input_size,
        })
    }

    pub fn input_size(&self) -> (u32, u32) {
        self.input_size
    }

    /// Run the graph on an NHWC `[1, H, W, 3]` tensor and return the first output
    /// as a flat score vector.
    pub fn run(&self, input: Tensor) -> Result<Vec<f32>> {
        let outputs = self
            .runnable
            .run(tvec![input.into()])
            .map_err(|e| anyhow::anyhow!("classifier execution failed: {e}"))?;
        let first = outputs
            .into_iter()
            .next()
            .context("classifier produced no outputs")?
            .into_tensor();
        let scores = first
            .as_slice::<f32>()
            .map_err(|e| anyhow::anyhow!("classifier output is not f32: {e}"))?;
        Ok(scores.to_vec())
    }
}

impl PatchClassifier for LesionClassifier {
    fn classify(&self, patch: &RgbImage) -> Result<Classification> {
        let (width, height) = self.input_size;
        let resized = resize_rgb(patch, width, height);
        let array = rgb_to_nhwc_unit(&resized);
        let data: Vec<f32> = array.iter().copied().collect();
        let tensor = Tensor::from_shape(&[1, height as usize, width as usize, 3], &data)
            .map_err(|e| anyhow::anyhow!("failed to build classifier input tensor: {e}"))?;
        decode_scores(&self.run(tensor)?)
    }
}

#[derive(Debug, Clone, Copy)]
enum Plan {
    Optimized,
    Decluttered,
}

fn compile(path: &Path, plan: Plan) -> Result<RunnableModel> {
    let graph = tract_onnx::onnx()
        .model_for_path(path)
        .with_context(|| format!("{} is not a readable ONNX graph", path.display()))?
        .into_typed()
        .context("classifier graph has unresolved shapes or types")?;
    let graph = match plan {
        Plan::Optimized => graph.into_optimized().context("graph optimization failed")?,
        Plan::Decluttered => graph.into_decluttered().context("graph decluttering failed")?,
    };
    graph.into_runnable().context("classifier plan could not be built")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn loading_missing_model_fails() {
        let result = LesionClassifier::load("missing.onnx", (224, 224));
        assert!(result.is_err());
    }

    #[test]
    fn invalid_model_produces_useful_error() {
        let mut temp = NamedTempFile::new().expect("temp file");
        temp.write_all(b"not a real onnx file")
            .expect("write mock model");

        let err = LesionClassifier::load(temp.path(), (224, 224))
            .expect_err("invalid ONNX should fail");
        let message = format!("{err}");
        assert!(
            message.contains("is not a readable ONNX graph"),
            "Unexpected error message: {message}"
        );
    }

    #[test]
    fn multi_class_output_uses_argmax() {
        let result = decode_scores(&[0.1, 0.05, 0.6, 0.2, 0.05]).expect("decode");
        assert_eq!(result.diagnosis, LesionClass::SquamousCellCarcinoma);
        assert!((result.confidence - 0.6).abs() < 1e-6);
        assert!((result.malignant_probability() - 0.75).abs() < 1e-6);
    }

    #[test]
    fn ties_keep_class_order_and_extra_scores_are_ignored() {
        let result = decode_scores(&[0.3, 0.3, 0.1, 0.1, 0.2, 0.9]).expect("decode");
        assert_eq!(result.diagnosis, LesionClass::Melanoma);
        assert_eq!(result.probabilities.len(), 5);
    }

    #[test]
    fn risk_score_maps_through_bands() {
        let cases = [
            (0.0, LesionClass::Nevus, 0.65),
            (0.2, LesionClass::BenignKeratosis, 0.45),
            (0.5, LesionClass::BasalCellCarcinoma, 0.42),
            (0.79, LesionClass::Melanoma, 0.48),
            (0.95, LesionClass::Melanoma, 0.62),
        ];
        for (risk, class, confidence) in cases {
            let result = decode_scores(&[risk]).expect("decode");
            assert_eq!(result.diagnosis, class, "risk {risk}");
            assert!((result.confidence - confidence).abs() < 1e-6, "risk {risk}");
        }
        assert_eq!(decode_scores(&[f32::NAN]).unwrap().diagnosis, LesionClass::Nevus);
        assert!(decode_scores(&[]).is_err());
    }

    #[test]
    fn classification_serializes_with_display_names() {
        let result = decode_scores(&[0.5]).expect("decode");
        let json = serde_json::to_value(&result).expect("serialize");
        assert_eq!(json["diagnosis"], "Basal Cell Carcinoma");
        assert!(json["probabilities"]["Squamous Cell Carcinoma"].is_number());
    }
}

use thiserror::Error;

/// Reasons a single `analyze` call fails. None of them leave a partial result.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Zero-area or otherwise malformed input buffer.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Intermediate maps disagree on shape; this is a programming defect.
    #[error("internal inconsistency: {0}")]
    InternalInconsistency(String),

    /// The learned strategy failed while running the classifier.
    #[error("model inference failed: {0:#}")]
    Inference(anyhow::Error),
}

pub type AnalysisResult<T> = std::result::Result<T, AnalysisError>;

/// Fail with `InternalInconsistency` unless both shapes match.
pub(crate) fn ensure_same_dims(
    what: &str,
    expected: (u32, u32),
    actual: (u32, u32),
) -> AnalysisResult<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(AnalysisError::InternalInconsistency(format!(
            "{what}: expected {}x{}, got {}x{}",
            expected.0, expected.1, actual.0, actual.1
        )))
    }
}

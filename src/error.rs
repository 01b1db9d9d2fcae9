use thiserror::Error;

/// Failure taxonomy for the analysis pipeline.
///
/// Only `Validation`, `ModelTimeout`, and `Infrastructure` ever reach the
/// caller. `MalformedModelOutput` is always caught inside stages 1 and 3,
/// where it triggers the deterministic fallback path.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid question: {reason}")]
    Validation { reason: String },

    #[error("model endpoint timed out after all retries")]
    ModelTimeout,

    #[error("model output unparseable: {0}")]
    MalformedModelOutput(String),

    #[error(transparent)]
    Infrastructure(#[from] anyhow::Error),
}

impl PipelineError {
    pub fn validation(reason: impl Into<String>) -> Self {
        PipelineError::Validation {
            reason: reason.into(),
        }
    }
}

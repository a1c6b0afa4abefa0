use thiserror::Error;

/// Top-level error type for the Flexscan runtime.
#[derive(Debug, Error)]
pub enum FlexscanError {
    #[error("vision provider error ({model}): {message}")]
    Vision { model: String, message: String },

    #[error("{operation} timed out after {after_ms} ms")]
    Timeout { operation: String, after_ms: u64 },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("media download failed: {0}")]
    Media(String),

    #[error("invalid image: {0}")]
    InvalidImage(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FlexscanError {
    pub fn timeout(operation: impl Into<String>, after_ms: u64) -> Self {
        Self::Timeout { operation: operation.into(), after_ms }
    }
}

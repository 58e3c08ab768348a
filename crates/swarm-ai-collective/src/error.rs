//! Error types for collective learning operations.

/// Error types for the collective learning engine.
///
/// Failed skill transfers are deliberately absent: a refused transfer is an
/// expected outcome reported as a `false` return, never through this enum.
/// Enrichment failures (fragment extraction, predictor training) are caught
/// and logged inside `learn` and surface here only from explicit calls.
#[derive(Debug, thiserror::Error)]
pub enum CollectiveError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Knowledge extraction failed: {0}")]
    Extraction(String),

    #[error("Predictor rejected the update: {0}")]
    Predictor(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, CollectiveError>;

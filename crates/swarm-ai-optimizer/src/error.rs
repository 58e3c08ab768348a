//! Error types for cost optimization operations.

/// Error types for the cost optimizer.
///
/// Budget breaches are deliberately absent: exceeding a cost ceiling is an
/// expected operational condition reported through [`crate::CostAlert`]
/// values, never through this enum.
#[derive(Debug, thiserror::Error)]
pub enum OptimizerError {
    #[error("Unknown resource: {0}")]
    UnknownResource(String),

    #[error("Resource already registered: {0}")]
    DuplicateResource(String),

    #[error("No resources registered")]
    NoResources,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, OptimizerError>;

//! Validator error types.
//!
//! Errors only surface at construction time (bad thresholds, unbuildable
//! rules). Validation itself never fails: a poor artifact yields a
//! `ValidationResult` with `is_valid = false`, not an error.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidatorError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("rule pattern failed to compile: {0}")]
    Rule(#[from] regex::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ValidatorError>;

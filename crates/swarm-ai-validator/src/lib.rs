//! Static quality validation for swarm-ai agent output.
//!
//! Every artifact an agent produces gets scored before the swarm accepts
//! it, providing:
//!
//! - **Code Extraction**: Fenced blocks (or content that reads like code)
//!   are pulled out of mixed-prose artifacts
//! - **Structural Analysis**: Language detection, complexity, nesting,
//!   design patterns, and code smells
//! - **Rule Passes**: Syntax, logic, performance, security, best-practice,
//!   and style checks producing typed issues
//! - **Multi-Dimensional Scoring**: Six weighted dimensions roll up into a
//!   0-100 score and a quality band
//!
//! # Architecture
//!
//! Validation is pure and synchronous: no I/O, no model calls, no shared
//! state. A validator is cheap to construct and safe to share behind a
//! reference. Poor artifacts yield `is_valid = false`, never an `Err`.
//!
//! # Usage
//!
//! ```ignore
//! use swarm_ai_validator::{Artifact, QualityValidator};
//!
//! let validator = QualityValidator::with_defaults()?;
//! let artifact = Artifact::new("```rust\nfn add(a: i32, b: i32) -> i32 { a + b }\n```");
//!
//! let result = validator.validate(&artifact);
//! if !result.is_valid {
//!     for issue in &result.issues {
//!         println!("[{:?}] {}", issue.severity, issue.message);
//!     }
//! }
//! ```

pub mod analysis;
pub mod artifact;
pub mod config;
pub mod error;
pub mod issues;
pub mod metrics;
pub mod rules;
pub mod validator;

// Re-export main types for convenience
pub use analysis::{analyze, extract_code, CodeAnalysis, Language};
pub use artifact::Artifact;
pub use config::{
    MetricWeights, QualityBand, QualityBands, SeverityDeductions, StructuralLimits, ValidatorConfig,
};
pub use error::{Result, ValidatorError};
pub use issues::{IssueCategory, IssueKind, Severity, ValidationIssue};
pub use metrics::QualityMetrics;
pub use rules::RuleSet;
pub use validator::{QualityValidator, ValidationResult};

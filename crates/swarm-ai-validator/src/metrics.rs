//! Quality metrics: six dimension scores and their weighted combination.

use crate::analysis::CodeAnalysis;
use crate::config::ValidatorConfig;
use crate::issues::{IssueCategory, Severity, ValidationIssue};
use serde::{Deserialize, Serialize};

/// Comment density at which documentation scores a full 100.
const FULL_DOC_DENSITY: f64 = 0.15;

/// Bounded 0 to 100 scores for each quality dimension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityMetrics {
    /// Syntax and logic soundness
    pub code_quality: f64,

    /// Freedom from obvious performance traps
    pub performance: f64,

    /// Freedom from dangerous constructs
    pub security: f64,

    /// Structural hygiene: size, style, smells
    pub maintainability: f64,

    /// How approachable the code is for testing
    pub testability: f64,

    /// Comment coverage
    pub documentation: f64,

    /// Weighted combination of the six dimensions
    pub overall: f64,
}

impl QualityMetrics {
    /// The same score on every dimension, for artifacts without code.
    pub fn uniform(score: f64) -> Self {
        let score = score.clamp(0.0, 100.0);
        Self {
            code_quality: score,
            performance: score,
            security: score,
            maintainability: score,
            testability: score,
            documentation: score,
            overall: score,
        }
    }

    /// Score an analyzed piece of code against its issues.
    ///
    /// Each dimension starts at 100 and loses the configured deduction per
    /// issue in its mapped categories; maintainability additionally pays
    /// per detected smell; testability and documentation derive from the
    /// analysis itself.
    pub fn compute(
        analysis: &CodeAnalysis,
        issues: &[ValidationIssue],
        config: &ValidatorConfig,
    ) -> Self {
        let deductions = &config.deductions;
        let penalty = |categories: &[IssueCategory]| -> f64 {
            issues
                .iter()
                .filter(|issue| categories.contains(&issue.category))
                .map(|issue| match issue.severity {
                    Severity::Critical => deductions.critical,
                    Severity::High => deductions.high,
                    Severity::Medium => deductions.medium,
                    Severity::Low => deductions.low,
                })
                .sum()
        };

        let code_quality = 100.0 - penalty(&[IssueCategory::Syntax, IssueCategory::Logic]);
        let performance = 100.0 - penalty(&[IssueCategory::Performance]);
        let security = 100.0 - penalty(&[IssueCategory::Security]);
        let maintainability = 100.0
            - penalty(&[IssueCategory::BestPractices, IssueCategory::Style])
            - config.smell_deduction * analysis.smells.len() as f64;

        let long_functions = analysis.function_count > 0
            && analysis.avg_function_length() > config.limits.max_function_lines as f64;
        let testability =
            100.0 - 2.0 * analysis.complexity as f64 - if long_functions { 15.0 } else { 0.0 };

        let documentation = (analysis.comment_density() / FULL_DOC_DENSITY * 100.0).min(100.0);

        Self::combine(
            code_quality.clamp(0.0, 100.0),
            performance.clamp(0.0, 100.0),
            security.clamp(0.0, 100.0),
            maintainability.clamp(0.0, 100.0),
            testability.clamp(0.0, 100.0),
            documentation.clamp(0.0, 100.0),
            config,
        )
    }

    fn combine(
        code_quality: f64,
        performance: f64,
        security: f64,
        maintainability: f64,
        testability: f64,
        documentation: f64,
        config: &ValidatorConfig,
    ) -> Self {
        let w = &config.weights;
        let total_weight = w.code_quality
            + w.performance
            + w.security
            + w.maintainability
            + w.testability
            + w.documentation;
        let overall = (w.code_quality * code_quality
            + w.performance * performance
            + w.security * security
            + w.maintainability * maintainability
            + w.testability * testability
            + w.documentation * documentation)
            / total_weight;

        Self {
            code_quality,
            performance,
            security,
            maintainability,
            testability,
            documentation,
            overall,
        }
    }
}

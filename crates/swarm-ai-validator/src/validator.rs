//! The quality validator: code extraction, rule passes, scoring, and the
//! validity verdict.
//!
//! Validation never fails. A poor artifact produces a result with
//! `is_valid = false` and populated issues; errors only exist at
//! construction time.

use crate::analysis::{self, CodeAnalysis, Language};
use crate::artifact::Artifact;
use crate::config::{QualityBand, ValidatorConfig};
use crate::error::Result;
use crate::issues::ValidationIssue;
use crate::metrics::QualityMetrics;
use crate::rules::RuleSet;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Confidence reported when a verdict comes from code analysis.
const CODE_CONFIDENCE: f64 = 0.9;

/// Confidence reported when a verdict comes from the content heuristic.
const CONTENT_CONFIDENCE: f64 = 0.6;

/// The verdict on one artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Whether the artifact passes: no blocking issue and a score at or
    /// above the minimum band
    pub is_valid: bool,

    /// Overall quality score (0 to 100)
    pub quality_score: f64,

    /// The band the score falls into
    pub band: QualityBand,

    /// Per-dimension scores
    pub metrics: QualityMetrics,

    /// Everything the rule passes found
    pub issues: Vec<ValidationIssue>,

    /// Deduplicated remediation suggestions
    pub suggestions: Vec<String>,

    /// How confident the validator is in this verdict (0 to 1)
    pub confidence: f64,

    /// The code analysis, when code was extractable
    pub analysis: Option<CodeAnalysis>,
}

/// Stateless artifact validator. Aside from its configuration it holds
/// only compiled rule patterns.
#[derive(Debug)]
pub struct QualityValidator {
    config: ValidatorConfig,
    rules: RuleSet,
}

impl QualityValidator {
    /// Build a validator, compiling the rule set.
    pub fn new(config: ValidatorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            rules: RuleSet::new()?,
        })
    }

    /// Build a validator with default thresholds.
    pub fn with_defaults() -> Result<Self> {
        Self::new(ValidatorConfig::default())
    }

    /// Current configuration.
    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Replace the configuration.
    pub fn set_config(&mut self, config: ValidatorConfig) -> Result<()> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    /// Classify a score into its configured quality band.
    pub fn quality_band(&self, score: f64) -> QualityBand {
        self.config.bands.classify(score)
    }

    /// Validate an artifact.
    pub fn validate(&self, artifact: &Artifact) -> ValidationResult {
        match analysis::extract_code(&artifact.content) {
            Some(code) => self.validate_code(&code, artifact.language_hint.as_deref()),
            None => self.validate_content(artifact),
        }
    }

    fn validate_code(&self, code: &str, language_hint: Option<&str>) -> ValidationResult {
        let mut analysis = analysis::analyze(code, &self.config.limits);
        if let Some(language) = language_hint.and_then(Language::from_hint) {
            analysis.language = language;
        }

        let issues = self.rules.check(code, &analysis, &self.config.limits);
        let metrics = QualityMetrics::compute(&analysis, &issues, &self.config);
        let quality_score = metrics.overall;

        let blocked = issues.iter().any(|issue| issue.is_blocking());
        let is_valid = !blocked && quality_score >= self.config.bands.minimum;
        let suggestions = self.suggest(&issues, &analysis);

        ValidationResult {
            is_valid,
            quality_score,
            band: self.config.bands.classify(quality_score),
            metrics,
            issues,
            suggestions,
            confidence: CODE_CONFIDENCE,
            analysis: Some(analysis),
        }
    }

    /// Content without extractable code is judged by a cheap heuristic:
    /// the producer's declared confidence, penalized for open markers and
    /// defect mentions, rewarded for substance.
    fn validate_content(&self, artifact: &Artifact) -> ValidationResult {
        let lower = artifact.content.to_lowercase();
        let mut score = artifact.confidence * 100.0;

        let open_markers = lower.matches("todo").count() + lower.matches("fixme").count();
        score -= 8.0 * open_markers as f64;

        for marker in ["bug", "broken", "doesn't work", "does not work", "failing"] {
            score -= 5.0 * lower.matches(marker).count() as f64;
        }

        let length = artifact.content.chars().count();
        if length > 500 {
            score += 10.0;
        } else if length < 50 {
            score -= 10.0;
        }

        let score = score.clamp(0.0, 100.0);
        ValidationResult {
            is_valid: score >= self.config.bands.minimum,
            quality_score: score,
            band: self.config.bands.classify(score),
            metrics: QualityMetrics::uniform(score),
            issues: Vec::new(),
            suggestions: Vec::new(),
            confidence: CONTENT_CONFIDENCE,
            analysis: None,
        }
    }

    /// Deduplicated per-issue suggestions plus structural ones when the
    /// analysis crosses its thresholds.
    pub fn suggest(&self, issues: &[ValidationIssue], analysis: &CodeAnalysis) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut suggestions = Vec::new();
        for issue in issues {
            if let Some(suggestion) = &issue.suggestion {
                if seen.insert(suggestion.clone()) {
                    suggestions.push(suggestion.clone());
                }
            }
        }

        let limits = &self.config.limits;
        let mut structural = |text: &str| {
            if seen.insert(text.to_string()) {
                suggestions.push(text.to_string());
            }
        };
        if analysis.line_count > limits.max_file_lines {
            structural("split the file into smaller modules");
        }
        if analysis.complexity > limits.max_complexity {
            structural("refactor high-complexity sections into smaller functions");
        }
        if analysis.smells.iter().any(|s| s == "duplicated code") {
            structural("extract duplicated code into shared helpers");
        }
        suggestions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issues::{IssueCategory, Severity};

    fn validator() -> QualityValidator {
        QualityValidator::with_defaults().unwrap()
    }

    #[test]
    fn test_clean_code_is_valid_and_well_banded() {
        let artifact = Artifact::new(
            "```rust\n/// Add two numbers.\nfn add(a: i32, b: i32) -> i32 {\n    a + b\n}\n```",
        );
        let result = validator().validate(&artifact);

        assert!(result.is_valid);
        assert!(result.quality_score >= 90.0);
        assert_eq!(result.band, QualityBand::Excellent);
        assert!(result.issues.is_empty());
        assert!(result.analysis.is_some());
    }

    #[test]
    fn test_critical_security_issue_invalidates_regardless_of_score() {
        let artifact = Artifact::new(
            "```js\n// render the template\nfunction render(input) {\n  return eval(input);\n}\n```",
        )
        .with_confidence(0.95);
        let result = validator().validate(&artifact);

        assert!(!result.is_valid);
        assert!(result.issues.iter().any(|issue| {
            issue.category == IssueCategory::Security && issue.severity == Severity::Critical
        }));
        // The rest of the artifact scores fine; the sink alone blocks it.
        assert!(result.metrics.code_quality >= 60.0);
    }

    #[test]
    fn test_unbalanced_code_is_invalid() {
        let artifact = Artifact::new("```rust\nfn main() {\n    if x {\n```");
        let result = validator().validate(&artifact);
        assert!(!result.is_valid);
    }

    #[test]
    fn test_prose_uses_the_content_heuristic() {
        let artifact =
            Artifact::new("The migration plan is reviewed and ready for the next sprint.")
                .with_confidence(0.8);
        let result = validator().validate(&artifact);

        assert!(result.is_valid);
        assert!((result.quality_score - 80.0).abs() < 1e-9);
        assert!(result.analysis.is_none());
        assert!((result.confidence - CONTENT_CONFIDENCE).abs() < 1e-9);
    }

    #[test]
    fn test_prose_with_open_markers_scores_down() {
        let artifact = Artifact::new("Draft notes. TODO: fill in the rollback bug details.")
            .with_confidence(0.5);
        let result = validator().validate(&artifact);

        // 50 - 8 (todo) - 5 (bug) = 37
        assert!(!result.is_valid);
        assert_eq!(result.band, QualityBand::Critical);
    }

    #[test]
    fn test_suggestions_are_deduplicated() {
        let long = "y".repeat(130);
        let code = format!("```js\nconst a = \"{long}\";\nconst b = \"{long}\";\n```");
        let result = validator().validate(&Artifact::new(code));

        let wraps = result
            .suggestions
            .iter()
            .filter(|s| s.contains("wrap long lines"))
            .count();
        assert_eq!(wraps, 1);
        assert!(result.issues.len() >= 2);
    }

    #[test]
    fn test_language_hint_overrides_detection() {
        let artifact = Artifact::new("```\nlet x = run();\nreturn x;\nconst y = 1;\n```")
            .with_language_hint("rust");
        let result = validator().validate(&artifact);

        let analysis = result.analysis.unwrap();
        assert_eq!(analysis.language, crate::analysis::Language::Rust);
    }
}

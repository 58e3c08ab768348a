//! Validator configuration: quality bands, deduction tables, and metric
//! weights, all configurable with hand-tuned defaults.

use crate::error::{Result, ValidatorError};
use serde::{Deserialize, Serialize};

/// Named score bands classifying a quality score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityBand {
    /// Below the critical threshold
    Critical,
    /// Below the minimum acceptance threshold
    Poor,
    /// Acceptable but unremarkable
    Acceptable,
    /// At or above the good threshold
    Good,
    /// At or above the excellent threshold
    Excellent,
}

/// Score thresholds for the quality bands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityBands {
    /// Scores below this are critically bad
    pub critical: f64,

    /// Minimum score for an artifact to be considered valid
    pub minimum: f64,

    /// Scores at or above this are good
    pub good: f64,

    /// Scores at or above this are excellent
    pub excellent: f64,
}

impl Default for QualityBands {
    fn default() -> Self {
        Self {
            critical: 40.0,
            minimum: 60.0,
            good: 75.0,
            excellent: 90.0,
        }
    }
}

impl QualityBands {
    /// Classify a score into its band.
    pub fn classify(&self, score: f64) -> QualityBand {
        if score < self.critical {
            QualityBand::Critical
        } else if score < self.minimum {
            QualityBand::Poor
        } else if score < self.good {
            QualityBand::Acceptable
        } else if score < self.excellent {
            QualityBand::Good
        } else {
            QualityBand::Excellent
        }
    }

    /// Validate that the bands are ordered and within the score range.
    pub fn validate(&self) -> Result<()> {
        let ordered = self.critical <= self.minimum
            && self.minimum <= self.good
            && self.good <= self.excellent;
        if !ordered {
            return Err(ValidatorError::InvalidConfig(
                "quality bands must be ordered critical <= minimum <= good <= excellent"
                    .to_string(),
            ));
        }
        if self.critical < 0.0 || self.excellent > 100.0 {
            return Err(ValidatorError::InvalidConfig(
                "quality bands must lie within 0 to 100".to_string(),
            ));
        }
        Ok(())
    }
}

/// Points deducted from a metric per issue, by severity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeverityDeductions {
    pub critical: f64,
    pub high: f64,
    pub medium: f64,
    pub low: f64,
}

impl Default for SeverityDeductions {
    fn default() -> Self {
        Self {
            critical: 25.0,
            high: 15.0,
            medium: 8.0,
            low: 3.0,
        }
    }
}

impl SeverityDeductions {
    pub fn validate(&self) -> Result<()> {
        let values = [self.critical, self.high, self.medium, self.low];
        if values.iter().any(|v| *v < 0.0) {
            return Err(ValidatorError::InvalidConfig(
                "severity deductions must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Weights combining the six metric dimensions into the overall score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricWeights {
    pub code_quality: f64,
    pub performance: f64,
    pub security: f64,
    pub maintainability: f64,
    pub testability: f64,
    pub documentation: f64,
}

impl Default for MetricWeights {
    fn default() -> Self {
        Self {
            code_quality: 0.25,
            performance: 0.20,
            security: 0.20,
            maintainability: 0.15,
            testability: 0.10,
            documentation: 0.10,
        }
    }
}

impl MetricWeights {
    pub fn validate(&self) -> Result<()> {
        let weights = [
            self.code_quality,
            self.performance,
            self.security,
            self.maintainability,
            self.testability,
            self.documentation,
        ];
        if weights.iter().any(|w| *w < 0.0) {
            return Err(ValidatorError::InvalidConfig(
                "metric weights must be non-negative".to_string(),
            ));
        }
        if weights.iter().sum::<f64>() <= 0.0 {
            return Err(ValidatorError::InvalidConfig(
                "metric weights must not all be zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Structural size and complexity thresholds for code under review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuralLimits {
    /// Average function length considered acceptable, in lines
    pub max_function_lines: usize,

    /// File length considered acceptable, in lines
    pub max_file_lines: usize,

    /// Cyclomatic-style complexity considered acceptable
    pub max_complexity: u32,

    /// Maximum acceptable source line length, in characters
    pub max_line_length: usize,
}

impl Default for StructuralLimits {
    fn default() -> Self {
        Self {
            max_function_lines: 50,
            max_file_lines: 500,
            max_complexity: 15,
            max_line_length: 120,
        }
    }
}

impl StructuralLimits {
    pub fn validate(&self) -> Result<()> {
        if self.max_function_lines == 0
            || self.max_file_lines == 0
            || self.max_complexity == 0
            || self.max_line_length == 0
        {
            return Err(ValidatorError::InvalidConfig(
                "structural limits must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Complete validator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorConfig {
    /// Score thresholds classifying quality
    #[serde(default)]
    pub bands: QualityBands,

    /// Per-severity score deductions
    #[serde(default)]
    pub deductions: SeverityDeductions,

    /// Weights combining the metric dimensions
    #[serde(default)]
    pub weights: MetricWeights,

    /// Structural size thresholds
    #[serde(default)]
    pub limits: StructuralLimits,

    /// Points deducted from maintainability per detected smell
    #[serde(default = "default_smell_deduction")]
    pub smell_deduction: f64,
}

fn default_smell_deduction() -> f64 {
    5.0
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            bands: QualityBands::default(),
            deductions: SeverityDeductions::default(),
            weights: MetricWeights::default(),
            limits: StructuralLimits::default(),
            smell_deduction: default_smell_deduction(),
        }
    }
}

impl ValidatorConfig {
    /// Validate every section.
    pub fn validate(&self) -> Result<()> {
        self.bands.validate()?;
        self.deductions.validate()?;
        self.weights.validate()?;
        self.limits.validate()?;
        if self.smell_deduction < 0.0 {
            return Err(ValidatorError::InvalidConfig(
                "smell_deduction must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

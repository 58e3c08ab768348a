//! Optimizer configuration: cost ceilings, selection weights, and strategy
//! savings estimates.
//!
//! Every hand-tuned constant in the optimizer lives here as a configurable
//! default so deployments can recalibrate without code changes.

use crate::error::{OptimizerError, Result};
use serde::{Deserialize, Serialize};

/// Named cost ceilings governing escalation behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostLimits {
    /// Maximum spend per calendar day
    pub daily_limit: f64,

    /// Maximum spend per calendar month
    pub monthly_limit: f64,

    /// Maximum spend for a single task
    pub per_task_limit: f64,

    /// Maximum cumulative spend per agent
    pub per_agent_limit: f64,

    /// Fraction of a limit at which a warning fires (0.0 to 1.0)
    pub warn_ratio: f64,
}

impl Default for CostLimits {
    fn default() -> Self {
        Self {
            daily_limit: 50.0,
            monthly_limit: 1000.0,
            per_task_limit: 5.0,
            per_agent_limit: 20.0,
            warn_ratio: 0.8,
        }
    }
}

impl CostLimits {
    /// Validate that all limits are positive and the warn ratio is sane.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("daily_limit", self.daily_limit),
            ("monthly_limit", self.monthly_limit),
            ("per_task_limit", self.per_task_limit),
            ("per_agent_limit", self.per_agent_limit),
        ] {
            if value <= 0.0 {
                return Err(OptimizerError::InvalidConfig(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        if self.warn_ratio <= 0.0 || self.warn_ratio > 1.0 {
            return Err(OptimizerError::InvalidConfig(format!(
                "warn_ratio must be in (0, 1], got {}",
                self.warn_ratio
            )));
        }
        Ok(())
    }
}

/// Weights for the resource selection score.
///
/// The defaults (40% cost, 30% quality, 20% speed, 10% capability match)
/// favor cheap resources that are still good enough for the task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionWeights {
    /// Weight for normalized cost savings
    pub cost: f64,

    /// Weight for the resource quality rating
    pub quality: f64,

    /// Weight for the resource speed rating
    pub speed: f64,

    /// Weight for capability match breadth
    pub capability: f64,
}

impl Default for SelectionWeights {
    fn default() -> Self {
        Self {
            cost: 0.40,
            quality: 0.30,
            speed: 0.20,
            capability: 0.10,
        }
    }
}

impl SelectionWeights {
    /// Validate that the weights are non-negative and not all zero.
    pub fn validate(&self) -> Result<()> {
        let weights = [self.cost, self.quality, self.speed, self.capability];
        if weights.iter().any(|w| *w < 0.0) {
            return Err(OptimizerError::InvalidConfig(
                "selection weights must be non-negative".to_string(),
            ));
        }
        if weights.iter().sum::<f64>() <= 0.0 {
            return Err(OptimizerError::InvalidConfig(
                "selection weights must not all be zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Estimated percentage saving attributed to each optimization strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategySavings {
    pub context_compression: f64,
    pub resource_reselection: f64,
    pub batching: f64,
    pub caching: f64,
    pub fallback: f64,
}

impl Default for StrategySavings {
    fn default() -> Self {
        Self {
            context_compression: 30.0,
            resource_reselection: 25.0,
            batching: 15.0,
            caching: 40.0,
            fallback: 20.0,
        }
    }
}

/// Configuration for the cost optimizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Cost ceilings
    pub limits: CostLimits,

    /// Resource selection weights
    pub weights: SelectionWeights,

    /// Per-strategy savings estimates (percent)
    pub savings: StrategySavings,

    /// Unit count above which context compression is planned
    pub compression_threshold_units: u64,

    /// Result cache time-to-live in seconds
    pub cache_ttl_secs: i64,

    /// Batch collection window in milliseconds
    pub batch_window_ms: i64,

    /// Batch size that triggers an immediate flush
    pub max_batch_size: usize,

    /// Ceiling on the combined projected savings percentage
    pub max_savings_pct: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            limits: CostLimits::default(),
            weights: SelectionWeights::default(),
            savings: StrategySavings::default(),
            compression_threshold_units: 2000,
            cache_ttl_secs: 3600,
            batch_window_ms: 200,
            max_batch_size: 10,
            max_savings_pct: 90.0,
        }
    }
}

impl OptimizerConfig {
    /// Validate the full configuration. Fatal at construction.
    pub fn validate(&self) -> Result<()> {
        self.limits.validate()?;
        self.weights.validate()?;
        if self.compression_threshold_units == 0 {
            return Err(OptimizerError::InvalidConfig(
                "compression_threshold_units must be positive".to_string(),
            ));
        }
        if self.cache_ttl_secs <= 0 {
            return Err(OptimizerError::InvalidConfig(
                "cache_ttl_secs must be positive".to_string(),
            ));
        }
        if self.batch_window_ms <= 0 || self.max_batch_size == 0 {
            return Err(OptimizerError::InvalidConfig(
                "batch window and size must be positive".to_string(),
            ));
        }
        if !(0.0..=100.0).contains(&self.max_savings_pct) {
            return Err(OptimizerError::InvalidConfig(format!(
                "max_savings_pct must be in [0, 100], got {}",
                self.max_savings_pct
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(OptimizerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_limits() {
        let mut config = OptimizerConfig::default();
        config.limits.daily_limit = 0.0;
        assert!(config.validate().is_err());

        let mut config = OptimizerConfig::default();
        config.limits.warn_ratio = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_weights() {
        let mut config = OptimizerConfig::default();
        config.weights = SelectionWeights {
            cost: 0.0,
            quality: 0.0,
            speed: 0.0,
            capability: 0.0,
        };
        assert!(config.validate().is_err());
    }
}

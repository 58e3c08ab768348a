//! Learning engine configuration: rates, thresholds, and retention rules.
//!
//! Every hand-tuned constant in the learning engine lives here as a
//! configurable default so deployments can recalibrate without code changes.

use crate::error::{CollectiveError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Weights combined into a pattern's emergence score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergenceWeights {
    /// Weight for the pattern's observed success rate
    pub success_rate: f32,

    /// Weight for the pattern's average reward
    pub avg_reward: f32,

    /// Weight for observation frequency (saturating at 10 observations)
    pub frequency: f32,
}

impl Default for EmergenceWeights {
    fn default() -> Self {
        Self {
            success_rate: 0.4,
            avg_reward: 0.4,
            frequency: 0.2,
        }
    }
}

impl EmergenceWeights {
    /// Validate that the weights are non-negative and not all zero.
    pub fn validate(&self) -> Result<()> {
        let weights = [self.success_rate, self.avg_reward, self.frequency];
        if weights.iter().any(|w| *w < 0.0) {
            return Err(CollectiveError::InvalidConfig(
                "emergence weights must be non-negative".to_string(),
            ));
        }
        if weights.iter().sum::<f32>() <= 0.0 {
            return Err(CollectiveError::InvalidConfig(
                "emergence weights must not all be zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration for the collective learning engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningConfig {
    /// Base skill learning rate applied per experience
    pub base_rate: f32,

    /// Minimum reward for a successful experience to yield a knowledge
    /// fragment
    pub extraction_min_reward: f32,

    /// Same-task-type experience count required before pattern mining runs
    pub pattern_threshold: usize,

    /// Fraction of the sample an element must recur in to join a pattern
    pub pattern_recurrence: f32,

    /// Maximum experiences sampled per pattern mining pass
    pub pattern_sample: usize,

    /// Emergence score weights
    pub emergence_weights: EmergenceWeights,

    /// Minimum source confidence for a skill transfer
    pub min_transfer_confidence: f32,

    /// Factor applied to the source confidence when seeding a transferred
    /// skill
    pub transfer_confidence_discount: f32,

    /// Days a fragment may go unused before it is eligible for decay
    pub retention_days: i64,

    /// Fragments used at least this many times survive decay regardless of
    /// age
    pub min_fragment_uses: u64,

    /// Experience buffer capacity; oldest entries are evicted first
    pub buffer_capacity: usize,

    /// Relative importance per skill, used to rank transfer recommendations
    #[serde(default = "default_skill_importance")]
    pub skill_importance: HashMap<String, f32>,
}

fn default_skill_importance() -> HashMap<String, f32> {
    HashMap::from([
        ("code_generation".to_string(), 1.0),
        ("debugging".to_string(), 0.9),
        ("code_analysis".to_string(), 0.8),
        ("testing".to_string(), 0.8),
        ("refactoring".to_string(), 0.7),
        ("documentation".to_string(), 0.5),
    ])
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            base_rate: 0.1,
            extraction_min_reward: 0.7,
            pattern_threshold: 5,
            pattern_recurrence: 0.3,
            pattern_sample: 20,
            emergence_weights: EmergenceWeights::default(),
            min_transfer_confidence: 0.7,
            transfer_confidence_discount: 0.8,
            retention_days: 30,
            min_fragment_uses: 5,
            buffer_capacity: 10_000,
            skill_importance: default_skill_importance(),
        }
    }
}

impl LearningConfig {
    /// Importance of a skill for recommendation ranking. Unknown skills get
    /// a neutral 0.5.
    pub fn importance_for(&self, skill: &str) -> f32 {
        self.skill_importance.get(skill).copied().unwrap_or(0.5)
    }

    /// Validate the full configuration. Fatal at construction.
    pub fn validate(&self) -> Result<()> {
        if self.base_rate <= 0.0 || self.base_rate > 1.0 {
            return Err(CollectiveError::InvalidConfig(format!(
                "base_rate must be in (0, 1], got {}",
                self.base_rate
            )));
        }
        for (name, value) in [
            ("extraction_min_reward", self.extraction_min_reward),
            ("min_transfer_confidence", self.min_transfer_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(CollectiveError::InvalidConfig(format!(
                    "{name} must be in [0, 1], got {value}"
                )));
            }
        }
        if self.pattern_recurrence <= 0.0 || self.pattern_recurrence > 1.0 {
            return Err(CollectiveError::InvalidConfig(format!(
                "pattern_recurrence must be in (0, 1], got {}",
                self.pattern_recurrence
            )));
        }
        if self.transfer_confidence_discount <= 0.0 || self.transfer_confidence_discount > 1.0 {
            return Err(CollectiveError::InvalidConfig(format!(
                "transfer_confidence_discount must be in (0, 1], got {}",
                self.transfer_confidence_discount
            )));
        }
        if self.pattern_threshold == 0 {
            return Err(CollectiveError::InvalidConfig(
                "pattern_threshold must be positive".to_string(),
            ));
        }
        if self.pattern_sample < self.pattern_threshold {
            return Err(CollectiveError::InvalidConfig(
                "pattern_sample must be at least pattern_threshold".to_string(),
            ));
        }
        if self.retention_days <= 0 {
            return Err(CollectiveError::InvalidConfig(
                "retention_days must be positive".to_string(),
            ));
        }
        if self.buffer_capacity == 0 {
            return Err(CollectiveError::InvalidConfig(
                "buffer_capacity must be positive".to_string(),
            ));
        }
        self.emergence_weights.validate()?;
        if self.skill_importance.values().any(|v| *v < 0.0) {
            return Err(CollectiveError::InvalidConfig(
                "skill importance values must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(LearningConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_recurrence() {
        let mut config = LearningConfig::default();
        config.pattern_recurrence = 0.0;
        assert!(config.validate().is_err());

        config.pattern_recurrence = 1.2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_sample_below_threshold() {
        let mut config = LearningConfig::default();
        config.pattern_sample = 3;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_importance_falls_back_to_neutral() {
        let config = LearningConfig::default();
        assert_eq!(config.importance_for("code_generation"), 1.0);
        assert_eq!(config.importance_for("interpretive_dance"), 0.5);
    }
}

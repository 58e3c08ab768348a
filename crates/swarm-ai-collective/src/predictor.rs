//! Lightweight outcome prediction behind a swappable scoring interface.

use crate::error::{CollectiveError, Result};
use crate::experience::AgentExperience;

/// Pluggable outcome scoring strategy. The engine only ever drives this
/// interface, so the default scorer can be swapped for a real classifier
/// without touching the learning control flow.
pub trait OutcomeScorer: Send + Sync + std::fmt::Debug {
    /// Encode an experience into a feature vector.
    fn encode(&self, experience: &AgentExperience) -> Vec<f32>;

    /// Predict a success likelihood in [0, 1] for encoded features.
    fn predict(&self, features: &[f32]) -> f32;

    /// Fold one observed outcome into the scorer.
    fn update(&mut self, features: &[f32], target: f32) -> Result<()>;
}

const FEATURE_DIM: usize = 5;
const LEARNING_RATE: f32 = 0.05;
const MOMENTUM: f32 = 0.9;

/// Single-layer logistic scorer trained online with momentum. Deliberately
/// tiny; it weights decisions, it does not make them.
#[derive(Debug, Default)]
pub struct MomentumScorer {
    weights: [f32; FEATURE_DIM],
    velocity: [f32; FEATURE_DIM],
    bias: f32,
    bias_velocity: f32,
}

impl MomentumScorer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OutcomeScorer for MomentumScorer {
    fn encode(&self, experience: &AgentExperience) -> Vec<f32> {
        vec![
            experience.difficulty,
            (experience.context.len() as f32 / 8.0).min(1.0),
            (experience.action.len() as f32 / 64.0).min(1.0),
            (experience.duration_ms as f32 / 60_000.0).min(1.0),
            hash_bucket(&experience.task_type) as f32 / 16.0,
        ]
    }

    fn predict(&self, features: &[f32]) -> f32 {
        let weighted: f32 = features
            .iter()
            .zip(self.weights.iter())
            .map(|(feature, weight)| feature * weight)
            .sum();
        sigmoid(weighted + self.bias)
    }

    fn update(&mut self, features: &[f32], target: f32) -> Result<()> {
        if features.len() != FEATURE_DIM {
            return Err(CollectiveError::Predictor(format!(
                "expected {FEATURE_DIM} features, got {}",
                features.len()
            )));
        }
        let error = self.predict(features) - target.clamp(0.0, 1.0);
        for i in 0..FEATURE_DIM {
            self.velocity[i] = MOMENTUM * self.velocity[i] - LEARNING_RATE * error * features[i];
            self.weights[i] += self.velocity[i];
        }
        self.bias_velocity = MOMENTUM * self.bias_velocity - LEARNING_RATE * error;
        self.bias += self.bias_velocity;
        Ok(())
    }
}

fn sigmoid(z: f32) -> f32 {
    1.0 / (1.0 + (-z).exp())
}

fn hash_bucket(task_type: &str) -> u32 {
    task_type
        .bytes()
        .fold(0u32, |hash, byte| hash.wrapping_mul(31).wrapping_add(byte as u32))
        % 16
}

#[cfg(test)]
mod tests {
    use super::*;

    fn experience() -> AgentExperience {
        AgentExperience::new("agent-1", "code_generation", "wrote the module", true, 0.9)
            .with_difficulty(0.7)
            .with_duration_ms(30_000)
    }

    #[test]
    fn test_untrained_scorer_is_neutral() {
        let scorer = MomentumScorer::new();
        let features = scorer.encode(&experience());
        assert_eq!(features.len(), FEATURE_DIM);
        assert!((scorer.predict(&features) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_updates_move_prediction_toward_target() {
        let mut scorer = MomentumScorer::new();
        let features = scorer.encode(&experience());

        for _ in 0..50 {
            scorer.update(&features, 1.0).unwrap();
        }
        assert!(scorer.predict(&features) > 0.7);

        let mut scorer = MomentumScorer::new();
        for _ in 0..50 {
            scorer.update(&features, 0.0).unwrap();
        }
        assert!(scorer.predict(&features) < 0.3);
    }

    #[test]
    fn test_rejects_wrong_dimension() {
        let mut scorer = MomentumScorer::new();
        assert!(scorer.update(&[0.5, 0.5], 1.0).is_err());
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let scorer = MomentumScorer::new();
        let exp = experience();
        assert_eq!(scorer.encode(&exp), scorer.encode(&exp));
    }
}

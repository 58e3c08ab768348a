//! Emergent behavior patterns mined from sampled experience.

use crate::config::LearningConfig;
use crate::experience::AgentExperience;
use crate::types::{AgentId, PatternId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Observation count at which the frequency factor saturates.
const FREQUENCY_SATURATION: f32 = 10.0;

/// A recurring regularity extracted from multiple similar experiences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningPattern {
    /// Unique pattern identifier, stable across re-detections
    pub pattern_id: PatternId,

    /// Task type the pattern was mined from
    pub task_type: String,

    /// The recurring action/context elements, sorted
    pub elements: Vec<String>,

    /// Observations supporting the pattern
    pub frequency: u64,

    /// Success rate over the most recent supporting sample
    pub success_rate: f32,

    /// Average reward over the most recent supporting sample
    pub avg_reward: f32,

    /// Composite emergence score (0 to 1)
    pub emergence: f32,

    /// The agent whose experience first surfaced the pattern
    pub discovered_by: AgentId,

    /// Every agent whose experience has supported the pattern
    pub validating_agents: Vec<AgentId>,

    /// When the pattern was first detected
    pub detected_at: DateTime<Utc>,

    /// When the pattern was last re-detected
    pub last_seen: DateTime<Utc>,
}

/// Mines experience samples for recurring elements. Patterns are keyed by
/// task type plus element signature, so re-detection updates the existing
/// pattern instead of duplicating it.
#[derive(Debug, Default)]
pub struct PatternMiner {
    patterns: HashMap<String, LearningPattern>,
}

impl PatternMiner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mine a sample of same-task-type experiences. Returns the matched or
    /// created pattern and whether it is newly detected; `None` when the
    /// sample is too small or nothing recurs.
    pub fn observe(
        &mut self,
        discoverer: &str,
        task_type: &str,
        sample: &[&AgentExperience],
        config: &LearningConfig,
        now: DateTime<Utc>,
    ) -> Option<(&LearningPattern, bool)> {
        if sample.len() < config.pattern_threshold {
            return None;
        }
        let recurring = recurring_elements(sample, config.pattern_recurrence);
        if recurring.is_empty() {
            return None;
        }

        let successes = sample.iter().filter(|exp| exp.success).count();
        let success_rate = successes as f32 / sample.len() as f32;
        let avg_reward = sample.iter().map(|exp| exp.reward).sum::<f32>() / sample.len() as f32;
        let mut validating: Vec<AgentId> =
            sample.iter().map(|exp| exp.agent_id.clone()).collect();
        validating.sort();
        validating.dedup();

        let key = signature(task_type, &recurring);
        let is_new = !self.patterns.contains_key(&key);
        let pattern = self.patterns.entry(key).or_insert_with(|| LearningPattern {
            pattern_id: uuid::Uuid::new_v4().to_string(),
            task_type: task_type.to_string(),
            elements: recurring,
            frequency: sample.len() as u64,
            success_rate,
            avg_reward,
            emergence: 0.0,
            discovered_by: discoverer.to_string(),
            validating_agents: validating.clone(),
            detected_at: now,
            last_seen: now,
        });
        if !is_new {
            pattern.frequency += 1;
            pattern.success_rate = success_rate;
            pattern.avg_reward = avg_reward;
            for agent in validating {
                if !pattern.validating_agents.contains(&agent) {
                    pattern.validating_agents.push(agent);
                }
            }
            pattern.last_seen = now;
        }

        let weights = &config.emergence_weights;
        pattern.emergence = weights.success_rate * pattern.success_rate
            + weights.avg_reward * pattern.avg_reward
            + weights.frequency * (pattern.frequency as f32 / FREQUENCY_SATURATION).min(1.0);

        Some((&*pattern, is_new))
    }

    pub fn get(&self, pattern_id: &str) -> Option<&LearningPattern> {
        self.patterns
            .values()
            .find(|pattern| pattern.pattern_id == pattern_id)
    }

    /// All detected patterns, strongest emergence first.
    pub fn patterns(&self) -> Vec<&LearningPattern> {
        let mut patterns: Vec<&LearningPattern> = self.patterns.values().collect();
        patterns.sort_by(|a, b| {
            b.emergence
                .partial_cmp(&a.emergence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        patterns
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

fn signature(task_type: &str, elements: &[String]) -> String {
    format!("{task_type}::{}", elements.join("+"))
}

/// Elements recurring in at least the given fraction of the sample, sorted.
/// An element counts once per experience no matter how often it repeats
/// inside one.
fn recurring_elements(sample: &[&AgentExperience], recurrence: f32) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for exp in sample {
        let unique: HashSet<String> = exp.elements().into_iter().collect();
        for element in unique {
            *counts.entry(element).or_default() += 1;
        }
    }
    // Small epsilon keeps exact fractions like 0.3 * 10 from rounding up.
    let cutoff = (recurrence * sample.len() as f32 - 1e-4).ceil().max(1.0) as usize;
    let mut recurring: Vec<String> = counts
        .into_iter()
        .filter(|(_, count)| *count >= cutoff)
        .map(|(element, _)| element)
        .collect();
    recurring.sort();
    recurring
}

#[cfg(test)]
mod tests {
    use super::*;

    fn similar_experience(agent: &str) -> AgentExperience {
        AgentExperience::new(agent, "debugging", "bisected the failing commit", true, 0.9)
            .with_context(vec!["stack_trace".to_string()])
    }

    #[test]
    fn test_below_threshold_detects_nothing() {
        let mut miner = PatternMiner::new();
        let config = LearningConfig::default();
        let experiences: Vec<AgentExperience> =
            (0..4).map(|_| similar_experience("agent-1")).collect();
        let sample: Vec<&AgentExperience> = experiences.iter().collect();

        assert!(miner.observe("agent-1", "debugging", &sample, &config, Utc::now()).is_none());
    }

    #[test]
    fn test_similar_successes_yield_one_pattern() {
        let mut miner = PatternMiner::new();
        let config = LearningConfig::default();
        let experiences: Vec<AgentExperience> =
            (0..6).map(|_| similar_experience("agent-1")).collect();
        let sample: Vec<&AgentExperience> = experiences.iter().collect();
        let now = Utc::now();

        let (pattern, is_new) = miner
            .observe("agent-1", "debugging", &sample, &config, now)
            .unwrap();
        assert!(is_new);
        assert_eq!(pattern.success_rate, 1.0);
        assert!(pattern.elements.contains(&"bisected the failing commit".to_string()));
        let first_id = pattern.pattern_id.clone();

        // The same regularity observed again updates rather than duplicates.
        let (pattern, is_new) = miner
            .observe("agent-2", "debugging", &sample, &config, now)
            .unwrap();
        assert!(!is_new);
        assert_eq!(pattern.pattern_id, first_id);
        assert_eq!(pattern.frequency, 7);
        assert_eq!(miner.len(), 1);
    }

    #[test]
    fn test_rare_elements_are_excluded() {
        let mut miner = PatternMiner::new();
        let config = LearningConfig::default();
        let mut experiences: Vec<AgentExperience> =
            (0..4).map(|_| similar_experience("agent-1")).collect();
        experiences.push(
            similar_experience("agent-1").with_context(vec!["one_off_tag".to_string()]),
        );
        let sample: Vec<&AgentExperience> = experiences.iter().collect();

        let (pattern, _) = miner
            .observe("agent-1", "debugging", &sample, &config, Utc::now())
            .unwrap();
        assert!(!pattern.elements.contains(&"one_off_tag".to_string()));
        assert!(pattern.elements.contains(&"stack_trace".to_string()));
    }

    #[test]
    fn test_nothing_recurs_detects_nothing() {
        let mut miner = PatternMiner::new();
        let config = LearningConfig::default();
        let experiences: Vec<AgentExperience> = (0..5)
            .map(|i| {
                AgentExperience::new("agent-1", "debugging", format!("approach {i}"), true, 0.5)
            })
            .collect();
        let sample: Vec<&AgentExperience> = experiences.iter().collect();

        assert!(miner.observe("agent-1", "debugging", &sample, &config, Utc::now()).is_none());
    }

    #[test]
    fn test_emergence_combines_rate_reward_and_frequency() {
        let mut miner = PatternMiner::new();
        let config = LearningConfig::default();
        let experiences: Vec<AgentExperience> =
            (0..5).map(|_| similar_experience("agent-1")).collect();
        let sample: Vec<&AgentExperience> = experiences.iter().collect();

        let (pattern, _) = miner
            .observe("agent-1", "debugging", &sample, &config, Utc::now())
            .unwrap();
        // 0.4 * 1.0 + 0.4 * 0.9 + 0.2 * (5 / 10) = 0.86
        assert!((pattern.emergence - 0.86).abs() < 1e-5);
    }

    #[test]
    fn test_validating_agents_accumulate() {
        let mut miner = PatternMiner::new();
        let config = LearningConfig::default();
        let first: Vec<AgentExperience> =
            (0..5).map(|_| similar_experience("agent-1")).collect();
        let second: Vec<AgentExperience> =
            (0..5).map(|_| similar_experience("agent-2")).collect();
        let now = Utc::now();

        let sample: Vec<&AgentExperience> = first.iter().collect();
        miner.observe("agent-1", "debugging", &sample, &config, now);
        let sample: Vec<&AgentExperience> = second.iter().collect();
        let (pattern, is_new) = miner
            .observe("agent-2", "debugging", &sample, &config, now)
            .unwrap();

        assert!(!is_new);
        assert_eq!(pattern.validating_agents.len(), 2);
        assert_eq!(pattern.discovered_by, "agent-1");
    }
}

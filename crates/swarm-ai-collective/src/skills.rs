//! Per-agent skill tracking: levels, confidence, and state classification.

use crate::types::{AgentId, SkillName};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Level at or above which an agent counts as proficient and may donate the
/// skill to others.
pub const PROFICIENT_LEVEL: f32 = 0.8;

/// Where a skill sits in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillState {
    /// No experience and no transfer yet
    Unseen,
    /// Level rising with practice
    Learning,
    /// Level at or above the proficiency bar, eligible as a transfer source
    Proficient,
    /// Received via transfer and not yet practiced
    Transferred,
}

/// One agent's standing in one skill.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillLevel {
    /// The skill this entry tracks
    pub skill: SkillName,

    /// Proficiency level from 0.0 to 1.0
    pub level: f32,

    /// Confidence in the level, an exponential moving average of success
    pub confidence: f32,

    /// Number of experiences that shaped this skill
    pub experience_count: u64,

    /// When the level last improved
    pub last_improved: DateTime<Utc>,

    /// Donor agent, when the skill arrived via transfer
    pub transferred_from: Option<AgentId>,
}

impl SkillLevel {
    pub fn new(skill: impl Into<String>) -> Self {
        Self {
            skill: skill.into(),
            level: 0.0,
            confidence: 0.0,
            experience_count: 0,
            last_improved: Utc::now(),
            transferred_from: None,
        }
    }

    /// Classify the skill's lifecycle state.
    pub fn state(&self) -> SkillState {
        if self.experience_count == 0 && self.transferred_from.is_some() {
            return SkillState::Transferred;
        }
        if self.level >= PROFICIENT_LEVEL {
            SkillState::Proficient
        } else if self.experience_count > 0 || self.level > 0.0 {
            SkillState::Learning
        } else {
            SkillState::Unseen
        }
    }

    /// Fold one experience into the skill. The gain shrinks with
    /// accumulated experience and is attenuated tenfold on failure.
    /// Returns the applied delta.
    pub fn apply_outcome(
        &mut self,
        success: bool,
        reward: f32,
        difficulty: f32,
        base_rate: f32,
        now: DateTime<Utc>,
    ) -> f32 {
        let mut delta =
            base_rate * reward * difficulty / ((self.experience_count + 1) as f32).sqrt();
        if !success {
            delta *= 0.1;
        }
        self.level = (self.level + delta).min(1.0);
        self.experience_count += 1;

        let alpha = 0.1;
        let success_value = if success { 1.0 } else { 0.0 };
        self.confidence = (1.0 - alpha) * self.confidence + alpha * success_value;

        if delta > 0.0 {
            self.last_improved = now;
        }
        delta
    }

    /// Whether this skill can be donated to another agent.
    pub fn is_transfer_source(&self) -> bool {
        self.level >= PROFICIENT_LEVEL
    }
}

/// Per-agent mapping from skill name to standing, plus transfer history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillProfile {
    /// The agent this profile belongs to
    pub agent_id: AgentId,

    /// Standing per skill
    pub skills: HashMap<SkillName, SkillLevel>,

    /// Times this agent donated a skill
    pub transfers_taught: u64,

    /// Times this agent received a skill
    pub transfers_received: u64,

    /// When the profile was created
    pub created_at: DateTime<Utc>,
}

impl SkillProfile {
    pub fn new(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            skills: HashMap::new(),
            transfers_taught: 0,
            transfers_received: 0,
            created_at: Utc::now(),
        }
    }

    pub fn skill(&self, name: &str) -> Option<&SkillLevel> {
        self.skills.get(name)
    }

    /// Get a skill entry, creating it if absent.
    pub fn skill_mut(&mut self, name: &str) -> &mut SkillLevel {
        self.skills
            .entry(name.to_string())
            .or_insert_with(|| SkillLevel::new(name))
    }

    /// Number of distinct skills with any standing.
    pub fn distinct_skills(&self) -> usize {
        self.skills.len()
    }

    /// Mean level across all tracked skills.
    pub fn avg_level(&self) -> f32 {
        if self.skills.is_empty() {
            return 0.0;
        }
        let total: f32 = self.skills.values().map(|skill| skill.level).sum();
        total / self.skills.len() as f32
    }

    /// Skills at or above the proficiency bar.
    pub fn proficient_skills(&self) -> Vec<&str> {
        self.skills
            .values()
            .filter(|skill| skill.is_transfer_source())
            .map(|skill| skill.skill.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_outcome_delta() {
        let mut skill = SkillLevel::new("code_generation");
        let now = Utc::now();

        // 0.1 * 1.0 * 0.5 / sqrt(1) = 0.05
        let delta = skill.apply_outcome(true, 1.0, 0.5, 0.1, now);
        assert!((delta - 0.05).abs() < 1e-6);
        assert!((skill.level - 0.05).abs() < 1e-6);
        assert_eq!(skill.experience_count, 1);
        assert_eq!(skill.last_improved, now);
    }

    #[test]
    fn test_failure_is_attenuated() {
        let mut success = SkillLevel::new("debugging");
        let mut failure = SkillLevel::new("debugging");
        let now = Utc::now();

        let success_delta = success.apply_outcome(true, 0.8, 0.5, 0.1, now);
        let failure_delta = failure.apply_outcome(false, 0.8, 0.5, 0.1, now);

        assert!((failure_delta - success_delta * 0.1).abs() < 1e-6);
        assert!(failure.confidence < success.confidence);
    }

    #[test]
    fn test_gain_shrinks_with_experience() {
        let mut skill = SkillLevel::new("testing");
        let now = Utc::now();

        let first = skill.apply_outcome(true, 1.0, 1.0, 0.1, now);
        let second = skill.apply_outcome(true, 1.0, 1.0, 0.1, now);
        assert!(second < first);
    }

    #[test]
    fn test_state_machine() {
        let mut skill = SkillLevel::new("refactoring");
        assert_eq!(skill.state(), SkillState::Unseen);

        let now = Utc::now();
        skill.apply_outcome(true, 0.9, 0.5, 0.1, now);
        assert_eq!(skill.state(), SkillState::Learning);

        skill.level = 0.85;
        assert_eq!(skill.state(), SkillState::Proficient);
        assert!(skill.is_transfer_source());

        let mut received = SkillLevel::new("refactoring");
        received.level = 0.4;
        received.transferred_from = Some("agent-1".to_string());
        assert_eq!(received.state(), SkillState::Transferred);

        // Practicing a transferred skill moves it back into learning.
        received.apply_outcome(true, 0.5, 0.5, 0.1, now);
        assert_eq!(received.state(), SkillState::Learning);
    }

    #[test]
    fn test_profile_aggregates() {
        let mut profile = SkillProfile::new("agent-1");
        let now = Utc::now();

        profile.skill_mut("code_generation").level = 0.9;
        profile.skill_mut("debugging").apply_outcome(true, 0.5, 0.5, 0.1, now);

        assert_eq!(profile.distinct_skills(), 2);
        assert!(profile.avg_level() > 0.4);
        assert_eq!(profile.proficient_skills(), vec!["code_generation"]);
        assert!(profile.skill("documentation").is_none());
    }
}

//! The collective learning engine: experiences in, skills and knowledge out.
//!
//! One logical caller drives the engine per task, so every operation is a
//! plain synchronous transformation over engine-owned state. `learn` is the
//! hot path; its optional enrichment steps (knowledge extraction, predictor
//! updates) fail soft so a bad step never loses the experience itself.

use crate::config::LearningConfig;
use crate::error::{CollectiveError, Result};
use crate::experience::{AgentExperience, ExperienceBuffer};
use crate::knowledge::{FragmentKind, KnowledgeFragment, KnowledgeStore};
use crate::patterns::{LearningPattern, PatternMiner};
use crate::predictor::{MomentumScorer, OutcomeScorer};
use crate::skills::{SkillProfile, SkillState, PROFICIENT_LEVEL};
use crate::types::{AgentId, ExperienceId, FragmentId, PatternId, SkillName};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use swarm_ai_clock::Clock;
use tokio::sync::broadcast;

/// A donor must lead the requester by this much before it counts as a
/// recommendation source.
const TRANSFER_MARGIN: f32 = 0.1;

/// Learning velocity is the success rate over this many latest experiences.
const RECENT_WINDOW: usize = 100;

/// A state change worth telling the rest of the swarm about. Broadcast to
/// subscribers; dropped silently when nobody listens.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningUpdate {
    /// A skill absorbed one more experience.
    SkillUpdated {
        agent_id: AgentId,
        skill: SkillName,
        level: f32,
        delta: f32,
    },
    /// A knowledge fragment entered the store.
    FragmentStored {
        fragment_id: FragmentId,
        domain: String,
        kind: FragmentKind,
    },
    /// A recurring behavior was detected for the first time.
    PatternDetected {
        pattern_id: PatternId,
        task_type: String,
        emergence: f32,
    },
    /// A skill was seeded into another agent.
    SkillTransferred {
        from_agent: AgentId,
        to_agent: AgentId,
        skill: SkillName,
        seeded_level: f32,
        efficiency: f32,
    },
}

/// What one `learn` call did, returned to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnReport {
    /// Id of the experience that was absorbed.
    pub experience_id: ExperienceId,
    /// Agent the experience belongs to.
    pub agent_id: AgentId,
    /// Skill that absorbed the experience (the task type).
    pub skill: SkillName,
    /// Skill level before the update.
    pub level_before: f32,
    /// Skill level after the update.
    pub level_after: f32,
    /// Where the skill stands after the update.
    pub skill_state: SkillState,
    /// Knowledge fragment extracted from this experience, if any.
    pub fragment_id: Option<FragmentId>,
    /// Pattern newly detected by this experience, if any. Re-detections of
    /// a known pattern refresh it without reporting here.
    pub pattern_id: Option<PatternId>,
}

/// A suggested skill transfer for an agent, ranked by priority.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillRecommendation {
    /// Skill worth acquiring or improving.
    pub skill: SkillName,
    /// The agent's current level in it.
    pub current_level: f32,
    /// Agents able to donate the skill.
    pub sources: Vec<AgentId>,
    /// Estimated level gain from the best donor after efficiency loss.
    pub expected_improvement: f32,
    /// Ranking score combining improvement, gap, and skill importance.
    pub priority: f32,
}

/// Aggregate view of the swarm's learning state. Recomputed from the
/// underlying stores on every maintenance tick, never hand-maintained.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LearningMetrics {
    /// Agents with at least one profile entry.
    pub agent_count: usize,
    /// Experiences currently held in the buffer.
    pub experience_count: usize,
    /// Knowledge fragments currently stored.
    pub fragment_count: usize,
    /// Distinct patterns detected so far.
    pub pattern_count: usize,
    /// Mean of per-agent average skill levels.
    pub avg_skill_level: f32,
    /// Success rate over the most recent experiences.
    pub learning_velocity: f32,
    /// Completed skill transfers across the swarm.
    pub transfer_count: u64,
    /// When these aggregates were last recomputed.
    pub updated_at: Option<DateTime<Utc>>,
}

/// Swarm-wide learning engine.
///
/// Owns the experience buffer, knowledge store, pattern miner, per-agent
/// skill profiles, and the outcome predictor. All state is in-memory with
/// bounded retention; nothing here persists across restarts.
#[derive(Debug)]
pub struct CollectiveLearning {
    config: LearningConfig,
    buffer: ExperienceBuffer,
    store: KnowledgeStore,
    miner: PatternMiner,
    profiles: HashMap<AgentId, SkillProfile>,
    predictor: Box<dyn OutcomeScorer>,
    metrics: LearningMetrics,
    clock: Arc<dyn Clock>,
    events: broadcast::Sender<LearningUpdate>,
}

impl CollectiveLearning {
    /// Create an engine with the default momentum scorer.
    pub fn new(config: LearningConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        Self::with_scorer(config, clock, Box::new(MomentumScorer::new()))
    }

    /// Create an engine with a caller-supplied outcome scorer.
    pub fn with_scorer(
        config: LearningConfig,
        clock: Arc<dyn Clock>,
        predictor: Box<dyn OutcomeScorer>,
    ) -> Result<Self> {
        config.validate()?;
        let (events, _) = broadcast::channel(100);
        let buffer = ExperienceBuffer::new(config.buffer_capacity);
        Ok(Self {
            config,
            buffer,
            store: KnowledgeStore::new(),
            miner: PatternMiner::new(),
            profiles: HashMap::new(),
            predictor,
            metrics: LearningMetrics::default(),
            clock,
            events,
        })
    }

    /// Subscribe to learning updates.
    pub fn subscribe(&self) -> broadcast::Receiver<LearningUpdate> {
        self.events.subscribe()
    }

    /// Aggregates as of the last maintenance tick.
    pub fn metrics(&self) -> &LearningMetrics {
        &self.metrics
    }

    /// Skill profile of one agent.
    pub fn profile(&self, agent_id: &str) -> Option<&SkillProfile> {
        self.profiles.get(agent_id)
    }

    /// Detected patterns, strongest emergence first.
    pub fn patterns(&self) -> Vec<&LearningPattern> {
        self.miner.patterns()
    }

    /// The knowledge store.
    pub fn store(&self) -> &KnowledgeStore {
        &self.store
    }

    /// The experience buffer.
    pub fn buffer(&self) -> &ExperienceBuffer {
        &self.buffer
    }

    /// Current configuration.
    pub fn config(&self) -> &LearningConfig {
        &self.config
    }

    /// Replace the configuration. The buffer shrinks immediately when the
    /// new capacity is smaller, evicting oldest entries first.
    pub fn set_config(&mut self, config: LearningConfig) -> Result<()> {
        config.validate()?;
        self.buffer.set_capacity(config.buffer_capacity);
        self.config = config;
        Ok(())
    }

    /// Absorb one experience.
    ///
    /// Updates the agent's skill for the experience's task type, extracts a
    /// solution fragment from high-reward successes, appends to the buffer,
    /// runs pattern detection over a reward- and recency-weighted sample of
    /// the same task type, and feeds the outcome predictor. Extraction and
    /// predictor failures are logged and swallowed.
    pub fn learn(&mut self, experience: AgentExperience) -> LearnReport {
        let now = self.clock.now();
        let experience_id = experience.experience_id.clone();
        let agent_id = experience.agent_id.clone();
        let skill = experience.task_type.clone();
        let success = experience.success;
        let reward = experience.reward;
        let difficulty = experience.difficulty;
        let features = self.predictor.encode(&experience);

        let profile = self
            .profiles
            .entry(agent_id.clone())
            .or_insert_with(|| SkillProfile::new(agent_id.clone()));
        let state = profile.skill_mut(&skill);
        let level_before = state.level;
        let delta = state.apply_outcome(success, reward, difficulty, self.config.base_rate, now);
        let level_after = state.level;
        let skill_state = state.state();
        let _ = self.events.send(LearningUpdate::SkillUpdated {
            agent_id: agent_id.clone(),
            skill: skill.clone(),
            level: level_after,
            delta,
        });

        let mut fragment_id = None;
        if success && reward > self.config.extraction_min_reward {
            match solution_fragment(&experience, now) {
                Ok(fragment) => {
                    let domain = fragment.domain.clone();
                    let id = self.store.insert(fragment);
                    let _ = self.events.send(LearningUpdate::FragmentStored {
                        fragment_id: id.clone(),
                        domain,
                        kind: FragmentKind::Solution,
                    });
                    fragment_id = Some(id);
                }
                Err(error) => {
                    tracing::warn!(%error, %experience_id, "knowledge extraction failed");
                }
            }
        }

        self.buffer.push(experience);

        let mut rng = rand::thread_rng();
        let sample = self.buffer.sample_weighted(&skill, self.config.pattern_sample, now, &mut rng);
        let mined = self
            .miner
            .observe(&agent_id, &skill, &sample, &self.config, now)
            .map(|(pattern, is_new)| (pattern.clone(), is_new));

        let mut pattern_id = None;
        if let Some((pattern, true)) = mined {
            let _ = self.events.send(LearningUpdate::PatternDetected {
                pattern_id: pattern.pattern_id.clone(),
                task_type: pattern.task_type.clone(),
                emergence: pattern.emergence,
            });
            match serde_json::to_value(&pattern) {
                Ok(content) => {
                    let mirror = KnowledgeFragment::new(
                        FragmentKind::Pattern,
                        pattern.task_type.clone(),
                        content,
                        pattern.discovered_by.clone(),
                    )
                    .with_confidence(pattern.emergence)
                    .with_created_at(now);
                    let id = self.store.insert(mirror);
                    let _ = self.events.send(LearningUpdate::FragmentStored {
                        fragment_id: id,
                        domain: pattern.task_type.clone(),
                        kind: FragmentKind::Pattern,
                    });
                }
                Err(error) => {
                    tracing::warn!(%error, "pattern fragment encoding failed");
                }
            }
            pattern_id = Some(pattern.pattern_id);
        }

        if let Err(error) = self.predictor.update(&features, reward) {
            tracing::warn!(%error, "predictor update failed");
        }

        LearnReport {
            experience_id,
            agent_id,
            skill,
            level_before,
            level_after,
            skill_state,
            fragment_id,
            pattern_id,
        }
    }

    /// Seed one agent's skill from another's.
    ///
    /// Requires a proficient, confident donor and recorded knowledge for
    /// the skill's domain. The seeded level is the donor's scaled by a
    /// transfer efficiency built from the donor's teaching history and the
    /// receiver's adaptability. Returns `false` without mutating anything
    /// when any requirement fails or the receiver would not improve.
    pub fn transfer_skill(&mut self, from: &str, to: &str, skill: &str) -> bool {
        let now = self.clock.now();

        let Some(source) = self.profiles.get(from).and_then(|p| p.skill(skill)) else {
            tracing::warn!(from, to, skill, "transfer refused: donor has no such skill");
            return false;
        };
        if !source.is_transfer_source() {
            tracing::warn!(from, to, skill, "transfer refused: donor is not proficient");
            return false;
        }
        if source.confidence < self.config.min_transfer_confidence {
            tracing::warn!(from, to, skill, "transfer refused: donor confidence too low");
            return false;
        }
        let source_level = source.level;
        let source_confidence = source.confidence;

        let fragment_ids: Vec<FragmentId> = self
            .store
            .for_domain(skill)
            .iter()
            .take(3)
            .map(|fragment| fragment.fragment_id.clone())
            .collect();
        if fragment_ids.is_empty() {
            tracing::warn!(from, to, skill, "transfer refused: no knowledge for the skill");
            return false;
        }

        let efficiency = self.transfer_efficiency(from, to);
        let seeded_level = source_level * efficiency;
        let current = self
            .profiles
            .get(to)
            .and_then(|p| p.skill(skill))
            .map_or(0.0, |s| s.level);
        if seeded_level <= current {
            tracing::warn!(from, to, skill, "transfer refused: receiver would not improve");
            return false;
        }

        let receiver = self
            .profiles
            .entry(to.to_string())
            .or_insert_with(|| SkillProfile::new(to));
        let state = receiver.skill_mut(skill);
        state.level = seeded_level;
        state.confidence = source_confidence * self.config.transfer_confidence_discount;
        state.transferred_from = Some(from.to_string());
        state.last_improved = now;
        receiver.transfers_received += 1;
        if let Some(donor) = self.profiles.get_mut(from) {
            donor.transfers_taught += 1;
        }
        for fragment_id in &fragment_ids {
            self.store.record_use(fragment_id, true, now);
        }

        let _ = self.events.send(LearningUpdate::SkillTransferred {
            from_agent: from.to_string(),
            to_agent: to.to_string(),
            skill: skill.to_string(),
            seeded_level,
            efficiency,
        });
        true
    }

    /// Rank the transfers most worth making for an agent.
    ///
    /// Considers every skill known anywhere in the swarm that the agent has
    /// not yet mastered, and keeps the ones a confident donor leads by a
    /// margin.
    pub fn recommend_skills(&self, agent_id: &str) -> Vec<SkillRecommendation> {
        let own = self.profiles.get(agent_id);
        let mut known: Vec<&str> = self
            .profiles
            .values()
            .flat_map(|profile| profile.skills.keys().map(String::as_str))
            .collect();
        known.sort_unstable();
        known.dedup();

        let mut recommendations = Vec::new();
        for skill in known {
            let current = own.and_then(|p| p.skill(skill)).map_or(0.0, |s| s.level);
            if current >= PROFICIENT_LEVEL {
                continue;
            }
            let mut sources = Vec::new();
            let mut best_level: f32 = 0.0;
            let mut efficiency_sum = 0.0;
            for (donor_id, profile) in &self.profiles {
                if donor_id == agent_id {
                    continue;
                }
                let Some(state) = profile.skill(skill) else {
                    continue;
                };
                if state.level <= current + TRANSFER_MARGIN
                    || state.confidence < self.config.min_transfer_confidence
                {
                    continue;
                }
                sources.push(donor_id.clone());
                best_level = best_level.max(state.level);
                efficiency_sum += self.transfer_efficiency(donor_id, agent_id);
            }
            if sources.is_empty() {
                continue;
            }
            sources.sort_unstable();
            let avg_efficiency = efficiency_sum / sources.len() as f32;
            let expected_improvement = (best_level - current) * avg_efficiency;
            let priority = 0.5 * expected_improvement
                + 0.3 * (PROFICIENT_LEVEL - current)
                + 0.2 * self.config.importance_for(skill);
            recommendations.push(SkillRecommendation {
                skill: skill.to_string(),
                current_level: current,
                sources,
                expected_improvement,
                priority,
            });
        }
        recommendations.sort_by(|a, b| {
            b.priority
                .partial_cmp(&a.priority)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        recommendations
    }

    /// Train the outcome predictor on a batch of experiences. Best-effort:
    /// failed updates are logged and skipped. Returns how many were applied.
    pub fn train_predictor(&mut self, batch: &[AgentExperience]) -> usize {
        let mut trained = 0;
        for experience in batch {
            let features = self.predictor.encode(experience);
            match self.predictor.update(&features, experience.reward) {
                Ok(()) => trained += 1,
                Err(error) => {
                    tracing::warn!(%error, "predictor update failed");
                }
            }
        }
        trained
    }

    /// Predicted success likelihood for a prospective experience.
    pub fn predict_success(&self, experience: &AgentExperience) -> f32 {
        let features = self.predictor.encode(experience);
        self.predictor.predict(&features)
    }

    /// Periodic upkeep: evict knowledge fragments that are both stale and
    /// rarely used, then recompute aggregate metrics. Returns the number of
    /// fragments evicted. Only ever removes unused entries, so it is safe
    /// to run between any two task-driven calls.
    pub fn run_maintenance(&mut self) -> usize {
        let now = self.clock.now();
        let evicted = self.store.decay(
            now,
            Duration::days(self.config.retention_days),
            self.config.min_fragment_uses,
        );
        if evicted > 0 {
            tracing::debug!(evicted, "evicted stale knowledge fragments");
        }
        self.recompute_metrics(now);
        evicted
    }

    /// Transfer efficiency from one agent to another: a base of 0.5, plus
    /// up to 0.2 for the donor's teaching history, plus up to 0.3 for the
    /// receiver's adaptability (share of the swarm's known skills it
    /// already holds).
    fn transfer_efficiency(&self, from: &str, to: &str) -> f32 {
        let taught = self.profiles.get(from).map_or(0, |p| p.transfers_taught);
        let known: HashSet<&str> = self
            .profiles
            .values()
            .flat_map(|profile| profile.skills.keys().map(String::as_str))
            .collect();
        let held = self.profiles.get(to).map_or(0, SkillProfile::distinct_skills);
        let adaptability = if known.is_empty() {
            0.0
        } else {
            held as f32 / known.len() as f32
        };
        0.5 + (taught as f32 * 0.02).min(0.2) + 0.3 * adaptability
    }

    fn recompute_metrics(&mut self, now: DateTime<Utc>) {
        let recent = self.buffer.recent(RECENT_WINDOW);
        let learning_velocity = if recent.is_empty() {
            0.0
        } else {
            recent.iter().filter(|exp| exp.success).count() as f32 / recent.len() as f32
        };
        let avg_skill_level = if self.profiles.is_empty() {
            0.0
        } else {
            self.profiles.values().map(SkillProfile::avg_level).sum::<f32>()
                / self.profiles.len() as f32
        };
        self.metrics = LearningMetrics {
            agent_count: self.profiles.len(),
            experience_count: self.buffer.len(),
            fragment_count: self.store.len(),
            pattern_count: self.miner.len(),
            avg_skill_level,
            learning_velocity,
            transfer_count: self.profiles.values().map(|p| p.transfers_taught).sum(),
            updated_at: Some(now),
        };
    }
}

/// Summarize a high-reward success as a reusable solution fragment.
fn solution_fragment(
    experience: &AgentExperience,
    now: DateTime<Utc>,
) -> Result<KnowledgeFragment> {
    #[derive(Serialize)]
    struct Summary<'a> {
        action: &'a str,
        context: &'a [String],
        result: &'a str,
        reward: f32,
    }
    let content = serde_json::to_value(Summary {
        action: &experience.action,
        context: &experience.context,
        result: &experience.result,
        reward: experience.reward,
    })
    .map_err(|error| CollectiveError::Extraction(error.to_string()))?;
    Ok(KnowledgeFragment::new(
        FragmentKind::Solution,
        experience.task_type.clone(),
        content,
        experience.agent_id.clone(),
    )
    .with_confidence(experience.reward)
    .with_created_at(now))
}

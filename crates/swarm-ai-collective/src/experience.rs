//! Experience records and the bounded, indexed buffer that holds them.

use crate::types::{AgentId, ExperienceId};
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// Days after which an experience's recency weight bottoms out.
const RECENCY_HORIZON_DAYS: f32 = 30.0;

/// One recorded attempt at a task. Append-only: experiences feed skill
/// updates and pattern mining but are never edited after the fact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentExperience {
    /// Unique experience identifier
    pub experience_id: ExperienceId,

    /// The agent that made the attempt
    pub agent_id: AgentId,

    /// Type of task attempted, e.g. "code_generation"
    pub task_type: String,

    /// Context elements describing the situation (tags, inputs, tools)
    pub context: Vec<String>,

    /// The action the agent took
    pub action: String,

    /// Short description of the outcome
    pub result: String,

    /// Whether the attempt succeeded
    pub success: bool,

    /// Scalar reward in [0, 1]
    pub reward: f32,

    /// Task difficulty in [0, 1]
    pub difficulty: f32,

    /// Wall time the attempt took
    pub duration_ms: u64,

    /// Resource cost of the attempt
    pub cost: f64,

    /// When the attempt happened
    pub occurred_at: DateTime<Utc>,
}

impl AgentExperience {
    /// Create an experience record with neutral defaults for the optional
    /// fields.
    pub fn new(
        agent_id: impl Into<String>,
        task_type: impl Into<String>,
        action: impl Into<String>,
        success: bool,
        reward: f32,
    ) -> Self {
        Self {
            experience_id: uuid::Uuid::new_v4().to_string(),
            agent_id: agent_id.into(),
            task_type: task_type.into(),
            context: Vec::new(),
            action: action.into(),
            result: String::new(),
            success,
            reward: reward.clamp(0.0, 1.0),
            difficulty: 0.5,
            duration_ms: 0,
            cost: 0.0,
            occurred_at: Utc::now(),
        }
    }

    /// Set the context elements.
    pub fn with_context(mut self, context: Vec<String>) -> Self {
        self.context = context;
        self
    }

    /// Set the outcome description.
    pub fn with_result(mut self, result: impl Into<String>) -> Self {
        self.result = result.into();
        self
    }

    /// Set the task difficulty, clamped to [0, 1].
    pub fn with_difficulty(mut self, difficulty: f32) -> Self {
        self.difficulty = difficulty.clamp(0.0, 1.0);
        self
    }

    /// Set the attempt duration.
    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    /// Set the resource cost.
    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = cost;
        self
    }

    /// Override the attempt timestamp.
    pub fn with_occurred_at(mut self, at: DateTime<Utc>) -> Self {
        self.occurred_at = at;
        self
    }

    /// The action plus context elements, the unit of pattern mining.
    pub fn elements(&self) -> Vec<String> {
        let mut elements = vec![self.action.clone()];
        elements.extend(self.context.iter().cloned());
        elements
    }
}

/// Bounded, indexed log of experiences. Entries are keyed by a monotonic
/// sequence number; the oldest entry evicts first at capacity.
#[derive(Debug)]
pub struct ExperienceBuffer {
    capacity: usize,
    next_seq: u64,
    entries: HashMap<u64, AgentExperience>,
    order: VecDeque<u64>,
    by_task_type: HashMap<String, Vec<u64>>,
    by_agent: HashMap<String, Vec<u64>>,
}

impl ExperienceBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            next_seq: 0,
            entries: HashMap::new(),
            order: VecDeque::new(),
            by_task_type: HashMap::new(),
            by_agent: HashMap::new(),
        }
    }

    /// Append an experience, evicting the oldest entry at capacity.
    pub fn push(&mut self, experience: AgentExperience) -> u64 {
        while self.entries.len() >= self.capacity {
            self.evict_oldest();
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.by_task_type
            .entry(experience.task_type.clone())
            .or_default()
            .push(seq);
        self.by_agent
            .entry(experience.agent_id.clone())
            .or_default()
            .push(seq);
        self.entries.insert(seq, experience);
        self.order.push_back(seq);
        seq
    }

    fn evict_oldest(&mut self) {
        let Some(seq) = self.order.pop_front() else {
            return;
        };
        if let Some(dropped) = self.entries.remove(&seq) {
            remove_seq(&mut self.by_task_type, &dropped.task_type, seq);
            remove_seq(&mut self.by_agent, &dropped.agent_id, seq);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Change the capacity, evicting oldest entries if shrinking.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        while self.entries.len() > self.capacity {
            self.evict_oldest();
        }
    }

    /// How many buffered experiences share a task type.
    pub fn count_for_task_type(&self, task_type: &str) -> usize {
        self.by_task_type.get(task_type).map_or(0, Vec::len)
    }

    /// All buffered experiences of a task type, oldest first.
    pub fn for_task_type(&self, task_type: &str) -> Vec<&AgentExperience> {
        self.by_task_type
            .get(task_type)
            .map(|seqs| seqs.iter().filter_map(|seq| self.entries.get(seq)).collect())
            .unwrap_or_default()
    }

    /// All buffered experiences for an agent, oldest first.
    pub fn for_agent(&self, agent_id: &str) -> Vec<&AgentExperience> {
        self.by_agent
            .get(agent_id)
            .map(|seqs| seqs.iter().filter_map(|seq| self.entries.get(seq)).collect())
            .unwrap_or_default()
    }

    /// The most recent `n` experiences, newest first.
    pub fn recent(&self, n: usize) -> Vec<&AgentExperience> {
        self.order
            .iter()
            .rev()
            .take(n)
            .filter_map(|seq| self.entries.get(seq))
            .collect()
    }

    /// Sample up to `n` experiences of a task type without replacement,
    /// weighted by reward and recency. Returns every candidate when `n`
    /// covers them all, which keeps small-sample mining deterministic.
    pub fn sample_weighted<R: Rng>(
        &self,
        task_type: &str,
        n: usize,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Vec<&AgentExperience> {
        let candidates = self.for_task_type(task_type);
        if candidates.len() <= n {
            return candidates;
        }
        let mut pool: Vec<(f32, &AgentExperience)> = candidates
            .into_iter()
            .map(|exp| (sampling_weight(exp, now), exp))
            .collect();
        let mut picked = Vec::with_capacity(n);
        while picked.len() < n && !pool.is_empty() {
            let total: f32 = pool.iter().map(|(weight, _)| weight).sum();
            let mut roll = rng.gen_range(0.0..total);
            let mut index = pool.len() - 1;
            for (i, (weight, _)) in pool.iter().enumerate() {
                if roll < *weight {
                    index = i;
                    break;
                }
                roll -= weight;
            }
            picked.push(pool.swap_remove(index).1);
        }
        picked
    }
}

/// Reward- and recency-weighted sampling weight. Both factors are floored
/// at 0.1 so stale or low-reward experiences stay reachable.
fn sampling_weight(experience: &AgentExperience, now: DateTime<Utc>) -> f32 {
    let age_days = (now - experience.occurred_at).num_seconds().max(0) as f32 / 86_400.0;
    experience.reward.max(0.1) * (1.0 - age_days / RECENCY_HORIZON_DAYS).max(0.1)
}

fn remove_seq(index: &mut HashMap<String, Vec<u64>>, key: &str, seq: u64) {
    if let Some(seqs) = index.get_mut(key) {
        if let Ok(pos) = seqs.binary_search(&seq) {
            seqs.remove(pos);
        }
        if seqs.is_empty() {
            index.remove(key);
        }
    }
}

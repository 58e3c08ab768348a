//! Collective learning for swarm-ai agents.
//!
//! This crate lets a swarm get better at what it does, enabling:
//!
//! - **Experience Capture**: Every task attempt lands in a bounded buffer
//!   and updates the acting agent's skill profile
//! - **Knowledge Extraction**: High-reward successes become reusable
//!   fragments, retrievable by domain and kind
//! - **Pattern Mining**: Recurring behaviors across sampled experiences
//!   surface as patterns scored by an emergence measure
//! - **Skill Transfer**: Proficient agents seed their skills into weaker
//!   ones, with efficiency loss and discounted confidence
//!
//! # Architecture
//!
//! The engine is a single-writer component: one logical caller (the
//! coordinator) drives it per task. Time comes from an injected clock so
//! recency weighting and knowledge decay are deterministically testable.
//! Enrichment steps inside `learn` fail soft; a failed transfer is a
//! `false` return, not an error.
//!
//! # Usage
//!
//! ```ignore
//! use swarm_ai_collective::{AgentExperience, CollectiveLearning, LearningConfig};
//!
//! let mut learning = CollectiveLearning::new(LearningConfig::default(), clock)?;
//!
//! // Absorb a task outcome
//! let experience = AgentExperience::new("agent-1", "debugging", "bisected the bad commit", true, 0.9);
//! let report = learning.learn(experience);
//!
//! // Spread what agent-1 knows
//! if learning.transfer_skill("agent-1", "agent-2", "debugging") {
//!     println!("seeded debugging into agent-2");
//! }
//! for rec in learning.recommend_skills("agent-3") {
//!     println!("{} (priority {:.2})", rec.skill, rec.priority);
//! }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod experience;
pub mod knowledge;
pub mod patterns;
pub mod predictor;
pub mod skills;
pub mod types;

// Re-export main types for convenience
pub use config::{EmergenceWeights, LearningConfig};
pub use engine::{
    CollectiveLearning, LearnReport, LearningMetrics, LearningUpdate, SkillRecommendation,
};
pub use error::{CollectiveError, Result};
pub use experience::{AgentExperience, ExperienceBuffer};
pub use knowledge::{FragmentKind, KnowledgeFragment, KnowledgeStore};
pub use patterns::{LearningPattern, PatternMiner};
pub use predictor::{MomentumScorer, OutcomeScorer};
pub use skills::{SkillLevel, SkillProfile, SkillState, PROFICIENT_LEVEL};
pub use types::{AgentId, ExperienceId, FragmentId, PatternId, SkillName};

//! Cost optimization, quality validation, and collective learning for
//! multi-agent swarms.
//!
//! This facade crate wires the three engines together:
//!
//! - [`optimizer`]: cost tracking, budget alerts, resource selection, and
//!   cost-saving strategies
//! - [`validator`]: static multi-dimensional quality scoring of produced
//!   artifacts
//! - [`collective`]: experience capture, knowledge extraction, pattern
//!   mining, and skill transfer
//!
//! [`SwarmCoordinator`] drives all three per task; model execution stays
//! behind the caller-supplied [`ModelInvoker`] seam.
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use swarm_ai::{ResourceProfile, SwarmConfig, SwarmCoordinator, SystemClock, TaskSpec};
//!
//! swarm_ai::init_tracing();
//!
//! let clock = Arc::new(SystemClock::new());
//! let mut coordinator = SwarmCoordinator::new(SwarmConfig::default(), invoker, clock)?;
//! coordinator.register_resource(ResourceProfile::new("fast-small", "Fast Small", 0.001))?;
//!
//! let task = TaskSpec::new("code_review", "Review the parser module");
//! let report = coordinator.run_task(&task, "agent-1", 1500).await?;
//! println!("quality {:?}", report.validation.map(|v| v.quality_score));
//! ```

pub use swarm_ai_clock as clock;
pub use swarm_ai_collective as collective;
pub use swarm_ai_optimizer as optimizer;
pub use swarm_ai_validator as validator;

pub mod coordinator;

// Re-export main types for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use collective::{AgentExperience, CollectiveLearning, LearningConfig, SkillRecommendation};
pub use coordinator::{
    BatchedOutcome, ModelInvoker, ModelOutput, SwarmConfig, SwarmCoordinator, TaskReport,
};
pub use optimizer::{CostAlert, CostOptimizer, OptimizerConfig, ResourceProfile, TaskSpec};
pub use validator::{Artifact, QualityValidator, ValidationResult, ValidatorConfig};

/// Initialize structured logging for binaries embedding the swarm core.
///
/// Honors `RUST_LOG`; defaults to `info`. Calling it more than once is
/// harmless.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

//! Cost-aware optimization for swarm-ai agents.
//!
//! This crate keeps a swarm's model spend under control, enabling:
//!
//! - **Cost Tracking**: Every invocation is recorded and broken down by
//!   resource, agent, task, and day
//! - **Budget Alerts**: Daily, monthly, per-task, and per-agent thresholds
//!   fire structured alerts instead of failing tasks
//! - **Resource Selection**: Tasks run on the cheapest resource that covers
//!   their derived capability requirements
//! - **Saving Strategies**: Context compression, result caching, batching,
//!   and fallback routing kick in under spend pressure
//!
//! # Architecture
//!
//! The optimizer is a single-writer component: one logical caller (the
//! coordinator) drives it per task. Time comes from an injected clock so
//! window and TTL behavior is deterministically testable.
//!
//! # Usage
//!
//! ```ignore
//! use swarm_ai_optimizer::{CostOptimizer, OptimizerConfig, ResourceProfile, TaskSpec};
//!
//! let mut optimizer = CostOptimizer::new(OptimizerConfig::default(), clock)?;
//! optimizer.register_resource(ResourceProfile::new("fast-small", "Fast Small", 0.001))?;
//!
//! // Decide how to run a task
//! let task = TaskSpec::new("code_review", "Review the parser module");
//! let decision = optimizer.optimize(&task, "agent-1", 1500)?;
//!
//! // Record what it actually cost
//! let alerts = optimizer.record_cost("agent-1", &task.task_id, &decision.resource_id, 1500, 0.45);
//! ```

pub mod batch;
pub mod cache;
pub mod compress;
pub mod config;
pub mod error;
pub mod metrics;
pub mod optimizer;
pub mod resources;
pub mod strategy;
pub mod task;

// Re-export main types for convenience
pub use batch::{Batch, BatchQueue};
pub use cache::{CachedResult, ResultCache};
pub use compress::{compress_context, estimate_units};
pub use config::{CostLimits, OptimizerConfig, SelectionWeights, StrategySavings};
pub use error::{OptimizerError, Result};
pub use metrics::{CostMetrics, CostRecord};
pub use optimizer::{
    AlertLevel, BudgetScope, CostAlert, CostOptimizer, OptimizationDecision, SelectionReport,
};
pub use resources::{Capability, ResourceId, ResourceProfile, ResourceRegistry};
pub use strategy::{OptimizationStrategy, StrategyKind};
pub use task::{derive_requirements, TaskComplexity, TaskId, TaskSpec};

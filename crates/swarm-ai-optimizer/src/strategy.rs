//! Cost-saving strategies and the per-task selection pass.
//!
//! Strategies are stateless policies: the selection pass names which ones
//! apply to a task, and the caller carries them out (compressing context,
//! consulting the cache, batching the call).

use crate::config::OptimizerConfig;
use crate::task::{TaskComplexity, TaskSpec};
use serde::{Deserialize, Serialize};

/// The named cost-saving remediations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Shrink oversized context before invocation
    ContextCompression,
    /// Re-run resource selection with spend pressure applied
    ResourceReselection,
    /// Coalesce nearby calls into one execution
    Batching,
    /// Serve repeatable tasks from the result cache
    Caching,
    /// Route simple work to the cheapest resource
    Fallback,
}

impl StrategyKind {
    /// Application order; lower runs first.
    pub fn priority(&self) -> u8 {
        match self {
            StrategyKind::ContextCompression => 1,
            StrategyKind::ResourceReselection => 2,
            StrategyKind::Batching => 3,
            StrategyKind::Caching => 4,
            StrategyKind::Fallback => 5,
        }
    }
}

/// A strategy selected for a specific task, with its expected saving.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationStrategy {
    /// Which remediation to apply
    pub kind: StrategyKind,

    /// Application order; lower runs first
    pub priority: u8,

    /// Expected saving as a percentage of the task's estimated cost
    pub estimated_saving_pct: f64,

    /// Why this strategy was selected
    pub reason: String,
}

impl OptimizationStrategy {
    fn new(kind: StrategyKind, estimated_saving_pct: f64, reason: impl Into<String>) -> Self {
        Self {
            kind,
            priority: kind.priority(),
            estimated_saving_pct,
            reason: reason.into(),
        }
    }
}

/// Select the strategies that apply to a task.
///
/// Each trigger is independent. When `forced` is set (emergency mode or a
/// throttled agent) every strategy is applied regardless of triggers.
pub fn select_strategies(
    task: &TaskSpec,
    estimated_units: u64,
    daily_spent: f64,
    config: &OptimizerConfig,
    forced: bool,
) -> Vec<OptimizationStrategy> {
    let savings = &config.savings;
    let mut strategies = Vec::new();

    if forced || estimated_units > config.compression_threshold_units {
        strategies.push(OptimizationStrategy::new(
            StrategyKind::ContextCompression,
            savings.context_compression,
            format!(
                "estimated {} units exceeds the {} unit compression threshold",
                estimated_units, config.compression_threshold_units
            ),
        ));
    }

    if forced || daily_spent > config.limits.daily_limit / 2.0 {
        strategies.push(OptimizationStrategy::new(
            StrategyKind::ResourceReselection,
            savings.resource_reselection,
            format!(
                "daily spend {:.2} is past half the {:.2} daily limit",
                daily_spent, config.limits.daily_limit
            ),
        ));
    }

    if forced {
        strategies.push(OptimizationStrategy::new(
            StrategyKind::Batching,
            savings.batching,
            "spend pressure forces batched execution",
        ));
    }

    if forced || task.repeatable {
        strategies.push(OptimizationStrategy::new(
            StrategyKind::Caching,
            savings.caching,
            "task is repeatable so results can be cached",
        ));
    }

    if forced || task.complexity == TaskComplexity::Simple {
        strategies.push(OptimizationStrategy::new(
            StrategyKind::Fallback,
            savings.fallback,
            "simple task can run on the cheapest resource",
        ));
    }

    strategies.sort_by_key(|s| s.priority);
    strategies
}

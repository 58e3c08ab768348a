//! The cost optimizer: budget tracking, resource selection, and per-task
//! optimization decisions.
//!
//! Budget breaches are never errors. They surface as `CostAlert` values,
//! returned to the caller and broadcast to subscribers, while subsequent
//! selections are biased toward cheaper resources.

use crate::cache::ResultCache;
use crate::compress;
use crate::config::OptimizerConfig;
use crate::error::{OptimizerError, Result};
use crate::metrics::{CostMetrics, CostRecord};
use crate::resources::{Capability, ResourceId, ResourceProfile, ResourceRegistry};
use crate::strategy::{select_strategies, OptimizationStrategy};
use crate::task::{derive_requirements, TaskId, TaskSpec};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use swarm_ai_clock::Clock;
use tokio::sync::broadcast;

/// How serious a budget alert is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    /// Spend is approaching a limit
    Warning,
    /// Spend reached or exceeded a limit
    Critical,
}

/// Which budget band an alert refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetScope {
    Daily,
    Monthly,
    PerTask,
    PerAgent,
}

/// A budget threshold crossing, reported as a value and broadcast to
/// subscribers. Never raised as an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostAlert {
    /// Severity of the crossing
    pub level: AlertLevel,

    /// Budget band that was crossed
    pub scope: BudgetScope,

    /// What the band applies to: a day, a month, an agent id, or a task id
    pub subject: String,

    /// Spend at the moment the alert fired
    pub spent: f64,

    /// The configured limit for the band
    pub limit: f64,

    /// Human-readable description
    pub message: String,

    /// When the alert fired
    pub raised_at: DateTime<Utc>,
}

impl CostAlert {
    fn new(
        level: AlertLevel,
        scope: BudgetScope,
        subject: impl Into<String>,
        spent: f64,
        limit: f64,
        message: impl Into<String>,
        raised_at: DateTime<Utc>,
    ) -> Self {
        Self {
            level,
            scope,
            subject: subject.into(),
            spent,
            limit,
            message: message.into(),
            raised_at,
        }
    }
}

/// Outcome of a resource selection pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionReport {
    /// The chosen resource
    pub resource_id: ResourceId,

    /// Weighted score of the chosen resource (0 to 1)
    pub score: f64,

    /// Whether no resource qualified and the cheapest was used instead
    pub fallback: bool,

    /// Human-readable explanation of the choice
    pub reasoning: String,

    /// The requirements the selection had to cover
    pub requirements: Vec<Capability>,
}

/// The full optimization decision for one task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationDecision {
    /// Task the decision applies to
    pub task_id: TaskId,

    /// Resource the task should run on
    pub resource_id: ResourceId,

    /// Estimated cost of running the task there
    pub estimated_cost: f64,

    /// Strategies to apply, in priority order
    pub strategies: Vec<OptimizationStrategy>,

    /// Expected saving from the strategies, in currency
    pub projected_savings: f64,

    /// The selection pass that produced the resource
    pub selection: SelectionReport,

    /// When the decision was made
    pub decided_at: DateTime<Utc>,
}

/// Cost-aware task optimizer. Owns the cost ledger, the resource registry,
/// and the result cache; driven by a single logical caller.
#[derive(Debug)]
pub struct CostOptimizer {
    config: OptimizerConfig,
    registry: ResourceRegistry,
    metrics: CostMetrics,
    history: Vec<CostRecord>,
    cache: ResultCache,
    clock: Arc<dyn Clock>,
    events: broadcast::Sender<CostAlert>,
    throttled_agents: HashSet<String>,
}

impl CostOptimizer {
    /// Create an optimizer with the given configuration and clock.
    pub fn new(config: OptimizerConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        let (events, _) = broadcast::channel(100);
        let cache = ResultCache::new(config.cache_ttl_secs);
        Ok(Self {
            config,
            registry: ResourceRegistry::new(),
            metrics: CostMetrics::default(),
            history: Vec::new(),
            cache,
            clock,
            events,
            throttled_agents: HashSet::new(),
        })
    }

    /// Register a selectable resource.
    pub fn register_resource(&mut self, profile: ResourceProfile) -> Result<()> {
        self.registry.register(profile)
    }

    /// Subscribe to budget alerts.
    pub fn subscribe(&self) -> broadcast::Receiver<CostAlert> {
        self.events.subscribe()
    }

    /// Current cost aggregates.
    pub fn metrics(&self) -> &CostMetrics {
        &self.metrics
    }

    /// Every cost record seen so far, in order.
    pub fn history(&self) -> &[CostRecord] {
        &self.history
    }

    /// Current configuration.
    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Whether an agent has crossed its spend limit and is being throttled.
    pub fn is_agent_throttled(&self, agent_id: &str) -> bool {
        self.throttled_agents.contains(agent_id)
    }

    /// Whether daily or monthly spend has reached its limit. In emergency
    /// mode every selection takes the cheapest qualifying resource and all
    /// strategies are forced.
    pub fn is_emergency(&self) -> bool {
        let now = self.clock.now();
        let day = now.format("%Y-%m-%d").to_string();
        let month = now.format("%Y-%m").to_string();
        self.metrics.spent_on_day(&day) >= self.config.limits.daily_limit
            || self.metrics.spent_in_month(&month) >= self.config.limits.monthly_limit
    }

    /// Record a cost event and report any thresholds it crossed.
    ///
    /// Alert rules: daily and monthly bands fire a warning when spend
    /// reaches `warn_ratio × limit` and a critical when it reaches the
    /// limit; per-task and per-agent bands fire once, on the transition
    /// from at-or-under to over the limit. Negative costs (cache
    /// reversals) can never cross upward, so they never alert.
    pub fn record_cost(
        &mut self,
        agent_id: impl Into<String>,
        task_id: impl Into<String>,
        resource_id: impl Into<String>,
        units: u64,
        cost: f64,
    ) -> Vec<CostAlert> {
        let agent_id = agent_id.into();
        let task_id = task_id.into();
        let now = self.clock.now();
        let day = now.format("%Y-%m-%d").to_string();
        let month = now.format("%Y-%m").to_string();

        let daily_before = self.metrics.spent_on_day(&day);
        let monthly_before = self.metrics.spent_in_month(&month);
        let task_before = self.metrics.by_task.get(&task_id).copied().unwrap_or(0.0);
        let agent_before = self.metrics.spent_by_agent(&agent_id);

        let record = CostRecord {
            agent_id: agent_id.clone(),
            task_id: task_id.clone(),
            resource_id: resource_id.into(),
            units,
            cost,
            recorded_at: now,
        };
        self.metrics.apply(&record);
        self.history.push(record);

        let limits = &self.config.limits;
        let mut alerts = Vec::new();

        let daily_after = self.metrics.spent_on_day(&day);
        let daily_warn = limits.daily_limit * limits.warn_ratio;
        if daily_before < limits.daily_limit && daily_after >= limits.daily_limit {
            alerts.push(CostAlert::new(
                AlertLevel::Critical,
                BudgetScope::Daily,
                &day,
                daily_after,
                limits.daily_limit,
                format!(
                    "daily spend {:.2} reached the daily limit {:.2}, emergency mode active",
                    daily_after, limits.daily_limit
                ),
                now,
            ));
        } else if daily_before < daily_warn && daily_after >= daily_warn {
            alerts.push(CostAlert::new(
                AlertLevel::Warning,
                BudgetScope::Daily,
                &day,
                daily_after,
                limits.daily_limit,
                format!(
                    "daily spend {:.2} passed the warning threshold {:.2}",
                    daily_after, daily_warn
                ),
                now,
            ));
        }

        let monthly_after = self.metrics.spent_in_month(&month);
        let monthly_warn = limits.monthly_limit * limits.warn_ratio;
        if monthly_before < limits.monthly_limit && monthly_after >= limits.monthly_limit {
            alerts.push(CostAlert::new(
                AlertLevel::Critical,
                BudgetScope::Monthly,
                &month,
                monthly_after,
                limits.monthly_limit,
                format!(
                    "monthly spend {:.2} reached the monthly limit {:.2}, emergency mode active",
                    monthly_after, limits.monthly_limit
                ),
                now,
            ));
        } else if monthly_before < monthly_warn && monthly_after >= monthly_warn {
            alerts.push(CostAlert::new(
                AlertLevel::Warning,
                BudgetScope::Monthly,
                &month,
                monthly_after,
                limits.monthly_limit,
                format!(
                    "monthly spend {:.2} passed the warning threshold {:.2}",
                    monthly_after, monthly_warn
                ),
                now,
            ));
        }

        let task_after = self.metrics.by_task.get(&task_id).copied().unwrap_or(0.0);
        if task_before <= limits.per_task_limit && task_after > limits.per_task_limit {
            alerts.push(CostAlert::new(
                AlertLevel::Warning,
                BudgetScope::PerTask,
                &task_id,
                task_after,
                limits.per_task_limit,
                format!(
                    "task {} cost {:.2} exceeded the per-task limit {:.2}",
                    task_id, task_after, limits.per_task_limit
                ),
                now,
            ));
        }

        let agent_after = self.metrics.spent_by_agent(&agent_id);
        if agent_before <= limits.per_agent_limit && agent_after > limits.per_agent_limit {
            self.throttled_agents.insert(agent_id.clone());
            alerts.push(CostAlert::new(
                AlertLevel::Critical,
                BudgetScope::PerAgent,
                &agent_id,
                agent_after,
                limits.per_agent_limit,
                format!(
                    "agent {} spend {:.2} exceeded the per-agent limit {:.2}, throttling",
                    agent_id, agent_after, limits.per_agent_limit
                ),
                now,
            ));
        }

        for alert in &alerts {
            tracing::warn!(
                scope = ?alert.scope,
                level = ?alert.level,
                spent = alert.spent,
                limit = alert.limit,
                "{}",
                alert.message
            );
            let _ = self.events.send(alert.clone());
        }
        alerts
    }

    /// Select the best resource for a task.
    ///
    /// Candidates must cover the task's derived requirements and fit the
    /// estimated context. When none qualify, the cheapest registered
    /// resource is returned with the fallback flag set. In emergency mode
    /// the cheapest qualifying candidate wins outright.
    pub fn select_resource(
        &self,
        task: &TaskSpec,
        estimated_units: u64,
    ) -> Result<SelectionReport> {
        let requirements = derive_requirements(task, estimated_units);
        let candidates = self.registry.candidates(&requirements, estimated_units);

        if candidates.is_empty() {
            let fallback = self
                .registry
                .cheapest()
                .ok_or(OptimizerError::NoResources)?;
            tracing::warn!(
                task_id = %task.task_id,
                resource_id = %fallback.resource_id,
                "no resource covers the requirements, using cheapest fallback"
            );
            return Ok(SelectionReport {
                resource_id: fallback.resource_id.clone(),
                score: 0.0,
                fallback: true,
                reasoning: format!(
                    "no registered resource covers all {} requirement(s); \
                     falling back to cheapest resource '{}'",
                    requirements.len(),
                    fallback.display_name
                ),
                requirements,
            });
        }

        let min_cost = candidates
            .iter()
            .map(|r| r.cost_per_unit)
            .fold(f64::MAX, f64::min);
        let max_cost = candidates
            .iter()
            .map(|r| r.cost_per_unit)
            .fold(f64::MIN, f64::max);

        if self.is_emergency() {
            if let Some(cheapest) = candidates.iter().copied().min_by(|a, b| {
                a.cost_per_unit
                    .partial_cmp(&b.cost_per_unit)
                    .unwrap_or(std::cmp::Ordering::Equal)
            }) {
                let score = self.score_resource(cheapest, &requirements, min_cost, max_cost);
                return Ok(SelectionReport {
                    resource_id: cheapest.resource_id.clone(),
                    score,
                    fallback: false,
                    reasoning: format!(
                        "emergency mode: cheapest qualifying resource '{}'",
                        cheapest.display_name
                    ),
                    requirements,
                });
            }
        }

        let mut best: Option<(&ResourceProfile, f64)> = None;
        for resource in candidates {
            let score = self.score_resource(resource, &requirements, min_cost, max_cost);
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((resource, score));
            }
        }
        let (chosen, score) = best.ok_or(OptimizerError::NoResources)?;

        Ok(SelectionReport {
            resource_id: chosen.resource_id.clone(),
            score,
            fallback: false,
            reasoning: selection_reasoning(chosen, score, &requirements),
            requirements,
        })
    }

    fn score_resource(
        &self,
        resource: &ResourceProfile,
        requirements: &[Capability],
        min_cost: f64,
        max_cost: f64,
    ) -> f64 {
        let weights = &self.config.weights;

        let cost_savings = if (max_cost - min_cost).abs() < f64::EPSILON {
            1.0
        } else {
            (max_cost - resource.cost_per_unit) / (max_cost - min_cost)
        };
        let quality = resource.quality as f64 / 100.0;
        let speed = resource.speed as f64 / 100.0;
        let extra_capabilities = resource.capabilities.len().saturating_sub(requirements.len());
        let capability_match = (0.8 + 0.1 * extra_capabilities as f64).min(1.0);

        weights.cost * cost_savings
            + weights.quality * quality
            + weights.speed * speed
            + weights.capability * capability_match
    }

    /// Estimated cost of running `units` of work on a resource.
    pub fn estimate_cost(&self, resource_id: &str, units: u64) -> Result<f64> {
        let resource = self.registry.require(resource_id)?;
        Ok(units as f64 * resource.cost_per_unit)
    }

    /// Full optimization pass for a task: resource selection plus the
    /// strategies that should accompany the invocation.
    pub fn optimize(
        &self,
        task: &TaskSpec,
        agent_id: &str,
        estimated_units: u64,
    ) -> Result<OptimizationDecision> {
        let forced = self.is_emergency() || self.is_agent_throttled(agent_id);
        let selection = self.select_resource(task, estimated_units)?;
        let estimated_cost = self.estimate_cost(&selection.resource_id, estimated_units)?;

        let now = self.clock.now();
        let day = now.format("%Y-%m-%d").to_string();
        let strategies = select_strategies(
            task,
            estimated_units,
            self.metrics.spent_on_day(&day),
            &self.config,
            forced,
        );
        if forced {
            tracing::warn!(
                task_id = %task.task_id,
                agent_id = %agent_id,
                "spend pressure active, forcing every cost-saving strategy"
            );
        }

        let total_pct: f64 = strategies.iter().map(|s| s.estimated_saving_pct).sum();
        let projected_savings =
            estimated_cost * total_pct.min(self.config.max_savings_pct) / 100.0;

        Ok(OptimizationDecision {
            task_id: task.task_id.clone(),
            resource_id: selection.resource_id.clone(),
            estimated_cost,
            strategies,
            projected_savings,
            selection,
            decided_at: now,
        })
    }

    /// Compress text to the given unit budget.
    pub fn compress_context(&self, text: &str, max_units: u64) -> String {
        compress::compress_context(text, max_units)
    }

    /// Look up a cached result. A hit records a negative-cost `"cache"`
    /// entry so aggregate spend reflects the saving.
    pub fn lookup_cached(
        &mut self,
        key: &str,
        agent_id: &str,
        task_id: &str,
    ) -> Option<serde_json::Value> {
        let now = self.clock.now();
        let hit = self.cache.get(key, now)?;
        // A negative record can never cross a threshold upward.
        let _ = self.record_cost(agent_id, task_id, "cache", 0, -hit.cost);
        Some(hit.result)
    }

    /// Store a task result for later reuse.
    pub fn store_result(&mut self, key: impl Into<String>, result: serde_json::Value, cost: f64) {
        let now = self.clock.now();
        self.cache.put(key, result, cost, now);
    }

    /// Periodic upkeep: drop expired cache entries.
    pub fn run_maintenance(&mut self) {
        let now = self.clock.now();
        let evicted = self.cache.evict_expired(now);
        if evicted > 0 {
            tracing::debug!(evicted, "evicted expired cache entries");
        }
    }

    /// Replace the configuration. Clears agent throttles so the new limits
    /// apply from a clean slate.
    pub fn set_config(&mut self, config: OptimizerConfig) -> Result<()> {
        config.validate()?;
        self.cache.set_ttl(config.cache_ttl_secs);
        self.throttled_agents.clear();
        self.config = config;
        Ok(())
    }
}

fn selection_reasoning(
    resource: &ResourceProfile,
    score: f64,
    requirements: &[Capability],
) -> String {
    let mut reasons = Vec::new();
    if resource.quality >= 80 {
        reasons.push("high quality rating");
    }
    if resource.speed >= 80 {
        reasons.push("fast responses");
    }
    if resource.cost_per_unit <= 0.002 {
        reasons.push("low per-unit cost");
    }
    if reasons.is_empty() {
        reasons.push("best weighted score among candidates");
    }
    format!(
        "selected '{}' (score {:.2}) covering {} requirement(s): {}",
        resource.display_name,
        score,
        requirements.len(),
        reasons.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CostLimits;
    use crate::strategy::StrategyKind;
    use crate::task::TaskComplexity;
    use chrono::TimeZone;
    use serde_json::json;
    use swarm_ai_clock::ManualClock;

    fn manual_clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap(),
        ))
    }

    fn optimizer_with(config: OptimizerConfig) -> CostOptimizer {
        let clock = manual_clock();
        CostOptimizer::new(config, clock).unwrap()
    }

    fn register_pair(optimizer: &mut CostOptimizer) {
        optimizer
            .register_resource(
                ResourceProfile::new("fast-small", "Fast Small", 0.001)
                    .with_capabilities(vec![Capability::CodeGeneration, Capability::General])
                    .with_quality(60)
                    .with_speed(90)
                    .with_max_context(16_000),
            )
            .unwrap();
        optimizer
            .register_resource(
                ResourceProfile::new("deep-large", "Deep Large", 0.01)
                    .with_capabilities(vec![
                        Capability::CodeGeneration,
                        Capability::CodeAnalysis,
                        Capability::Reasoning,
                        Capability::LongContext,
                        Capability::General,
                    ])
                    .with_quality(95)
                    .with_speed(60)
                    .with_max_context(200_000),
            )
            .unwrap();
    }

    #[test]
    fn test_total_cost_equals_sum_of_all_records() {
        let mut optimizer = optimizer_with(OptimizerConfig::default());
        optimizer.record_cost("agent-1", "task-1", "model-a", 100, 2.5);
        optimizer.record_cost("agent-2", "task-2", "model-b", 200, 4.0);
        optimizer.record_cost("agent-1", "task-1", "cache", 0, -1.5);

        assert!((optimizer.metrics().total_cost - 5.0).abs() < 1e-9);
        assert_eq!(optimizer.history().len(), 3);
    }

    #[test]
    fn test_daily_thresholds_fire_once_each() {
        let config = OptimizerConfig {
            limits: CostLimits {
                daily_limit: 50.0,
                monthly_limit: 10_000.0,
                per_task_limit: 1000.0,
                per_agent_limit: 1000.0,
                warn_ratio: 0.8,
            },
            ..OptimizerConfig::default()
        };
        let mut optimizer = optimizer_with(config);

        // Daily limit 50.0, warning at 40.0
        assert!(optimizer
            .record_cost("agent-1", "task-1", "model-a", 100, 35.0)
            .is_empty());

        let alerts = optimizer.record_cost("agent-1", "task-2", "model-a", 100, 6.0);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].level, AlertLevel::Warning);
        assert_eq!(alerts[0].scope, BudgetScope::Daily);

        assert!(optimizer
            .record_cost("agent-1", "task-3", "model-a", 100, 3.0)
            .is_empty());
        assert!(!optimizer.is_emergency());

        let alerts = optimizer.record_cost("agent-1", "task-4", "model-a", 100, 7.0);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].level, AlertLevel::Critical);
        assert!(optimizer.is_emergency());

        // Already over the limit, no repeat alert
        assert!(optimizer
            .record_cost("agent-1", "task-5", "model-a", 100, 1.0)
            .is_empty());
    }

    #[test]
    fn test_per_agent_throttle_fires_exactly_once_at_the_crossing() {
        let config = OptimizerConfig {
            limits: CostLimits {
                daily_limit: 1000.0,
                monthly_limit: 10_000.0,
                per_task_limit: 500.0,
                per_agent_limit: 10.0,
                warn_ratio: 0.8,
            },
            ..OptimizerConfig::default()
        };
        let mut optimizer = optimizer_with(config);

        let first = optimizer.record_cost("agent-1", "task-1", "model-a", 100, 10.0);
        assert!(first.is_empty());
        assert!(!optimizer.is_agent_throttled("agent-1"));

        let second = optimizer.record_cost("agent-1", "task-2", "model-a", 100, 15.0);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].scope, BudgetScope::PerAgent);
        assert_eq!(second[0].level, AlertLevel::Critical);
        assert!(optimizer.is_agent_throttled("agent-1"));

        let third = optimizer.record_cost("agent-1", "task-3", "model-a", 100, 30.0);
        assert!(third.is_empty());
    }

    #[test]
    fn test_alerts_are_broadcast() {
        let mut optimizer = optimizer_with(OptimizerConfig::default());
        let mut events = optimizer.subscribe();

        optimizer.record_cost("agent-1", "task-1", "model-a", 100, 45.0);
        let alert = events.try_recv().unwrap();
        assert_eq!(alert.scope, BudgetScope::Daily);
        assert_eq!(alert.level, AlertLevel::Warning);
    }

    #[test]
    fn test_selection_covers_derived_requirements() {
        let mut optimizer = optimizer_with(OptimizerConfig::default());
        register_pair(&mut optimizer);

        let task = TaskSpec::new("analysis", "Analyze the planner design")
            .with_complexity(TaskComplexity::Complex);
        let report = optimizer.select_resource(&task, 1000).unwrap();

        assert!(!report.fallback);
        assert_eq!(report.resource_id, "deep-large");
        let chosen = optimizer.registry.require(&report.resource_id).unwrap();
        assert!(chosen.covers(&report.requirements));
    }

    #[test]
    fn test_selection_falls_back_to_cheapest_when_none_qualify() {
        let mut optimizer = optimizer_with(OptimizerConfig::default());
        optimizer
            .register_resource(
                ResourceProfile::new("fast-small", "Fast Small", 0.001)
                    .with_capabilities(vec![Capability::General]),
            )
            .unwrap();
        optimizer
            .register_resource(
                ResourceProfile::new("mid", "Mid", 0.005)
                    .with_capabilities(vec![Capability::Documentation]),
            )
            .unwrap();

        let task = TaskSpec::new("debugging", "Fix the crash in the scheduler");
        let report = optimizer.select_resource(&task, 100).unwrap();

        assert!(report.fallback);
        assert_eq!(report.resource_id, "fast-small");
    }

    #[test]
    fn test_selection_errors_with_no_resources() {
        let optimizer = optimizer_with(OptimizerConfig::default());
        let task = TaskSpec::new("chat", "Say hello");

        assert!(matches!(
            optimizer.select_resource(&task, 10),
            Err(OptimizerError::NoResources)
        ));
    }

    #[test]
    fn test_emergency_mode_selects_cheapest_qualifying() {
        let mut optimizer = optimizer_with(OptimizerConfig::default());
        optimizer
            .register_resource(
                ResourceProfile::new("junk", "Junk", 0.001)
                    .with_capabilities(vec![Capability::CodeGeneration, Capability::General])
                    .with_quality(5)
                    .with_speed(5)
                    .with_max_context(16_000),
            )
            .unwrap();
        optimizer
            .register_resource(
                ResourceProfile::new("deep-large", "Deep Large", 0.01)
                    .with_capabilities(vec![
                        Capability::CodeGeneration,
                        Capability::CodeAnalysis,
                        Capability::Reasoning,
                        Capability::LongContext,
                        Capability::General,
                    ])
                    .with_quality(100)
                    .with_speed(90)
                    .with_max_context(200_000),
            )
            .unwrap();

        let task = TaskSpec::new("implement", "Implement the config parser");

        // Normally quality and coverage outweigh the cost gap.
        let normal = optimizer.select_resource(&task, 1000).unwrap();
        assert_eq!(normal.resource_id, "deep-large");

        // Push daily spend to the limit to enter emergency mode.
        optimizer.record_cost("agent-1", "task-0", "deep-large", 1000, 50.0);
        assert!(optimizer.is_emergency());

        let pressed = optimizer.select_resource(&task, 1000).unwrap();
        assert_eq!(pressed.resource_id, "junk");
        assert!(pressed.reasoning.contains("emergency"));
    }

    #[test]
    fn test_optimize_composes_strategies_and_savings() {
        let mut optimizer = optimizer_with(OptimizerConfig::default());
        register_pair(&mut optimizer);

        let task = TaskSpec::new("implement", "Implement the formatter")
            .with_complexity(TaskComplexity::Simple)
            .with_cache_key("formatter:v1");
        let decision = optimizer.optimize(&task, "agent-1", 3000).unwrap();

        let kinds: Vec<StrategyKind> = decision.strategies.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                StrategyKind::ContextCompression,
                StrategyKind::Caching,
                StrategyKind::Fallback,
            ]
        );

        // 30% + 40% + 20% = 90%, the default cap
        let expected = decision.estimated_cost * 0.9;
        assert!((decision.projected_savings - expected).abs() < 1e-9);
    }

    #[test]
    fn test_throttled_agent_gets_forced_strategies() {
        let config = OptimizerConfig {
            limits: CostLimits {
                daily_limit: 1000.0,
                monthly_limit: 10_000.0,
                per_task_limit: 500.0,
                per_agent_limit: 5.0,
                warn_ratio: 0.8,
            },
            ..OptimizerConfig::default()
        };
        let mut optimizer = optimizer_with(config);
        register_pair(&mut optimizer);

        optimizer.record_cost("agent-1", "task-0", "deep-large", 1000, 6.0);
        assert!(optimizer.is_agent_throttled("agent-1"));

        let task = TaskSpec::new("chat", "Answer a question");
        let throttled = optimizer.optimize(&task, "agent-1", 100).unwrap();
        assert_eq!(throttled.strategies.len(), 5);

        let unthrottled = optimizer.optimize(&task, "agent-2", 100).unwrap();
        assert!(unthrottled.strategies.is_empty());
    }

    #[test]
    fn test_cache_hit_reverses_cost() {
        let mut optimizer = optimizer_with(OptimizerConfig::default());

        optimizer.record_cost("agent-1", "task-1", "model-a", 100, 5.0);
        optimizer.store_result("review:main", json!({"verdict": "ok"}), 2.0);

        let hit = optimizer.lookup_cached("review:main", "agent-1", "task-2");
        assert_eq!(hit, Some(json!({"verdict": "ok"})));
        assert!((optimizer.metrics().total_cost - 3.0).abs() < 1e-9);
        assert!((optimizer.metrics().by_resource["cache"] + 2.0).abs() < 1e-9);

        assert!(optimizer
            .lookup_cached("missing", "agent-1", "task-2")
            .is_none());
    }

    #[test]
    fn test_maintenance_evicts_expired_cache_entries() {
        let clock = manual_clock();
        let mut optimizer =
            CostOptimizer::new(OptimizerConfig::default(), clock.clone()).unwrap();

        optimizer.store_result("stale", json!(1), 0.5);
        clock.advance(chrono::Duration::seconds(3600));
        optimizer.run_maintenance();

        assert!(optimizer.cache.is_empty());
        assert!(optimizer
            .lookup_cached("stale", "agent-1", "task-1")
            .is_none());
    }

    #[test]
    fn test_set_config_clears_throttles() {
        let config = OptimizerConfig {
            limits: CostLimits {
                per_agent_limit: 1.0,
                ..CostLimits::default()
            },
            ..OptimizerConfig::default()
        };
        let mut optimizer = optimizer_with(config);

        optimizer.record_cost("agent-1", "task-1", "model-a", 100, 2.0);
        assert!(optimizer.is_agent_throttled("agent-1"));

        optimizer.set_config(OptimizerConfig::default()).unwrap();
        assert!(!optimizer.is_agent_throttled("agent-1"));
    }
}

//! The coordinator drives the three engines end to end for each task.
//!
//! Engines are single-writer components; the coordinator is that single
//! writer. It owns them outright, threads one injected clock through all
//! of them, and delegates actual model execution to a caller-supplied
//! [`ModelInvoker`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use swarm_ai_clock::Clock;
use swarm_ai_collective::{
    AgentExperience, CollectiveLearning, LearnReport, LearningConfig, SkillRecommendation,
};
use swarm_ai_optimizer::{
    BatchQueue, CostAlert, CostOptimizer, OptimizationDecision, OptimizerConfig, ResourceProfile,
    StrategyKind, TaskComplexity, TaskSpec,
};
use swarm_ai_validator::{Artifact, QualityValidator, ValidationResult, ValidatorConfig};
use tokio::sync::oneshot;

/// What one model invocation produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelOutput {
    /// The produced artifact content.
    pub content: String,
    /// Units actually consumed.
    pub units_used: u64,
    /// What the invocation cost, in currency.
    pub cost: f64,
}

/// Caller-supplied capability that runs a task on a concrete resource.
///
/// The core never talks to a model itself; invocation latency and failure
/// live entirely on the caller's side of this seam.
#[async_trait]
pub trait ModelInvoker: Send + Sync {
    /// Execute the prepared input on the given resource.
    async fn invoke(&self, resource_id: &str, input: &str) -> anyhow::Result<ModelOutput>;
}

/// Configuration for all three engines, supplied at construction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SwarmConfig {
    /// Cost optimizer thresholds and weights.
    #[serde(default)]
    pub optimizer: OptimizerConfig,
    /// Quality bands, metric weights, and rule deductions.
    #[serde(default)]
    pub validator: ValidatorConfig,
    /// Learning rates, pattern mining, and transfer thresholds.
    #[serde(default)]
    pub learning: LearningConfig,
}

/// End-to-end outcome of one coordinated task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskReport {
    /// Task that ran.
    pub task_id: String,
    /// Agent the task ran for.
    pub agent_id: String,
    /// Resource the optimizer picked.
    pub resource_id: String,
    /// The produced content.
    pub content: String,
    /// Whether the content came from the result cache.
    pub from_cache: bool,
    /// Whether the input was compressed before invocation.
    pub compressed: bool,
    /// Units the invocation consumed; zero on a cache hit.
    pub units_used: u64,
    /// What the invocation cost; zero on a cache hit.
    pub cost: f64,
    /// Budget thresholds the recorded cost crossed.
    pub alerts: Vec<CostAlert>,
    /// Quality assessment of the content. Absent on a cache hit, where the
    /// stored content was validated when it was produced.
    pub validation: Option<ValidationResult>,
    /// What the learning engine did with the outcome. Absent on a cache
    /// hit, which teaches nothing new.
    pub learning: Option<LearnReport>,
}

/// Outcome delivered to a batched caller. Failures cross the channel as
/// strings so one rejection can fan out to every queued caller.
pub type BatchedOutcome = Result<TaskReport, String>;

/// A task waiting in the batch queue.
struct QueuedTask {
    task: TaskSpec,
    agent_id: String,
    estimated_units: u64,
}

/// Façade over the cost optimizer, quality validator, and learning engine.
pub struct SwarmCoordinator {
    optimizer: CostOptimizer,
    validator: QualityValidator,
    learning: CollectiveLearning,
    batch: BatchQueue<QueuedTask, BatchedOutcome>,
    invoker: Arc<dyn ModelInvoker>,
    clock: Arc<dyn Clock>,
}

impl SwarmCoordinator {
    /// Build a coordinator and its engines from one configuration.
    pub fn new(
        config: SwarmConfig,
        invoker: Arc<dyn ModelInvoker>,
        clock: Arc<dyn Clock>,
    ) -> anyhow::Result<Self> {
        let batch = BatchQueue::new(
            config.optimizer.batch_window_ms,
            config.optimizer.max_batch_size,
        );
        let optimizer = CostOptimizer::new(config.optimizer, clock.clone())?;
        let validator = QualityValidator::new(config.validator)?;
        let learning = CollectiveLearning::new(config.learning, clock.clone())?;
        Ok(Self {
            optimizer,
            validator,
            learning,
            batch,
            invoker,
            clock,
        })
    }

    /// Register a resource tasks can run on.
    pub fn register_resource(&mut self, profile: ResourceProfile) -> anyhow::Result<()> {
        self.optimizer.register_resource(profile)?;
        Ok(())
    }

    /// Run one task end to end.
    ///
    /// Optimizes resource choice and strategies, serves repeatable tasks
    /// from the cache when possible, compresses oversized input, invokes
    /// the model, records the cost, validates the artifact, and feeds the
    /// outcome back into collective learning. Validated repeatable results
    /// are cached for next time.
    pub async fn run_task(
        &mut self,
        task: &TaskSpec,
        agent_id: &str,
        estimated_units: u64,
    ) -> anyhow::Result<TaskReport> {
        let decision = self.optimizer.optimize(task, agent_id, estimated_units)?;

        if plans(&decision, StrategyKind::Caching) {
            if let Some(key) = task.cache_key.as_deref() {
                if let Some(cached) = self.optimizer.lookup_cached(key, agent_id, &task.task_id) {
                    tracing::debug!(task_id = %task.task_id, "served from result cache");
                    return Ok(TaskReport {
                        task_id: task.task_id.clone(),
                        agent_id: agent_id.to_string(),
                        resource_id: decision.resource_id,
                        content: text_of(cached),
                        from_cache: true,
                        compressed: false,
                        units_used: 0,
                        cost: 0.0,
                        alerts: Vec::new(),
                        validation: None,
                        learning: None,
                    });
                }
            }
        }

        let mut input = task.description.clone();
        let mut compressed = false;
        if plans(&decision, StrategyKind::ContextCompression) {
            let target = self.optimizer.config().compression_threshold_units;
            let shrunk = self.optimizer.compress_context(&input, target);
            compressed = shrunk.len() < input.len();
            input = shrunk;
        }

        let started = self.clock.now();
        let output = self.invoker.invoke(&decision.resource_id, &input).await?;
        let duration_ms = (self.clock.now() - started).num_milliseconds().max(0) as u64;

        let alerts = self.optimizer.record_cost(
            agent_id,
            &task.task_id,
            &decision.resource_id,
            output.units_used,
            output.cost,
        );

        let artifact = Artifact::new(output.content.clone());
        let validation = self.validator.validate(&artifact);

        let reward = (validation.quality_score / 100.0) as f32;
        let context: Vec<String> = decision
            .strategies
            .iter()
            .map(|strategy| format!("strategy:{:?}", strategy.kind))
            .chain(std::iter::once(format!("resource:{}", decision.resource_id)))
            .collect();
        let experience = AgentExperience::new(
            agent_id,
            &task.task_type,
            &task.description,
            validation.is_valid,
            reward,
        )
        .with_context(context)
        .with_result(format!("{:?} ({:.0})", validation.band, validation.quality_score))
        .with_difficulty(difficulty_of(task.complexity))
        .with_duration_ms(duration_ms)
        .with_cost(output.cost)
        .with_occurred_at(started);
        let learning = self.learning.learn(experience);

        if validation.is_valid && task.repeatable {
            if let Some(key) = task.cache_key.as_deref() {
                self.optimizer.store_result(
                    key,
                    serde_json::Value::String(output.content.clone()),
                    output.cost,
                );
            }
        }

        Ok(TaskReport {
            task_id: task.task_id.clone(),
            agent_id: agent_id.to_string(),
            resource_id: decision.resource_id,
            content: output.content,
            from_cache: false,
            compressed,
            units_used: output.units_used,
            cost: output.cost,
            alerts,
            validation: Some(validation),
            learning: Some(learning),
        })
    }

    /// Queue a task for batched execution instead of running it now.
    ///
    /// The batch flushes on the next maintenance tick once it reaches the
    /// configured size or its window deadline passes; every queued caller
    /// resolves in that same flush. Dropping the receiver abandons the slot.
    pub fn enqueue_task(
        &mut self,
        task: TaskSpec,
        agent_id: &str,
        estimated_units: u64,
    ) -> oneshot::Receiver<BatchedOutcome> {
        let queued = QueuedTask {
            task,
            agent_id: agent_id.to_string(),
            estimated_units,
        };
        self.batch.submit(queued, self.clock.now())
    }

    /// Tasks waiting for the next batch flush.
    pub fn queued_tasks(&self) -> usize {
        self.batch.len()
    }

    async fn flush_due_batch(&mut self) {
        if !self.batch.should_flush(self.clock.now()) {
            return;
        }
        let batch = self.batch.drain();
        tracing::debug!(batch_id = %batch.id(), size = batch.len(), "flushing task batch");
        for (queued, tx) in batch.into_entries() {
            let outcome = self
                .run_task(&queued.task, &queued.agent_id, queued.estimated_units)
                .await
                .map_err(|error| error.to_string());
            let _ = tx.send(outcome);
        }
    }

    /// Validate an artifact without running a task.
    pub fn validate(&self, artifact: &Artifact) -> ValidationResult {
        self.validator.validate(artifact)
    }

    /// Seed one agent's skill from another's.
    pub fn transfer_skill(&mut self, from: &str, to: &str, skill: &str) -> bool {
        self.learning.transfer_skill(from, to, skill)
    }

    /// Rank the transfers most worth making for an agent.
    pub fn recommend_skills(&self, agent_id: &str) -> Vec<SkillRecommendation> {
        self.learning.recommend_skills(agent_id)
    }

    /// Periodic upkeep across the engines: any due task batch flushes,
    /// expired cache entries go, stale knowledge decays, and learning
    /// aggregates are recomputed. Aside from the flush this only removes
    /// expired or unused entries, so it is safe to run between any two
    /// tasks.
    pub async fn maintenance_tick(&mut self) {
        self.flush_due_batch().await;
        self.optimizer.run_maintenance();
        self.learning.run_maintenance();
    }

    /// Replace the configuration of every engine.
    pub fn set_config(&mut self, config: SwarmConfig) -> anyhow::Result<()> {
        // Validate everything up front so a failure applies nothing.
        config.optimizer.validate()?;
        config.validator.validate()?;
        config.learning.validate()?;
        self.batch.configure(config.optimizer.batch_window_ms, config.optimizer.max_batch_size);
        self.optimizer.set_config(config.optimizer)?;
        self.validator.set_config(config.validator)?;
        self.learning.set_config(config.learning)?;
        Ok(())
    }

    /// The cost optimizer.
    pub fn optimizer(&self) -> &CostOptimizer {
        &self.optimizer
    }

    /// Mutable access to the cost optimizer.
    pub fn optimizer_mut(&mut self) -> &mut CostOptimizer {
        &mut self.optimizer
    }

    /// The quality validator.
    pub fn validator(&self) -> &QualityValidator {
        &self.validator
    }

    /// The learning engine.
    pub fn learning(&self) -> &CollectiveLearning {
        &self.learning
    }

    /// Mutable access to the learning engine.
    pub fn learning_mut(&mut self) -> &mut CollectiveLearning {
        &mut self.learning
    }
}

fn plans(decision: &OptimizationDecision, kind: StrategyKind) -> bool {
    decision.strategies.iter().any(|strategy| strategy.kind == kind)
}

fn text_of(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text,
        other => other.to_string(),
    }
}

fn difficulty_of(complexity: TaskComplexity) -> f32 {
    match complexity {
        TaskComplexity::Simple => 0.3,
        TaskComplexity::Moderate => 0.5,
        TaskComplexity::Complex => 0.7,
        TaskComplexity::Intensive => 0.9,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use swarm_ai_clock::ManualClock;
    use swarm_ai_optimizer::Capability;

    const GOOD_RUST: &str = r#"```rust
/// Double every value in the slice.
pub fn doubled(values: &[i32]) -> Vec<i32> {
    values.iter().map(|v| v * 2).collect()
}
```"#;

    #[derive(Debug)]
    struct StubInvoker {
        content: String,
        cost: f64,
        calls: AtomicUsize,
    }

    impl StubInvoker {
        fn new(content: &str, cost: f64) -> Arc<Self> {
            Arc::new(Self {
                content: content.to_string(),
                cost,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ModelInvoker for StubInvoker {
        async fn invoke(&self, _resource_id: &str, _input: &str) -> anyhow::Result<ModelOutput> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ModelOutput {
                content: self.content.clone(),
                units_used: 1200,
                cost: self.cost,
            })
        }
    }

    fn manual_clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap(),
        ))
    }

    fn coordinator(invoker: Arc<StubInvoker>, clock: Arc<ManualClock>) -> SwarmCoordinator {
        let mut coordinator =
            SwarmCoordinator::new(SwarmConfig::default(), invoker, clock).unwrap();
        coordinator
            .register_resource(
                ResourceProfile::new("fast-small", "Fast Small", 0.001).with_capabilities(vec![
                    Capability::CodeGeneration,
                    Capability::CodeAnalysis,
                    Capability::General,
                ]),
            )
            .unwrap();
        coordinator
    }

    #[tokio::test]
    async fn test_run_task_round_trip() {
        let invoker = StubInvoker::new(GOOD_RUST, 0.4);
        let mut coordinator = coordinator(invoker.clone(), manual_clock());

        let task = TaskSpec::new("code_generation", "Write a small helper module");
        let report = coordinator.run_task(&task, "agent-1", 800).await.unwrap();

        assert_eq!(report.resource_id, "fast-small");
        assert!(!report.from_cache);
        assert!(!report.compressed);
        assert!((report.cost - 0.4).abs() < 1e-9);
        assert!(report.alerts.is_empty());

        let validation = report.validation.unwrap();
        assert!(validation.is_valid);
        let learning = report.learning.unwrap();
        assert_eq!(learning.skill, "code_generation");
        assert!(learning.level_after > 0.0);
        assert!(learning.fragment_id.is_some());

        assert!((coordinator.optimizer().metrics().total_cost - 0.4).abs() < 1e-9);
        assert_eq!(coordinator.learning().buffer().len(), 1);
        assert_eq!(invoker.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_repeatable_task_hits_cache() {
        let invoker = StubInvoker::new(GOOD_RUST, 0.4);
        let mut coordinator = coordinator(invoker.clone(), manual_clock());

        let task = TaskSpec::new("code_generation", "Write the weekly report helper")
            .with_cache_key("weekly-report-helper");

        let first = coordinator.run_task(&task, "agent-1", 800).await.unwrap();
        assert!(!first.from_cache);

        let second = coordinator.run_task(&task, "agent-1", 800).await.unwrap();
        assert!(second.from_cache);
        assert_eq!(second.content, first.content);
        assert!(second.validation.is_none());
        assert_eq!(invoker.calls.load(Ordering::SeqCst), 1);

        // The hit reversed the stored cost in the ledger.
        assert!(coordinator.optimizer().metrics().total_cost.abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_oversized_input_is_compressed() {
        let invoker = StubInvoker::new("All modules summarized without surprises.", 0.2);
        let mut coordinator = coordinator(invoker, manual_clock());

        let description = "inspect the workspace and summarize every module\n".repeat(300);
        let task = TaskSpec::new("code_analysis", description);
        let report = coordinator.run_task(&task, "agent-1", 10_000).await.unwrap();

        assert!(report.compressed);
        assert!(report.validation.is_some());
    }

    #[tokio::test]
    async fn test_maintenance_tick_prunes_everything() {
        let clock = manual_clock();
        let invoker = StubInvoker::new(GOOD_RUST, 0.4);
        let mut coordinator = coordinator(invoker.clone(), clock.clone());

        let task = TaskSpec::new("code_generation", "Write the weekly report helper")
            .with_cache_key("weekly-report-helper");
        coordinator.run_task(&task, "agent-1", 800).await.unwrap();
        assert_eq!(coordinator.learning().store().len(), 1);

        clock.advance(Duration::days(40));
        coordinator.maintenance_tick().await;

        assert!(coordinator.learning().store().is_empty());
        assert_eq!(coordinator.learning().metrics().fragment_count, 0);

        // The cache entry expired too, so the task runs for real again.
        let rerun = coordinator.run_task(&task, "agent-1", 800).await.unwrap();
        assert!(!rerun.from_cache);
        assert_eq!(invoker.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_batched_tasks_flush_together_on_the_tick() {
        let clock = manual_clock();
        let invoker = StubInvoker::new(GOOD_RUST, 0.1);
        let mut coordinator = coordinator(invoker.clone(), clock.clone());

        let first = coordinator.enqueue_task(
            TaskSpec::new("code_generation", "Write the pagination helper"),
            "agent-1",
            500,
        );
        let second = coordinator.enqueue_task(
            TaskSpec::new("code_generation", "Write the retry helper"),
            "agent-2",
            500,
        );
        assert_eq!(coordinator.queued_tasks(), 2);

        // The window has not closed yet, so the tick leaves the queue alone.
        coordinator.maintenance_tick().await;
        assert_eq!(coordinator.queued_tasks(), 2);

        clock.advance(Duration::milliseconds(200));
        coordinator.maintenance_tick().await;
        assert_eq!(coordinator.queued_tasks(), 0);

        let first = first.await.unwrap().unwrap();
        let second = second.await.unwrap().unwrap();
        assert_eq!(first.agent_id, "agent-1");
        assert_eq!(second.agent_id, "agent-2");
        assert!(!first.from_cache && !second.from_cache);
        assert_eq!(invoker.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_set_config_applies_nothing_on_failure() {
        let invoker = StubInvoker::new(GOOD_RUST, 0.4);
        let mut coordinator = coordinator(invoker, manual_clock());

        let config = SwarmConfig {
            learning: LearningConfig {
                base_rate: 0.0,
                ..LearningConfig::default()
            },
            ..SwarmConfig::default()
        };
        assert!(coordinator.set_config(config).is_err());
        assert!((coordinator.learning().config().base_rate - 0.1).abs() < 1e-6);
    }
}

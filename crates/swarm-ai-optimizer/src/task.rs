//! Task descriptions and capability requirement derivation.

use crate::resources::Capability;
use serde::{Deserialize, Serialize};

/// Unique identifier for a task.
pub type TaskId = String;

/// Coarse complexity classification of a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskComplexity {
    /// Trivial work a small resource handles fine
    Simple,
    /// Ordinary day-to-day work
    #[default]
    Moderate,
    /// Work that needs careful multi-step reasoning
    Complex,
    /// Long-running, heavyweight work
    Intensive,
}

/// A task submitted for optimization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSpec {
    /// Unique task identifier
    pub task_id: TaskId,

    /// Kind of task (e.g., "code_review", "implement_feature")
    pub task_type: String,

    /// Free-form description of what the task should accomplish
    pub description: String,

    /// Complexity classification
    #[serde(default)]
    pub complexity: TaskComplexity,

    /// Whether an identical task is likely to recur
    #[serde(default)]
    pub repeatable: bool,

    /// Cache key for repeatable tasks; defaults to none
    #[serde(default)]
    pub cache_key: Option<String>,

    /// Arbitrary task payload forwarded to the executing resource
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl TaskSpec {
    /// Create a task with a generated id.
    pub fn new(task_type: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            task_id: uuid::Uuid::new_v4().to_string(),
            task_type: task_type.into(),
            description: description.into(),
            complexity: TaskComplexity::default(),
            repeatable: false,
            cache_key: None,
            payload: serde_json::Value::Null,
        }
    }

    /// Set the complexity classification.
    pub fn with_complexity(mut self, complexity: TaskComplexity) -> Self {
        self.complexity = complexity;
        self
    }

    /// Mark the task as repeatable and cacheable under the given key.
    pub fn with_cache_key(mut self, key: impl Into<String>) -> Self {
        self.repeatable = true;
        self.cache_key = Some(key.into());
        self
    }

    /// Attach a payload.
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

/// Derive the capabilities a task requires from its type, description,
/// complexity, and estimated size.
///
/// Keyword matching is intentionally simple: the goal is a stable,
/// explainable mapping, not language understanding.
pub fn derive_requirements(task: &TaskSpec, estimated_units: u64) -> Vec<Capability> {
    let text = format!("{} {}", task.task_type, task.description).to_lowercase();
    let mut required = Vec::new();

    let keyword_table: &[(&[&str], Capability)] = &[
        (
            &["implement", "write", "generate", "build", "create", "code"],
            Capability::CodeGeneration,
        ),
        (
            &["review", "analyze", "inspect", "audit"],
            Capability::CodeAnalysis,
        ),
        (
            &["debug", "fix", "bug", "error", "crash"],
            Capability::Debugging,
        ),
        (&["test", "coverage"], Capability::Testing),
        (
            &["document", "docs", "readme", "comment"],
            Capability::Documentation,
        ),
        (
            &["refactor", "restructure", "cleanup"],
            Capability::Refactoring,
        ),
    ];

    for (keywords, capability) in keyword_table {
        if keywords.iter().any(|kw| text.contains(kw)) {
            required.push(*capability);
        }
    }

    if matches!(
        task.complexity,
        TaskComplexity::Complex | TaskComplexity::Intensive
    ) {
        required.push(Capability::Reasoning);
    }

    if estimated_units > 8000 {
        required.push(Capability::LongContext);
    }

    if required.is_empty() {
        required.push(Capability::General);
    }

    required.sort();
    required.dedup();
    required
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_requirements_from_keywords() {
        let task = TaskSpec::new("code_review", "Review the parser module for bugs");
        let required = derive_requirements(&task, 500);

        assert!(required.contains(&Capability::CodeAnalysis));
        assert!(required.contains(&Capability::Debugging));
        assert!(!required.contains(&Capability::General));
    }

    #[test]
    fn test_complexity_and_size_add_requirements() {
        let task = TaskSpec::new("design", "Plan the migration strategy")
            .with_complexity(TaskComplexity::Complex);
        let required = derive_requirements(&task, 10_000);

        assert!(required.contains(&Capability::Reasoning));
        assert!(required.contains(&Capability::LongContext));
    }

    #[test]
    fn test_unmatched_task_falls_back_to_general() {
        let task = TaskSpec::new("chat", "Say hello");
        let required = derive_requirements(&task, 10);

        assert_eq!(required, vec![Capability::General]);
    }

    #[test]
    fn test_requirements_are_sorted_and_deduped() {
        let task = TaskSpec::new("implement", "Implement and write and generate the module");
        let required = derive_requirements(&task, 100);

        assert_eq!(required, vec![Capability::CodeGeneration]);
    }
}

//! Cost accounting: individual records and running aggregates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single cost event attributed to an agent, task, and resource.
///
/// Costs are usually positive. Cache hits append a compensating record
/// with a negative cost so the ledger reflects avoided spend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostRecord {
    /// Agent that incurred the cost
    pub agent_id: String,

    /// Task the cost belongs to
    pub task_id: String,

    /// Resource that produced the cost
    pub resource_id: String,

    /// Units of work consumed
    pub units: u64,

    /// Cost in the configured currency
    pub cost: f64,

    /// When the cost was incurred
    pub recorded_at: DateTime<Utc>,
}

/// Running cost aggregates over every recorded event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostMetrics {
    /// Sum of all recorded costs, including negative reversals
    pub total_cost: f64,

    /// Total units consumed
    pub total_units: u64,

    /// Number of cost events recorded
    pub record_count: u64,

    /// Cost grouped by resource id
    pub by_resource: HashMap<String, f64>,

    /// Cost grouped by agent id
    pub by_agent: HashMap<String, f64>,

    /// Cost grouped by task id
    pub by_task: HashMap<String, f64>,

    /// Cost grouped by calendar day ("YYYY-MM-DD", UTC)
    pub by_day: HashMap<String, f64>,

    /// Cost efficiency score (0 to 100, higher is better)
    pub efficiency: f64,
}

impl Default for CostMetrics {
    fn default() -> Self {
        Self {
            total_cost: 0.0,
            total_units: 0,
            record_count: 0,
            by_resource: HashMap::new(),
            by_agent: HashMap::new(),
            by_task: HashMap::new(),
            by_day: HashMap::new(),
            efficiency: 100.0,
        }
    }
}

impl CostMetrics {
    /// Fold a cost record into every aggregate.
    pub fn apply(&mut self, record: &CostRecord) {
        self.total_cost += record.cost;
        self.total_units += record.units;
        self.record_count += 1;

        *self
            .by_resource
            .entry(record.resource_id.clone())
            .or_insert(0.0) += record.cost;
        *self.by_agent.entry(record.agent_id.clone()).or_insert(0.0) += record.cost;
        *self.by_task.entry(record.task_id.clone()).or_insert(0.0) += record.cost;

        let day = record.recorded_at.format("%Y-%m-%d").to_string();
        *self.by_day.entry(day).or_insert(0.0) += record.cost;

        self.efficiency = self.compute_efficiency();
    }

    /// Spend attributed to a single UTC day.
    pub fn spent_on_day(&self, day: &str) -> f64 {
        self.by_day.get(day).copied().unwrap_or(0.0)
    }

    /// Spend attributed to a UTC month, given its "YYYY-MM" prefix.
    pub fn spent_in_month(&self, month_prefix: &str) -> f64 {
        self.by_day
            .iter()
            .filter(|(day, _)| day.starts_with(month_prefix))
            .map(|(_, cost)| cost)
            .sum()
    }

    /// Spend attributed to one agent.
    pub fn spent_by_agent(&self, agent_id: &str) -> f64 {
        self.by_agent.get(agent_id).copied().unwrap_or(0.0)
    }

    fn compute_efficiency(&self) -> f64 {
        if self.by_task.is_empty() {
            return 100.0;
        }
        let avg_cost_per_task = self.total_cost / self.by_task.len() as f64;
        (100.0 - avg_cost_per_task * 10.0).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(agent: &str, task: &str, cost: f64, day: u32) -> CostRecord {
        CostRecord {
            agent_id: agent.to_string(),
            task_id: task.to_string(),
            resource_id: "model-a".to_string(),
            units: 100,
            cost,
            recorded_at: Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_apply_updates_every_aggregate() {
        let mut metrics = CostMetrics::default();
        metrics.apply(&record("agent-1", "task-1", 2.0, 5));
        metrics.apply(&record("agent-1", "task-2", 3.0, 5));
        metrics.apply(&record("agent-2", "task-3", 1.0, 6));

        assert!((metrics.total_cost - 6.0).abs() < f64::EPSILON);
        assert_eq!(metrics.record_count, 3);
        assert!((metrics.spent_by_agent("agent-1") - 5.0).abs() < f64::EPSILON);
        assert!((metrics.spent_on_day("2024-03-05") - 5.0).abs() < f64::EPSILON);
        assert!((metrics.spent_in_month("2024-03") - 6.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_negative_records_reduce_totals() {
        let mut metrics = CostMetrics::default();
        metrics.apply(&record("agent-1", "task-1", 4.0, 5));
        metrics.apply(&record("agent-1", "task-1", -1.5, 5));

        assert!((metrics.total_cost - 2.5).abs() < f64::EPSILON);
        assert!((metrics.spent_on_day("2024-03-05") - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_efficiency_degrades_with_expensive_tasks() {
        let mut metrics = CostMetrics::default();
        assert!((metrics.efficiency - 100.0).abs() < f64::EPSILON);

        metrics.apply(&record("agent-1", "task-1", 5.0, 5));
        assert!((metrics.efficiency - 50.0).abs() < f64::EPSILON);

        // Efficiency is clamped at zero
        metrics.apply(&record("agent-1", "task-1", 50.0, 5));
        assert!(metrics.efficiency.abs() < f64::EPSILON);
    }
}

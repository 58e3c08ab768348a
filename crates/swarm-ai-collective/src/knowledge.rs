//! Reusable knowledge fragments and the store that indexes them.

use crate::types::{AgentId, FragmentId};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What kind of insight a fragment captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentKind {
    /// A recurring behavioral pattern
    Pattern,
    /// A working solution to a task
    Solution,
    /// A change that improved cost or speed
    Optimization,
    /// A fix for a known failure mode
    ErrorFix,
    /// A general practice worth repeating
    BestPractice,
}

/// A unit of reusable insight extracted from agent experience.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeFragment {
    /// Unique fragment identifier
    pub fragment_id: FragmentId,

    /// What kind of insight this is
    pub kind: FragmentKind,

    /// Domain the insight applies to, named after the task type
    pub domain: String,

    /// The insight payload
    pub content: serde_json::Value,

    /// Confidence in the insight (0 to 1)
    pub confidence: f32,

    /// How useful the fragment has proven in reuse (0 to 1)
    pub usefulness: f32,

    /// The agent whose experience produced this fragment
    pub source_agent: AgentId,

    /// How many times the fragment has been applied
    pub use_count: u64,

    /// When the fragment was extracted
    pub created_at: DateTime<Utc>,

    /// When the fragment was last applied
    pub last_used: Option<DateTime<Utc>>,
}

impl KnowledgeFragment {
    pub fn new(
        kind: FragmentKind,
        domain: impl Into<String>,
        content: serde_json::Value,
        source_agent: impl Into<String>,
    ) -> Self {
        Self {
            fragment_id: uuid::Uuid::new_v4().to_string(),
            kind,
            domain: domain.into(),
            content,
            confidence: 0.5,
            usefulness: 0.5,
            source_agent: source_agent.into(),
            use_count: 0,
            created_at: Utc::now(),
            last_used: None,
        }
    }

    /// Set the confidence, clamped to [0, 1].
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    /// Override the extraction timestamp.
    pub fn with_created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = at;
        self
    }

    /// Record an application of this fragment, folding whether it helped
    /// into the usefulness score.
    pub fn record_use(&mut self, helpful: bool, now: DateTime<Utc>) {
        self.use_count += 1;
        self.last_used = Some(now);
        let alpha = 0.1;
        let value = if helpful { 1.0 } else { 0.0 };
        self.usefulness = (1.0 - alpha) * self.usefulness + alpha * value;
    }

    /// When the fragment was last touched: last use, or extraction if never
    /// used.
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_used.unwrap_or(self.created_at)
    }
}

/// In-memory repository of knowledge fragments indexed by domain and kind.
#[derive(Debug, Default)]
pub struct KnowledgeStore {
    fragments: HashMap<FragmentId, KnowledgeFragment>,
    by_domain: HashMap<String, Vec<FragmentId>>,
    by_kind: HashMap<FragmentKind, Vec<FragmentId>>,
}

impl KnowledgeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a fragment and return its id.
    pub fn insert(&mut self, fragment: KnowledgeFragment) -> FragmentId {
        let id = fragment.fragment_id.clone();
        self.by_domain
            .entry(fragment.domain.clone())
            .or_default()
            .push(id.clone());
        self.by_kind.entry(fragment.kind).or_default().push(id.clone());
        self.fragments.insert(id.clone(), fragment);
        id
    }

    pub fn get(&self, fragment_id: &str) -> Option<&KnowledgeFragment> {
        self.fragments.get(fragment_id)
    }

    /// Fragments matching a domain and kind, most confident first.
    pub fn retrieve(&self, domain: &str, kind: FragmentKind) -> Vec<&KnowledgeFragment> {
        let mut matches: Vec<&KnowledgeFragment> = self
            .by_domain
            .get(domain)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.fragments.get(id))
                    .filter(|fragment| fragment.kind == kind)
                    .collect()
            })
            .unwrap_or_default();
        sort_by_confidence(&mut matches);
        matches
    }

    /// All fragments for a domain regardless of kind, most confident first.
    pub fn for_domain(&self, domain: &str) -> Vec<&KnowledgeFragment> {
        let mut matches: Vec<&KnowledgeFragment> = self
            .by_domain
            .get(domain)
            .map(|ids| ids.iter().filter_map(|id| self.fragments.get(id)).collect())
            .unwrap_or_default();
        sort_by_confidence(&mut matches);
        matches
    }

    /// All fragments of a kind across domains.
    pub fn of_kind(&self, kind: FragmentKind) -> Vec<&KnowledgeFragment> {
        self.by_kind
            .get(&kind)
            .map(|ids| ids.iter().filter_map(|id| self.fragments.get(id)).collect())
            .unwrap_or_default()
    }

    /// Record that a fragment was applied.
    pub fn record_use(&mut self, fragment_id: &str, helpful: bool, now: DateTime<Utc>) -> bool {
        match self.fragments.get_mut(fragment_id) {
            Some(fragment) => {
                fragment.record_use(helpful, now);
                true
            }
            None => false,
        }
    }

    /// Evict fragments untouched for the retention window and applied fewer
    /// than `min_uses` times. Returns how many were removed. Removal-only,
    /// so it is safe to run between any two reads.
    pub fn decay(&mut self, now: DateTime<Utc>, retention: Duration, min_uses: u64) -> usize {
        let stale: Vec<FragmentId> = self
            .fragments
            .values()
            .filter(|fragment| {
                fragment.use_count < min_uses && now - fragment.last_activity() >= retention
            })
            .map(|fragment| fragment.fragment_id.clone())
            .collect();
        for id in &stale {
            if let Some(fragment) = self.fragments.remove(id) {
                if let Some(ids) = self.by_domain.get_mut(&fragment.domain) {
                    ids.retain(|existing| existing != id);
                }
                if let Some(ids) = self.by_kind.get_mut(&fragment.kind) {
                    ids.retain(|existing| existing != id);
                }
            }
        }
        stale.len()
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &KnowledgeFragment> {
        self.fragments.values()
    }
}

fn sort_by_confidence(fragments: &mut [&KnowledgeFragment]) {
    fragments.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn fragment(domain: &str, kind: FragmentKind, confidence: f32) -> KnowledgeFragment {
        KnowledgeFragment::new(kind, domain, json!({"note": "use the parser"}), "agent-1")
            .with_confidence(confidence)
    }

    #[test]
    fn test_store_and_retrieve_round_trip() {
        let mut store = KnowledgeStore::new();
        let stored = fragment("code_generation", FragmentKind::Solution, 0.9);
        let id = store.insert(stored);

        let matches = store.retrieve("code_generation", FragmentKind::Solution);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].fragment_id, id);

        assert!(store.retrieve("code_generation", FragmentKind::ErrorFix).is_empty());
        assert!(store.retrieve("debugging", FragmentKind::Solution).is_empty());
    }

    #[test]
    fn test_retrieve_orders_by_confidence() {
        let mut store = KnowledgeStore::new();
        store.insert(fragment("testing", FragmentKind::Solution, 0.3));
        let best = store.insert(fragment("testing", FragmentKind::Solution, 0.9));

        let matches = store.retrieve("testing", FragmentKind::Solution);
        assert_eq!(matches[0].fragment_id, best);
    }

    #[test]
    fn test_record_use_updates_usefulness() {
        let mut store = KnowledgeStore::new();
        let id = store.insert(fragment("testing", FragmentKind::Solution, 0.5));
        let now = Utc::now();

        assert!(store.record_use(&id, true, now));
        let stored = store.get(&id).unwrap();
        assert_eq!(stored.use_count, 1);
        assert!(stored.usefulness > 0.5);
        assert_eq!(stored.last_used, Some(now));

        assert!(!store.record_use("no-such-fragment", true, now));
    }

    #[test]
    fn test_decay_evicts_stale_unused_fragments() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut store = KnowledgeStore::new();

        let stale = store.insert(
            fragment("testing", FragmentKind::Solution, 0.5).with_created_at(start),
        );
        let fresh = store.insert(
            fragment("testing", FragmentKind::Solution, 0.5)
                .with_created_at(start + Duration::days(25)),
        );
        let well_used = store.insert(
            fragment("debugging", FragmentKind::ErrorFix, 0.5).with_created_at(start),
        );
        for _ in 0..5 {
            store.record_use(&well_used, true, start + Duration::days(1));
        }

        let now = start + Duration::days(40);
        let evicted = store.decay(now, Duration::days(30), 5);

        assert_eq!(evicted, 1);
        assert!(store.get(&stale).is_none());
        assert!(store.get(&fresh).is_some());
        assert!(store.get(&well_used).is_some());
        assert!(store.retrieve("testing", FragmentKind::Solution).len() == 1);
    }
}

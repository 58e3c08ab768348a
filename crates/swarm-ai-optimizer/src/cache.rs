//! Time-boxed memo for repeatable task results.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A cached task result with the cost it originally took to produce.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedResult {
    /// Cache key the result is stored under
    pub key: String,

    /// The result payload
    pub result: serde_json::Value,

    /// Cost of the invocation that produced the result
    pub cost: f64,

    /// When the result was stored
    pub stored_at: DateTime<Utc>,

    /// How many times the entry has been served
    pub hits: u64,
}

/// In-memory result cache with a fixed TTL.
#[derive(Debug)]
pub struct ResultCache {
    entries: HashMap<String, CachedResult>,
    ttl: Duration,
}

impl ResultCache {
    /// Create a cache whose entries live for `ttl_secs` seconds.
    pub fn new(ttl_secs: i64) -> Self {
        Self {
            entries: HashMap::new(),
            ttl: Duration::seconds(ttl_secs),
        }
    }

    /// Look up a key. Expired entries are removed on access; live entries
    /// have their hit count bumped.
    pub fn get(&mut self, key: &str, now: DateTime<Utc>) -> Option<CachedResult> {
        let expired = match self.entries.get(key) {
            Some(entry) => now.signed_duration_since(entry.stored_at) >= self.ttl,
            None => return None,
        };
        if expired {
            self.entries.remove(key);
            return None;
        }
        let entry = self.entries.get_mut(key)?;
        entry.hits += 1;
        Some(entry.clone())
    }

    /// Store a result, replacing any previous entry under the key.
    pub fn put(
        &mut self,
        key: impl Into<String>,
        result: serde_json::Value,
        cost: f64,
        now: DateTime<Utc>,
    ) {
        let key = key.into();
        self.entries.insert(
            key.clone(),
            CachedResult {
                key,
                result,
                cost,
                stored_at: now,
                hits: 0,
            },
        );
    }

    /// Change the TTL. Existing entries keep their stored-at time and are
    /// judged against the new TTL from now on.
    pub fn set_ttl(&mut self, ttl_secs: i64) {
        self.ttl = Duration::seconds(ttl_secs);
    }

    /// Remove every expired entry, returning how many were dropped.
    pub fn evict_expired(&mut self, now: DateTime<Utc>) -> usize {
        let ttl = self.ttl;
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| now.signed_duration_since(entry.stored_at) < ttl);
        before - self.entries.len()
    }

    /// Number of live entries (including ones not yet noticed as expired).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

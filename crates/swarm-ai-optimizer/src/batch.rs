//! Batching of nearby calls into a single execution.
//!
//! The queue collects submitted items until a size threshold or the window
//! deadline, whichever comes first. Flushing is explicit: the owner polls
//! `should_flush` off its maintenance tick and then drains, so every queued
//! caller is resolved together and nobody observes a half-drained queue.

use chrono::{DateTime, Duration, Utc};
use tokio::sync::oneshot;

struct PendingEntry<T, R> {
    item: T,
    tx: oneshot::Sender<R>,
}

/// Collects items for batched execution and hands each submitter a
/// receiver for its result. Dropping the receiver abandons the slot.
pub struct BatchQueue<T, R> {
    window: Duration,
    max_size: usize,
    pending: Vec<PendingEntry<T, R>>,
    deadline: Option<DateTime<Utc>>,
}

impl<T, R> BatchQueue<T, R> {
    /// Create a queue flushing after `window_ms` milliseconds or `max_size`
    /// items, whichever comes first.
    pub fn new(window_ms: i64, max_size: usize) -> Self {
        Self {
            window: Duration::milliseconds(window_ms),
            max_size: max_size.max(1),
            pending: Vec::new(),
            deadline: None,
        }
    }

    /// Queue an item. The window deadline starts with the first item of a
    /// batch.
    pub fn submit(&mut self, item: T, now: DateTime<Utc>) -> oneshot::Receiver<R> {
        let (tx, rx) = oneshot::channel();
        if self.pending.is_empty() {
            self.deadline = Some(now + self.window);
        }
        self.pending.push(PendingEntry { item, tx });
        rx
    }

    /// Change the window and size thresholds. Items already queued keep
    /// their current deadline; the new window applies from the next batch.
    pub fn configure(&mut self, window_ms: i64, max_size: usize) {
        self.window = Duration::milliseconds(window_ms);
        self.max_size = max_size.max(1);
    }

    /// Whether the queue is due for a flush.
    pub fn should_flush(&self, now: DateTime<Utc>) -> bool {
        if self.pending.is_empty() {
            return false;
        }
        if self.pending.len() >= self.max_size {
            return true;
        }
        matches!(self.deadline, Some(deadline) if now >= deadline)
    }

    /// Take every pending entry as one batch and reset the window.
    pub fn drain(&mut self) -> Batch<T, R> {
        self.deadline = None;
        Batch {
            batch_id: uuid::Uuid::new_v4().to_string(),
            entries: std::mem::take(&mut self.pending),
        }
    }

    /// Number of queued items.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// A drained batch awaiting resolution. Consuming it resolves every caller.
pub struct Batch<T, R> {
    batch_id: String,
    entries: Vec<PendingEntry<T, R>>,
}

impl<T, R> Batch<T, R> {
    /// Identifier for correlating logs about this batch.
    pub fn id(&self) -> &str {
        &self.batch_id
    }

    /// Number of entries in the batch.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The queued items, in submission order.
    pub fn items(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|entry| &entry.item)
    }

    /// Resolve each caller with the result of `f` on its item. Abandoned
    /// slots are skipped silently.
    pub fn resolve_with(self, mut f: impl FnMut(T) -> R) {
        for entry in self.entries {
            let result = f(entry.item);
            let _ = entry.tx.send(result);
        }
    }

    /// Take the entries as item/sender pairs, for resolvers that must
    /// await between items.
    pub fn into_entries(self) -> Vec<(T, oneshot::Sender<R>)> {
        self.entries
            .into_iter()
            .map(|entry| (entry.item, entry.tx))
            .collect()
    }
}

impl<T, R: Clone> Batch<T, R> {
    /// Resolve every caller with the same result, e.g. a shared error.
    pub fn resolve_all(self, result: R) {
        for entry in self.entries {
            let _ = entry.tx.send(result.clone());
        }
    }
}

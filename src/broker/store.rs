//! Concurrency-safe record table.
//!
//! Every operation holds the shard lock for its key for the whole
//! read-modify-write, so callers never see a half-written record. The
//! underlying map is never handed out.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use std::time::SystemTime;

use crate::broker::error::StoreError;
use crate::broker::key::CorrelationKey;
use crate::broker::record::{RequestDescriptor, RequestRecord, ResultDescriptor};
use crate::observability::metrics;

/// What happened to a result handed to [`RecordStore::complete_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// The record moved from pending to completed.
    Completed,
    /// The record already had a result; the new one was dropped.
    AlreadyCompleted,
    /// No record exists for the key; the result was dropped.
    UnknownKey,
}

impl CompletionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::AlreadyCompleted => "already_completed",
            Self::UnknownKey => "unknown_key",
        }
    }
}

/// Record counts by state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RecordSummary {
    pub total: usize,
    pub pending: usize,
    pub completed: usize,
}

/// Shared mapping from correlation key to record. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    inner: Arc<DashMap<CorrelationKey, RequestRecord>>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pending record. Fails only if the key is already tracked.
    pub fn put(&self, key: CorrelationKey, request: RequestDescriptor) -> Result<(), StoreError> {
        match self.inner.entry(key) {
            Entry::Occupied(entry) => Err(StoreError::DuplicateKey(entry.key().clone())),
            Entry::Vacant(entry) => {
                let record = RequestRecord::new(entry.key().clone(), request);
                entry.insert(record);
                metrics::record_tracked_records(self.inner.len());
                Ok(())
            }
        }
    }

    /// Snapshot of the record, if any.
    pub fn get(&self, key: &CorrelationKey) -> Option<RequestRecord> {
        self.inner.get(key).map(|r| r.value().clone())
    }

    /// Attach the downstream result. Write-once: a completed record keeps
    /// its first result.
    pub fn complete_with(&self, key: &CorrelationKey, result: ResultDescriptor) -> CompletionOutcome {
        let Some(mut record) = self.inner.get_mut(key) else {
            return CompletionOutcome::UnknownKey;
        };

        if record.result.is_some() {
            return CompletionOutcome::AlreadyCompleted;
        }

        record.submitted_at = SystemTime::now();
        record.result = Some(result);
        CompletionOutcome::Completed
    }

    /// Refresh the "last observed" timestamp and return the refreshed record.
    pub fn touch(&self, key: &CorrelationKey) -> Option<RequestRecord> {
        let mut record = self.inner.get_mut(key)?;
        record.submitted_at = SystemTime::now();
        Some(record.value().clone())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Count records by state. Not a consistent snapshot across shards.
    pub fn summary(&self) -> RecordSummary {
        let mut summary = RecordSummary::default();
        for r in self.inner.iter() {
            summary.total += 1;
            if r.value().result.is_some() {
                summary.completed += 1;
            } else {
                summary.pending += 1;
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::record::{ClientRequest, HeaderSet, RecordState};
    use std::time::Duration;

    fn descriptor() -> RequestDescriptor {
        ClientRequest::new("GET", "http://x/y", HeaderSet::new().with("A", "1"))
            .validate()
            .unwrap()
    }

    fn result(id: &str) -> ResultDescriptor {
        ResultDescriptor {
            id: id.into(),
            status: 200,
            headers: HeaderSet::new(),
            content_length: Some(42),
        }
    }

    #[test]
    fn test_put_and_get() {
        let store = RecordStore::new();
        let key = CorrelationKey::new("k1");

        assert!(store.get(&key).is_none());
        store.put(key.clone(), descriptor()).unwrap();

        let record = store.get(&key).expect("record");
        assert_eq!(record.key, key);
        assert_eq!(record.state(), RecordState::Pending);
        assert_eq!(record.request, descriptor());
    }

    #[test]
    fn test_put_duplicate_key_fails() {
        let store = RecordStore::new();
        let key = CorrelationKey::new("k1");
        store.put(key.clone(), descriptor()).unwrap();

        let err = store.put(key.clone(), descriptor()).unwrap_err();
        assert_eq!(err, StoreError::DuplicateKey(key));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_complete_with_is_write_once() {
        let store = RecordStore::new();
        let key = CorrelationKey::new("k1");
        store.put(key.clone(), descriptor()).unwrap();

        assert_eq!(store.complete_with(&key, result("r1")), CompletionOutcome::Completed);
        assert_eq!(
            store.complete_with(&key, result("r2")),
            CompletionOutcome::AlreadyCompleted
        );

        let record = store.get(&key).unwrap();
        assert_eq!(record.state(), RecordState::Completed);
        assert_eq!(record.result, Some(result("r1")));
    }

    #[test]
    fn test_complete_unknown_key_is_dropped() {
        let store = RecordStore::new();
        let key = CorrelationKey::new("ghost");

        assert_eq!(store.complete_with(&key, result("r1")), CompletionOutcome::UnknownKey);
        assert!(store.is_empty());
    }

    #[test]
    fn test_touch_refreshes_timestamp_only() {
        let store = RecordStore::new();
        let key = CorrelationKey::new("k1");
        store.put(key.clone(), descriptor()).unwrap();
        let before = store.get(&key).unwrap().submitted_at;

        std::thread::sleep(Duration::from_millis(5));
        let touched = store.touch(&key).expect("record");

        assert!(touched.submitted_at > before);
        assert_eq!(touched.state(), RecordState::Pending);
        assert!(store.touch(&CorrelationKey::new("ghost")).is_none());
    }

    #[test]
    fn test_summary_counts_states() {
        let store = RecordStore::new();
        for i in 0..3 {
            store.put(CorrelationKey::new(format!("k{i}")), descriptor()).unwrap();
        }
        store.complete_with(&CorrelationKey::new("k0"), result("k0"));

        assert_eq!(
            store.summary(),
            RecordSummary {
                total: 3,
                pending: 2,
                completed: 1
            }
        );
    }

    #[test]
    fn test_concurrent_completion_has_single_winner() {
        let store = RecordStore::new();
        let key = CorrelationKey::new("k1");
        store.put(key.clone(), descriptor()).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                let key = key.clone();
                std::thread::spawn(move || store.complete_with(&key, result(&format!("r{i}"))))
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|o| *o == CompletionOutcome::Completed)
            .count();
        assert_eq!(winners, 1);
    }
}

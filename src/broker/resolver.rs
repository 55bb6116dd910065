//! Status lookups for polling clients.

use crate::broker::key::CorrelationKey;
use crate::broker::record::ResultDescriptor;
use crate::broker::store::RecordStore;
use crate::observability::metrics;

/// What a poll observes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The key was never issued by this process.
    NotFound,
    /// The record exists but no result has arrived yet.
    Pending,
    /// The record's result, verbatim.
    Completed(ResultDescriptor),
}

impl PollOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Pending => "pending",
            Self::Completed(_) => "completed",
        }
    }
}

/// Answers polls. Each hit refreshes the record's last-observed time.
#[derive(Debug, Clone)]
pub struct StatusResolver {
    store: RecordStore,
}

impl StatusResolver {
    pub fn new(store: RecordStore) -> Self {
        Self { store }
    }

    pub fn poll(&self, key: &CorrelationKey) -> PollOutcome {
        let outcome = match self.store.touch(key) {
            None => PollOutcome::NotFound,
            Some(record) => match record.result {
                None => PollOutcome::Pending,
                Some(result) => PollOutcome::Completed(result),
            },
        };

        metrics::record_poll(outcome.as_str());
        tracing::debug!(key = %key, state = outcome.as_str(), "Status polled");
        outcome
    }
}

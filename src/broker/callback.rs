//! Completion of records from downstream callbacks.

use crate::broker::key::CorrelationKey;
use crate::broker::record::ResultDescriptor;
use crate::broker::store::{CompletionOutcome, RecordStore};
use crate::observability::metrics;

/// Applies asynchronous results to their records.
#[derive(Debug, Clone)]
pub struct CallbackReceiver {
    store: RecordStore,
}

impl CallbackReceiver {
    pub fn new(store: RecordStore) -> Self {
        Self { store }
    }

    /// Attach `result` to the record for `key`.
    ///
    /// Unknown keys and repeated completions are accepted and have no
    /// effect; the outcome says which case applied.
    pub fn complete(&self, key: &CorrelationKey, result: ResultDescriptor) -> CompletionOutcome {
        let status = result.status;
        let outcome = self.store.complete_with(key, result);
        metrics::record_callback(outcome.as_str());

        match outcome {
            CompletionOutcome::Completed => {
                tracing::info!(key = %key, status, "Request completed");
            }
            CompletionOutcome::AlreadyCompleted => {
                tracing::warn!(key = %key, status, "Duplicate callback ignored");
            }
            CompletionOutcome::UnknownKey => {
                tracing::warn!(key = %key, status, "Callback for unknown key discarded");
            }
        }

        outcome
    }
}

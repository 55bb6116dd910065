//! Request submission and background dispatch.

use std::sync::Arc;
use tokio::sync::mpsc;

use crate::broker::error::SubmitError;
use crate::broker::key::{CorrelationKey, KeyGenerator, UuidKeyGenerator};
use crate::broker::record::ClientRequest;
use crate::broker::store::RecordStore;
use crate::downstream::{DownstreamError, DownstreamExecutor};
use crate::observability::metrics;

/// Outcome of one background downstream call.
///
/// Records are never altered by a failed dispatch: the record stays pending.
#[derive(Debug)]
pub struct DispatchReport {
    pub key: CorrelationKey,
    pub outcome: Result<(), DownstreamError>,
}

/// Validates submissions, creates records and fires the downstream call.
#[derive(Clone)]
pub struct Dispatcher {
    store: RecordStore,
    keys: Arc<dyn KeyGenerator>,
    executor: Arc<dyn DownstreamExecutor>,
    reports: mpsc::UnboundedSender<DispatchReport>,
}

impl Dispatcher {
    /// Create a dispatcher using UUID keys.
    ///
    /// Returns the dispatcher and a receiver for dispatch reports.
    pub fn new(
        store: RecordStore,
        executor: Arc<dyn DownstreamExecutor>,
    ) -> (Self, mpsc::UnboundedReceiver<DispatchReport>) {
        Self::with_key_generator(store, executor, Arc::new(UuidKeyGenerator))
    }

    pub fn with_key_generator(
        store: RecordStore,
        executor: Arc<dyn DownstreamExecutor>,
        keys: Arc<dyn KeyGenerator>,
    ) -> (Self, mpsc::UnboundedReceiver<DispatchReport>) {
        let (reports, reports_rx) = mpsc::unbounded_channel();
        (
            Self {
                store,
                keys,
                executor,
                reports,
            },
            reports_rx,
        )
    }

    /// Validate and register a request, then hand it to the executor in the
    /// background. Returns as soon as the record exists.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn submit(&self, request: ClientRequest) -> Result<CorrelationKey, SubmitError> {
        let descriptor = match request.validate() {
            Ok(d) => d,
            Err(e) => {
                metrics::record_submission("rejected");
                return Err(e.into());
            }
        };

        let key = self.keys.generate();
        if let Err(e) = self.store.put(key.clone(), descriptor.clone()) {
            metrics::record_submission("collision");
            return Err(e.into());
        }
        metrics::record_submission("accepted");

        tracing::info!(
            key = %key,
            method = %descriptor.method,
            url = %descriptor.url,
            "Request registered"
        );

        let executor = Arc::clone(&self.executor);
        let reports = self.reports.clone();
        let report_key = key.clone();
        tokio::spawn(async move {
            let outcome = executor.execute(report_key.clone(), descriptor).await;
            // Nobody listening is fine: the outcome is informational.
            let _ = reports.send(DispatchReport {
                key: report_key,
                outcome,
            });
        });

        Ok(key)
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }
}

/// Drain dispatch reports, logging and counting each outcome.
///
/// Ends when every [`Dispatcher`] clone has been dropped.
pub async fn log_dispatch_reports(mut reports: mpsc::UnboundedReceiver<DispatchReport>) {
    while let Some(report) = reports.recv().await {
        match report.outcome {
            Ok(()) => {
                metrics::record_dispatch("accepted");
                tracing::debug!(key = %report.key, "Downstream accepted request");
            }
            Err(e) => {
                metrics::record_dispatch("failed");
                tracing::warn!(
                    key = %report.key,
                    error = %e,
                    "Downstream call failed; record stays pending"
                );
            }
        }
    }
}

//! Fire-and-forget delivery of session records to the outbound ports.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;

use quizproctor_core::error::SinkError;
use quizproctor_core::results::{AnswerRecord, ResultRecord};
use quizproctor_core::traits::{ResultSink, SinkSet, TelemetrySink};

/// In-flight deliveries for one session.
pub(crate) struct Deliveries {
    sinks: SinkSet,
    pending: JoinSet<()>,
}

impl Deliveries {
    pub(crate) fn new(sinks: SinkSet) -> Self {
        Self {
            sinks,
            pending: JoinSet::new(),
        }
    }

    pub(crate) fn answer(&mut self, record: AnswerRecord) {
        let sink: Arc<dyn TelemetrySink> = Arc::clone(&self.sinks.telemetry);
        self.pending.spawn(async move {
            if let Err(e) = sink.record_answer(&record).await {
                log_failure("telemetry", sink.name(), &e);
            }
        });
    }

    pub(crate) fn result(&mut self, record: ResultRecord) {
        let sink: Arc<dyn ResultSink> = Arc::clone(&self.sinks.results);
        self.pending.spawn(async move {
            match sink.persist_result(&record).await {
                Ok(()) => tracing::debug!(sink = sink.name(), "result persisted"),
                Err(e) => log_failure("result", sink.name(), &e),
            }
        });
    }

    /// Reap finished deliveries so the set does not grow over a long exam.
    pub(crate) fn reap(&mut self) {
        while let Some(joined) = self.pending.try_join_next() {
            if let Err(e) = joined {
                tracing::warn!("delivery task failed: {e}");
            }
        }
    }

    /// Wait up to `timeout` for everything in flight, then detach the rest.
    pub(crate) async fn settle(mut self, timeout: Duration) {
        let pending = &mut self.pending;
        let drained = tokio::time::timeout(timeout, async {
            while let Some(joined) = pending.join_next().await {
                if let Err(e) = joined {
                    tracing::warn!("delivery task failed: {e}");
                }
            }
        })
        .await;

        if drained.is_err() {
            tracing::warn!(
                pending = self.pending.len(),
                "deliveries still in flight after {}ms, detaching",
                timeout.as_millis()
            );
        }
        self.pending.detach_all();
    }

    /// Let in-flight deliveries finish on their own.
    pub(crate) fn detach(mut self) {
        self.pending.detach_all();
    }
}

fn log_failure(port: &str, sink: &str, error: &anyhow::Error) {
    match error.downcast_ref::<SinkError>() {
        Some(e) if e.is_permanent() => {
            tracing::error!(port, sink, "delivery rejected: {e}");
        }
        _ => tracing::warn!(port, sink, "delivery failed: {error:#}"),
    }
}

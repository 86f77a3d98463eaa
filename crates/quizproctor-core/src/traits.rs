//! Outbound ports for telemetry and result persistence.
//!
//! These async traits are implemented by the `quizproctor-sinks` crate. The
//! session host calls them fire-and-forget; an `Err` is logged and dropped.

use std::sync::Arc;

use async_trait::async_trait;

use crate::results::{AnswerRecord, ResultRecord};

/// Receives one record per graded answer.
#[async_trait]
pub trait TelemetrySink: Send + Sync {
    /// Human-readable sink name (e.g. "rest").
    fn name(&self) -> &str;

    /// Deliver a per-answer record.
    async fn record_answer(&self, record: &AnswerRecord) -> anyhow::Result<()>;
}

/// Receives the final result of a session.
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Human-readable sink name (e.g. "rest").
    fn name(&self) -> &str;

    /// Persist a final result.
    async fn persist_result(&self, record: &ResultRecord) -> anyhow::Result<()>;
}

/// The pair of outbound ports a session writes to.
#[derive(Clone)]
pub struct SinkSet {
    pub telemetry: Arc<dyn TelemetrySink>,
    pub results: Arc<dyn ResultSink>,
}

impl SinkSet {
    /// Use one value for both ports.
    pub fn shared<S>(sink: Arc<S>) -> Self
    where
        S: TelemetrySink + ResultSink + 'static,
    {
        Self {
            telemetry: sink.clone(),
            results: sink,
        }
    }
}

impl Default for SinkSet {
    fn default() -> Self {
        Self::shared(Arc::new(NullSink))
    }
}

/// Sink that accepts and discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

#[async_trait]
impl TelemetrySink for NullSink {
    fn name(&self) -> &str {
        "none"
    }

    async fn record_answer(&self, _: &AnswerRecord) -> anyhow::Result<()> {
        Ok(())
    }
}

#[async_trait]
impl ResultSink for NullSink {
    fn name(&self) -> &str {
        "none"
    }

    async fn persist_result(&self, _: &ResultRecord) -> anyhow::Result<()> {
        Ok(())
    }
}

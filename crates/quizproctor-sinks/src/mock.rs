//! Recording sink for testing.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use quizproctor_core::error::SinkError;
use quizproctor_core::results::{AnswerRecord, ResultRecord};
use quizproctor_core::traits::{ResultSink, TelemetrySink};

/// A sink that keeps every record in memory.
///
/// Can be switched into a failing mode to exercise best-effort delivery.
#[derive(Default)]
pub struct RecordingSink {
    answers: Mutex<Vec<AnswerRecord>>,
    results: Mutex<Vec<ResultRecord>>,
    call_count: AtomicU32,
    failing: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a sink whose every delivery fails with a network error.
    pub fn failing() -> Self {
        let sink = Self::default();
        sink.set_failing(true);
        sink
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    /// Number of delivery attempts, failed ones included.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    pub fn answers(&self) -> Vec<AnswerRecord> {
        self.answers.lock().unwrap().clone()
    }

    pub fn results(&self) -> Vec<ResultRecord> {
        self.results.lock().unwrap().clone()
    }

    fn attempt(&self) -> Result<(), SinkError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        if self.failing.load(Ordering::Relaxed) {
            Err(SinkError::Network("recording sink set to fail".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl TelemetrySink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    async fn record_answer(&self, record: &AnswerRecord) -> anyhow::Result<()> {
        self.attempt()?;
        self.answers.lock().unwrap().push(record.clone());
        Ok(())
    }
}

#[async_trait]
impl ResultSink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    async fn persist_result(&self, record: &ResultRecord) -> anyhow::Result<()> {
        self.attempt()?;
        self.results.lock().unwrap().push(record.clone());
        Ok(())
    }
}

//! Sink that only writes to the tracing log. Used when no backend is set up.

use async_trait::async_trait;

use quizproctor_core::results::{AnswerRecord, ResultRecord};
use quizproctor_core::traits::{ResultSink, TelemetrySink};

#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl TelemetrySink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    async fn record_answer(&self, record: &AnswerRecord) -> anyhow::Result<()> {
        tracing::info!(
            session = %record.session_id,
            user = %record.user_id,
            correct = record.is_correct,
            elapsed_secs = record.elapsed_seconds,
            topics = ?record.topics,
            "answer recorded"
        );
        Ok(())
    }
}

#[async_trait]
impl ResultSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    async fn persist_result(&self, record: &ResultRecord) -> anyhow::Result<()> {
        tracing::info!(
            session = %record.session_id,
            quiz = %record.quiz_id,
            user = %record.user_id,
            score = record.score,
            total = record.total_questions,
            reason = %record.reason,
            violations = record.violation_count,
            forced = record.forcibly_submitted,
            "result recorded"
        );
        Ok(())
    }
}

//! REST backend sink.
//!
//! Posts records as JSON rows to a backend-as-a-service REST endpoint. The
//! key is sent both as an `apikey` header and as a bearer token, which is
//! what hosted Postgres REST gateways expect.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;
use tracing::instrument;

use quizproctor_core::error::SinkError;
use quizproctor_core::results::{AnswerRecord, ResultRecord};
use quizproctor_core::traits::{ResultSink, TelemetrySink};

pub const DEFAULT_RESULTS_PATH: &str = "/rest/v1/exam_results";
pub const DEFAULT_ANSWERS_PATH: &str = "/rest/v1/answer_logs";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Sink that writes to a REST backend.
pub struct RestSink {
    api_key: String,
    base_url: String,
    results_path: String,
    answers_path: String,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl RestSink {
    pub fn new(api_key: &str, base_url: &str, timeout_secs: u64) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            results_path: DEFAULT_RESULTS_PATH.to_string(),
            answers_path: DEFAULT_ANSWERS_PATH.to_string(),
            timeout_secs,
            client,
        })
    }

    pub fn with_paths(mut self, results_path: &str, answers_path: &str) -> Self {
        self.results_path = results_path.to_string();
        self.answers_path = answers_path.to_string();
        self
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<(), SinkError> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Prefer", "return=minimal")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SinkError::Timeout(self.timeout_secs)
                } else if e.is_builder() || e.is_body() {
                    SinkError::Serialization(e.to_string())
                } else {
                    SinkError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if status == 401 || status == 403 {
            let body = response.text().await.unwrap_or_default();
            return Err(SinkError::Unauthorized(body));
        }
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            return Err(SinkError::Rejected {
                status,
                message: body,
            });
        }

        Ok(())
    }
}

#[async_trait]
impl TelemetrySink for RestSink {
    fn name(&self) -> &str {
        "rest"
    }

    #[instrument(skip(self, record), fields(session = %record.session_id))]
    async fn record_answer(&self, record: &AnswerRecord) -> anyhow::Result<()> {
        self.post(&self.answers_path, record).await?;
        Ok(())
    }
}

#[async_trait]
impl ResultSink for RestSink {
    fn name(&self) -> &str {
        "rest"
    }

    #[instrument(skip(self, record), fields(session = %record.session_id, score = record.score))]
    async fn persist_result(&self, record: &ResultRecord) -> anyhow::Result<()> {
        self.post(&self.results_path, record).await?;
        tracing::debug!("result persisted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quizproctor_core::results::FinishReason;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn result_record() -> ResultRecord {
        ResultRecord {
            session_id: uuid::Uuid::nil(),
            quiz_id: "quiz-1".into(),
            user_id: "student-1".into(),
            score: 2,
            total_questions: 3,
            reason: FinishReason::Completed,
            subject: Some("Vật lý".into()),
            grade: Some("11".into()),
            violation_count: 0,
            forcibly_submitted: false,
            finished_at: chrono::Utc::now(),
        }
    }

    fn answer_record() -> AnswerRecord {
        AnswerRecord {
            session_id: uuid::Uuid::nil(),
            user_id: "student-1".into(),
            question_text: "Q1".into(),
            is_correct: true,
            elapsed_seconds: 12,
            topics: vec!["optics".into()],
        }
    }

    #[tokio::test]
    async fn persists_result_with_auth_headers() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/rest/v1/exam_results"))
            .and(header("apikey", "anon-key"))
            .and(header("Authorization", "Bearer anon-key"))
            .and(body_partial_json(serde_json::json!({
                "score": 2,
                "total_questions": 3,
                "reason": "completed"
            })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let sink = RestSink::new("anon-key", &server.uri(), 5).unwrap();
        sink.persist_result(&result_record()).await.unwrap();
    }

    #[tokio::test]
    async fn records_answer_on_custom_path() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/answers"))
            .and(body_partial_json(serde_json::json!({
                "question_text": "Q1",
                "is_correct": true,
                "elapsed_seconds": 12
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let sink = RestSink::new("k", &format!("{}/", server.uri()), 5)
            .unwrap()
            .with_paths("/api/results", "/api/answers");
        sink.record_answer(&answer_record()).await.unwrap();
    }

    #[tokio::test]
    async fn unauthorized_is_classified() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let sink = RestSink::new("bad", &server.uri(), 5).unwrap();
        let err = sink.persist_result(&result_record()).await.unwrap_err();
        let sink_err = err.downcast_ref::<SinkError>().unwrap();
        assert!(matches!(sink_err, SinkError::Unauthorized(_)));
        assert!(sink_err.is_permanent());
    }

    #[tokio::test]
    async fn server_error_is_rejected() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let sink = RestSink::new("k", &server.uri(), 5).unwrap();
        let err = sink.record_answer(&answer_record()).await.unwrap_err();
        assert!(err.to_string().contains("503"));
        assert!(err.to_string().contains("maintenance"));
    }

    #[tokio::test]
    async fn unreachable_backend_is_network_error() {
        let sink = RestSink::new("k", "http://127.0.0.1:9", 2).unwrap();
        let err = sink.persist_result(&result_record()).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SinkError>(),
            Some(SinkError::Network(_)) | Some(SinkError::Timeout(_))
        ));
    }
}

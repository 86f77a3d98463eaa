//! Outbound records produced by a quiz session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Every question was answered and advanced past.
    Completed,
    /// The countdown reached zero.
    TimedOut,
    /// The proctor ended the exam after repeated violations.
    ForcedSubmission,
    /// The quiz had no questions to show.
    NoQuestions,
}

impl fmt::Display for FinishReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FinishReason::Completed => write!(f, "completed"),
            FinishReason::TimedOut => write!(f, "timed out"),
            FinishReason::ForcedSubmission => write!(f, "forced submission"),
            FinishReason::NoQuestions => write!(f, "no questions"),
        }
    }
}

/// The final score of a session, reported exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizOutcome {
    pub score: u32,
    pub total_questions: u32,
    pub reason: FinishReason,
}

impl QuizOutcome {
    /// Fraction of the full question count answered correctly.
    pub fn ratio(&self) -> f64 {
        if self.total_questions == 0 {
            0.0
        } else {
            f64::from(self.score) / f64::from(self.total_questions)
        }
    }
}

/// One graded answer, kept for the end-of-quiz review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradedAnswer {
    pub question_index: usize,
    pub selected: String,
    pub is_correct: bool,
    pub elapsed_secs: u64,
}

/// Something the engine wants delivered outside the session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A question was graded; forwarded to telemetry.
    AnswerGraded {
        question_text: String,
        is_correct: bool,
        elapsed_secs: u64,
        topics: Vec<String>,
    },
    /// The session reached a terminal state.
    Finished(QuizOutcome),
}

/// Per-answer telemetry payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub session_id: Uuid,
    pub user_id: String,
    pub question_text: String,
    pub is_correct: bool,
    pub elapsed_seconds: u64,
    pub topics: Vec<String>,
}

/// Final result payload, including out-of-band exam context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub session_id: Uuid,
    pub quiz_id: String,
    pub user_id: String,
    pub score: u32,
    pub total_questions: u32,
    pub reason: FinishReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
    pub violation_count: u32,
    pub forcibly_submitted: bool,
    pub finished_at: DateTime<Utc>,
}

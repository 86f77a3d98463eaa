//! Timed quiz engine.
//!
//! Drives one user through a fixed, ordered list of questions under a global
//! countdown. The engine performs no I/O: every operation is synchronous and
//! anything meant for the outside world is queued as a [`SessionEvent`] that
//! the host drains with [`QuizEngine::drain_events`].
//!
//! ```text
//! Idle --initialize--> InProgress(0)
//! InProgress --select_answer--> Answered
//! Answered --advance--> InProgress(cursor + 1) | Finished
//! InProgress | Answered --countdown hits 0 / force_submit--> Finished
//! ```

use std::sync::Arc;

use tokio::time::Instant;

use crate::model::{format_mm_ss, Question, Quiz};
use crate::results::{FinishReason, GradedAnswer, QuizOutcome, SessionEvent};

/// Externally visible state of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No quiz loaded yet.
    Idle,
    /// Waiting for an answer to the current question.
    InProgress,
    /// Current question graded, waiting for `advance`.
    Answered,
    /// Terminal. No further transitions are accepted.
    Finished,
}

/// The quiz session state machine.
pub struct QuizEngine {
    quiz: Option<Arc<Quiz>>,
    cursor: usize,
    score: u32,
    selected: Option<String>,
    answered: bool,
    remaining_secs: u64,
    timer_running: bool,
    question_shown_at: Instant,
    history: Vec<GradedAnswer>,
    outcome: Option<QuizOutcome>,
    outbox: Vec<SessionEvent>,
}

impl Default for QuizEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl QuizEngine {
    /// Create an idle engine with no quiz loaded.
    pub fn new() -> Self {
        Self {
            quiz: None,
            cursor: 0,
            score: 0,
            selected: None,
            answered: false,
            remaining_secs: 0,
            timer_running: false,
            question_shown_at: Instant::now(),
            history: Vec::new(),
            outcome: None,
            outbox: Vec::new(),
        }
    }

    /// Create an engine and immediately load `quiz`.
    pub fn start(quiz: impl Into<Arc<Quiz>>) -> Self {
        let mut engine = Self::new();
        engine.initialize(quiz);
        engine
    }

    /// Load a quiz and start its countdown.
    ///
    /// Replaces all session state, including undelivered events of a
    /// previous session. A quiz without questions finishes immediately.
    pub fn initialize(&mut self, quiz: impl Into<Arc<Quiz>>) {
        let quiz = quiz.into();
        let remaining_secs = quiz.time_limit_secs();
        let is_empty = quiz.is_empty();

        tracing::debug!(
            quiz_id = %quiz.id,
            questions = quiz.len(),
            remaining_secs,
            "initializing quiz session"
        );

        *self = Self {
            quiz: Some(quiz),
            remaining_secs,
            timer_running: true,
            ..Self::new()
        };

        if is_empty {
            self.finish(FinishReason::NoQuestions);
        }
    }

    /// Answer the current question.
    ///
    /// Silently ignored when the question was already answered, the
    /// countdown has stopped, or there is no current question. Returns
    /// whether the answer was graded.
    pub fn select_answer(&mut self, option: &str) -> bool {
        if self.answered || !self.timer_running || self.outcome.is_some() {
            return false;
        }
        let Some(question) = self.current_question() else {
            return false;
        };

        let is_correct = question.is_correct(option);
        let elapsed_secs = self.question_shown_at.elapsed().as_secs();
        let event = SessionEvent::AnswerGraded {
            question_text: question.prompt.clone(),
            is_correct,
            elapsed_secs,
            topics: question.topics.clone(),
        };

        self.answered = true;
        self.selected = Some(option.to_string());
        if is_correct {
            self.score += 1;
        }
        self.history.push(GradedAnswer {
            question_index: self.cursor,
            selected: option.to_string(),
            is_correct,
            elapsed_secs,
        });
        self.outbox.push(event);

        tracing::debug!(cursor = self.cursor, is_correct, elapsed_secs, "answer graded");
        true
    }

    /// Move to the next question.
    ///
    /// Ignored unless the current question has been answered. Returns whether
    /// the cursor moved.
    pub fn advance(&mut self) -> bool {
        if !self.answered || self.outcome.is_some() {
            return false;
        }

        self.answered = false;
        self.selected = None;
        self.cursor += 1;
        self.question_shown_at = Instant::now();

        if self.cursor >= self.total_questions() {
            self.finish(FinishReason::Completed);
        }
        true
    }

    /// Count down one second.
    ///
    /// The host must call this exactly once per elapsed second. Reaching
    /// zero stops the timer and ends the session at the current cursor.
    pub fn tick(&mut self) {
        if !self.timer_running || self.outcome.is_some() {
            return;
        }

        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            self.timer_running = false;
            self.finish(FinishReason::TimedOut);
        }
    }

    /// End the session now with the score accumulated so far.
    ///
    /// Bypasses the answered guard of [`advance`](Self::advance). A no-op on
    /// an idle or already finished session.
    pub fn force_submit(&mut self) {
        if self.quiz.is_none() {
            return;
        }
        self.finish(FinishReason::ForcedSubmission);
    }

    fn finish(&mut self, reason: FinishReason) {
        if self.outcome.is_some() {
            return;
        }

        let outcome = QuizOutcome {
            score: self.score,
            total_questions: question_count(self.total_questions()),
            reason,
        };
        self.timer_running = false;
        self.outcome = Some(outcome);
        self.outbox.push(SessionEvent::Finished(outcome));

        tracing::info!(
            score = outcome.score,
            total = outcome.total_questions,
            %reason,
            "quiz session finished"
        );
    }

    /// Take all events queued since the last call.
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.outbox)
    }

    pub fn phase(&self) -> Phase {
        if self.quiz.is_none() {
            Phase::Idle
        } else if self.outcome.is_some() {
            Phase::Finished
        } else if self.answered {
            Phase::Answered
        } else {
            Phase::InProgress
        }
    }

    /// Whether the session is InProgress or Answered.
    pub fn is_active(&self) -> bool {
        matches!(self.phase(), Phase::InProgress | Phase::Answered)
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn quiz(&self) -> Option<&Arc<Quiz>> {
        self.quiz.as_ref()
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.quiz.as_ref()?.questions.get(self.cursor)
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn total_questions(&self) -> usize {
        self.quiz.as_ref().map_or(0, |q| q.len())
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn selected_answer(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn is_answered(&self) -> bool {
        self.answered
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    /// Remaining time as `MM:SS`.
    pub fn remaining_display(&self) -> String {
        format_mm_ss(self.remaining_secs)
    }

    pub fn timer_running(&self) -> bool {
        self.timer_running
    }

    pub fn outcome(&self) -> Option<QuizOutcome> {
        self.outcome
    }

    /// Graded answers in the order they were given.
    pub fn history(&self) -> &[GradedAnswer] {
        &self.history
    }
}

/// Question count as reported in outcomes, saturating at `u32::MAX`.
fn question_count(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

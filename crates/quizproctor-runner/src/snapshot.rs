//! Read-only view of a running session, published over a watch channel.

use uuid::Uuid;

use quizproctor_core::engine::{Phase, QuizEngine};
use quizproctor_core::proctor::ExamProctor;
use quizproctor_core::results::{GradedAnswer, QuizOutcome};

/// The question currently on screen.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionView {
    /// 1-based position for display.
    pub number: usize,
    pub prompt: String,
    /// Options prefixed with their letter label, e.g. `("A", "Paris")`.
    pub options: Vec<(String, String)>,
    /// Revealed once the question is answered.
    pub correct_answer: Option<String>,
    /// Revealed once the question is answered, if the quiz has one.
    pub explanation: Option<String>,
}

/// Proctoring indicators.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProctorView {
    pub armed: bool,
    pub fullscreen_prompt: bool,
    pub warning_shown: bool,
    pub violation_count: u32,
    pub forcibly_submitted: bool,
}

impl ProctorView {
    pub(crate) fn of(proctor: &ExamProctor) -> Self {
        Self {
            armed: proctor.is_armed(),
            fullscreen_prompt: proctor.fullscreen_prompt(),
            warning_shown: proctor.warning_shown(),
            violation_count: proctor.violation_count(),
            forcibly_submitted: proctor.forcibly_submitted(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub title: String,
    pub phase: Phase,
    pub cursor: usize,
    pub total_questions: usize,
    pub score: u32,
    pub question: Option<QuestionView>,
    pub selected_answer: Option<String>,
    pub answered: bool,
    pub remaining_secs: u64,
    pub remaining_display: String,
    /// `None` outside exam mode.
    pub proctor: Option<ProctorView>,
    pub outcome: Option<QuizOutcome>,
    pub history: Vec<GradedAnswer>,
}

impl SessionSnapshot {
    pub(crate) fn capture(
        session_id: Uuid,
        engine: &QuizEngine,
        proctor: Option<&ExamProctor>,
    ) -> Self {
        let answered = engine.is_answered();
        let question = engine.current_question().map(|q| QuestionView {
            number: engine.cursor() + 1,
            prompt: q.prompt.clone(),
            options: q
                .labelled_options()
                .map(|(label, text)| (label.to_string(), text.to_string()))
                .collect(),
            correct_answer: answered.then(|| q.correct_answer.clone()),
            explanation: (answered && !q.explanation.is_empty()).then(|| q.explanation.clone()),
        });

        Self {
            session_id,
            title: engine
                .quiz()
                .map(|q| q.display_title().to_string())
                .unwrap_or_default(),
            phase: engine.phase(),
            cursor: engine.cursor(),
            total_questions: engine.total_questions(),
            score: engine.score(),
            question: if engine.is_finished() { None } else { question },
            selected_answer: engine.selected_answer().map(str::to_string),
            answered,
            remaining_secs: engine.remaining_secs(),
            remaining_display: engine.remaining_display(),
            proctor: proctor.map(ProctorView::of),
            outcome: engine.outcome(),
            history: engine.history().to_vec(),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quizproctor_core::model::{Question, Quiz};

    fn quiz() -> Quiz {
        Quiz {
            id: "q".into(),
            title: None,
            source: None,
            time_limit: "2".into(),
            subject: None,
            grade: None,
            questions: vec![Question {
                prompt: "2 + 2?".into(),
                options: vec!["3".into(), "4".into()],
                correct_answer: "4".into(),
                explanation: "Basic arithmetic.".into(),
                topics: vec![],
            }],
        }
    }

    #[tokio::test]
    async fn answer_is_hidden_until_answered() {
        let mut engine = QuizEngine::start(quiz());
        let snap = SessionSnapshot::capture(Uuid::nil(), &engine, None);
        let view = snap.question.unwrap();
        assert_eq!(view.number, 1);
        assert_eq!(view.options[1], ("B".to_string(), "4".to_string()));
        assert!(view.correct_answer.is_none());
        assert!(view.explanation.is_none());
        assert_eq!(snap.title, "Untitled quiz");
        assert_eq!(snap.remaining_display, "02:00");

        engine.select_answer("3");
        let view = SessionSnapshot::capture(Uuid::nil(), &engine, None)
            .question
            .unwrap();
        assert_eq!(view.correct_answer.as_deref(), Some("4"));
        assert_eq!(view.explanation.as_deref(), Some("Basic arithmetic."));
    }

    #[tokio::test]
    async fn finished_session_has_no_current_question() {
        let mut engine = QuizEngine::start(quiz());
        engine.force_submit();
        let snap = SessionSnapshot::capture(Uuid::nil(), &engine, None);
        assert!(snap.is_finished());
        assert!(snap.question.is_none());
        assert_eq!(snap.outcome.map(|o| o.total_questions), Some(1));
    }
}

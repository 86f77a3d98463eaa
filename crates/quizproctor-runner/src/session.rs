//! The per-session task.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

use quizproctor_core::engine::QuizEngine;
use quizproctor_core::model::Quiz;
use quizproctor_core::proctor::{ExamProctor, ViolationOutcome};
use quizproctor_core::results::{AnswerRecord, FinishReason, ResultRecord, SessionEvent};
use quizproctor_core::traits::SinkSet;

use crate::delivery::Deliveries;
use crate::snapshot::SessionSnapshot;
use crate::{SessionConfig, SessionContext, SessionExit, SessionInput};

pub(crate) struct Session {
    id: Uuid,
    context: SessionContext,
    engine: QuizEngine,
    proctor: Option<ExamProctor>,
    fullscreen: bool,
    tick_period: Duration,
    drain_timeout: Duration,
    deliveries: Deliveries,
    snapshots: watch::Sender<SessionSnapshot>,
    result: Option<ResultRecord>,
}

impl Session {
    /// Build the session and its initial snapshot. The engine is already
    /// initialized and, in exam mode, the proctor has been asked to arm.
    pub(crate) fn new(
        id: Uuid,
        quiz: Arc<Quiz>,
        context: SessionContext,
        config: SessionConfig,
        sinks: SinkSet,
    ) -> (Self, watch::Receiver<SessionSnapshot>) {
        let engine = QuizEngine::start(quiz);
        let proctor = config.exam.map(|proctor_config| {
            let mut proctor = ExamProctor::new(proctor_config, config.fullscreen);
            proctor.arm(&engine);
            proctor
        });

        let (snapshots, rx) = watch::channel(SessionSnapshot::capture(
            id,
            &engine,
            proctor.as_ref(),
        ));

        let session = Self {
            id,
            context,
            engine,
            proctor,
            fullscreen: config.fullscreen,
            tick_period: config.tick_period,
            drain_timeout: config.drain_timeout,
            deliveries: Deliveries::new(sinks),
            snapshots,
            result: None,
        };
        (session, rx)
    }

    pub(crate) async fn run(mut self, mut inputs: mpsc::Receiver<SessionInput>) -> SessionExit {
        // A quiz without questions is already finished.
        self.dispatch();
        if let Some(record) = self.finished() {
            return SessionExit::Finished(record);
        }

        let start = tokio::time::Instant::now() + self.tick_period;
        let mut ticker = tokio::time::interval_at(start, self.tick_period);
        // Missed ticks fire back to back so the countdown keeps wall-clock pace.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.on_tick(),
                input = inputs.recv() => match input {
                    Some(SessionInput::Cancel) | None => {
                        tracing::info!(session = %self.id, "session cancelled");
                        self.deliveries.detach();
                        return SessionExit::Cancelled;
                    }
                    Some(input) => self.apply(input),
                },
            }

            self.dispatch();
            if let Some(record) = self.finished() {
                self.deliveries.settle(self.drain_timeout).await;
                return SessionExit::Finished(record);
            }
            self.publish();
            self.deliveries.reap();
        }
    }

    fn on_tick(&mut self) {
        self.engine.tick();
        if let Some(proctor) = self.proctor.as_mut() {
            proctor.observe_fullscreen(self.fullscreen, &self.engine);
        }
    }

    fn apply(&mut self, input: SessionInput) {
        match input {
            SessionInput::Select(option) => {
                self.engine.select_answer(&option);
            }
            SessionInput::SelectLabel(label) => {
                let option = self
                    .engine
                    .current_question()
                    .and_then(|q| q.option_by_label(label))
                    .map(str::to_string);
                match option {
                    Some(option) => {
                        self.engine.select_answer(&option);
                    }
                    None => tracing::debug!(%label, "no option with that label"),
                }
            }
            SessionInput::Advance => {
                self.engine.advance();
            }
            SessionInput::FocusLost(signal) => {
                if let Some(proctor) = self.proctor.as_mut() {
                    if proctor.on_focus_lost(signal, &mut self.engine)
                        == ViolationOutcome::ForcedSubmission
                    {
                        tracing::warn!(session = %self.id, "exam force-submitted");
                    }
                }
            }
            SessionInput::FocusRegained => {
                if let Some(proctor) = self.proctor.as_mut() {
                    proctor.on_focus_regained();
                }
            }
            SessionInput::Fullscreen(fullscreen) => {
                self.fullscreen = fullscreen;
                if let Some(proctor) = self.proctor.as_mut() {
                    proctor.observe_fullscreen(fullscreen, &self.engine);
                }
            }
            SessionInput::AcknowledgeWarning => {
                if let Some(proctor) = self.proctor.as_mut() {
                    proctor.acknowledge_warning();
                }
            }
            SessionInput::Cancel => {}
        }
    }

    /// Hand every queued engine event to the sinks.
    fn dispatch(&mut self) {
        for event in self.engine.drain_events() {
            match event {
                SessionEvent::AnswerGraded {
                    question_text,
                    is_correct,
                    elapsed_secs,
                    topics,
                } => self.deliveries.answer(AnswerRecord {
                    session_id: self.id,
                    user_id: self.context.user_id.clone(),
                    question_text,
                    is_correct,
                    elapsed_seconds: elapsed_secs,
                    topics,
                }),
                SessionEvent::Finished(outcome) => {
                    let quiz = self.engine.quiz();
                    let record = ResultRecord {
                        session_id: self.id,
                        quiz_id: quiz.map(|q| q.id.clone()).unwrap_or_default(),
                        user_id: self.context.user_id.clone(),
                        score: outcome.score,
                        total_questions: outcome.total_questions,
                        reason: outcome.reason,
                        subject: self
                            .context
                            .subject
                            .clone()
                            .or_else(|| quiz.and_then(|q| q.subject.clone())),
                        grade: self
                            .context
                            .grade
                            .clone()
                            .or_else(|| quiz.and_then(|q| q.grade.clone())),
                        violation_count: self.proctor.as_ref().map_or(0, |p| p.violation_count()),
                        forcibly_submitted: self
                            .proctor
                            .as_ref()
                            .is_some_and(|p| p.forcibly_submitted()),
                        finished_at: Utc::now(),
                    };

                    if outcome.reason == FinishReason::NoQuestions {
                        tracing::info!(session = %self.id, "quiz has no questions, nothing persisted");
                    } else {
                        self.deliveries.result(record.clone());
                    }
                    self.result = Some(record);
                }
            }
        }
    }

    fn publish(&self) {
        let snapshot = SessionSnapshot::capture(self.id, &self.engine, self.proctor.as_ref());
        self.snapshots.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }

    /// Publish the final snapshot and hand back the record once finished.
    fn finished(&mut self) -> Option<ResultRecord> {
        let record = self.result.take()?;
        self.publish();
        Some(record)
    }
}

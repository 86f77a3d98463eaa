//! quizproctor-runner — Session host.
//!
//! Runs one quiz session per tokio task. The task owns the engine and, in
//! exam mode, the proctor. It counts down on a one-second interval, applies
//! user and windowing inputs from a channel, publishes snapshots for the UI,
//! and hands telemetry and results to the configured sinks without waiting
//! on them.

mod delivery;
mod session;
pub mod snapshot;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use uuid::Uuid;

use quizproctor_core::model::Quiz;
use quizproctor_core::proctor::{AttentionSignal, ProctorConfig};
use quizproctor_core::results::ResultRecord;
use quizproctor_core::traits::SinkSet;

pub use snapshot::{ProctorView, QuestionView, SessionSnapshot};

/// Who is taking the quiz. Attached to every outbound record.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    pub user_id: String,
    /// Overrides the quiz's own subject when set.
    pub subject: Option<String>,
    /// Overrides the quiz's own grade when set.
    pub grade: Option<String>,
}

impl SessionContext {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Proctor settings. `None` runs a practice quiz without monitoring.
    pub exam: Option<ProctorConfig>,
    /// Full-screen status when the session starts.
    pub fullscreen: bool,
    /// Countdown granularity. One second outside tests.
    pub tick_period: Duration,
    /// How long a finished session waits for in-flight deliveries.
    pub drain_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            exam: None,
            fullscreen: false,
            tick_period: Duration::from_secs(1),
            drain_timeout: Duration::from_secs(5),
        }
    }
}

impl SessionConfig {
    pub fn exam(proctor: ProctorConfig, fullscreen: bool) -> Self {
        Self {
            exam: Some(proctor),
            fullscreen,
            ..Self::default()
        }
    }
}

/// Everything a session reacts to besides the clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionInput {
    /// Answer with the option text.
    Select(String),
    /// Answer with the option's letter label.
    SelectLabel(char),
    Advance,
    FocusLost(AttentionSignal),
    FocusRegained,
    Fullscreen(bool),
    AcknowledgeWarning,
    /// Tear the session down without a result.
    Cancel,
}

/// How a session task ended.
#[derive(Debug, Clone)]
pub enum SessionExit {
    /// The session reached its terminal state. The record is returned even
    /// when it was not persisted (quiz without questions).
    Finished(ResultRecord),
    /// Cancelled by the host before finishing.
    Cancelled,
}

impl SessionExit {
    pub fn record(&self) -> Option<&ResultRecord> {
        match self {
            SessionExit::Finished(record) => Some(record),
            SessionExit::Cancelled => None,
        }
    }
}

/// Handle to a running session.
pub struct SessionHandle {
    id: Uuid,
    inputs: mpsc::Sender<SessionInput>,
    snapshots: watch::Receiver<SessionSnapshot>,
    task: JoinHandle<SessionExit>,
}

impl SessionHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Queue an input. Fails once the session has ended.
    pub async fn send(&self, input: SessionInput) -> Result<()> {
        self.inputs
            .send(input)
            .await
            .map_err(|_| anyhow::anyhow!("session {} has ended", self.id))
    }

    /// A cloneable sender for feeding inputs from another task.
    pub fn sender(&self) -> mpsc::Sender<SessionInput> {
        self.inputs.clone()
    }

    /// Subscribe to snapshot updates.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    /// The most recently published snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Stop the task immediately. Nothing is delivered afterwards except
    /// requests already in flight.
    pub fn abort(&self) {
        self.task.abort();
    }

    /// Wait for the session to end.
    pub async fn join(self) -> Result<SessionExit> {
        let Self { id, task, .. } = self;
        match task.await {
            Ok(exit) => Ok(exit),
            Err(e) if e.is_cancelled() => Ok(SessionExit::Cancelled),
            Err(e) => Err(e).with_context(|| format!("session {id} panicked")),
        }
    }
}

/// Start a session for `quiz` on the current tokio runtime.
pub fn spawn_session(
    quiz: impl Into<Arc<Quiz>>,
    context: SessionContext,
    config: SessionConfig,
    sinks: SinkSet,
) -> SessionHandle {
    let id = Uuid::new_v4();
    let quiz = quiz.into();
    tracing::info!(
        session = %id,
        quiz = %quiz.id,
        user = %context.user_id,
        exam = config.exam.is_some(),
        "starting session"
    );

    let (inputs, rx) = mpsc::channel(32);
    let (session, snapshots) = session::Session::new(id, quiz, context, config, sinks);
    let task = tokio::spawn(session.run(rx));

    SessionHandle {
        id,
        inputs,
        snapshots,
        task,
    }
}

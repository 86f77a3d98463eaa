//! Exam proctor.
//!
//! Supervises one [`QuizEngine`] in locked-down exam mode. The proctor never
//! touches session state directly; escalation goes through
//! [`QuizEngine::force_submit`].
//!
//! Browsers usually fire both a window blur and a visibility change for a
//! single tab switch. Both arrive as [`AttentionSignal`]s and are folded into
//! one attention-loss episode: the first signal counts, later signals inside
//! the coalescing window are dropped. Regaining focus closes the episode.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::engine::QuizEngine;

/// A windowing signal indicating the user may have left the exam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttentionSignal {
    /// The window lost foreground focus.
    WindowBlur,
    /// The document became hidden (tab switch, minimise).
    DocumentHidden,
}

/// Proctor tuning.
#[derive(Debug, Clone)]
pub struct ProctorConfig {
    /// Violation count that triggers forced submission. Earlier violations
    /// only raise the warning.
    pub max_violations: u32,
    /// Signals this close to the start of an open episode are the same
    /// violation.
    pub coalesce_window: Duration,
}

impl Default for ProctorConfig {
    fn default() -> Self {
        Self {
            max_violations: 2,
            coalesce_window: Duration::from_millis(1000),
        }
    }
}

/// What a focus-loss signal did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationOutcome {
    /// Not monitoring, or the session is already over.
    Ignored,
    /// Part of an already counted episode.
    Coalesced,
    /// Counted; the warning modal must be shown.
    Warned,
    /// Counted; the exam was force-submitted.
    ForcedSubmission,
}

/// Proctor state for one exam attempt.
#[derive(Debug)]
pub struct ExamProctor {
    config: ProctorConfig,
    fullscreen: bool,
    arm_requested: bool,
    armed: bool,
    fullscreen_prompt: bool,
    violation_count: u32,
    warning_shown: bool,
    forcibly_submitted: bool,
    episode_started: Option<Instant>,
}

impl ExamProctor {
    /// Create a disarmed proctor. `fullscreen` is the presentation state at
    /// mount time.
    pub fn new(config: ProctorConfig, fullscreen: bool) -> Self {
        Self {
            config: ProctorConfig {
                max_violations: config.max_violations.max(1),
                ..config
            },
            fullscreen,
            arm_requested: false,
            armed: false,
            fullscreen_prompt: false,
            violation_count: 0,
            warning_shown: false,
            forcibly_submitted: false,
            episode_started: None,
        }
    }

    /// Start monitoring `engine`.
    ///
    /// A no-op unless the session is in progress. Outside full-screen the
    /// request is remembered, the full-screen prompt is raised, and arming
    /// completes on the first [`observe_fullscreen`](Self::observe_fullscreen)
    /// that reports full-screen. Returns whether monitoring is active.
    pub fn arm(&mut self, engine: &QuizEngine) -> bool {
        if !engine.is_active() {
            return false;
        }
        self.arm_requested = true;
        self.apply_gate(engine);
        self.armed
    }

    /// Feed the current full-screen status. Called on every observation tick.
    pub fn observe_fullscreen(&mut self, fullscreen: bool, engine: &QuizEngine) {
        if fullscreen != self.fullscreen {
            tracing::debug!(fullscreen, "full-screen status changed");
        }
        self.fullscreen = fullscreen;
        self.apply_gate(engine);
    }

    fn apply_gate(&mut self, engine: &QuizEngine) {
        if !self.arm_requested || !engine.is_active() || self.forcibly_submitted {
            self.fullscreen_prompt = false;
            return;
        }

        self.fullscreen_prompt = !self.fullscreen;
        if self.fullscreen && !self.armed {
            self.armed = true;
            tracing::info!("exam monitoring armed");
        }
    }

    /// Handle a focus or visibility loss.
    pub fn on_focus_lost(
        &mut self,
        signal: AttentionSignal,
        engine: &mut QuizEngine,
    ) -> ViolationOutcome {
        if !self.armed || self.forcibly_submitted || engine.is_finished() {
            return ViolationOutcome::Ignored;
        }

        let now = Instant::now();
        if let Some(started) = self.episode_started {
            if now.duration_since(started) < self.config.coalesce_window {
                tracing::debug!(?signal, "signal coalesced into open episode");
                return ViolationOutcome::Coalesced;
            }
        }

        self.episode_started = Some(now);
        self.violation_count += 1;
        tracing::warn!(
            ?signal,
            violations = self.violation_count,
            "exam attention lost"
        );

        if self.violation_count >= self.config.max_violations {
            self.forcibly_submitted = true;
            self.warning_shown = false;
            self.fullscreen_prompt = false;
            engine.force_submit();
            ViolationOutcome::ForcedSubmission
        } else {
            self.warning_shown = true;
            ViolationOutcome::Warned
        }
    }

    /// Focus came back; the next loss opens a new episode.
    pub fn on_focus_regained(&mut self) {
        self.episode_started = None;
    }

    /// Dismiss the first-violation warning. The count is kept.
    pub fn acknowledge_warning(&mut self) {
        self.warning_shown = false;
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Whether the blocking "enter full-screen" prompt must be shown.
    pub fn fullscreen_prompt(&self) -> bool {
        self.fullscreen_prompt
    }

    pub fn violation_count(&self) -> u32 {
        self.violation_count
    }

    pub fn warning_shown(&self) -> bool {
        self.warning_shown
    }

    pub fn forcibly_submitted(&self) -> bool {
        self.forcibly_submitted
    }
}

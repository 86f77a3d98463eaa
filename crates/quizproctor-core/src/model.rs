//! Core data model types for quizproctor.
//!
//! A [`Quiz`] is read-only once loaded: the engine borrows nothing mutable
//! from it and question order is the presentation order.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Time limit used when the quiz text carries no usable number of minutes.
pub const DEFAULT_TIME_LIMIT_MINUTES: u64 = 15;

/// A single multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// The question text shown to the user.
    #[serde(alias = "question", alias = "text")]
    pub prompt: String,
    /// Answer options in presentation order; labelled A, B, C, ... by position.
    #[serde(default)]
    pub options: Vec<String>,
    /// Must literally match one of `options`.
    #[serde(alias = "correctAnswer", default)]
    pub correct_answer: String,
    /// Shown after the question has been answered.
    #[serde(default)]
    pub explanation: String,
    /// Analytics tags, forwarded with per-answer telemetry.
    #[serde(default, alias = "tags")]
    pub topics: Vec<String>,
}

impl Question {
    /// Options paired with their letter labels.
    pub fn labelled_options(&self) -> impl Iterator<Item = (OptionLabel, &str)> {
        self.options
            .iter()
            .enumerate()
            .filter_map(|(i, o)| OptionLabel::from_index(i).map(|l| (l, o.as_str())))
    }

    /// Look up an option by its letter label (case-insensitive).
    pub fn option_by_label(&self, label: char) -> Option<&str> {
        let label = OptionLabel::from_char(label)?;
        self.options.get(label.index()).map(String::as_str)
    }

    /// Whether `option` is the correct answer. Exact string equality.
    pub fn is_correct(&self, option: &str) -> bool {
        option == self.correct_answer
    }
}

/// Letter label of an answer option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OptionLabel(u8);

impl OptionLabel {
    /// Number of distinct letter labels.
    pub const MAX: usize = 26;

    pub fn from_index(index: usize) -> Option<Self> {
        (index < Self::MAX).then(|| Self(index as u8))
    }

    pub fn from_char(c: char) -> Option<Self> {
        let c = c.to_ascii_uppercase();
        c.is_ascii_uppercase().then(|| Self(c as u8 - b'A'))
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for OptionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", (b'A' + self.0) as char)
    }
}

/// An ordered list of questions with a free-text time limit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    /// Unique identifier; generated when the source omits it.
    #[serde(default = "generate_id")]
    pub id: String,
    /// Human-readable title.
    #[serde(default)]
    pub title: Option<String>,
    /// Where the questions came from (document name, generator, ...).
    #[serde(default, alias = "source_label")]
    pub source: Option<String>,
    /// Free text such as "10 phút" or "45 minutes". The first integer is
    /// read as minutes.
    #[serde(default, alias = "timeLimit")]
    pub time_limit: String,
    /// Subject label, forwarded with the persisted result.
    #[serde(default)]
    pub subject: Option<String>,
    /// Grade label, forwarded with the persisted result.
    #[serde(default)]
    pub grade: Option<String>,
    #[serde(default)]
    pub questions: Vec<Question>,
}

fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

impl Quiz {
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Countdown length in seconds, see [`parse_time_limit_minutes`].
    pub fn time_limit_secs(&self) -> u64 {
        parse_time_limit_minutes(&self.time_limit) * 60
    }

    /// Title, or a placeholder for untitled quizzes.
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("Untitled quiz")
    }
}

/// Extract the number of minutes from free-text time limits.
///
/// Takes the first run of ASCII digits. Empty text, text without digits, an
/// explicit zero, or a count too large to express in seconds all fall back
/// to [`DEFAULT_TIME_LIMIT_MINUTES`].
pub fn parse_time_limit_minutes(text: &str) -> u64 {
    usable_minutes(text).unwrap_or(DEFAULT_TIME_LIMIT_MINUTES)
}

/// Whether `text` yields a usable number of minutes without the fallback.
pub fn has_explicit_time_limit(text: &str) -> bool {
    usable_minutes(text).is_some()
}

fn usable_minutes(text: &str) -> Option<u64> {
    first_integer(text).filter(|&m| m > 0 && m.checked_mul(60).is_some())
}

fn first_integer(text: &str) -> Option<u64> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let digits: &str = &text[start..];
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse().ok()
}

/// Render seconds as zero-padded `MM:SS`.
///
/// Minutes are not wrapped at 60, so a 90-minute exam starts at `90:00`.
pub fn format_mm_ss(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

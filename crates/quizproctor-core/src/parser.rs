//! Quiz file loader.
//!
//! Loads quizzes from TOML or JSON files and directories, and validates them.
//! Only defensive defaults are applied; malformed questions are reported as
//! warnings, never rejected.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::model::{
    has_explicit_time_limit, OptionLabel, Question, Quiz, DEFAULT_TIME_LIMIT_MINUTES,
};

/// Intermediate TOML structure for quiz files.
#[derive(Debug, Deserialize)]
struct TomlQuizFile {
    quiz: TomlQuizHeader,
    #[serde(default)]
    questions: Vec<Question>,
}

#[derive(Debug, Deserialize)]
struct TomlQuizHeader {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    time_limit: Option<TimeLimitValue>,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    grade: Option<String>,
}

/// TOML authors write both `time_limit = 10` and `time_limit = "10 phút"`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TimeLimitValue {
    Minutes(u64),
    Text(String),
}

impl TimeLimitValue {
    fn into_text(self) -> String {
        match self {
            TimeLimitValue::Minutes(m) => m.to_string(),
            TimeLimitValue::Text(t) => t,
        }
    }
}

/// Supported quiz file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizFormat {
    Toml,
    Json,
}

impl QuizFormat {
    /// Pick the format from a file extension; anything but `.json` is TOML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => QuizFormat::Json,
            _ => QuizFormat::Toml,
        }
    }
}

/// Read and parse a single quiz file.
pub fn load_quiz(path: &Path) -> Result<Quiz> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read quiz file: {}", path.display()))?;

    parse_quiz_str(&content, path)
}

/// Parse quiz text; the format follows `source_path`'s extension.
pub fn parse_quiz_str(content: &str, source_path: &Path) -> Result<Quiz> {
    match QuizFormat::from_path(source_path) {
        QuizFormat::Json => serde_json::from_str(content)
            .with_context(|| format!("failed to parse JSON: {}", source_path.display())),
        QuizFormat::Toml => parse_toml(content, source_path),
    }
}

fn parse_toml(content: &str, source_path: &Path) -> Result<Quiz> {
    let parsed: TomlQuizFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let header = parsed.quiz;
    Ok(Quiz {
        id: header
            .id
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        title: header.title,
        source: header.source,
        time_limit: header
            .time_limit
            .map(TimeLimitValue::into_text)
            .unwrap_or_default(),
        subject: header.subject,
        grade: header.grade,
        questions: parsed.questions,
    })
}

/// Recursively load every `.toml` and `.json` quiz in a directory.
///
/// Unparsable files are skipped with a warning.
pub fn load_quiz_directory(dir: &Path) -> Result<Vec<Quiz>> {
    let mut quizzes = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.path());

    for entry in entries {
        let path = entry.path();

        if path.is_dir() {
            quizzes.extend(load_quiz_directory(&path)?);
        } else if path
            .extension()
            .is_some_and(|ext| ext == "toml" || ext == "json")
        {
            match load_quiz(&path) {
                Ok(quiz) => quizzes.push(quiz),
                Err(e) => {
                    tracing::warn!("skipping {}: {:#}", path.display(), e);
                }
            }
        }
    }

    Ok(quizzes)
}

/// Load a file, or every quiz below a directory.
pub fn load_quizzes(path: &Path) -> Result<Vec<Quiz>> {
    if path.is_dir() {
        load_quiz_directory(path)
    } else {
        Ok(vec![load_quiz(path)?])
    }
}

/// A warning from quiz validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// 1-based question number (if applicable).
    pub question: Option<usize>,
    /// Warning message.
    pub message: String,
}

/// Validate a quiz for common authoring issues.
pub fn validate_quiz(quiz: &Quiz) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if quiz.questions.is_empty() {
        warnings.push(ValidationWarning {
            question: None,
            message: "quiz has no questions".into(),
        });
    }

    if !has_explicit_time_limit(&quiz.time_limit) {
        warnings.push(ValidationWarning {
            question: None,
            message: format!(
                "time limit {:?} has no usable minutes, defaulting to {DEFAULT_TIME_LIMIT_MINUTES}",
                quiz.time_limit
            ),
        });
    }

    for (i, q) in quiz.questions.iter().enumerate() {
        let mut warn = |message: String| {
            warnings.push(ValidationWarning {
                question: Some(i + 1),
                message,
            })
        };

        if q.prompt.trim().is_empty() {
            warn("prompt is empty".into());
        }
        if q.options.len() < 2 {
            warn(format!("only {} option(s)", q.options.len()));
        }
        if q.options.len() > OptionLabel::MAX {
            warn(format!(
                "{} options, only the first {} can be labelled",
                q.options.len(),
                OptionLabel::MAX
            ));
        }

        let mut seen = HashSet::new();
        for option in &q.options {
            if !seen.insert(option.as_str()) {
                warn(format!("duplicate option: {option:?}"));
            }
        }

        if !q.options.iter().any(|o| o == &q.correct_answer) {
            warn(format!(
                "correct answer {:?} does not match any option",
                q.correct_answer
            ));
        }
    }

    warnings
}

//! Configuration and sink factory.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use quizproctor_core::proctor::ProctorConfig;
use quizproctor_core::traits::{NullSink, SinkSet};

use crate::log::LogSink;
use crate::rest::{RestSink, DEFAULT_ANSWERS_PATH, DEFAULT_RESULTS_PATH, DEFAULT_TIMEOUT_SECS};

/// Where telemetry and results go.
///
/// Note: Custom Debug impl masks the API key to prevent accidental exposure in logs.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SinkConfig {
    Rest {
        base_url: String,
        api_key: String,
        #[serde(default = "default_results_path")]
        results_path: String,
        #[serde(default = "default_answers_path")]
        answers_path: String,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
    #[default]
    Log,
    None,
}

impl std::fmt::Debug for SinkConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkConfig::Rest {
                base_url,
                api_key: _,
                results_path,
                answers_path,
                timeout_secs,
            } => f
                .debug_struct("Rest")
                .field("base_url", base_url)
                .field("api_key", &"***")
                .field("results_path", results_path)
                .field("answers_path", answers_path)
                .field("timeout_secs", timeout_secs)
                .finish(),
            SinkConfig::Log => f.write_str("Log"),
            SinkConfig::None => f.write_str("None"),
        }
    }
}

fn default_results_path() -> String {
    DEFAULT_RESULTS_PATH.to_string()
}
fn default_answers_path() -> String {
    DEFAULT_ANSWERS_PATH.to_string()
}
fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Proctoring knobs as written in the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProctorSettings {
    /// Violations before forced submission.
    #[serde(default = "default_max_violations")]
    pub max_violations: u32,
    /// Blur/visibility signals closer than this are one violation.
    #[serde(default = "default_coalesce_window_ms")]
    pub coalesce_window_ms: u64,
}

fn default_max_violations() -> u32 {
    2
}
fn default_coalesce_window_ms() -> u64 {
    1000
}

impl Default for ProctorSettings {
    fn default() -> Self {
        Self {
            max_violations: default_max_violations(),
            coalesce_window_ms: default_coalesce_window_ms(),
        }
    }
}

impl ProctorSettings {
    pub fn to_proctor_config(&self) -> ProctorConfig {
        ProctorConfig {
            max_violations: self.max_violations,
            coalesce_window: Duration::from_millis(self.coalesce_window_ms),
        }
    }
}

/// Top-level quizproctor configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuizproctorConfig {
    #[serde(default)]
    pub sink: SinkConfig,
    #[serde(default)]
    pub proctor: ProctorSettings,
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

fn resolve_sink_config(config: &SinkConfig) -> SinkConfig {
    match config {
        SinkConfig::Rest {
            base_url,
            api_key,
            results_path,
            answers_path,
            timeout_secs,
        } => SinkConfig::Rest {
            base_url: resolve_env_vars(base_url),
            api_key: resolve_env_vars(api_key),
            results_path: results_path.clone(),
            answers_path: answers_path.clone(),
            timeout_secs: *timeout_secs,
        },
        other => other.clone(),
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `quizproctor.toml` in the current directory
/// 2. `~/.config/quizproctor/config.toml`
///
/// Environment variable override: `QUIZPROCTOR_API_KEY`.
pub fn load_config() -> Result<QuizproctorConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<QuizproctorConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("quizproctor.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            let config = toml::from_str::<QuizproctorConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?;
            tracing::debug!("loaded config from {}", path.display());
            config
        }
        None => QuizproctorConfig::default(),
    };

    if let Ok(key) = std::env::var("QUIZPROCTOR_API_KEY") {
        if let SinkConfig::Rest { api_key, .. } = &mut config.sink {
            *api_key = key;
        }
    }

    config.sink = resolve_sink_config(&config.sink);

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("quizproctor"))
}

/// Create sink instances from configuration.
pub fn create_sinks(config: &SinkConfig) -> Result<SinkSet> {
    match config {
        SinkConfig::Rest {
            base_url,
            api_key,
            results_path,
            answers_path,
            timeout_secs,
        } => {
            anyhow::ensure!(!base_url.is_empty(), "rest sink needs a base_url");
            if api_key.is_empty() {
                tracing::warn!("rest sink configured without an api_key");
            }
            let sink = RestSink::new(api_key, base_url, *timeout_secs)?
                .with_paths(results_path, answers_path);
            Ok(SinkSet::shared(Arc::new(sink)))
        }
        SinkConfig::Log => Ok(SinkSet::shared(Arc::new(LogSink))),
        SinkConfig::None => Ok(SinkSet::shared(Arc::new(NullSink))),
    }
}

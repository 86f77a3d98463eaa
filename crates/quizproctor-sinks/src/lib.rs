//! quizproctor-sinks — Outbound sinks and configuration.
//!
//! Implements the `TelemetrySink` and `ResultSink` ports for a REST backend,
//! the tracing log, and an in-memory recorder for tests, plus the config file
//! loader that picks between them.

pub mod config;
pub mod log;
pub mod mock;
pub mod rest;

pub use config::{create_sinks, load_config, load_config_from, QuizproctorConfig, SinkConfig};
pub use quizproctor_core::error::SinkError;
pub use quizproctor_core::traits::SinkSet;

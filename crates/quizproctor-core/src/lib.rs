//! quizproctor-core — Timed quiz engine and exam proctor.
//!
//! This crate defines the quiz data model, the quiz progression engine, the
//! exam proctoring state machine, the quiz file loader, and the outbound
//! ports that the rest of quizproctor builds on.

pub mod engine;
pub mod error;
pub mod model;
pub mod parser;
pub mod proctor;
pub mod results;
pub mod traits;

pub use engine::{Phase, QuizEngine};
pub use model::{Question, Quiz};
pub use proctor::{AttentionSignal, ExamProctor, ProctorConfig, ViolationOutcome};
pub use results::{FinishReason, QuizOutcome, SessionEvent};

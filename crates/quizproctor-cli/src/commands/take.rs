//! The `quizproctor take` command.
//!
//! Reads one command per line from stdin. Letters answer the current
//! question, an empty line advances, and `:`-prefixed commands stand in for
//! the windowing events a graphical host would deliver.

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, watch};

use quizproctor_core::engine::Phase;
use quizproctor_core::model::Quiz;
use quizproctor_core::parser;
use quizproctor_core::proctor::AttentionSignal;
use quizproctor_core::results::{FinishReason, ResultRecord};
use quizproctor_runner::{
    spawn_session, SessionConfig, SessionContext, SessionExit, SessionInput, SessionSnapshot,
};
use quizproctor_sinks::{create_sinks, load_config_from};

pub struct TakeArgs {
    pub quiz: PathBuf,
    pub exam: bool,
    pub fullscreen: bool,
    pub user: String,
    pub subject: Option<String>,
    pub grade: Option<String>,
    pub max_violations: Option<u32>,
    pub output: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

pub async fn execute(args: TakeArgs) -> Result<()> {
    let config = load_config_from(args.config.as_deref())?;
    let quiz = Arc::new(parser::load_quiz(&args.quiz)?);

    let warnings = parser::validate_quiz(&quiz);
    if !warnings.is_empty() {
        eprintln!(
            "{} has {} warning(s); run `quizproctor validate` for details.",
            args.quiz.display(),
            warnings.len()
        );
    }

    let sinks = create_sinks(&config.sink)?;
    let session_config = if args.exam {
        let mut proctor = config.proctor.to_proctor_config();
        if let Some(max) = args.max_violations {
            proctor.max_violations = max;
        }
        SessionConfig::exam(proctor, args.fullscreen)
    } else {
        SessionConfig::default()
    };
    let context = SessionContext {
        user_id: args.user,
        subject: args.subject,
        grade: args.grade,
    };

    println!("{}", quiz.display_title());
    println!(
        "{} question(s), {} minute(s). Type :help for commands.",
        quiz.len(),
        quiz.time_limit_secs() / 60
    );

    let handle = spawn_session(Arc::clone(&quiz), context, session_config, sinks);
    let snapshots = handle.subscribe();
    let renderer = tokio::spawn(render_loop(handle.subscribe()));
    spawn_stdin_reader(handle.sender());

    let exit = handle.join().await?;
    renderer.await.context("renderer task failed")?;

    let record = match exit {
        SessionExit::Finished(record) => record,
        SessionExit::Cancelled => {
            println!("\nSession cancelled, nothing was recorded.");
            return Ok(());
        }
    };

    if record.reason == FinishReason::NoQuestions {
        println!("\nThis quiz has no questions.");
    } else {
        let last = snapshots.borrow().clone();
        print_summary(&quiz, &record);
        print_review(&quiz, &last);
    }

    if let Some(path) = args.output {
        let json = serde_json::to_string_pretty(&record)?;
        std::fs::write(&path, json)
            .with_context(|| format!("failed to write result: {}", path.display()))?;
        println!("Result written to {}", path.display());
    }

    Ok(())
}

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Inputs(Vec<SessionInput>),
    Help,
}

fn parse_command(line: &str) -> Option<Command> {
    let line = line.trim();
    let input = match line.to_ascii_lowercase().as_str() {
        "" | "next" => SessionInput::Advance,
        ":help" | "?" => return Some(Command::Help),
        ":quit" | ":q" => SessionInput::Cancel,
        ":blur" => SessionInput::FocusLost(AttentionSignal::WindowBlur),
        ":hide" => SessionInput::FocusLost(AttentionSignal::DocumentHidden),
        // A tab switch fires both signals.
        ":switch" => {
            return Some(Command::Inputs(vec![
                SessionInput::FocusLost(AttentionSignal::WindowBlur),
                SessionInput::FocusLost(AttentionSignal::DocumentHidden),
            ]))
        }
        ":focus" => SessionInput::FocusRegained,
        ":fs on" => SessionInput::Fullscreen(true),
        ":fs off" => SessionInput::Fullscreen(false),
        ":ok" => SessionInput::AcknowledgeWarning,
        other => {
            let mut chars = other.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii_alphabetic() => SessionInput::SelectLabel(c),
                _ => return None,
            }
        }
    };
    Some(Command::Inputs(vec![input]))
}

const HELP: &str = "\
Commands:
  a, b, c ...   answer the current question
  <enter>       next question
  :switch       simulate a tab switch (blur + hide)
  :blur :hide   single focus-loss signals
  :focus        focus regained
  :fs on|off    enter or leave full-screen
  :ok           dismiss the exam warning
  :quit         abandon the quiz";

/// Feed stdin into the session from a plain thread so a pending read never
/// holds up runtime shutdown. End of input cancels the session.
fn spawn_stdin_reader(inputs: mpsc::Sender<SessionInput>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            match parse_command(&line) {
                Some(Command::Inputs(batch)) => {
                    for input in batch {
                        if inputs.blocking_send(input).is_err() {
                            return;
                        }
                    }
                }
                Some(Command::Help) => println!("{HELP}"),
                None => eprintln!("Unrecognised input {line:?}, type :help"),
            }
        }
        let _ = inputs.blocking_send(SessionInput::Cancel);
    });
}

async fn render_loop(mut snapshots: watch::Receiver<SessionSnapshot>) {
    let mut prev: Option<SessionSnapshot> = None;
    loop {
        let snap = snapshots.borrow_and_update().clone();
        for line in render(prev.as_ref(), &snap) {
            println!("{line}");
        }
        if snap.is_finished() {
            return;
        }
        prev = Some(snap);
        if snapshots.changed().await.is_err() {
            return;
        }
    }
}

/// Lines to print for the transition from `prev` to `snap`.
fn render(prev: Option<&SessionSnapshot>, snap: &SessionSnapshot) -> Vec<String> {
    let mut out = Vec::new();

    if let Some(proctor) = &snap.proctor {
        let before = prev.and_then(|p| p.proctor.as_ref());
        if proctor.fullscreen_prompt && !before.is_some_and(|b| b.fullscreen_prompt) {
            out.push("Full-screen is required for this exam. Type :fs on to continue.".into());
        }
        if proctor.warning_shown && !before.is_some_and(|b| b.warning_shown) {
            out.push(format!(
                "Warning: you left the exam window ({} violation(s)). Leaving again may submit \
                 the exam. Type :ok to continue.",
                proctor.violation_count
            ));
        }
    }

    if snap.is_finished() {
        if !prev.is_some_and(|p| p.is_finished()) {
            match snap.outcome.map(|o| o.reason) {
                Some(FinishReason::TimedOut) => out.push("\nTime is up!".into()),
                Some(FinishReason::ForcedSubmission) => {
                    out.push("\nThe exam was submitted after repeated violations.".into())
                }
                _ => {}
            }
        }
        return out;
    }

    let Some(question) = &snap.question else {
        return out;
    };

    let new_question = !prev.is_some_and(|p| p.cursor == snap.cursor && p.phase != Phase::Idle);
    if new_question {
        out.push(format!(
            "\nQuestion {}/{}  [{} left]",
            question.number, snap.total_questions, snap.remaining_display
        ));
        out.push(question.prompt.clone());
        for (label, text) in &question.options {
            out.push(format!("  {label}) {text}"));
        }
    }

    let newly_answered = snap.answered && !prev.is_some_and(|p| p.answered && p.cursor == snap.cursor);
    if newly_answered {
        let correct = question.correct_answer.as_deref().unwrap_or_default();
        if snap.selected_answer.as_deref() == Some(correct) {
            out.push("Correct!".into());
        } else {
            out.push(format!("Wrong. The answer is {correct}."));
        }
        if let Some(explanation) = &question.explanation {
            out.push(explanation.clone());
        }
        out.push("Press Enter to continue.".into());
    }

    if snap.remaining_secs <= 60 && prev.is_some_and(|p| p.remaining_secs > 60) {
        out.push("One minute left.".into());
    }

    out
}

fn print_summary(quiz: &Quiz, record: &ResultRecord) {
    use comfy_table::{Cell, Table};

    let mut table = Table::new();
    table.set_header(vec!["Quiz", "Score", "Percent", "Finished", "Violations"]);
    let percent = if record.total_questions == 0 {
        0.0
    } else {
        f64::from(record.score) / f64::from(record.total_questions) * 100.0
    };
    table.add_row(vec![
        Cell::new(quiz.display_title()),
        Cell::new(format!("{}/{}", record.score, record.total_questions)),
        Cell::new(format!("{percent:.1}%")),
        Cell::new(record.reason),
        Cell::new(record.violation_count),
    ]);

    println!("\n{table}");
}

fn print_review(quiz: &Quiz, last: &SessionSnapshot) {
    use comfy_table::{Cell, Table};

    let mut table = Table::new();
    table.set_header(vec!["#", "Question", "Your answer", "Correct answer", "Result"]);

    for (i, question) in quiz.questions.iter().enumerate() {
        let graded = last.history.iter().find(|g| g.question_index == i);
        let (given, result) = match graded {
            Some(g) if g.is_correct => (g.selected.as_str(), "correct"),
            Some(g) => (g.selected.as_str(), "wrong"),
            None => ("-", "unanswered"),
        };
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&question.prompt),
            Cell::new(given),
            Cell::new(&question.correct_answer),
            Cell::new(result),
        ]);
    }

    println!("{table}");
}

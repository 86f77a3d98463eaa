use std::sync::Arc;
use std::time::Duration;

use quizproctor_core::engine::Phase;
use quizproctor_core::model::{Question, Quiz};
use quizproctor_core::proctor::{AttentionSignal, ProctorConfig};
use quizproctor_core::results::FinishReason;
use quizproctor_core::traits::SinkSet;
use quizproctor_runner::{
    spawn_session, SessionConfig, SessionContext, SessionExit, SessionInput, SessionSnapshot,
};
use quizproctor_sinks::mock::RecordingSink;

fn question(prompt: &str, options: &[&str], correct: &str) -> Question {
    Question {
        prompt: prompt.to_string(),
        options: options.iter().map(|o| o.to_string()).collect(),
        correct_answer: correct.to_string(),
        explanation: format!("{correct} is right"),
        topics: vec!["geography".to_string()],
    }
}

fn quiz(time_limit: &str, questions: Vec<Question>) -> Quiz {
    Quiz {
        id: "capitals".to_string(),
        title: Some("Capitals".to_string()),
        source: None,
        time_limit: time_limit.to_string(),
        subject: Some("geography".to_string()),
        grade: Some("7".to_string()),
        questions,
    }
}

fn three_questions(time_limit: &str) -> Quiz {
    quiz(
        time_limit,
        vec![
            question("Capital of France?", &["Paris", "Lyon"], "Paris"),
            question("Capital of Italy?", &["Milan", "Rome"], "Rome"),
            question("Capital of Spain?", &["Madrid", "Seville"], "Madrid"),
        ],
    )
}

fn recording() -> (Arc<RecordingSink>, SinkSet) {
    let sink = Arc::new(RecordingSink::new());
    (sink.clone(), SinkSet::shared(sink))
}

fn exam(fullscreen: bool) -> SessionConfig {
    SessionConfig::exam(ProctorConfig::default(), fullscreen)
}

fn finished(exit: SessionExit) -> quizproctor_core::results::ResultRecord {
    match exit {
        SessionExit::Finished(record) => record,
        SessionExit::Cancelled => panic!("session was cancelled"),
    }
}

async fn wait_for(
    rx: &mut tokio::sync::watch::Receiver<SessionSnapshot>,
    f: impl FnMut(&SessionSnapshot) -> bool,
) -> SessionSnapshot {
    rx.wait_for(f).await.unwrap().clone()
}

/// Let detached deliveries of a cancelled session run.
async fn let_deliveries_run() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

#[tokio::test(start_paused = true)]
async fn practice_session_runs_to_completion() {
    let (sink, sinks) = recording();
    let handle = spawn_session(
        three_questions("10 minutes"),
        SessionContext::new("student-1"),
        SessionConfig::default(),
        sinks,
    );

    let initial = handle.snapshot();
    assert_eq!(initial.phase, Phase::InProgress);
    assert_eq!(initial.remaining_secs, 600);
    assert_eq!(initial.remaining_display, "10:00");
    assert!(initial.proctor.is_none());

    let mut rx = handle.subscribe();
    handle.send(SessionInput::SelectLabel('a')).await.unwrap();
    let answered = wait_for(&mut rx, |s| s.answered).await;
    let view = answered.question.unwrap();
    assert_eq!(view.correct_answer.as_deref(), Some("Paris"));
    assert_eq!(view.explanation.as_deref(), Some("Paris is right"));
    assert_eq!(answered.score, 1);

    handle.send(SessionInput::Advance).await.unwrap();
    handle.send(SessionInput::Select("Milan".into())).await.unwrap();
    handle.send(SessionInput::Advance).await.unwrap();
    handle.send(SessionInput::Select("Madrid".into())).await.unwrap();
    handle.send(SessionInput::Advance).await.unwrap();

    let record = finished(handle.join().await.unwrap());
    assert_eq!(record.score, 2);
    assert_eq!(record.total_questions, 3);
    assert_eq!(record.reason, FinishReason::Completed);
    assert_eq!(record.user_id, "student-1");
    assert_eq!(record.subject.as_deref(), Some("geography"));
    assert_eq!(record.violation_count, 0);

    let answers = sink.answers();
    assert_eq!(answers.len(), 3);
    assert!(answers[0].is_correct);
    assert!(!answers[1].is_correct);
    assert_eq!(answers[0].topics, vec!["geography".to_string()]);
    assert_eq!(sink.results(), vec![record]);
}

#[tokio::test(start_paused = true)]
async fn final_snapshot_is_published() {
    let (_sink, sinks) = recording();
    let handle = spawn_session(
        quiz("5", vec![question("Q", &["a", "b"], "b")]),
        SessionContext::new("u"),
        SessionConfig::default(),
        sinks,
    );
    let mut rx = handle.subscribe();

    handle.send(SessionInput::SelectLabel('B')).await.unwrap();
    handle.send(SessionInput::Advance).await.unwrap();

    let last = wait_for(&mut rx, |s| s.is_finished()).await;
    assert!(last.question.is_none());
    let outcome = last.outcome.unwrap();
    assert_eq!((outcome.score, outcome.total_questions), (1, 1));
    assert_eq!(last.history.len(), 1);
    handle.join().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn elapsed_time_is_measured_per_question() {
    let (sink, sinks) = recording();
    let handle = spawn_session(
        three_questions("10"),
        SessionContext::new("u"),
        SessionConfig::default(),
        sinks,
    );
    let mut rx = handle.subscribe();

    tokio::time::sleep(Duration::from_secs(3)).await;
    handle.send(SessionInput::SelectLabel('A')).await.unwrap();
    wait_for(&mut rx, |s| s.answered).await;
    handle.send(SessionInput::Advance).await.unwrap();
    wait_for(&mut rx, |s| s.cursor == 1).await;

    tokio::time::sleep(Duration::from_secs(7)).await;
    handle.send(SessionInput::SelectLabel('B')).await.unwrap();
    wait_for(&mut rx, |s| s.answered).await;

    handle.send(SessionInput::Cancel).await.unwrap();
    handle.join().await.unwrap();
    let_deliveries_run().await;

    let elapsed: Vec<u64> = sink.answers().iter().map(|a| a.elapsed_seconds).collect();
    assert_eq!(elapsed, vec![3, 7]);
}

#[tokio::test(start_paused = true)]
async fn second_selection_is_ignored() {
    let (sink, sinks) = recording();
    let handle = spawn_session(
        three_questions("10"),
        SessionContext::new("u"),
        SessionConfig::default(),
        sinks,
    );
    let mut rx = handle.subscribe();

    handle.send(SessionInput::SelectLabel('B')).await.unwrap();
    handle.send(SessionInput::SelectLabel('A')).await.unwrap();
    handle.send(SessionInput::Advance).await.unwrap();
    let snap = wait_for(&mut rx, |s| s.cursor == 1).await;
    assert_eq!(snap.score, 0);

    handle.send(SessionInput::Cancel).await.unwrap();
    handle.join().await.unwrap();
    let_deliveries_run().await;
    assert_eq!(sink.answers().len(), 1);
    assert!(!sink.answers()[0].is_correct);
}

#[tokio::test(start_paused = true)]
async fn countdown_expiry_submits_partial_score() {
    let (sink, sinks) = recording();
    let started = tokio::time::Instant::now();
    let handle = spawn_session(
        three_questions("1 minute"),
        SessionContext::new("u"),
        SessionConfig::default(),
        sinks,
    );
    let mut rx = handle.subscribe();

    handle.send(SessionInput::SelectLabel('A')).await.unwrap();
    handle.send(SessionInput::Advance).await.unwrap();
    wait_for(&mut rx, |s| s.cursor == 1).await;

    let record = finished(handle.join().await.unwrap());
    assert_eq!(record.reason, FinishReason::TimedOut);
    assert_eq!(record.score, 1);
    assert_eq!(record.total_questions, 3);
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(60) && elapsed < Duration::from_secs(61));
    assert_eq!(sink.results().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn unparsable_time_limit_counts_down_from_fifteen_minutes() {
    let (_sink, sinks) = recording();
    let handle = spawn_session(
        three_questions("soon"),
        SessionContext::new("u"),
        SessionConfig::default(),
        sinks,
    );
    assert_eq!(handle.snapshot().remaining_display, "15:00");

    let mut rx = handle.subscribe();
    tokio::time::sleep(Duration::from_secs(61)).await;
    let snap = wait_for(&mut rx, |s| s.remaining_secs <= 839).await;
    assert_eq!(snap.remaining_display, "13:59");
    handle.abort();
    assert!(matches!(
        handle.join().await.unwrap(),
        SessionExit::Cancelled
    ));
}

#[tokio::test(start_paused = true)]
async fn countdown_catches_up_after_a_stall() {
    let (_sink, sinks) = recording();
    let handle = spawn_session(
        three_questions("1 minute"),
        SessionContext::new("u"),
        SessionConfig::default(),
        sinks,
    );
    let mut rx = handle.subscribe();

    // The session loop is running once the answer shows up.
    handle.send(SessionInput::SelectLabel('A')).await.unwrap();
    wait_for(&mut rx, |s| s.answered).await;
    assert_eq!(handle.snapshot().remaining_secs, 60);

    tokio::time::advance(Duration::from_secs(30)).await;
    let snap = wait_for(&mut rx, |s| s.remaining_secs <= 30).await;
    assert_eq!(snap.remaining_secs, 30);
    assert_eq!(snap.remaining_display, "00:30");

    handle.send(SessionInput::Cancel).await.unwrap();
    handle.join().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn empty_quiz_finishes_without_persisting() {
    let (sink, sinks) = recording();
    let handle = spawn_session(
        quiz("10", vec![]),
        SessionContext::new("u"),
        SessionConfig::default(),
        sinks,
    );

    let record = finished(handle.join().await.unwrap());
    assert_eq!(record.reason, FinishReason::NoQuestions);
    assert_eq!(record.total_questions, 0);
    assert!(sink.results().is_empty());
    assert_eq!(sink.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn cancelled_session_reports_nothing() {
    let (sink, sinks) = recording();
    let handle = spawn_session(
        three_questions("1"),
        SessionContext::new("u"),
        SessionConfig::default(),
        sinks,
    );

    handle.send(SessionInput::Cancel).await.unwrap();
    assert!(handle.join().await.unwrap().record().is_none());

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert!(sink.results().is_empty());
}

#[tokio::test(start_paused = true)]
async fn sink_failures_do_not_affect_the_session() {
    let sink = Arc::new(RecordingSink::failing());
    let handle = spawn_session(
        quiz("10", vec![question("Q", &["a", "b"], "a")]),
        SessionContext::new("u"),
        SessionConfig::default(),
        SinkSet::shared(sink.clone()),
    );

    handle.send(SessionInput::SelectLabel('A')).await.unwrap();
    handle.send(SessionInput::Advance).await.unwrap();

    let record = finished(handle.join().await.unwrap());
    assert_eq!(record.score, 1);
    assert_eq!(sink.call_count(), 2);
    assert!(sink.results().is_empty());
}

#[tokio::test(start_paused = true)]
async fn exam_second_violation_forces_submission() {
    let (sink, sinks) = recording();
    let handle = spawn_session(
        three_questions("10"),
        SessionContext::new("u"),
        exam(true),
        sinks,
    );
    let mut rx = handle.subscribe();
    assert!(handle.snapshot().proctor.unwrap().armed);

    handle.send(SessionInput::SelectLabel('A')).await.unwrap();
    handle.send(SessionInput::Advance).await.unwrap();

    // One tab switch fires both signals.
    handle
        .send(SessionInput::FocusLost(AttentionSignal::WindowBlur))
        .await
        .unwrap();
    handle
        .send(SessionInput::FocusLost(AttentionSignal::DocumentHidden))
        .await
        .unwrap();
    let snap = wait_for(&mut rx, |s| {
        s.proctor.as_ref().is_some_and(|p| p.warning_shown)
    })
    .await;
    assert_eq!(snap.proctor.unwrap().violation_count, 1);
    assert_eq!(snap.phase, Phase::InProgress);

    handle.send(SessionInput::AcknowledgeWarning).await.unwrap();
    handle.send(SessionInput::FocusRegained).await.unwrap();
    let snap = wait_for(&mut rx, |s| {
        s.proctor.as_ref().is_some_and(|p| !p.warning_shown)
    })
    .await;
    assert_eq!(snap.proctor.unwrap().violation_count, 1);

    handle
        .send(SessionInput::FocusLost(AttentionSignal::DocumentHidden))
        .await
        .unwrap();

    let record = finished(handle.join().await.unwrap());
    assert_eq!(record.reason, FinishReason::ForcedSubmission);
    assert_eq!(record.score, 1);
    assert_eq!(record.total_questions, 3);
    assert_eq!(record.violation_count, 2);
    assert!(record.forcibly_submitted);
    assert_eq!(sink.results().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn exam_warning_does_not_pause_the_quiz() {
    let (sink, sinks) = recording();
    let handle = spawn_session(
        three_questions("10"),
        SessionContext::new("u"),
        exam(true),
        sinks,
    );
    let mut rx = handle.subscribe();

    handle
        .send(SessionInput::FocusLost(AttentionSignal::WindowBlur))
        .await
        .unwrap();
    let warned = wait_for(&mut rx, |s| {
        s.proctor.as_ref().is_some_and(|p| p.warning_shown)
    })
    .await;

    tokio::time::sleep(Duration::from_secs(5)).await;
    let later = wait_for(&mut rx, |s| {
        s.remaining_secs <= warned.remaining_secs - 5
    })
    .await;
    assert_eq!(later.phase, Phase::InProgress);
    assert!(later.proctor.unwrap().warning_shown);

    handle.send(SessionInput::SelectLabel('A')).await.unwrap();
    let answered = wait_for(&mut rx, |s| s.answered).await;
    assert_eq!(answered.score, 1);
    assert!(answered.proctor.unwrap().warning_shown);

    handle.send(SessionInput::Cancel).await.unwrap();
    handle.join().await.unwrap();
    let_deliveries_run().await;
    assert_eq!(sink.answers().len(), 1);
    assert!(sink.answers()[0].is_correct);
}

#[tokio::test(start_paused = true)]
async fn exam_waits_for_fullscreen_before_monitoring() {
    let (_sink, sinks) = recording();
    let handle = spawn_session(
        three_questions("10"),
        SessionContext::new("u"),
        exam(false),
        sinks,
    );
    let mut rx = handle.subscribe();

    let proctor = handle.snapshot().proctor.unwrap();
    assert!(proctor.fullscreen_prompt);
    assert!(!proctor.armed);

    handle
        .send(SessionInput::FocusLost(AttentionSignal::WindowBlur))
        .await
        .unwrap();
    handle.send(SessionInput::Fullscreen(true)).await.unwrap();
    let snap = wait_for(&mut rx, |s| s.proctor.as_ref().is_some_and(|p| p.armed)).await;
    let proctor = snap.proctor.unwrap();
    assert!(!proctor.fullscreen_prompt);
    assert_eq!(proctor.violation_count, 0);

    handle.send(SessionInput::Fullscreen(false)).await.unwrap();
    let snap = wait_for(&mut rx, |s| {
        s.proctor.as_ref().is_some_and(|p| p.fullscreen_prompt)
    })
    .await;
    assert!(snap.proctor.unwrap().armed);

    handle.send(SessionInput::Cancel).await.unwrap();
    handle.join().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn practice_mode_ignores_windowing_signals() {
    let (_sink, sinks) = recording();
    let handle = spawn_session(
        three_questions("10"),
        SessionContext::new("u"),
        SessionConfig::default(),
        sinks,
    );
    let mut rx = handle.subscribe();

    handle
        .send(SessionInput::FocusLost(AttentionSignal::WindowBlur))
        .await
        .unwrap();
    handle.send(SessionInput::SelectLabel('A')).await.unwrap();
    let snap = wait_for(&mut rx, |s| s.answered).await;
    assert_eq!(snap.phase, Phase::Answered);
    assert!(snap.proctor.is_none());

    handle.send(SessionInput::Cancel).await.unwrap();
    handle.join().await.unwrap();
}

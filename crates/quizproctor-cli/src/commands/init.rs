//! The `quizproctor init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    if std::path::Path::new("quizproctor.toml").exists() {
        println!("quizproctor.toml already exists, skipping.");
    } else {
        std::fs::write("quizproctor.toml", SAMPLE_CONFIG)?;
        println!("Created quizproctor.toml");
    }

    std::fs::create_dir_all("quiz-sets")?;
    let example_path = std::path::Path::new("quiz-sets/example.toml");
    if example_path.exists() {
        println!("quiz-sets/example.toml already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_QUIZ)?;
        println!("Created quiz-sets/example.toml");
    }

    println!("\nNext steps:");
    println!("  1. Point [sink] in quizproctor.toml at your results backend");
    println!("  2. Run: quizproctor validate --quiz quiz-sets/example.toml");
    println!("  3. Run: quizproctor take --quiz quiz-sets/example.toml");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# quizproctor configuration

# Where answers and results go: "rest", "log" or "none".
[sink]
type = "log"

# [sink]
# type = "rest"
# base_url = "https://your-project.supabase.co"
# api_key = "${QUIZPROCTOR_API_KEY}"
# results_path = "/rest/v1/exam_results"
# answers_path = "/rest/v1/answer_logs"
# timeout_secs = 10

[proctor]
max_violations = 2
coalesce_window_ms = 1000
"#;

const EXAMPLE_QUIZ: &str = r#"[quiz]
id = "example"
title = "Example Quiz"
time_limit = "5 minutes"
subject = "general"

[[questions]]
prompt = "Which planet is closest to the sun?"
options = ["Venus", "Mercury", "Mars"]
correct_answer = "Mercury"
explanation = "Mercury orbits at about 0.39 AU."
topics = ["astronomy"]

[[questions]]
prompt = "What is 7 x 8?"
options = ["54", "56", "64"]
correct_answer = "56"
topics = ["arithmetic"]
"#;

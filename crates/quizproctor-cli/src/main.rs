//! quizproctor CLI — timed quizzes and proctored exams in the terminal.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "quizproctor", version, about = "Timed quizzes and proctored exams")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Take a quiz interactively
    Take {
        /// Path to a .toml or .json quiz file
        #[arg(long)]
        quiz: PathBuf,

        /// Run as a proctored exam
        #[arg(long)]
        exam: bool,

        /// Start in full-screen (exam mode only)
        #[arg(long)]
        fullscreen: bool,

        /// User id attached to telemetry and results
        #[arg(long, default_value = "anonymous")]
        user: String,

        /// Subject label, overrides the quiz's own
        #[arg(long)]
        subject: Option<String>,

        /// Grade label, overrides the quiz's own
        #[arg(long)]
        grade: Option<String>,

        /// Violations before forced submission, overrides the config file
        #[arg(long)]
        max_violations: Option<u32>,

        /// Write the final result as JSON to this path
        #[arg(long)]
        output: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate quiz files
    Validate {
        /// Path to a quiz file or directory
        #[arg(long)]
        quiz: PathBuf,
    },

    /// Create starter config and example quiz
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("quizproctor=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Take {
            quiz,
            exam,
            fullscreen,
            user,
            subject,
            grade,
            max_violations,
            output,
            config,
        } => {
            commands::take::execute(commands::take::TakeArgs {
                quiz,
                exam,
                fullscreen,
                user,
                subject,
                grade,
                max_violations,
                output,
                config,
            })
            .await
        }
        Commands::Validate { quiz } => commands::validate::execute(quiz),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

//! tutor: adaptive practice sessions in the terminal.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tokio::io::BufReader;
use tracing::{debug, info};

use services::{PracticeLoopService, SessionStart};
use storage::Storage;
use tutor_core::Clock;
use tutor_core::model::{PracticeMode, QuestionId, SettingsDraft, TopicId};

mod bank;
mod config;
mod repl;

use bank::QuestionBank;

#[derive(Parser)]
#[command(name = "tutor", version, about = "Adaptive practice sessions in the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one practice session
    Practice {
        /// Question bank JSON file
        #[arg(long, env = "TUTOR_BANK")]
        bank: PathBuf,

        /// Settings TOML file
        #[arg(long, env = "TUTOR_CONFIG")]
        config: Option<PathBuf>,

        /// Which questions to draw from
        #[arg(long, value_enum, default_value = "topic")]
        mode: ModeArg,

        /// Topic id (topic mode)
        #[arg(long)]
        topic: Option<u64>,

        /// Comma-separated question ids (custom mode)
        #[arg(long, value_delimiter = ',')]
        ids: Vec<u64>,

        /// Questions per session
        #[arg(long, env = "TUTOR_SESSION_SIZE")]
        size: Option<usize>,

        /// Sampling seed for a reproducible order
        #[arg(long, env = "TUTOR_SEED")]
        seed: Option<u64>,
    },

    /// Validate a question bank
    Check {
        /// Question bank JSON file
        #[arg(long, env = "TUTOR_BANK")]
        bank: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    Topic,
    Review,
    Weak,
    Custom,
}

fn practice_mode(mode: ModeArg, topic: Option<u64>, ids: Vec<u64>) -> anyhow::Result<PracticeMode> {
    Ok(match mode {
        ModeArg::Topic => {
            let topic = topic.ok_or_else(|| anyhow::anyhow!("--topic is required in topic mode"))?;
            PracticeMode::Topic(TopicId::new(topic))
        }
        ModeArg::Review => PracticeMode::Review,
        ModeArg::Weak => PracticeMode::Weak,
        ModeArg::Custom => PracticeMode::Custom(ids.into_iter().map(QuestionId::new).collect()),
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Practice {
            bank,
            config,
            mode,
            topic,
            ids,
            size,
            seed,
        } => practice(bank, config, mode, topic, ids, size, seed).await,
        Commands::Check { bank } => check(bank),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(2)
        }
    }
}

async fn practice(
    bank: PathBuf,
    config: Option<PathBuf>,
    mode: ModeArg,
    topic: Option<u64>,
    ids: Vec<u64>,
    size: Option<usize>,
    seed: Option<u64>,
) -> anyhow::Result<()> {
    let mode = practice_mode(mode, topic, ids)?;
    let overrides = SettingsDraft {
        session_size: size,
        ..SettingsDraft::default()
    };
    let settings = config::load_settings(config.as_deref(), overrides)?;
    let clock = Clock::default();
    let repo = QuestionBank::load(&bank)?.into_repository(clock)?;
    debug!(bank = %bank.display(), "question bank loaded");

    let mut service =
        PracticeLoopService::new(clock, Storage::from_memory(&repo)).with_settings(settings);
    if let Some(seed) = seed {
        service = service.with_seed(seed);
    }

    let mut run = match service.start_session(mode, None).await? {
        SessionStart::Ready(run) => run,
        SessionStart::Nothing(reason) => {
            println!("{}", reason.message());
            return Ok(());
        }
    };

    let mut out = std::io::stdout();
    let summary = repl::drive(&service, &mut run, BufReader::new(tokio::io::stdin()), &mut out).await?;
    run.flush().await;

    match summary {
        Some(summary) => repl::write_summary(&summary, &mut out)?,
        None => info!("session abandoned"),
    }
    Ok(())
}

fn check(bank: PathBuf) -> anyhow::Result<()> {
    let parsed = QuestionBank::load(&bank)?;
    let questions = parsed.questions()?;
    let topics: BTreeSet<_> = questions.iter().map(|q| q.topic_id()).collect();
    let due = parsed.due.len();
    parsed.into_repository(Clock::default())?;
    println!(
        "{}: {} questions across {} topics, {} due for review",
        bank.display(),
        questions.len(),
        topics.len(),
        due
    );
    Ok(())
}

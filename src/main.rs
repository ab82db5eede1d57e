use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use serde::Serialize;

use tube_digest::ai::{load_highlights, ChatCompletionClient};
use tube_digest::config::Config;
use tube_digest::db::Repository;
use tube_digest::error::{AppError, Result};
use tube_digest::feed::ChannelFeedFetcher;
use tube_digest::import::import_roster;
use tube_digest::models::DigestView;
use tube_digest::pipeline::DigestOrchestrator;
use tube_digest::transcript::InnertubeTranscriptClient;

const USAGE: &str = "\
Usage: tube-digest [COMMAND]

Commands:
  --run-all [--force]   Run the digest for every due user (all users with --force)
  --user <id>           Run the digest for one user now
  --highlights          Regenerate today's highlights for every user
  --stats [YYYY-MM-DD]  Print aggregate usage for a day (default today)
  --show <id>           Print a user's current digest and highlights
  --import <file>       Load users and subscriptions from a JSON roster
  --help                Show this message

With no command, behaves like --run-all.";

enum Command {
    RunAll { force: bool },
    User(String),
    Highlights,
    Stats(Option<String>),
    Show(String),
    Import(PathBuf),
    Help,
}

fn parse_args(args: &[String]) -> Result<Command> {
    let missing = |flag: &str| AppError::Config(format!("{flag} needs a value\n\n{USAGE}"));

    let command = match args.get(1).map(String::as_str) {
        None | Some("--run-all") => Command::RunAll {
            force: args.iter().skip(2).any(|a| a == "--force"),
        },
        Some("--user") => Command::User(args.get(2).cloned().ok_or_else(|| missing("--user"))?),
        Some("--highlights") => Command::Highlights,
        Some("--stats") => Command::Stats(args.get(2).cloned()),
        Some("--show") => Command::Show(args.get(2).cloned().ok_or_else(|| missing("--show"))?),
        Some("--import") => {
            Command::Import(args.get(2).map(PathBuf::from).ok_or_else(|| missing("--import"))?)
        }
        Some("--help") | Some("-h") => Command::Help,
        Some(other) => {
            return Err(AppError::Config(format!("unknown argument {other}\n\n{USAGE}")));
        }
    };
    Ok(command)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn build_orchestrator(config: &Config, repository: Repository) -> Result<DigestOrchestrator> {
    let llm = ChatCompletionClient::new(
        config.require_api_key()?,
        config.llm.base_url.clone(),
        config.llm.model.clone(),
        Duration::from_secs(config.llm.timeout_secs),
    )?;
    let feeds = ChannelFeedFetcher::new(config.pipeline.http_timeout())?;
    let transcripts = InnertubeTranscriptClient::new(config.pipeline.http_timeout())?;

    Ok(DigestOrchestrator::new(
        repository,
        Arc::new(feeds),
        Arc::new(transcripts),
        Arc::new(llm),
        &config.pipeline,
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let command = parse_args(&args)?;
    if let Command::Help = command {
        println!("{USAGE}");
        return Ok(());
    }

    let config = Config::load()?;
    let repository = Repository::new(&config.db_path).await?;

    match command {
        Command::RunAll { force } => {
            let orchestrator = build_orchestrator(&config, repository)?;
            let report = orchestrator.run_digest_for_all_users(!force).await?;
            print_json(&report)?;
        }
        Command::User(user_id) => {
            let orchestrator = build_orchestrator(&config, repository)?;
            let run = orchestrator.run_for_user(&user_id).await?;
            print_json(&run)?;
        }
        Command::Highlights => {
            let orchestrator = build_orchestrator(&config, repository)?;
            let report = orchestrator.run_highlights_for_all_users().await?;
            print_json(&report)?;
        }
        Command::Stats(date) => {
            let date = match date {
                Some(raw) => NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                    .map_err(|e| AppError::Config(format!("invalid date {raw}: {e}")))?,
                None => Utc::now().date_naive(),
            };
            print_json(&repository.daily_stats(date).await?)?;
        }
        Command::Show(user_id) => {
            let digest = DigestView::group(repository.digest_videos(&user_id).await?);
            let highlights = load_highlights(&repository, &user_id, Utc::now().date_naive()).await;
            print_json(&serde_json::json!({
                "digest": digest,
                "highlights": highlights,
            }))?;
        }
        Command::Import(path) => {
            let json = std::fs::read_to_string(&path)?;
            let summary = import_roster(&repository, &json).await?;
            println!(
                "Imported {} users and {} subscriptions from {:?}",
                summary.users, summary.subscriptions, path
            );
        }
        Command::Help => {}
    }

    Ok(())
}

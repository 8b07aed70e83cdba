//! Review council, an offline front end for the consensus engine.
//!
//! Reads reviewer opinions as JSON, runs voting, debates and
//! deduplication, and writes pretty JSON to stdout. Debates replay
//! scripted responses; logs go to stderr.
//!
//! # Usage
//!
//! ```bash
//! # Gate and classifier only
//! review-council vote opinions.json
//!
//! # Full pipeline with scripted debate responses
//! review-council run opinions.json --responses responses.json
//!
//! # One debate over opinions sharing a location
//! review-council debate contested.json --responses responses.json
//!
//! # Merge near-duplicate discussions
//! review-council dedup discussions.json
//!
//! # Custom configuration
//! REVIEW_MAX_ROUNDS=5 review-council --config review.toml run opinions.json --responses r.json
//! ```

mod config;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;

use consensus::debate::{DebateOrchestrator, MarkerResponseParser, ScriptedBackend};
use consensus::{Deduplicator, Discussion, Opinion, ReviewPipeline, SequentialIds};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Engine config TOML (overridden by REVIEW_* variables and flags)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Majority threshold for the voting gate (overrides REVIEW_THRESHOLD)
    #[arg(long, global = true)]
    threshold: Option<f64>,

    /// Maximum debate rounds (overrides REVIEW_MAX_ROUNDS)
    #[arg(long, global = true)]
    max_rounds: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Group opinions and report gate decisions and debate triggers
    Vote {
        /// JSON array of opinions
        opinions: PathBuf,
    },
    /// Run the full pipeline with scripted debate responses
    Run {
        /// JSON array of opinions
        opinions: PathBuf,
        /// JSON object mapping reviewer id to per-round responses
        #[arg(long)]
        responses: PathBuf,
        /// Prefix for generated discussion ids
        #[arg(long, default_value = "disc")]
        id_prefix: String,
    },
    /// Debate one location with scripted responses
    Debate {
        /// JSON array of opinions sharing one location
        opinions: PathBuf,
        /// JSON object mapping reviewer id to per-round responses
        #[arg(long)]
        responses: PathBuf,
    },
    /// Merge near-duplicate discussions
    Dedup {
        /// JSON array of discussions
        discussions: PathBuf,
    },
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content =
        std::fs::read_to_string(path).context(format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).context(format!("Failed to parse {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{out}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let engine = config::finalize(
        config::load(args.config.as_deref())?,
        args.threshold,
        args.max_rounds,
    )?;
    info!(
        threshold = engine.voting.threshold,
        max_rounds = engine.debate.max_rounds,
        "Review council starting"
    );

    match args.command {
        Command::Vote { opinions } => {
            let opinions: Vec<Opinion> = read_json(&opinions)?;
            let pipeline = ReviewPipeline::new(
                engine,
                Arc::new(ScriptedBackend::new()),
                Arc::new(MarkerResponseParser),
            )?;
            print_json(&pipeline.vote(opinions))?;
        }
        Command::Run {
            opinions,
            responses,
            id_prefix,
        } => {
            let opinions: Vec<Opinion> = read_json(&opinions)?;
            let backend: ScriptedBackend = read_json(&responses)?;
            let pipeline =
                ReviewPipeline::new(engine, Arc::new(backend), Arc::new(MarkerResponseParser))?;
            let mut ids = SequentialIds::new(&id_prefix);
            let report = pipeline.run(opinions, &mut ids).await?;
            print_json(&report)?;
        }
        Command::Debate {
            opinions,
            responses,
        } => {
            let path = opinions;
            let opinions: Vec<Opinion> = read_json(&path)?;
            let Some(first) = opinions.first() else {
                bail!("{} contains no opinions", path.display());
            };
            let location = first.key();
            let backend: ScriptedBackend = read_json(&responses)?;
            let orchestrator = DebateOrchestrator::new(
                Arc::new(backend),
                Arc::new(MarkerResponseParser),
                engine.debate,
            );
            let result = orchestrator.debate_opinions(&location, &opinions).await?;
            info!(
                elapsed_ms = result.duration().as_millis() as u64,
                "{}",
                result.summary_line()
            );
            print_json(&result)?;
        }
        Command::Dedup { discussions } => {
            let discussions: Vec<Discussion> = read_json(&discussions)?;
            let outcome = Deduplicator::new(engine.dedup).deduplicate(discussions);
            print_json(&outcome)?;
        }
    }

    Ok(())
}


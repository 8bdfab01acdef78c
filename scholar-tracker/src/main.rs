use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use scholar_core::{HttpInteractionApi, InterestType, ScholarConfig};
use tracing_subscriber::{fmt, EnvFilter};

use scholar_tracker::replay::{self, ReplayScript};
use scholar_tracker::{InteractionTracker, PageEvents};

#[derive(Parser, Debug)]
#[command(author, version, about = "Reading-behaviour tracker for the scholar paper reader", long_about = None)]
struct Args {
    #[arg(short, long, default_value = "scholar.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a scripted reading session against the backend
    Replay {
        /// JSON script of timed page events
        script: PathBuf,
    },

    /// Record an explicit like (or dislike) for a paper
    Mark {
        paper_id: String,

        #[arg(long)]
        dislike: bool,
    },

    /// Print the resolved configuration
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (dev convenience; production uses real env vars)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Load config before logging: the log level depends on tracker.debug
    let config = match ScholarConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    // Init logging
    let level = if config.tracker.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    if let Commands::Check = args.command {
        println!("api.base_url     = {}", config.api.base_url);
        println!("api.token        = {}", if config.api.token.is_some() { "<set>" } else { "<unset>" });
        println!("api.timeout_secs = {}", config.api.timeout_secs);
        println!("tracker          = {:#?}", config.tracker);
        return Ok(());
    }

    let api = match HttpInteractionApi::new(&config.api) {
        Ok(api) => Arc::new(api),
        Err(e) => {
            eprintln!("Failed to create API client: {}", e);
            std::process::exit(1);
        }
    };

    let events = PageEvents::new(config.tracker.event_buffer);
    let tracker = InteractionTracker::new(config.tracker.clone(), api, events);

    match args.command {
        Commands::Replay { script } => {
            let script = ReplayScript::from_file(&script)?;

            tracker
                .on_interest_analyzed(|paper_id, result| {
                    let line = serde_json::json!({
                        "paper_id": paper_id,
                        "analysis": result,
                    });
                    println!("{}", line);
                })
                .await;

            tokio::select! {
                res = replay::run_script(&tracker, &script) => {
                    let summary = res?;
                    tracing::info!(
                        steps = summary.steps_run,
                        interest_failures = summary.interest_failures,
                        "Replay complete"
                    );
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutdown signal received");
                }
            }

            tracker.shutdown().await;

            let status = tracker.status().await;
            if status.pending_retries > 0 || status.dropped_submissions > 0 {
                tracing::warn!(
                    pending = status.pending_retries,
                    dropped = status.dropped_submissions,
                    "Some submissions were not delivered"
                );
            }
        }
        Commands::Mark { paper_id, dislike } => {
            let interest = if dislike {
                InterestType::Dislike
            } else {
                InterestType::Like
            };

            let result = tracker.mark_interest(paper_id.as_str(), interest).await;
            tracker.shutdown().await;

            if let Err(e) = result {
                eprintln!("Failed to mark interest for {}: {}", paper_id, e);
                std::process::exit(1);
            }
            println!("Marked {:?} for {}", interest, paper_id);
        }
        Commands::Check => {}
    }

    Ok(())
}

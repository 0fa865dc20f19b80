// stargrep command line.
// Syncs the starred repositories of a token and searches them.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

use stargrep::cache;
use stargrep::pool::FetchPool;
use stargrep::{Config, GitHubClient, Result, Session, SyncOutcome, SyncReport};

#[derive(Debug, Parser)]
#[command(name = "stargrep", version, about = "Search your starred GitHub repositories")]
struct Cli {
    /// GitHub personal access token.
    #[arg(short, long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Bring the local cache up to date and report what changed.
    Sync {
        /// Reconcile with GitHub even if the cache is still fresh.
        #[arg(long)]
        force: bool,
    },
    /// Search name, description, topics and README of every starred repository.
    Search {
        text: String,
        /// Drop results scoring below this.
        #[arg(long)]
        min_score: Option<f32>,
        /// Maximum number of results.
        #[arg(long)]
        size: Option<usize>,
    },
    /// Delete the local cache file.
    Clear {
        /// Required to actually delete.
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "stargrep failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::new(cli.token)?;

    match cli.command {
        Command::Clear { yes } => {
            let path = config.db_path();
            if !yes {
                println!("Would delete {}. Pass --yes to confirm.", path.display());
                return Ok(());
            }
            cache::clear_all(&path)?;
            println!("Deleted {}", path.display());
            Ok(())
        }
        Command::Sync { force } => {
            if force {
                config = config.with_freshness_window(Duration::ZERO);
            }
            let (session, client) = open(&config).await?;
            print_report(session.report());

            let quota = client.rate_limit();
            if quota.limit > 0 {
                println!("API quota: {}/{} remaining", quota.remaining, quota.limit);
            }
            Ok(())
        }
        Command::Search {
            text,
            min_score,
            size,
        } => {
            if let Some(min_score) = min_score {
                config = config.with_min_score(min_score)?;
            }
            if let Some(size) = size {
                config = config.with_max_hits(size);
            }

            let (mut session, _) = open(&config).await?;
            let min_score = session.min_score();
            let results = session.search(&text)?;
            if results.is_empty() {
                println!("No matches for \"{}\" scoring {} or more", text.trim(), min_score);
            }
            for (rank, result) in results.iter().enumerate() {
                let item = &result.item;
                println!("{:>3}. {}  ({:.2})", rank + 1, item.full_name, result.score);
                if !item.description.is_empty() {
                    println!("     {}", item.description);
                }
                println!("     {}", item.url);
            }
            Ok(())
        }
    }
}

async fn open(config: &Config) -> Result<(Session, Arc<GitHubClient>)> {
    let pool = FetchPool::new(config.workers)?;
    let client = Arc::new(GitHubClient::new(&config.token, config.request_timeout, pool)?);
    let session = Session::open(config.clone(), client.clone()).await?;
    Ok((session, client))
}

fn print_report(report: &SyncReport) {
    let outcome = match report.outcome {
        SyncOutcome::Cached => "cache is fresh",
        SyncOutcome::Refreshed => "synced",
        SyncOutcome::Degraded => "listing failed, using cached data",
    };
    println!(
        "{outcome}: {} indexed, {} new, {} updated, {} removed, {} failed",
        report.indexed, report.inserted, report.updated, report.deleted, report.failed
    );
}

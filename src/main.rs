use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod ai;
mod config;
mod db;
mod digest;
mod error;
mod feed;
mod models;
mod pipeline;
mod services;
#[cfg(test)]
mod testing;

use ai::{ClaudeClient, LanguageModel, ModelProfile};
use config::Config;
use db::{ArticleStore, Repository};
use digest::{DigestAggregator, DigestOutcome};
use error::Result;
use feed::HttpFeedSource;
use models::ArticleQuery;
use pipeline::Pipeline;
use services::HttpPageSource;

/// Exit status when the model did not answer in time.
const EXIT_TIMEOUT: i32 = 3;

#[derive(Parser)]
#[command(name = "digest-reader", version, about)]
struct Cli {
    /// Sets a custom config file
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, extract and summarize one feed
    Fetch { feed_url: String },
    /// Process every active feed
    Refresh,
    /// Re-summarize stored articles without fetching
    Regenerate {
        #[arg(required = true)]
        feed_urls: Vec<String>,
    },
    /// Generate this week's digest
    Digest {
        #[arg(long, value_enum, default_value = "default")]
        profile: ModelProfile,
    },
    /// Print the latest digest
    Overview,
    /// List stored articles as JSON
    Articles {
        #[arg(required = true)]
        feed_urls: Vec<String>,
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    Feeds {
        #[command(subcommand)]
        command: FeedCommands,
    },
    /// Rewrite stored publication dates in canonical form (also done on open)
    NormalizeDates,
}

#[derive(Subcommand)]
enum FeedCommands {
    Add {
        url: String,
        #[arg(long)]
        name: Option<String>,
    },
    List {
        /// Show archived feeds instead of active ones
        #[arg(long)]
        archived: bool,
    },
    Archive { id: i64 },
    Reactivate { id: i64 },
    /// Delete every stored article of a feed
    Clear { id: i64 },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        if e.is_timeout() {
            eprintln!("Timed out waiting for the model ({e}); try again later.");
            process::exit(EXIT_TIMEOUT);
        }
        tracing::error!(error = %e, "command failed");
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn init_logging(config: &Config, verbose: bool) {
    let default_level = if verbose { "debug" } else { config.log_level.as_str() };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn open_store(config: &Config) -> Result<Arc<Repository>> {
    if let Some(parent) = Path::new(&config.db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating database directory {}", parent.display()))?;
        }
    }
    Ok(Arc::new(Repository::new(&config.db_path).await?))
}

fn language_model(config: &Config) -> Result<Arc<dyn LanguageModel>> {
    let client = ClaudeClient::new(
        config.api_key()?,
        config.model.clone(),
        config.pipeline.model_timeout_secs,
    )?;
    Ok(Arc::new(client))
}

fn pipeline(config: &Config, store: Arc<Repository>) -> Result<Pipeline> {
    Ok(Pipeline::new(
        store,
        Arc::new(HttpFeedSource::new()?),
        Arc::new(HttpPageSource::new()?),
        language_model(config)?,
        config,
    ))
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    init_logging(&config, cli.verbose);
    let store = open_store(&config).await?;

    match cli.command {
        Commands::Fetch { feed_url } => {
            let report = pipeline(&config, store)?.fetch_feed(&feed_url).await?;
            println!(
                "{}: {} new, {} already stored, {} dropped, {} short summary only, {} without summary",
                report.feed_url,
                report.new_links.len(),
                report.skipped_existing,
                report.dropped_insufficient,
                report.partial_summaries,
                report.summary_failures
            );
            for link in &report.new_links {
                println!("  + {link}");
            }
        }
        Commands::Refresh => {
            let report = pipeline(&config, store)?.refresh_all().await?;
            println!(
                "Refreshed {} feeds ({} failed), {} new articles",
                report.feeds.len(),
                report.failed_feeds.len(),
                report.new_articles()
            );
            for (url, reason) in &report.failed_feeds {
                println!("  ! {url}: {reason}");
            }
        }
        Commands::Regenerate { feed_urls } => {
            let report = pipeline(&config, store)?.regenerate(&feed_urls).await?;
            println!(
                "Regenerated {} summaries ({} failed)",
                report.processed, report.failed
            );
        }
        Commands::Digest { profile } => {
            let aggregator = DigestAggregator::new(
                store,
                language_model(&config)?,
                config.digest.clone(),
                Duration::from_secs(config.pipeline.model_timeout_secs),
            )
            .with_profile(profile);
            match aggregator.generate(Utc::now()).await? {
                DigestOutcome::Created(overview) => {
                    println!("Week of {}\n\n{}", overview.week_start, overview.content)
                }
                DigestOutcome::NoArticles => println!(
                    "No summarized articles in the last {} days.",
                    config.digest.window_days
                ),
            }
        }
        Commands::Overview => match store.latest_overview().await? {
            Some(overview) => println!(
                "Week of {} (created {})\n\n{}",
                overview.week_start,
                overview.created_at.format("%Y-%m-%d %H:%M"),
                overview.content
            ),
            None => println!("No digest has been generated yet."),
        },
        Commands::Articles {
            feed_urls,
            page,
            limit,
        } => {
            let page = store
                .query_articles(ArticleQuery::for_feeds(feed_urls).page(page.max(1), limit))
                .await?;
            println!("{}", serde_json::to_string_pretty(&page)?);
        }
        Commands::Feeds { command } => run_feed_command(&store, command).await?,
        Commands::NormalizeDates => {
            let repair = store.normalize_published_dates().await?;
            println!(
                "Normalized {} dates, {} could not be parsed",
                repair.updated, repair.invalid
            );
        }
    }

    Ok(())
}

async fn run_feed_command(store: &Repository, command: FeedCommands) -> Result<()> {
    match command {
        FeedCommands::Add { url, name } => match store.add_feed(&url, name.as_deref()).await? {
            Some(id) => println!("Added feed {id}: {url}"),
            None => println!("Already subscribed: {url}"),
        },
        FeedCommands::List { archived } => {
            for feed in store.list_feeds(archived).await? {
                let status = if feed.archived { "archived" } else { "active" };
                println!("{}\t{status}\t{}\t{}", feed.id, feed.display_name(), feed.url);
            }
        }
        FeedCommands::Archive { id } => {
            store.set_feed_archived(id, true).await?;
            println!("Archived feed {id}");
        }
        FeedCommands::Reactivate { id } => {
            store.set_feed_archived(id, false).await?;
            println!("Reactivated feed {id}");
        }
        FeedCommands::Clear { id } => {
            let deleted = store.clear_feed(id).await?;
            println!("Deleted {deleted} articles from feed {id}");
        }
    }
    Ok(())
}

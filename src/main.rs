use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fulltext::config::Config;
use fulltext::storage::{Database, DatabaseError, IngestedEntry, NewFeed};
use fulltext::Enricher;

/// Largest entries file `enrich-feed` will read (16MB)
const MAX_ENTRIES_FILE_SIZE: u64 = 16 * 1024 * 1024;

/// Get the config directory path (~/.config/fulltext/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("fulltext"))
}

#[derive(Parser, Debug)]
#[command(
    name = "fulltext",
    about = "Fetch full article content for feed entries"
)]
struct Args {
    /// Config file (default: ~/.config/fulltext/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a user, or print the existing one with that name
    AddUser { username: String },

    /// Subscribe a user to a feed, or update the subscription's settings
    AddFeed {
        user_id: i64,
        feed_url: String,
        #[arg(long, default_value = "")]
        title: String,
        #[arg(long)]
        site_url: Option<String>,
        /// Scrape the origin page of new entries
        #[arg(long)]
        crawler: bool,
        /// Fetch new entries through the user's remote parser API
        #[arg(long)]
        remote: bool,
        /// CSS selectors for the scraper, e.g. "article .post-body"
        #[arg(long, default_value = "")]
        scraper_rules: String,
        /// Comma-separated rewrite rules, e.g. "add_image_title,nl2br"
        #[arg(long, default_value = "")]
        rewrite_rules: String,
        #[arg(long, default_value = "")]
        user_agent: String,
    },

    /// List a user's feeds with their enrichment settings
    ListFeeds { user_id: i64 },

    /// Set a user's remote parser API endpoint (empty string clears it)
    SetEndpoint { user_id: i64, url: String },

    /// Enrich freshly ingested entries (JSON array of {url, title, content}) and store them
    EnrichFeed {
        feed_id: i64,
        #[arg(value_name = "ENTRIES_JSON")]
        entries_file: PathBuf,
    },

    /// Fetch full content for one stored entry now
    FetchEntry { entry_id: i64 },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let config_dir = get_config_dir()?;
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?
        .with_env_overrides();

    let db_path = match &config.database_path {
        Some(path) => path.clone(),
        None => {
            if !config_dir.exists() {
                std::fs::create_dir_all(&config_dir)
                    .context("Failed to create config directory")?;
            }
            config_dir.join("fulltext.db")
        }
    };
    let db = open_database(&db_path).await?;

    match args.command {
        Command::AddUser { username } => {
            let user = db
                .create_user(&username)
                .await
                .context("Failed to create user")?;
            println!("User {} ({})", user.id, user.username);
        }

        Command::AddFeed {
            user_id,
            feed_url,
            title,
            site_url,
            crawler,
            remote,
            scraper_rules,
            rewrite_rules,
            user_agent,
        } => {
            db.user_by_id(user_id)
                .await
                .with_context(|| format!("Unknown user {user_id}"))?;

            let title = if title.trim().is_empty() {
                feed_url.clone()
            } else {
                title
            };
            let feed_id = db
                .insert_feed(&NewFeed {
                    user_id,
                    title,
                    feed_url,
                    site_url,
                    crawler,
                    remote_enrichment: remote,
                    scraper_rules,
                    rewrite_rules,
                    user_agent,
                })
                .await
                .context("Failed to save feed")?;
            println!("Feed {feed_id}");
        }

        Command::ListFeeds { user_id } => {
            let user = db
                .user_by_id(user_id)
                .await
                .with_context(|| format!("Unknown user {user_id}"))?;
            let feeds = db
                .get_feeds_for_user(user.id)
                .await
                .context("Failed to load feeds")?;
            println!(
                "Remote API endpoint: {}",
                user.remote_endpoint().unwrap_or("(not set)")
            );
            for feed in feeds {
                let mut flags = Vec::new();
                if feed.crawler {
                    flags.push("crawler");
                }
                if feed.remote_enrichment {
                    flags.push("remote");
                }
                println!(
                    "{:>5}  {}  <{}>  [{}]",
                    feed.id,
                    feed.title,
                    feed.feed_url,
                    flags.join(", ")
                );
            }
        }

        Command::SetEndpoint { user_id, url } => {
            let url = url.trim();
            if !url.is_empty() {
                let parsed = url::Url::parse(url).context("Invalid endpoint URL")?;
                if !matches!(parsed.scheme(), "http" | "https") {
                    anyhow::bail!("Endpoint must be an http or https URL");
                }
            }
            db.set_user_remote_api_url(user_id, Some(url))
                .await
                .context("Failed to update endpoint")?;
            if url.is_empty() {
                println!("Remote API endpoint cleared for user {user_id}");
            } else {
                println!("Remote API endpoint for user {user_id}: {url}");
            }
        }

        Command::EnrichFeed {
            feed_id,
            entries_file,
        } => {
            let feed = db
                .get_feed(feed_id)
                .await
                .with_context(|| format!("Failed to load feed {feed_id}"))?;
            let ingested = read_ingested_entries(&entries_file)?;
            let mut entries: Vec<_> = ingested
                .into_iter()
                .map(|entry| entry.into_entry(&feed))
                .collect();

            let enricher = Enricher::new(&config, Arc::new(db.clone()))
                .context("Failed to build HTTP client")?;
            let report = enricher.enrich_feed_entries(&feed, &mut entries).await;

            let stored = db
                .upsert_entries(&entries)
                .await
                .context("Failed to store entries")?;
            println!(
                "{} entries processed: {} stored, {} already known, {} replaced with full content, {} failures",
                report.processed, stored, report.duplicates, report.replaced, report.failures
            );
        }

        Command::FetchEntry { entry_id } => {
            let mut entry = db
                .get_entry(entry_id)
                .await
                .with_context(|| format!("Failed to load entry {entry_id}"))?;
            let feed = db
                .get_feed(entry.feed_id)
                .await
                .context("Failed to load entry's feed")?;

            let enricher = Enricher::new(&config, Arc::new(db.clone()))
                .context("Failed to build HTTP client")?;
            match enricher.enrich_single_entry(&feed, &mut entry).await {
                Ok(()) => {
                    db.update_entry_content(entry.id, &entry.content)
                        .await
                        .context("Failed to save entry content")?;
                    println!("Fetched full content for entry {}", entry.id);
                }
                Err(e) if e.is_configuration() => {
                    eprintln!("Error: {e}");
                    eprintln!();
                    eprintln!("Set a remote parser endpoint for this user:");
                    eprintln!("  fulltext set-endpoint {} <URL>", entry.user_id);
                    std::process::exit(2);
                }
                Err(e) => {
                    return Err(anyhow::Error::new(e).context("Failed to fetch full content"));
                }
            }
        }
    }

    Ok(())
}

async fn open_database(path: &Path) -> Result<Database> {
    let path_str = path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
    match Database::open(path_str).await {
        Ok(db) => Ok(db),
        Err(DatabaseError::InstanceLocked) => {
            eprintln!(
                "Error: The database at {} is locked by another process. Please try again.",
                path.display()
            );
            std::process::exit(1);
        }
        Err(e) => Err(anyhow::anyhow!("Failed to open database: {}", e)),
    }
}

fn read_ingested_entries(path: &Path) -> Result<Vec<IngestedEntry>> {
    let metadata = std::fs::metadata(path)
        .with_context(|| format!("Failed to read entries file: {}", path.display()))?;
    if !metadata.is_file() {
        anyhow::bail!("Entries path must be a regular file");
    }
    if metadata.len() > MAX_ENTRIES_FILE_SIZE {
        anyhow::bail!(
            "Entries file is {} bytes, max is {}",
            metadata.len(),
            MAX_ENTRIES_FILE_SIZE
        );
    }

    let raw = std::fs::read(path)
        .with_context(|| format!("Failed to read entries file: {}", path.display()))?;
    serde_json::from_slice(&raw)
        .with_context(|| format!("{} is not a JSON array of entries", path.display()))
}

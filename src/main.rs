use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tubemirror::catalog::select_playlists;
use tubemirror::config::Config;
use tubemirror::service::youtube::{YouTubeClient, PAGE_SIZE};
use tubemirror::service::CatalogSource;
use tubemirror::storage::{LocalStore, MemoryStore, VideoStore};
use tubemirror::sync::{SyncReport, SyncRunner};

/// Mirror a YouTube user's or channel's playlists into a local store
#[derive(Parser)]
#[command(name = "tubemirror", version)]
struct Cli {
    /// Config file (default: <config dir>/tubemirror/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Sync this YouTube user instead of the configured account
    #[arg(long, global = true, conflicts_with = "channel")]
    user: Option<String>,

    /// Sync this channel id instead of the configured account
    #[arg(long, global = true)]
    channel: Option<String>,

    /// Comma-separated playlist names, overriding the config
    #[arg(long, global = true)]
    playlists: Option<String>,

    /// redb store file, overriding the config
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one sync pass
    Sync {
        /// Reconcile against an in-memory copy of the store and report only
        #[arg(long)]
        dry_run: bool,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the account's playlists and which ones the filter selects
    Playlists,
    /// Print the stored videos
    List,
    /// Write a default config file if none exists
    InitConfig,
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "tubemirror=debug,info" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    if let Some(user) = &cli.user {
        config.youtube.username = user.clone();
        config.youtube.channel_id.clear();
    }
    if let Some(channel) = &cli.channel {
        config.youtube.channel_id = channel.clone();
        config.youtube.username.clear();
    }
    if let Some(playlists) = &cli.playlists {
        config.youtube.playlists = playlists.clone();
    }
    if let Some(store) = &cli.store {
        config.store.path = Some(store.display().to_string());
    }
    Ok(config)
}

fn open_store(config: &Config) -> Result<LocalStore> {
    let path = config.store.resolved_path()?;
    tracing::debug!("Opening store at {}", path.display());
    LocalStore::open(&path).with_context(|| format!("Failed to open store {}", path.display()))
}

fn print_report(report: &SyncReport, dry_run: bool) {
    let r = &report.reconcile;
    let prefix = if dry_run { "Dry run for" } else { "Synced" };
    println!(
        "{} {} ({} playlists, {} items)",
        prefix,
        report.account,
        report.playlists.len(),
        report.fetched_items
    );
    println!(
        "  created {}, updated {}, unchanged {}, deleted {}",
        r.created, r.updated, r.unchanged, r.deleted
    );
    for (name, reason) in &report.failed_playlists {
        println!("  warning: playlist '{}' skipped: {}", name, reason);
    }
    for name in &report.truncated_playlists {
        println!(
            "  warning: playlist '{}' has more than {} items; only the first page was mirrored",
            name, PAGE_SIZE
        );
    }
}

async fn cmd_sync(config: &Config, dry_run: bool, json: bool) -> Result<()> {
    let account = config.youtube.account()?;
    let client = YouTubeClient::new(&config.youtube)?;
    let runner = SyncRunner::new(account, config.youtube.playlist_filter());
    let store = open_store(config)?;

    let report = if dry_run {
        let scratch = MemoryStore::with_records(store.list_all().await?);
        runner.run(&client, &scratch).await?
    } else {
        runner.run(&client, &store).await?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, dry_run);
    }
    Ok(())
}

async fn cmd_playlists(config: &Config) -> Result<()> {
    let account = config.youtube.account()?;
    let client = YouTubeClient::new(&config.youtube)?;

    let all = client.list_playlists(&account).await?;
    let selected = select_playlists(&all, config.youtube.playlist_filter());

    println!("Playlists of {}:", account);
    for (name, id) in all.iter() {
        let mark = if selected.contains(name) { "*" } else { " " };
        println!("{} {:<20} {}", mark, name, id);
    }
    Ok(())
}

async fn cmd_list(config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let records = store.list_all().await?;

    for record in &records {
        println!(
            "{:>5}  {:<12} {:<40} {}",
            record.id.unwrap_or_default(),
            record.video_id,
            record.playlist_entry_id,
            record.title
        );
    }
    println!("{} videos", records.len());
    Ok(())
}

fn cmd_init_config(cli: &Cli) -> Result<()> {
    let path = match &cli.config {
        Some(path) => path.clone(),
        None => Config::config_path()?,
    };
    if path.exists() {
        println!("Config already exists at {}", path.display());
        return Ok(());
    }
    Config::default().save_to(&path)?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Command::InitConfig = cli.command {
        return cmd_init_config(&cli);
    }

    let config = load_config(&cli)?;
    match cli.command {
        Command::Sync { dry_run, json } => cmd_sync(&config, dry_run, json).await,
        Command::Playlists => cmd_playlists(&config).await,
        Command::List => cmd_list(&config).await,
        Command::InitConfig => Ok(()),
    }
}

//! Sentinel main entry point
//!
//! This is the command-line interface for the Sentinel batch crawler.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use sentinel::batch::{load_metrics, load_progress, print_metrics, print_progress};
use sentinel::config::{load_config, Config};
use sentinel::service::{remove_batch, visible_batches};
use sentinel::storage::{lock_storage, JobStore, SqliteStorage};
use sentinel::{Owner, Sentinel};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Sentinel: crawl every URL found in a document
///
/// Sentinel extracts URLs from text, CSV, JSON or PDF documents, crawls each
/// one on a pool of workers, and keeps per-batch progress, results and
/// metrics in SQLite.
#[derive(Parser, Debug)]
#[command(name = "sentinel")]
#[command(version)]
#[command(about = "Batch URL crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults are used when omitted)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit a document and crawl every URL in it
    Submit {
        /// Document to read (.txt, .csv, .json or .pdf)
        file: PathBuf,

        /// Owning user id; omit to submit as a guest
        #[arg(long)]
        owner: Option<i64>,
    },

    /// Show progress of a batch
    Status { batch: String },

    /// Show crawl metrics of a batch
    Metrics { batch: String },

    /// Write every result of a batch as JSON
    Download {
        batch: String,

        /// Output file (stdout when omitted)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// List the batches of an owner
    List {
        #[arg(long)]
        owner: i64,
    },

    /// Delete a batch and its stored document
    Delete {
        batch: String,

        #[arg(long)]
        owner: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)
                .with_context(|| format!("failed to load configuration from {}", path.display()))?
        }
        None => Config::default(),
    };

    match cli.command {
        Command::Submit { file, owner } => handle_submit(config, &file, owner).await,
        Command::Status { batch } => {
            let storage = open_storage(&config)?;
            let progress = load_progress(&storage, &batch)?;
            if progress.total == 0 {
                tracing::warn!("Batch {} has no jobs", batch);
            }
            print_progress(&batch, &progress);
            Ok(())
        }
        Command::Metrics { batch } => {
            let storage = open_storage(&config)?;
            print_metrics(&batch, &load_metrics(&storage, &batch)?);
            Ok(())
        }
        Command::Download { batch, out } => handle_download(&config, &batch, out.as_deref()),
        Command::List { owner } => {
            let storage = open_storage(&config)?;
            for batch in visible_batches(&storage, Owner::from_user_id(owner))? {
                println!("{}", batch);
            }
            Ok(())
        }
        Command::Delete { batch, owner } => {
            let mut storage = open_storage(&config)?;
            let owner = Owner::from_user_id(owner);
            let uploads_dir = Path::new(&config.storage.uploads_dir);
            let deleted = remove_batch(&mut storage, uploads_dir, &batch, owner)?;
            if deleted == 0 {
                bail!("no batch {} owned by {}", batch, owner);
            }
            println!("Deleted {} ({} jobs)", batch, deleted);
            Ok(())
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sentinel=info,warn"),
            1 => EnvFilter::new("sentinel=debug,info"),
            2 => EnvFilter::new("sentinel=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn open_storage(config: &Config) -> anyhow::Result<SqliteStorage> {
    let path = &config.storage.database_path;
    SqliteStorage::new(Path::new(path)).with_context(|| format!("failed to open database {}", path))
}

/// Submits a document, waits for every job to finish, and prints progress
async fn handle_submit(config: Config, file: &Path, owner: Option<i64>) -> anyhow::Result<()> {
    let owner = owner.map(Owner::from_user_id).unwrap_or(Owner::Guest);
    let bytes =
        std::fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .context("document path has no file name")?;

    let sentinel = Sentinel::open(config)?;
    let submission = sentinel.submit_document(&bytes, &file_name, owner)?;
    let batch_key = submission.batch_key.clone();
    println!(
        "Accepted {} ({} candidates found)",
        batch_key, submission.candidates_found
    );

    let report = submission.wait().await?;
    tracing::info!(
        "{} of {} valid URLs enqueued",
        report.enqueued,
        report.valid
    );

    let progress_storage = sentinel.storage().clone();
    sentinel.shutdown().await;

    let storage = lock_storage(&progress_storage)?;
    print_progress(&batch_key, &load_progress(&*storage, &batch_key)?);
    Ok(())
}

fn handle_download(config: &Config, batch: &str, out: Option<&Path>) -> anyhow::Result<()> {
    let storage = open_storage(config)?;
    let results = storage.get_job_results(batch)?;
    let json = serde_json::to_string_pretty(&results)?;

    match out {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Wrote {} results to {}", results.len(), path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

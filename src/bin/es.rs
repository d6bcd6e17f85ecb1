//! `es` - Elasticsearch migrations from the command line.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use tracing::error;
use tracing_subscriber::EnvFilter;

use esmigrate::Config;
use esmigrate::commands;
use esmigrate::indices::IndexRequest;

#[derive(Debug, Parser)]
#[command(name = "es", version, about = "Versioned migrations for Elasticsearch")]
struct Cli {
    /// Config file (TOML). Defaults to ./es-migrate.toml, then the user config dir.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Elasticsearch URL
    #[arg(long, global = true, env = "ES_URL")]
    url: Option<String>,

    /// Sniff cluster nodes ("true" to enable)
    #[arg(long, global = true, env = "ES_SNIFF")]
    sniff: Option<String>,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create a new migration file
    CreateMigration { directory: PathBuf, name: String },
    /// Show applied and pending migrations
    MigrateStatus {
        directory: PathBuf,
        environment: Option<String>,
    },
    /// Apply pending migrations in order
    MigrateUp {
        directory: PathBuf,
        environment: String,
    },
    /// Count documents in indices
    Count { index: String },
    /// Flush indices
    Flush { index: Option<String> },
    /// Refresh indices
    Refresh { index: Option<String> },
    /// Print index settings
    Settings { index: Option<String> },
    /// Print index statistics
    Stats { index: Option<String> },
    /// Print the mapping of an index
    Mapping { index: String },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = Config::load(cli.config.as_deref())?
        .with_overrides(cli.url.as_deref(), cli.sniff.as_deref());

    let request = match cli.command {
        Commands::CreateMigration { directory, name } => {
            commands::create(&directory, &name)?;
            return Ok(ExitCode::SUCCESS);
        }
        Commands::MigrateStatus {
            directory,
            environment,
        } => {
            commands::migrate_status(&config, &directory, environment.as_deref()).await?;
            return Ok(ExitCode::SUCCESS);
        }
        Commands::MigrateUp {
            directory,
            environment,
        } => {
            let cancel = cancel_on_interrupt();
            return commands::migrate_up(&config, &directory, &environment, cancel).await;
        }
        Commands::Count { index } => IndexRequest::Count(index),
        Commands::Flush { index } => IndexRequest::Flush(index),
        Commands::Refresh { index } => IndexRequest::Refresh(index),
        Commands::Settings { index } => IndexRequest::Settings(index),
        Commands::Stats { index } => IndexRequest::Stats(index),
        Commands::Mapping { index } => IndexRequest::Mapping(index),
    };

    commands::run_index_request(&config, request).await?;
    Ok(ExitCode::SUCCESS)
}

/// First Ctrl-C stops the run before the next migration; a second one exits.
fn cancel_on_interrupt() -> Arc<AtomicBool> {
    let flag = Arc::new(AtomicBool::new(false));
    let handle = flag.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        eprintln!(
            "{}",
            "Interrupted: stopping after the current migration (Ctrl-C again to abort)".yellow()
        );
        handle.store(true, Ordering::SeqCst);
        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });
    flag
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "esmigrate=debug,warn" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

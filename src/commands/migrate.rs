//! Migration commands

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use anyhow::{Context, Result};
use colored::*;
use tracing::error;

use crate::config::Config;
use crate::error::MigrateError;
use crate::migrations::{Migrator, create_migration, render_status_table};
use crate::store::EsClient;

/// Create a new migration file and print its absolute path.
pub fn create(directory: &Path, name: &str) -> Result<()> {
    let path = create_migration(directory, name)
        .with_context(|| format!("Failed to create migration in {}", directory.display()))?;
    let absolute = std::fs::canonicalize(&path).unwrap_or(path);
    println!("{} {}", "created".green(), absolute.display());
    Ok(())
}

/// Print the status table for one environment.
pub async fn migrate_status(
    config: &Config,
    directory: &Path,
    environment: Option<&str>,
) -> Result<()> {
    let environment = environment.unwrap_or(config.migrations.default_environment.as_str());

    let client = EsClient::connect(&config.store)
        .await
        .context("Failed to create store client")?;
    let migrator = Migrator::new(&client, config, environment);
    let reconciled = migrator.load(directory).await?;

    println!(
        "migrate: status for url '{}' environment '{}'",
        config.store.url.yellow(),
        environment.cyan()
    );
    print!("{}", render_status_table(&reconciled.migrations));
    Ok(())
}

/// Apply pending migrations, printing `OK` per migration or `FAIL` on the first error.
///
/// Errors tied to a migration are reported here and turn into a failure
/// exit code; anything else (discovery, state access) is returned.
pub async fn migrate_up(
    config: &Config,
    directory: &Path,
    environment: &str,
    cancel: Arc<AtomicBool>,
) -> Result<ExitCode> {
    let client = EsClient::connect(&config.store)
        .await
        .context("Failed to create store client")?;
    let migrator = Migrator::new(&client, config, environment).with_cancel(cancel);

    let result = migrator
        .up(directory, |m| println!("{}   {}", "OK".green(), m.name()))
        .await;

    match result {
        Ok(summary) => {
            if summary.applied.is_empty() {
                println!("{}", "No pending migrations.".dimmed());
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(MigrateError::Cancelled { path, .. }) => {
            eprintln!(
                "{} before {}; remaining migrations are still pending",
                "Cancelled".yellow(),
                short_name(&path)
            );
            Ok(ExitCode::from(130))
        }
        Err(e) => match e.migration().map(short_name) {
            Some(name) => {
                if matches!(e, MigrateError::Record { .. }) {
                    error!(migration = %name, "migration applied but not recorded");
                }
                eprintln!("{}  {} {}", "FAIL".red().bold(), name, e);
                Ok(ExitCode::FAILURE)
            }
            None => Err(e.into()),
        },
    }
}

fn short_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

//! Apply pending migrations.
//!
//! Migrations run strictly one at a time in version order. The first
//! failure stops the run; whatever was applied before it stays applied.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, SubsecRound, Utc};
use tracing::{debug, info, warn};

use super::{
    MigrationDescriptor, MigrationRecord, Reconciled, StateStore, discover, reconcile,
    render_migration,
};
use crate::config::Config;
use crate::error::MigrateError;
use crate::store::DocumentStore;

/// Outcome of a successful `up` run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpSummary {
    /// Migrations applied by this run, in order.
    pub applied: Vec<MigrationDescriptor>,
    /// Time recorded for every migration of this run; `None` if nothing was pending.
    pub when: Option<DateTime<Utc>>,
}

/// Runs migrations from a directory against one environment.
///
/// # Example
/// ```ignore
/// let client = EsClient::connect(&config.store).await?;
/// let migrator = Migrator::new(&client, &config, "staging");
/// let summary = migrator.up(Path::new("migrations"), |m| println!("OK {}", m.name())).await?;
/// ```
pub struct Migrator<'a, S> {
    store: &'a S,
    state: StateStore<'a, S>,
    environment: String,
    variables: BTreeMap<String, String>,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a, S: DocumentStore> Migrator<'a, S> {
    pub fn new(store: &'a S, config: &Config, environment: &str) -> Self {
        Self {
            store,
            state: StateStore::new(
                store,
                config.migrations.state_index.clone(),
                config.migrations.page_size,
            ),
            environment: environment.to_string(),
            variables: config.variables(environment),
            cancel: None,
        }
    }

    /// Stop before the next migration once `flag` is set.
    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Discover migrations and classify them against the recorded state.
    ///
    /// Read-only: never creates the state index.
    pub async fn load(&self, directory: &Path) -> Result<Reconciled, MigrateError> {
        let migrations = discover(directory)?;
        let applied = self.state.load_applied(&self.environment).await?;
        let reconciled = reconcile(migrations, &applied);
        debug!(
            env = %self.environment,
            total = reconciled.migrations.len(),
            pending = reconciled.pending,
            "reconciled migrations"
        );
        Ok(reconciled)
    }

    /// Apply every pending migration in order.
    ///
    /// `on_applied` is called after each migration is executed and recorded.
    pub async fn up<F>(&self, directory: &Path, on_applied: F) -> Result<UpSummary, MigrateError>
    where
        F: FnMut(&MigrationDescriptor),
    {
        let reconciled = self.load(directory).await?;
        self.apply(reconciled, on_applied).await
    }

    /// Apply the pending migrations of an already reconciled set.
    pub async fn apply<F>(
        &self,
        reconciled: Reconciled,
        mut on_applied: F,
    ) -> Result<UpSummary, MigrateError>
    where
        F: FnMut(&MigrationDescriptor),
    {
        if reconciled.is_up_to_date() {
            info!(env = %self.environment, "no pending migrations");
            return Ok(UpSummary {
                applied: Vec::new(),
                when: None,
            });
        }

        self.state.ensure_initialized().await?;

        let when = Utc::now().trunc_subsecs(3);
        let mut applied = Vec::new();

        for mut migration in reconciled.migrations {
            if !migration.is_pending() {
                continue;
            }

            if self.is_cancelled() {
                warn!(version = migration.version, "run cancelled");
                return Err(MigrateError::Cancelled {
                    path: migration.source,
                    version: migration.version,
                });
            }

            self.apply_one(&migration, when).await?;

            migration.applied_at = Some(when);
            on_applied(&migration);
            applied.push(migration);
        }

        Ok(UpSummary {
            applied,
            when: Some(when),
        })
    }

    async fn apply_one(
        &self,
        migration: &MigrationDescriptor,
        when: DateTime<Utc>,
    ) -> Result<(), MigrateError> {
        let op = render_migration(&migration.source, &self.variables)?;

        debug!(
            version = migration.version,
            method = %op.method,
            endpoint = %op.endpoint,
            "applying migration"
        );

        self.store
            .perform_request(op.method, &op.endpoint, op.body())
            .await
            .map_err(|source| MigrateError::Execution {
                path: migration.source.clone(),
                version: migration.version,
                source,
            })?;

        let record = MigrationRecord::new(when, migration.version, &self.environment);
        self.state
            .record_applied(&record)
            .await
            .map_err(|source| MigrateError::Record {
                path: migration.source.clone(),
                version: migration.version,
                source,
            })?;

        info!(
            version = migration.version,
            env = %self.environment,
            migration = %migration.name(),
            "applied migration"
        );
        Ok(())
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }
}

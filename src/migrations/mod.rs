//! Migration engine.
//!
//! Submodules:
//! - `discover`: find migration files and order them by version
//! - `state`: persisted record of applied versions per environment
//! - `template`: `{{.Var}}` template engine
//! - `file`: render a migration file into a concrete operation
//! - `reconcile`: merge discovered files with applied records
//! - `up`: apply pending migrations in order
//! - `status`: status table
//! - `create`: write a new migration file

pub mod create;
pub mod discover;
pub mod file;
pub mod reconcile;
pub mod state;
pub mod status;
pub mod template;
pub mod up;

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use create::create_migration;
pub use discover::discover;
pub use file::{MigrationFile, Operation, render_migration};
pub use reconcile::{Reconciled, reconcile};
pub use state::StateStore;
pub use status::render_status_table;
pub use up::{Migrator, UpSummary};

/// One discovered migration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationDescriptor {
    /// 14-digit timestamp prefix of the file name.
    pub version: i64,
    pub source: PathBuf,
    /// When the migration was recorded as applied; `None` while pending.
    pub applied_at: Option<DateTime<Utc>>,
}

impl MigrationDescriptor {
    pub fn new(version: i64, source: impl Into<PathBuf>) -> Self {
        Self {
            version,
            source: source.into(),
            applied_at: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.applied_at.is_none()
    }

    /// File name, for short messages.
    pub fn name(&self) -> String {
        self.source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.source.display().to_string())
    }
}

/// A persisted "version applied to environment" entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationRecord {
    pub when: DateTime<Utc>,
    pub version: i64,
    #[serde(default)]
    pub env: String,
}

impl MigrationRecord {
    pub fn new(when: DateTime<Utc>, version: i64, env: impl Into<String>) -> Self {
        Self {
            when,
            version,
            env: env.into(),
        }
    }

    /// Document id; one record per (env, version) pair.
    pub fn document_id(&self) -> String {
        format!("{}-{}", self.env, self.version)
    }
}

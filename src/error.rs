//! Error types for the migration engine.
//!
//! Each layer has its own enum; [`MigrateError`] is what the executor
//! surfaces and maps one-to-one onto the failure classes an operator
//! has to tell apart (discovery, state read/init, render, execution,
//! record).

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Failures while scanning a migrations directory.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The directory does not exist.
    #[error("migrations directory not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// The directory exists but could not be read.
    #[error("cannot read migrations directory {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// An entry below the directory could not be visited.
    #[error("failed to walk migrations directory: {0}")]
    Walk(#[from] walkdir::Error),

    /// Two files carry the same 14-digit version.
    #[error(
        "duplicate migration version {version}: {} and {}",
        first.display(),
        second.display()
    )]
    DuplicateVersion {
        version: i64,
        first: PathBuf,
        second: PathBuf,
    },
}

/// Failures talking to the document store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Transport-level failure (connect, timeout, TLS, ...).
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The store answered with a non-success status.
    #[error("store returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body was not what the client expected.
    #[error("unexpected response: {0}")]
    Decode(String),

    /// The configured URL or a request endpoint is malformed.
    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

impl StoreError {
    /// HTTP status code, when the store answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            StoreError::Status { status, .. } => Some(*status),
            StoreError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Template parse and render failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// The template text is malformed.
    #[error("template syntax error at line {line}: {message}")]
    Syntax { line: usize, message: String },

    /// A `{{.Name}}` action refers to a variable nobody supplied.
    #[error("line {line}: no value for variable \"{name}\"")]
    MissingVariable { line: usize, name: String },
}

/// Failure to turn a migration file into a concrete operation.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("{}: cannot read migration: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}: {source}", path.display())]
    Template {
        path: PathBuf,
        #[source]
        source: TemplateError,
    },

    /// The rendered text is not a valid migration document.
    #[error("{}: invalid migration document: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl RenderError {
    /// Migration file the error belongs to.
    pub fn path(&self) -> &Path {
        match self {
            RenderError::Read { path, .. }
            | RenderError::Template { path, .. }
            | RenderError::Json { path, .. } => path,
        }
    }
}

/// Configuration loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Errors surfaced by the migration executor.
#[derive(Debug, Error)]
pub enum MigrateError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error("failed to read migration state: {0}")]
    StateRead(StoreError),

    #[error("failed to initialize migration state index: {0}")]
    StateInit(StoreError),

    #[error(transparent)]
    Render(#[from] RenderError),

    /// The store rejected the rendered operation.
    #[error("{}: operation failed: {source}", path.display())]
    Execution {
        path: PathBuf,
        version: i64,
        #[source]
        source: StoreError,
    },

    /// The operation took effect but could not be recorded as applied.
    #[error(
        "{}: operation was applied but recording version {version} failed \
         (re-running will execute it again): {source}",
        path.display()
    )]
    Record {
        path: PathBuf,
        version: i64,
        #[source]
        source: StoreError,
    },

    #[error("cancelled before applying {}", path.display())]
    Cancelled { path: PathBuf, version: i64 },
}

impl MigrateError {
    /// Migration file this error is attributed to, if any.
    pub fn migration(&self) -> Option<&Path> {
        match self {
            MigrateError::Render(e) => Some(e.path()),
            MigrateError::Execution { path, .. }
            | MigrateError::Record { path, .. }
            | MigrateError::Cancelled { path, .. } => Some(path),
            MigrateError::Discovery(_) | MigrateError::StateRead(_) | MigrateError::StateInit(_) => {
                None
            }
        }
    }
}

//! # esmigrate
//!
//! Versioned migrations for Elasticsearch. Each migration is a JSON file
//! named `<YYYYMMDDhhmmss>_<name>.json` holding one templated request;
//! applied versions are recorded per environment in a state index so each
//! migration runs at most once per environment.
//!
//! ```ignore
//! use esmigrate::{Config, EsClient, Migrator};
//!
//! let config = Config::load(None)?;
//! let client = EsClient::connect(&config.store).await?;
//! let migrator = Migrator::new(&client, &config, "dev");
//! migrator.up(Path::new("migrations"), |m| println!("OK {}", m.name())).await?;
//! ```

pub mod commands;
pub mod config;
pub mod error;
pub mod indices;
pub mod migrations;
pub mod store;

pub use config::Config;
pub use error::{MigrateError, StoreError};
pub use migrations::{MigrationDescriptor, MigrationRecord, Migrator};
pub use store::{DocumentStore, EsClient, Method};

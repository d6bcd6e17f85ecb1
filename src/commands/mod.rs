//! Command bodies for the `es` binary.
//!
//! - `migrate`: create-migration, migrate-status, migrate-up
//! - `indices`: count, flush, refresh, settings, stats, mapping

mod indices;
mod migrate;

pub use indices::run_index_request;
pub use migrate::{create, migrate_status, migrate_up};

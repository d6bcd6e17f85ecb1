//! Reconciliation of discovered files with applied records.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::warn;

use super::MigrationDescriptor;

/// Descriptors classified as applied or pending, in version order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    pub migrations: Vec<MigrationDescriptor>,
    pub pending: usize,
}

impl Reconciled {
    pub fn is_up_to_date(&self) -> bool {
        self.pending == 0
    }
}

/// Mark each descriptor applied (with its recorded time) or pending.
///
/// Records whose version has no file are ignored.
pub fn reconcile(
    mut migrations: Vec<MigrationDescriptor>,
    applied: &HashMap<i64, DateTime<Utc>>,
) -> Reconciled {
    for m in &mut migrations {
        m.applied_at = applied.get(&m.version).copied();
    }

    for version in applied.keys() {
        if !migrations.iter().any(|m| m.version == *version) {
            warn!(version, "applied migration has no matching file");
        }
    }

    let pending = migrations.iter().filter(|m| m.is_pending()).count();
    Reconciled {
        migrations,
        pending,
    }
}

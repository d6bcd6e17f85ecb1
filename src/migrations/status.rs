//! Migration status table.

use super::MigrationDescriptor;

/// `time.ANSIC`-style layout, e.g. `Mon Jan  2 15:04:05 2006`.
const APPLIED_AT_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

/// Render one row per migration: applied time (or `Pending`) and source.
///
/// Applied times are shown in UTC, whatever offset the record was written with.
pub fn render_status_table(migrations: &[MigrationDescriptor]) -> String {
    let mut out = String::new();
    out.push_str("    Applied At                  Migration\n");
    out.push_str("    =======================================\n");

    for m in migrations {
        let applied_at = match m.applied_at {
            Some(when) => when.format(APPLIED_AT_FORMAT).to_string(),
            None => "Pending".to_string(),
        };
        out.push_str(&format!("    {:<24} -- {}\n", applied_at, m.source.display()));
    }
    out
}

//! New migration files.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, TimeZone};

use super::discover::is_valid_name;

/// Starting content of a new migration.
pub const MIGRATION_TEMPLATE: &str = r#"{
  "up": {
    "endpoint": "/{{.Env}}_index/_settings",
    "method": "PUT",
    "payload": {}
  }
}
"#;

/// Write `<directory>/<YYYYMMDDhhmmss>_<name>.json`, creating the directory if needed.
pub fn create_migration(directory: &Path, name: &str) -> io::Result<PathBuf> {
    create_migration_at(directory, name, Local::now())
}

/// Same as [`create_migration`] with an explicit timestamp.
pub fn create_migration_at<Tz: TimeZone>(
    directory: &Path,
    name: &str,
    now: DateTime<Tz>,
) -> io::Result<PathBuf>
where
    Tz::Offset: std::fmt::Display,
{
    if !is_valid_name(name) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "invalid migration name \"{}\": use lowercase letters, digits and underscores",
                name
            ),
        ));
    }

    fs::create_dir_all(directory)?;

    let filename = format!("{}_{}.json", now.format("%Y%m%d%H%M%S"), name);
    let path = directory.join(filename);

    let mut file = OpenOptions::new().write(true).create_new(true).open(&path)?;
    file.write_all(MIGRATION_TEMPLATE.as_bytes())?;

    Ok(path)
}

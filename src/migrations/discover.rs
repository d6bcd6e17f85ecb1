//! Migration file discovery.
//!
//! A migration is any file, at any depth below the directory, named
//! `<14 digits>_<lowercase name>.json`. Everything else is skipped.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;
use walkdir::WalkDir;

use super::MigrationDescriptor;
use crate::error::DiscoveryError;

fn file_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // `[0-9]`, not `\d`: the regex crate's `\d` matches any Unicode digit.
    PATTERN.get_or_init(|| Regex::new(r"^([0-9]{14})_[a-z0-9_]+\.json$").expect("valid pattern"))
}

/// Version encoded in a migration file name, if the name matches.
pub fn parse_version(file_name: &str) -> Option<i64> {
    let caps = file_pattern().captures(file_name)?;
    caps[1].parse().ok()
}

/// Whether `name` can be used as the descriptive part of a file name.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
}

/// Walk `directory` and return its migrations in ascending version order.
///
/// A missing directory is an error; a directory without migrations is not.
/// Two files with the same version are rejected.
pub fn discover(directory: &Path) -> Result<Vec<MigrationDescriptor>, DiscoveryError> {
    match directory.metadata() {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => {
            return Err(DiscoveryError::Io {
                path: directory.to_path_buf(),
                source: io::Error::new(io::ErrorKind::InvalidInput, "not a directory"),
            });
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(DiscoveryError::NotFound {
                path: directory.to_path_buf(),
            });
        }
        Err(source) => {
            return Err(DiscoveryError::Io {
                path: directory.to_path_buf(),
                source,
            });
        }
    }

    let mut found = Vec::new();
    for entry in migration_files(directory) {
        let (version, path) = entry?;
        debug!(version, path = %path.display(), "found migration");
        found.push(MigrationDescriptor::new(version, path));
    }

    found.sort_by_key(|m| m.version);

    if let Some(pair) = found.windows(2).find(|w| w[0].version == w[1].version) {
        return Err(DiscoveryError::DuplicateVersion {
            version: pair[0].version,
            first: pair[0].source.clone(),
            second: pair[1].source.clone(),
        });
    }

    Ok(found)
}

/// Lazily yield `(version, path)` for each matching file below `directory`.
fn migration_files(
    directory: &Path,
) -> impl Iterator<Item = Result<(i64, PathBuf), DiscoveryError>> {
    WalkDir::new(directory)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => {
                if !entry.file_type().is_file() {
                    return None;
                }
                let version = parse_version(entry.file_name().to_str()?)?;
                Some(Ok((version, entry.into_path())))
            }
            Err(e) => Some(Err(DiscoveryError::from(e))),
        })
}

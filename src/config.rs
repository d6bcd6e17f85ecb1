//! Configuration.
//!
//! Layered: built-in defaults, then an optional TOML file, then the
//! `ES_URL` / `ES_SNIFF` overrides the caller passes in. Nothing here
//! reads the process environment; the binary does that through clap.
//!
//! ```toml
//! [store]
//! url = "http://es.internal:9200"
//! sniff = false
//!
//! [migrations]
//! state_index = ".es-migrate"
//!
//! [environments.prod.vars]
//! Shards = "5"
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

/// File name looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "es-migrate.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub migrations: MigrationsConfig,
    pub environments: BTreeMap<String, EnvironmentConfig>,
}

/// Connection settings for the target store.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub url: String,
    pub sniff: bool,
    pub timeout_secs: u64,
    /// Keep-alive passed to the scroll API, e.g. `1m`.
    pub scroll_keep_alive: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:9200".to_string(),
            sniff: false,
            timeout_secs: 30,
            scroll_keep_alive: "1m".to_string(),
        }
    }
}

/// Where and how migration state is kept.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MigrationsConfig {
    pub state_index: String,
    pub page_size: usize,
    /// Environment used when none is given on the command line.
    pub default_environment: String,
}

impl Default for MigrationsConfig {
    fn default() -> Self {
        Self {
            state_index: ".es-migrate".to_string(),
            page_size: 100,
            default_environment: "default".to_string(),
        }
    }
}

/// Per-environment settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Extra template variables.
    pub vars: BTreeMap<String, String>,
}

impl Config {
    /// Load configuration.
    ///
    /// An explicit `path` must exist. Without one, `./es-migrate.toml`
    /// and then `<config dir>/es-migrate/config.toml` are tried; if
    /// neither exists the defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::from_file(p),
            None => match default_config_paths().into_iter().find(|p| p.is_file()) {
                Some(p) => Self::from_file(&p),
                None => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Apply `ES_URL` / `ES_SNIFF` style overrides.
    pub fn with_overrides(mut self, url: Option<&str>, sniff: Option<&str>) -> Self {
        if let Some(url) = url.filter(|u| !u.is_empty()) {
            self.store.url = url.trim_end_matches('/').to_string();
        }
        if let Some(sniff) = sniff.filter(|s| !s.is_empty()) {
            self.store.sniff = sniff == "true";
        }
        self
    }

    /// Template variables for an environment. `Env` is always the
    /// environment name.
    pub fn variables(&self, environment: &str) -> BTreeMap<String, String> {
        let mut vars = self
            .environments
            .get(environment)
            .map(|e| e.vars.clone())
            .unwrap_or_default();
        vars.insert("Env".to_string(), environment.to_string());
        vars
    }
}

fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("es-migrate").join("config.toml"));
    }
    paths
}

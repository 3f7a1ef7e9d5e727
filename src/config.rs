// ABOUTME: Dump configuration assembled from defaults, environment, and TOML
// ABOUTME: Replaces ad-hoc environment reads with one explicit DumpConfig

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::PathBuf;

/// Default chunk size for paginated row fetches
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Largest accepted chunk size; one chunk is held in memory at a time
pub const MAX_CHUNK_SIZE: usize = 1_000_000;

/// Fallback values used when neither the environment nor a config file sets a key.
///
/// Each entry is `(environment variable, default value)`.
pub const DEFAULTS: &[(&str, &str)] = &[
    ("DB_HOST", "mysql"),
    ("DB_PORT", "3306"),
    ("DB_DATABASE", "laravel"),
    ("DB_USERNAME", "laravel"),
    ("DB_PASSWORD", "secret"),
    ("BACKUP_DIR", "/var/www/backups"),
    ("CHUNK_SIZE", "1000"),
];

/// Everything a dump run needs, passed into the dumper at construction
#[derive(Clone)]
pub struct DumpConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    pub backup_dir: PathBuf,
    pub chunk_size: usize,
    /// Hold one REPEATABLE READ transaction open for the whole run
    pub consistent_snapshot: bool,
    /// Order paginated fetches by primary key when the table has one
    pub order_by_primary_key: bool,
    pub include_tables: Option<Vec<String>>,
    pub exclude_tables: Option<Vec<String>>,
}

impl fmt::Debug for DumpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DumpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"***")
            .field("backup_dir", &self.backup_dir)
            .field("chunk_size", &self.chunk_size)
            .field("consistent_snapshot", &self.consistent_snapshot)
            .field("order_by_primary_key", &self.order_by_primary_key)
            .field("include_tables", &self.include_tables)
            .field("exclude_tables", &self.exclude_tables)
            .finish()
    }
}

/// Optional overrides read from a TOML file
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    host: Option<String>,
    port: Option<u16>,
    database: Option<String>,
    username: Option<String>,
    password: Option<String>,
    backup_dir: Option<PathBuf>,
    chunk_size: Option<usize>,
    consistent_snapshot: Option<bool>,
    order_by_primary_key: Option<bool>,
    include_tables: Option<Vec<String>>,
    exclude_tables: Option<Vec<String>>,
}

fn default_for(key: &str) -> &'static str {
    DEFAULTS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| *v)
        .unwrap_or_default()
}

impl DumpConfig {
    /// Build a config from the process environment, falling back to [`DEFAULTS`]
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup
    ///
    /// Unset or empty values fall back to [`DEFAULTS`]. Only parse errors are
    /// reported here; range checks run once on the final config in
    /// [`DumpConfig::validate`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| -> String {
            lookup(key)
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default_for(key).to_string())
        };

        let port_raw = get("DB_PORT");
        let port: u16 = port_raw
            .parse()
            .with_context(|| format!("Invalid DB_PORT '{}'", port_raw))?;

        let chunk_raw = get("CHUNK_SIZE");
        let chunk_size: usize = chunk_raw
            .parse()
            .with_context(|| format!("Invalid CHUNK_SIZE '{}'", chunk_raw))?;

        Ok(Self {
            host: get("DB_HOST"),
            port,
            database: get("DB_DATABASE"),
            username: get("DB_USERNAME"),
            password: get("DB_PASSWORD"),
            backup_dir: PathBuf::from(get("BACKUP_DIR")),
            chunk_size,
            consistent_snapshot: true,
            order_by_primary_key: true,
            include_tables: None,
            exclude_tables: None,
        })
    }

    /// Apply overrides from a TOML file on top of this config
    pub fn merge_file(mut self, path: &str) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at {}", path))?;
        let file: ConfigFile = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse TOML config at {}", path))?;

        if let Some(host) = file.host {
            self.host = host;
        }
        if let Some(port) = file.port {
            self.port = port;
        }
        if let Some(database) = file.database {
            self.database = database;
        }
        if let Some(username) = file.username {
            self.username = username;
        }
        if let Some(password) = file.password {
            self.password = password;
        }
        if let Some(backup_dir) = file.backup_dir {
            self.backup_dir = backup_dir;
        }
        if let Some(chunk_size) = file.chunk_size {
            self.chunk_size = chunk_size;
        }
        if let Some(snapshot) = file.consistent_snapshot {
            self.consistent_snapshot = snapshot;
        }
        if let Some(ordered) = file.order_by_primary_key {
            self.order_by_primary_key = ordered;
        }
        if file.include_tables.is_some() {
            self.include_tables = file.include_tables;
        }
        if file.exclude_tables.is_some() {
            self.exclude_tables = file.exclude_tables;
        }

        Ok(self)
    }

    /// Check the fully layered config before a run
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            bail!("Database host cannot be empty");
        }
        if self.database.trim().is_empty() {
            bail!("Database name cannot be empty");
        }
        if self.chunk_size == 0 {
            bail!("Chunk size must be at least 1");
        }
        if self.chunk_size > MAX_CHUNK_SIZE {
            bail!(
                "Chunk size {} exceeds the maximum of {}",
                self.chunk_size,
                MAX_CHUNK_SIZE
            );
        }
        Ok(())
    }
}

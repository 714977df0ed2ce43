//! Settings for the `pdsql` command line tool.
//!
//! Read from `pdsql/config.toml` under the platform config directory:
//!
//! ```toml
//! database_url = "sqlite://census.db"
//! format = "json"
//! log = "pdsql=debug"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{PdsqlError, PdsqlResult};

/// How result rows are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Connection URL handed to [`SqlxDriver`](crate::engine::SqlxDriver).
    pub database_url: Option<String>,
    pub format: OutputFormat,
    /// `tracing` filter directive, e.g. `pdsql=debug`.
    pub log: Option<String>,
}

impl Config {
    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> PdsqlResult<Self> {
        toml::from_str(content).map_err(|e| PdsqlError::Config(e.to_string()))
    }

    /// Load configuration from a file.
    pub fn load(path: &Path) -> PdsqlResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load from `path`, or from [`Config::default_path`] if none is given.
    ///
    /// A missing default file yields the default configuration; a missing
    /// explicit file is an error.
    pub fn discover(path: Option<&Path>) -> PdsqlResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::load(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    /// `<config dir>/pdsql/config.toml`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("pdsql").join("config.toml"))
    }
}

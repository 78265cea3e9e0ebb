//! Configuration handling for schema_vc
//!
//! ```toml
//! [database]
//! driver = "mysql"
//! url = "mysql://root@localhost/app"
//!
//! [schema]
//! file = "config/schema.yml"
//! detect_renames = false
//!
//! [apply]
//! strict = false
//!
//! [logging]
//! level = "info"
//! format = "text"
//! stdout = true
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::schema::diff::CompareOptions;

/// Load configuration from a TOML file
pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    let config_str = fs::read_to_string(path).map_err(|e| {
        Error::ConfigError(format!("Failed to read config file {}: {}", path.display(), e))
    })?;

    config_str.parse()
}

/// Represents the complete schema_vc configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub schema: SchemaConfig,
    #[serde(default)]
    pub apply: ApplyConfig,
    pub logging: Option<LoggingConfig>,
}

impl std::str::FromStr for Config {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }
}

/// Database connection configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// One of `mysql`, `postgres`, `sqlite`
    pub driver: String,
    pub url: String,
    pub pool_size: Option<u32>,
    pub timeout_seconds: Option<u64>,
    /// PostgreSQL schema or MySQL database to introspect
    pub schema: Option<String>,
}

/// Declarative schema file settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SchemaConfig {
    #[serde(default = "default_schema_file")]
    pub file: PathBuf,
    /// Report unambiguous drop/add pairs of identical columns and indexes as renames
    #[serde(default)]
    pub detect_renames: bool,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            file: default_schema_file(),
            detect_renames: false,
        }
    }
}

impl SchemaConfig {
    pub fn compare_options(&self) -> CompareOptions {
        CompareOptions {
            detect_renames: self.detect_renames,
        }
    }
}

fn default_schema_file() -> PathBuf {
    PathBuf::from("config/schema.yml")
}

/// Defaults for the `apply` command
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ApplyConfig {
    /// Also enforce the declared column order
    #[serde(default)]
    pub strict: bool,
    /// Skip the confirmation prompt
    #[serde(default)]
    pub assume_yes: bool,
}

/// Logging configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    pub file: Option<String>,
    /// `text` or `json`
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub stdout: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

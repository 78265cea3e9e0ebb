//! Logging utilities for schema_vc
//!
//! This module provides logging setup and configuration.

use std::fs::File;
use std::path::Path;
use std::sync::Mutex;

use tracing::Level;
use tracing_subscriber::{fmt, fmt::MakeWriter, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::{Error, Result};

/// Initialize logging based on configuration.
///
/// Without a `[logging]` section nothing is installed. Events go to the configured
/// file, else to stdout when `stdout` is set, else to stderr so that command output
/// stays clean.
pub fn init_logging(config: Option<&LoggingConfig>) -> Result<()> {
    let Some(config) = config else {
        return Ok(());
    };

    let filter = env_filter(&config.level)?;
    let json = config.format.eq_ignore_ascii_case("json");

    if let Some(file_path) = &config.file {
        if let Some(parent) = Path::new(file_path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(file_path)?;
        install(json, filter, Mutex::new(file))
    } else if config.stdout {
        install(json, filter, std::io::stdout)
    } else {
        install(json, filter, std::io::stderr)
    }
}

/// `RUST_LOG` directives plus the configured level for this crate
fn env_filter(level: &str) -> Result<EnvFilter> {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let directive = format!("schema_vc={}", level)
        .parse()
        .map_err(|e| Error::ConfigError(format!("Invalid log level: {}", e)))?;
    Ok(EnvFilter::from_default_env().add_directive(directive))
}

fn install<W>(json: bool, filter: EnvFilter, writer: W) -> Result<()>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let builder = fmt::Subscriber::builder().with_env_filter(filter).with_writer(writer);
    let result = if json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    result.map_err(|e| Error::ConfigError(format!("Failed to initialise logging: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_levels_fall_back_to_info() {
        let filter = env_filter("verbose").unwrap();
        assert!(filter.to_string().to_lowercase().contains("schema_vc=info"));
    }

    #[test]
    fn missing_section_installs_nothing() {
        assert!(init_logging(None).is_ok());
    }
}

//! Database connection handling
//!
//! This module provides functionality to establish database connection pools.

use std::time::Duration;

use sqlx::{
    mysql::MySqlPoolOptions, postgres::PgPoolOptions, sqlite::SqlitePoolOptions, Executor, MySql, Pool, Postgres,
    Sqlite,
};
use tracing::info;

use crate::config::DatabaseConfig;
use crate::error::{Error, Result};

/// Enumeration of supported database types
#[derive(Debug, Clone)]
pub enum DatabaseConnection {
    Postgres(Pool<Postgres>),
    MySql(Pool<MySql>),
    Sqlite(Pool<Sqlite>),
}

impl DatabaseConnection {
    /// Create a new database connection from configuration
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool_size = config.pool_size.unwrap_or(5);
        let timeout = Duration::from_secs(config.timeout_seconds.unwrap_or(30));

        let connection = match config.driver.as_str() {
            "postgres" => DatabaseConnection::Postgres(
                PgPoolOptions::new()
                    .max_connections(pool_size)
                    .acquire_timeout(timeout)
                    .connect(&config.url)
                    .await?,
            ),
            "mysql" => DatabaseConnection::MySql(
                MySqlPoolOptions::new()
                    .max_connections(pool_size)
                    .acquire_timeout(timeout)
                    .connect(&config.url)
                    .await?,
            ),
            "sqlite" => DatabaseConnection::Sqlite(
                SqlitePoolOptions::new()
                    .max_connections(pool_size)
                    .acquire_timeout(timeout)
                    .connect(&config.url)
                    .await?,
            ),
            _ => {
                return Err(Error::ConfigError(format!(
                    "Unsupported database driver: {}",
                    config.driver
                )))
            }
        };

        info!(driver = connection.driver(), "Connected to database");
        Ok(connection)
    }

    /// Driver name, matching the configuration value
    pub fn driver(&self) -> &'static str {
        match self {
            DatabaseConnection::Postgres(_) => "postgres",
            DatabaseConnection::MySql(_) => "mysql",
            DatabaseConnection::Sqlite(_) => "sqlite",
        }
    }

    /// Execute a single SQL statement as plain text, without preparing it
    pub async fn execute(&self, sql: &str) -> Result<()> {
        match self {
            DatabaseConnection::Postgres(pool) => {
                pool.execute(sql).await?;
            }
            DatabaseConnection::MySql(pool) => {
                pool.execute(sql).await?;
            }
            DatabaseConnection::Sqlite(pool) => {
                pool.execute(sql).await?;
            }
        }
        Ok(())
    }
}

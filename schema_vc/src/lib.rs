//! schema_vc: database schema version control
//!
//! The desired schema of a database lives in a versioned YAML file. schema_vc
//! compares it with the live schema, reports the differences and generates (and
//! optionally applies) the DDL statements reconciling the two.
//!
//! The engine itself ([`schema::diff`], [`schema::generator`], [`schema::reorder`])
//! works on in-memory [`Schema`] snapshots and performs no I/O. The live database
//! is reached through the [`Introspector`] and [`StatementExecutor`] traits.

pub mod config;
pub mod db;
pub mod error;
pub mod report;
pub mod schema;
pub mod service;
pub mod utils;


// Re-export main types for easier access
pub use config::Config;
pub use db::{DatabaseConnection, StatementExecutor};
pub use error::{Error, Result};
pub use schema::analyzer::{Introspector, SchemaAnalyzer};
pub use schema::diff::{CompareOptions, SchemaDiff, TableDiff};
pub use schema::generator::MigrationGenerator;
pub use schema::types::Schema;
pub use service::SchemaVersionControl;

/// Connect to the database described by the configuration file
pub async fn init(config_path: &str) -> Result<SchemaVersionControl> {
    let config = config::load_from_file(config_path)?;
    SchemaVersionControl::connect(&config).await
}

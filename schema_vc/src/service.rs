//! Schema version control service
//!
//! Composes the schema file, the live database and the migration engine. The
//! desired schema is always read from the file first, so a broken file is
//! reported before the database is touched.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::Config;
use crate::db::{execute_batch, DatabaseConnection, StatementExecutor};
use crate::error::{Error, Result};
use crate::schema::analyzer::{Introspector, SchemaAnalyzer};
use crate::schema::dialect::{dialect_for_driver, Dialect};
use crate::schema::diff::{CompareOptions, SchemaDiff};
use crate::schema::generator::MigrationGenerator;
use crate::schema::types::Schema;
use crate::schema::{file, reorder};

/// The main client for keeping a database in line with its schema file
pub struct SchemaVersionControl {
    introspector: Box<dyn Introspector>,
    executor: Box<dyn StatementExecutor>,
    dialect: Box<dyn Dialect>,
    schema_file: PathBuf,
    options: CompareOptions,
}

impl SchemaVersionControl {
    pub fn new(
        introspector: Box<dyn Introspector>,
        executor: Box<dyn StatementExecutor>,
        dialect: Box<dyn Dialect>,
        schema_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            introspector,
            executor,
            dialect,
            schema_file: schema_file.into(),
            options: CompareOptions::default(),
        }
    }

    pub fn with_compare_options(mut self, options: CompareOptions) -> Self {
        self.options = options;
        self
    }

    /// Connect to the configured database
    pub async fn connect(config: &Config) -> Result<Self> {
        // Validate the driver before opening a pool
        let dialect = dialect_for_driver(&config.database.driver)?;
        let connection = DatabaseConnection::connect(&config.database).await?;
        let analyzer = SchemaAnalyzer::new(connection.clone(), config.database.schema.clone());

        Ok(Self::new(Box::new(analyzer), Box::new(connection), dialect, config.schema.file.clone())
            .with_compare_options(config.schema.compare_options()))
    }

    pub fn schema_file(&self) -> &Path {
        &self.schema_file
    }

    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    /// Introspect the live database schema
    pub async fn current_schema(&self) -> Result<Schema> {
        self.introspector.introspect().await.map_err(|e| match e {
            Error::IntrospectionError(_) => e,
            other => Error::introspection(other),
        })
    }

    /// Load the desired schema. A missing or empty file is an empty schema.
    pub fn load_schema_file(&self) -> Result<Schema> {
        file::load_file(&self.schema_file)
    }

    /// The file's schema as the database will hold it once applied
    fn desired_schema(&self) -> Result<Schema> {
        let mut desired = self.load_schema_file()?;
        if self.dialect.creates_foreign_key_indexes() {
            for table in desired.tables.values_mut() {
                table.add_foreign_key_indexes();
            }
        }
        Ok(desired)
    }

    /// Differences from the live schema to the file, or from the file to the live
    /// schema when `reverse` is set
    pub async fn schema_diff(&self, reverse: bool) -> Result<SchemaDiff> {
        let desired = self.desired_schema()?;
        let current = self.current_schema().await?;

        let diff = if reverse {
            SchemaDiff::compare(&desired, &current, &self.options)
        } else {
            SchemaDiff::compare(&current, &desired, &self.options)
        };
        debug!(
            changed = diff.changed_tables.len(),
            new = diff.new_tables.len(),
            removed = diff.removed_tables.len(),
            reverse,
            "Compared schemas"
        );
        Ok(diff)
    }

    /// Statements bringing the live schema to the file's schema
    pub async fn migration_sql(&self) -> Result<Vec<String>> {
        let diff = self.schema_diff(false).await?;
        MigrationGenerator::new(self.dialect()).generate_migration_sql(&diff)
    }

    /// Statements aligning the column order of every table present in both schemas
    pub async fn reorder_sql(&self) -> Result<Vec<String>> {
        let desired = self.desired_schema()?;
        let current = self.current_schema().await?;
        self.plan_reorders(&current, &desired)
    }

    fn plan_reorders(&self, current: &Schema, desired: &Schema) -> Result<Vec<String>> {
        let mut statements = Vec::new();
        for table in current.tables.values() {
            let Some(wanted) = desired.table(&table.name) else {
                continue;
            };
            let order: Vec<&str> = wanted.column_names().collect();
            if let Some(sql) = reorder::reorder_sql(self.dialect(), table, &order)? {
                debug!(table = %table.name, "Planned column reorder");
                statements.push(sql);
            }
        }
        Ok(statements)
    }

    /// Apply the file's schema to the database and return every executed statement.
    /// An empty list means the database was already up to date.
    ///
    /// In `strict` mode the live schema is read again afterwards and the column
    /// order is enforced as well.
    pub async fn apply_schema(&self, strict: bool) -> Result<Vec<String>> {
        if strict && !self.dialect.supports_column_positioning() {
            return Err(Error::MigrationError(format!(
                "{} cannot reorder columns; strict mode is not available",
                self.dialect.name()
            )));
        }

        let mut executed = self.migration_sql().await?;
        execute_batch(self.executor.as_ref(), &executed).await?;

        if strict {
            let reorders = self.reorder_sql().await?;
            let offset = executed.len();
            execute_batch(self.executor.as_ref(), &reorders)
                .await
                .map_err(|e| match e {
                    Error::ExecutionError {
                        statement,
                        executed: done,
                        source,
                    } => Error::ExecutionError {
                        statement,
                        executed: offset + done,
                        source,
                    },
                    other => other,
                })?;
            executed.extend(reorders);
        }

        info!(count = executed.len(), strict, "Schema applied");
        Ok(executed)
    }

    /// Write the live schema to the schema file, creating its directory if needed
    pub async fn dump_schema(&self) -> Result<Schema> {
        let current = self.current_schema().await?;
        file::write_file(&self.schema_file, &current)?;
        info!(
            path = %self.schema_file.display(),
            tables = current.tables.len(),
            "Dumped live schema"
        );
        Ok(current)
    }
}

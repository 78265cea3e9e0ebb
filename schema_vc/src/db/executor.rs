//! SQL executor
//!
//! Statements run one at a time, in order, and the first failure stops the batch.
//! Nothing is wrapped in a transaction: most databases commit DDL implicitly, so
//! a failed batch leaves the statements before it applied.

use async_trait::async_trait;
use tracing::{debug, error, info};

use crate::db::connection::DatabaseConnection;
use crate::error::{Error, Result};

/// Sink for DDL statements
#[async_trait]
pub trait StatementExecutor: Send + Sync {
    /// Execute a single SQL statement
    async fn execute(&self, sql: &str) -> Result<()>;
}

#[async_trait]
impl StatementExecutor for DatabaseConnection {
    async fn execute(&self, sql: &str) -> Result<()> {
        DatabaseConnection::execute(self, sql).await
    }
}

/// Execute statements in order, stopping at the first failure.
///
/// The error is an [`Error::ExecutionError`] naming the failing statement and the
/// number of statements of this batch that succeeded before it.
pub async fn execute_batch(executor: &dyn StatementExecutor, statements: &[String]) -> Result<()> {
    for (executed, statement) in statements.iter().enumerate() {
        debug!(statement = %statement, "Executing statement");
        if let Err(source) = executor.execute(statement).await {
            error!(statement = %statement, executed, "Statement failed");
            return Err(Error::ExecutionError {
                statement: statement.clone(),
                executed,
                source: Box::new(source),
            });
        }
    }

    if !statements.is_empty() {
        info!(count = statements.len(), "Executed statements");
    }
    Ok(())
}

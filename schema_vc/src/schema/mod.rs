//! Schema module for schema_vc
//!
//! This module holds the schema model, its comparison and the generation of
//! migration statements, plus the readers and writers of schema snapshots.

pub mod analyzer;
pub mod dialect;
pub mod diff;
pub mod file;
pub mod generator;
pub mod reorder;
pub mod types;

// Re-export key types
pub use dialect::{dialect_for_driver, Dialect, MySqlDialect, PostgresDialect, SqliteDialect};
pub use diff::{compare, ColumnChange, CompareOptions, SchemaDiff, TableDiff};
pub use generator::{to_sql, MigrationGenerator};
pub use reorder::{plan_reorder, reorder_sql, ColumnMove};
pub use types::{Column, ColumnProperty, ColumnType, ForeignKey, Index, Schema, Table, TypeKind};

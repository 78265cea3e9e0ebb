//! SQL dialects
//!
//! A [`Dialect`] knows how to render types, defaults, column declarations and
//! constraint clauses for one database, and how that database shapes DDL
//! statements. The migration generator only decides *which* statements to emit
//! and in what order; everything textual is delegated here.

use crate::error::{Error, Result};
use crate::schema::diff::{ColumnChange, TableDiff};
use crate::schema::types::{Column, ColumnProperty, ColumnType, ForeignKey, Index, Table, TypeKind};

/// Rendering rules for one SQL dialect
pub trait Dialect: Send + Sync {
    /// Driver name, as used in configuration
    fn name(&self) -> &'static str;

    fn quote_identifier(&self, name: &str) -> String;

    /// Render a column type, e.g. `VARCHAR(255)`
    fn column_type_sql(&self, column_type: &ColumnType) -> String;

    /// Render the column definition without the name
    fn column_definition_sql(&self, column: &Column) -> String;

    /// Whether `MODIFY ... FIRST | AFTER` is available
    fn supports_column_positioning(&self) -> bool {
        false
    }

    /// Whether the database creates an index for a foreign key no index covers
    fn creates_foreign_key_indexes(&self) -> bool {
        false
    }

    /// Whether foreign keys can be added or dropped on existing tables
    fn supports_foreign_key_alteration(&self) -> bool {
        true
    }

    /// Render a default value clause
    fn default_sql(&self, column: &Column) -> Option<String> {
        column
            .default
            .as_deref()
            .map(|value| format!("DEFAULT {}", quote_default(value)))
    }

    /// Render `<name> <definition>`
    fn column_declaration_sql(&self, column: &Column) -> String {
        format!(
            "{} {}",
            self.quote_identifier(&column.name),
            self.column_definition_sql(column)
        )
    }

    /// Render a `CONSTRAINT ... FOREIGN KEY ... REFERENCES ...` clause
    fn foreign_key_constraint_sql(&self, fk: &ForeignKey) -> String {
        let mut sql = format!(
            "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
            self.quote_identifier(&fk.name),
            self.quote_list(&fk.columns),
            self.quote_identifier(&fk.ref_table),
            self.quote_list(&fk.ref_columns)
        );
        if let Some(action) = &fk.on_delete {
            sql.push_str(&format!(" ON DELETE {}", action));
        }
        if let Some(action) = &fk.on_update {
            sql.push_str(&format!(" ON UPDATE {}", action));
        }
        sql
    }

    fn quote_list(&self, names: &[String]) -> String {
        names
            .iter()
            .map(|name| self.quote_identifier(name))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Statements creating a table with its columns, primary key and indexes.
    /// Foreign keys are added separately unless the dialect cannot alter them.
    fn create_table_sql(&self, table: &Table) -> Vec<String> {
        let mut definitions: Vec<String> = table
            .columns
            .values()
            .map(|column| format!("  {}", self.column_declaration_sql(column)))
            .collect();
        if let Some(pk) = table.primary_key() {
            definitions.push(format!("  PRIMARY KEY ({})", self.quote_list(&pk.columns)));
        }
        if !self.supports_foreign_key_alteration() {
            for fk in table.foreign_keys.values() {
                definitions.push(format!("  {}", self.foreign_key_constraint_sql(fk)));
            }
        }

        let mut statements = vec![format!(
            "CREATE TABLE {} (\n{}\n){};",
            self.quote_identifier(&table.name),
            definitions.join(",\n"),
            self.table_options_sql(table)
        )];
        statements.extend(self.table_comment_sql(table));
        for index in table.indexes.values().filter(|index| !index.primary) {
            statements.push(self.create_index_sql(&table.name, index));
        }
        statements
    }

    /// Suffix appended after the closing parenthesis of `CREATE TABLE`
    fn table_options_sql(&self, _table: &Table) -> String {
        String::new()
    }

    /// Extra statements documenting a new table and its columns
    fn table_comment_sql(&self, _table: &Table) -> Vec<String> {
        Vec::new()
    }

    fn drop_table_sql(&self, table_name: &str) -> String {
        format!("DROP TABLE {};", self.quote_identifier(table_name))
    }

    /// Statements adding, renaming, changing and dropping columns of one table
    fn alter_columns_sql(&self, diff: &TableDiff) -> Result<Vec<String>>;

    fn create_index_sql(&self, table_name: &str, index: &Index) -> String {
        if index.primary {
            return format!(
                "ALTER TABLE {} ADD PRIMARY KEY ({});",
                self.quote_identifier(table_name),
                self.quote_list(&index.columns)
            );
        }
        let unique = if index.unique { "UNIQUE " } else { "" };
        format!(
            "CREATE {}INDEX {} ON {} ({});",
            unique,
            self.quote_identifier(&index.name),
            self.quote_identifier(table_name),
            self.quote_list(&index.columns)
        )
    }

    fn drop_index_sql(&self, table_name: &str, index: &Index) -> Result<String>;

    fn rename_index_sql(&self, table_name: &str, old_name: &str, index: &Index) -> Result<Vec<String>>;

    fn add_foreign_key_sql(&self, table_name: &str, fk: &ForeignKey) -> Result<String> {
        if !self.supports_foreign_key_alteration() {
            return Err(Error::MigrationError(format!(
                "{} cannot add foreign key `{}` to existing table `{}`",
                self.name(),
                fk.name,
                table_name
            )));
        }
        Ok(format!(
            "ALTER TABLE {} ADD {};",
            self.quote_identifier(table_name),
            self.foreign_key_constraint_sql(fk)
        ))
    }

    fn drop_foreign_key_sql(&self, table_name: &str, fk: &ForeignKey) -> Result<String>;

    /// A `MODIFY` clause moving `column` to the front, or right after `after`
    fn modify_column_position_clause(&self, column: &Column, _after: Option<&str>) -> Result<String> {
        Err(Error::MigrationError(format!(
            "{} does not support repositioning column `{}`",
            self.name(),
            column.name
        )))
    }
}

/// Pick the dialect for a configured driver name
pub fn dialect_for_driver(driver: &str) -> Result<Box<dyn Dialect>> {
    match driver {
        "mysql" => Ok(Box::new(MySqlDialect)),
        "postgres" => Ok(Box::new(PostgresDialect)),
        "sqlite" => Ok(Box::new(SqliteDialect)),
        _ => Err(Error::ConfigError(format!(
            "Unsupported database driver: {}",
            driver
        ))),
    }
}

/// Quote a string literal, doubling embedded quotes
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Render a raw default value: numbers, keywords and parenthesised expressions
/// are emitted verbatim, anything else becomes a string literal.
pub fn quote_default(value: &str) -> String {
    const KEYWORDS: [&str; 3] = ["NULL", "TRUE", "FALSE"];
    const FUNCTIONS: [&str; 4] = ["CURRENT_TIMESTAMP", "CURRENT_DATE", "CURRENT_TIME", "NOW("];

    let upper = value.trim().to_uppercase();
    let numeric = value.parse::<f64>().is_ok()
        && value.starts_with(|c: char| c.is_ascii_digit() || matches!(c, '-' | '+' | '.'));
    if numeric
        || KEYWORDS.contains(&upper.as_str())
        || FUNCTIONS.iter().any(|function| upper.starts_with(function))
        || value.starts_with('(')
    {
        value.to_string()
    } else {
        quote_literal(value)
    }
}

fn sized(name: &str, size: Option<u32>) -> String {
    match size {
        Some(size) => format!("{}({})", name, size),
        None => name.to_string(),
    }
}

fn decimal(name: &str, column_type: &ColumnType) -> String {
    format!(
        "{}({}, {})",
        name,
        column_type.effective_precision().unwrap_or(10),
        column_type.effective_scale().unwrap_or(0)
    )
}

/// MySQL / MariaDB
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

impl Dialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("`{}`", name.replace('`', "``"))
    }

    fn column_type_sql(&self, column_type: &ColumnType) -> String {
        let base = match &column_type.kind {
            TypeKind::SmallInt => "SMALLINT".to_string(),
            TypeKind::Integer => "INT".to_string(),
            TypeKind::BigInt => "BIGINT".to_string(),
            TypeKind::Decimal => decimal("DECIMAL", column_type),
            TypeKind::Float => "FLOAT".to_string(),
            TypeKind::Double => "DOUBLE".to_string(),
            TypeKind::Boolean => "TINYINT(1)".to_string(),
            TypeKind::String => sized("VARCHAR", column_type.effective_length()),
            TypeKind::Char => sized("CHAR", column_type.effective_length()),
            TypeKind::Text => "TEXT".to_string(),
            TypeKind::Binary => sized("VARBINARY", column_type.effective_length()),
            TypeKind::Blob => "BLOB".to_string(),
            TypeKind::Date => "DATE".to_string(),
            TypeKind::DateTime => "DATETIME".to_string(),
            TypeKind::Timestamp => "TIMESTAMP".to_string(),
            TypeKind::Time => "TIME".to_string(),
            TypeKind::Json => "JSON".to_string(),
            TypeKind::Uuid => "CHAR(36)".to_string(),
            TypeKind::Other(name) => sized(name, column_type.length),
        };
        if column_type.unsigned {
            format!("{} UNSIGNED", base)
        } else {
            base
        }
    }

    fn column_definition_sql(&self, column: &Column) -> String {
        let mut parts = vec![self.column_type_sql(&column.column_type)];
        if let Some(default) = self.default_sql(column) {
            parts.push(default);
        }
        parts.push(if column.nullable { "NULL" } else { "NOT NULL" }.to_string());
        if column.autoincrement {
            parts.push("AUTO_INCREMENT".to_string());
        }
        if let Some(comment) = &column.comment {
            parts.push(format!("COMMENT {}", quote_literal(comment)));
        }
        parts.join(" ")
    }

    fn supports_column_positioning(&self) -> bool {
        true
    }

    fn creates_foreign_key_indexes(&self) -> bool {
        true
    }

    fn table_options_sql(&self, table: &Table) -> String {
        let mut options = Vec::new();
        if let Some(engine) = table.options.get("engine") {
            options.push(format!("ENGINE = {}", engine));
        }
        options.push(format!(
            "DEFAULT CHARACTER SET {}",
            table.options.get("charset").map(String::as_str).unwrap_or("utf8mb4")
        ));
        options.push(format!(
            "COLLATE {}",
            table
                .options
                .get("collation")
                .map(String::as_str)
                .unwrap_or("utf8mb4_unicode_ci")
        ));
        if let Some(comment) = table.comment() {
            options.push(format!("COMMENT = {}", quote_literal(comment)));
        }
        format!(" {}", options.join(" "))
    }

    fn alter_columns_sql(&self, diff: &TableDiff) -> Result<Vec<String>> {
        let mut clauses = Vec::new();
        for column in diff.added_columns.values() {
            clauses.push(format!("ADD {}", self.column_declaration_sql(column)));
        }
        for (old_name, column) in &diff.renamed_columns {
            clauses.push(format!(
                "CHANGE {} {}",
                self.quote_identifier(old_name),
                self.column_declaration_sql(column)
            ));
        }
        for change in diff.changed_columns.values() {
            clauses.push(format!("MODIFY {}", self.column_declaration_sql(&change.to)));
        }
        for column_name in diff.removed_columns.keys() {
            clauses.push(format!("DROP {}", self.quote_identifier(column_name)));
        }

        if clauses.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![format!(
            "ALTER TABLE {} {};",
            self.quote_identifier(&diff.name),
            clauses.join(", ")
        )])
    }

    fn drop_index_sql(&self, table_name: &str, index: &Index) -> Result<String> {
        if index.primary {
            return Ok(format!(
                "ALTER TABLE {} DROP PRIMARY KEY;",
                self.quote_identifier(table_name)
            ));
        }
        Ok(format!(
            "DROP INDEX {} ON {};",
            self.quote_identifier(&index.name),
            self.quote_identifier(table_name)
        ))
    }

    fn rename_index_sql(&self, table_name: &str, old_name: &str, index: &Index) -> Result<Vec<String>> {
        Ok(vec![format!(
            "ALTER TABLE {} RENAME INDEX {} TO {};",
            self.quote_identifier(table_name),
            self.quote_identifier(old_name),
            self.quote_identifier(&index.name)
        )])
    }

    fn drop_foreign_key_sql(&self, table_name: &str, fk: &ForeignKey) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} DROP FOREIGN KEY {};",
            self.quote_identifier(table_name),
            self.quote_identifier(&fk.name)
        ))
    }

    fn modify_column_position_clause(&self, column: &Column, after: Option<&str>) -> Result<String> {
        let position = match after {
            Some(previous) => format!("AFTER {}", self.quote_identifier(previous)),
            None => "FIRST".to_string(),
        };
        Ok(format!(
            "MODIFY {} {}",
            self.column_declaration_sql(column),
            position
        ))
    }
}

/// PostgreSQL
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    fn column_comment_sql(&self, table_name: &str, column_name: &str, comment: Option<&str>) -> String {
        format!(
            "COMMENT ON COLUMN {}.{} IS {};",
            self.quote_identifier(table_name),
            self.quote_identifier(column_name),
            comment.map(quote_literal).unwrap_or_else(|| "NULL".to_string())
        )
    }

    fn alter_column_sql(&self, table_name: &str, change: &ColumnChange) -> Vec<String> {
        let table = self.quote_identifier(table_name);
        let column = self.quote_identifier(&change.column_name);
        let mut sql = Vec::new();

        if change.type_changed() {
            let new_type = self.column_type_sql(&change.to.column_type);
            sql.push(format!(
                "ALTER TABLE {} ALTER COLUMN {} TYPE {} USING {}::{};",
                table, column, new_type, column, new_type
            ));
        }
        if change.has_changed(ColumnProperty::Nullable) {
            let action = if change.to.nullable { "DROP NOT NULL" } else { "SET NOT NULL" };
            sql.push(format!("ALTER TABLE {} ALTER COLUMN {} {};", table, column, action));
        }
        if change.has_changed(ColumnProperty::Default) {
            let action = self
                .default_sql(&change.to)
                .map(|default| format!("SET {}", default))
                .unwrap_or_else(|| "DROP DEFAULT".to_string());
            sql.push(format!("ALTER TABLE {} ALTER COLUMN {} {};", table, column, action));
        }
        if change.has_changed(ColumnProperty::Autoincrement) {
            let action = if change.to.autoincrement {
                "ADD GENERATED BY DEFAULT AS IDENTITY"
            } else {
                "DROP IDENTITY IF EXISTS"
            };
            sql.push(format!("ALTER TABLE {} ALTER COLUMN {} {};", table, column, action));
        }
        if change.has_changed(ColumnProperty::Comment) {
            sql.push(self.column_comment_sql(table_name, &change.column_name, change.to.comment.as_deref()));
        }
        sql
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn column_type_sql(&self, column_type: &ColumnType) -> String {
        match &column_type.kind {
            TypeKind::SmallInt => "SMALLINT".to_string(),
            TypeKind::Integer => "INTEGER".to_string(),
            TypeKind::BigInt => "BIGINT".to_string(),
            TypeKind::Decimal => decimal("NUMERIC", column_type),
            TypeKind::Float => "REAL".to_string(),
            TypeKind::Double => "DOUBLE PRECISION".to_string(),
            TypeKind::Boolean => "BOOLEAN".to_string(),
            TypeKind::String => sized("VARCHAR", column_type.effective_length()),
            TypeKind::Char => sized("CHAR", column_type.effective_length()),
            TypeKind::Text => "TEXT".to_string(),
            TypeKind::Binary | TypeKind::Blob => "BYTEA".to_string(),
            TypeKind::Date => "DATE".to_string(),
            TypeKind::DateTime => "TIMESTAMP".to_string(),
            TypeKind::Timestamp => "TIMESTAMPTZ".to_string(),
            TypeKind::Time => "TIME".to_string(),
            TypeKind::Json => "JSONB".to_string(),
            TypeKind::Uuid => "UUID".to_string(),
            TypeKind::Other(name) => sized(name, column_type.length),
        }
    }

    fn column_definition_sql(&self, column: &Column) -> String {
        let mut parts = vec![self.column_type_sql(&column.column_type)];
        if column.autoincrement {
            parts.push("GENERATED BY DEFAULT AS IDENTITY".to_string());
        } else if let Some(default) = self.default_sql(column) {
            parts.push(default);
        }
        parts.push(if column.nullable { "NULL" } else { "NOT NULL" }.to_string());
        parts.join(" ")
    }

    fn table_comment_sql(&self, table: &Table) -> Vec<String> {
        let mut sql = Vec::new();
        if let Some(comment) = table.comment() {
            sql.push(format!(
                "COMMENT ON TABLE {} IS {};",
                self.quote_identifier(&table.name),
                quote_literal(comment)
            ));
        }
        for column in table.columns.values() {
            if let Some(comment) = &column.comment {
                sql.push(self.column_comment_sql(&table.name, &column.name, Some(comment)));
            }
        }
        sql
    }

    fn alter_columns_sql(&self, diff: &TableDiff) -> Result<Vec<String>> {
        let table = self.quote_identifier(&diff.name);
        let mut sql = Vec::new();

        for column in diff.added_columns.values() {
            sql.push(format!(
                "ALTER TABLE {} ADD COLUMN {};",
                table,
                self.column_declaration_sql(column)
            ));
            if let Some(comment) = &column.comment {
                sql.push(self.column_comment_sql(&diff.name, &column.name, Some(comment)));
            }
        }
        for (old_name, column) in &diff.renamed_columns {
            sql.push(format!(
                "ALTER TABLE {} RENAME COLUMN {} TO {};",
                table,
                self.quote_identifier(old_name),
                self.quote_identifier(&column.name)
            ));
        }
        for change in diff.changed_columns.values() {
            sql.extend(self.alter_column_sql(&diff.name, change));
        }
        for column_name in diff.removed_columns.keys() {
            sql.push(format!(
                "ALTER TABLE {} DROP COLUMN {};",
                table,
                self.quote_identifier(column_name)
            ));
        }
        Ok(sql)
    }

    fn drop_index_sql(&self, table_name: &str, index: &Index) -> Result<String> {
        if index.primary {
            // The constraint name is whatever the table was created with
            let table = self.quote_identifier(table_name);
            return Ok(format!(
                "DO $$ DECLARE pkey name; BEGIN \
                 SELECT conname INTO pkey FROM pg_constraint WHERE conrelid = {}::regclass AND contype = 'p'; \
                 EXECUTE format('ALTER TABLE %s DROP CONSTRAINT %I', {}, pkey); \
                 END $$;",
                quote_literal(&table),
                quote_literal(&table)
            ));
        }
        Ok(format!("DROP INDEX {};", self.quote_identifier(&index.name)))
    }

    fn rename_index_sql(&self, _table_name: &str, old_name: &str, index: &Index) -> Result<Vec<String>> {
        Ok(vec![format!(
            "ALTER INDEX {} RENAME TO {};",
            self.quote_identifier(old_name),
            self.quote_identifier(&index.name)
        )])
    }

    fn drop_foreign_key_sql(&self, table_name: &str, fk: &ForeignKey) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} DROP CONSTRAINT {};",
            self.quote_identifier(table_name),
            self.quote_identifier(&fk.name)
        ))
    }
}

/// SQLite
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    fn inline_primary_key<'t>(&self, table: &'t Table) -> Option<&'t Column> {
        let pk = table.primary_key()?;
        match pk.columns.as_slice() {
            [only] => table.column(only).filter(|column| column.autoincrement),
            _ => None,
        }
    }
}

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn column_type_sql(&self, column_type: &ColumnType) -> String {
        match &column_type.kind {
            TypeKind::SmallInt => "SMALLINT".to_string(),
            TypeKind::Integer => "INTEGER".to_string(),
            TypeKind::BigInt => "BIGINT".to_string(),
            TypeKind::Decimal => decimal("NUMERIC", column_type),
            TypeKind::Float => "REAL".to_string(),
            TypeKind::Double => "DOUBLE".to_string(),
            TypeKind::Boolean => "BOOLEAN".to_string(),
            TypeKind::String => sized("VARCHAR", column_type.effective_length()),
            TypeKind::Char => sized("CHAR", column_type.effective_length()),
            TypeKind::Text => "TEXT".to_string(),
            TypeKind::Binary | TypeKind::Blob => "BLOB".to_string(),
            TypeKind::Date => "DATE".to_string(),
            TypeKind::DateTime => "DATETIME".to_string(),
            TypeKind::Timestamp => "TIMESTAMP".to_string(),
            TypeKind::Time => "TIME".to_string(),
            TypeKind::Json => "JSON".to_string(),
            TypeKind::Uuid => "UUID".to_string(),
            TypeKind::Other(name) => sized(name, column_type.length),
        }
    }

    fn column_definition_sql(&self, column: &Column) -> String {
        let mut parts = vec![self.column_type_sql(&column.column_type)];
        if let Some(default) = self.default_sql(column) {
            parts.push(default);
        }
        if !column.nullable {
            parts.push("NOT NULL".to_string());
        }
        parts.join(" ")
    }

    fn supports_foreign_key_alteration(&self) -> bool {
        false
    }

    fn create_table_sql(&self, table: &Table) -> Vec<String> {
        // An autoincrement column must be declared inline as `INTEGER PRIMARY KEY AUTOINCREMENT`
        let inline_pk = self.inline_primary_key(table);
        let mut definitions: Vec<String> = table
            .columns
            .values()
            .map(|column| match inline_pk {
                Some(pk) if pk.name == column.name => format!(
                    "  {} INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL",
                    self.quote_identifier(&column.name)
                ),
                _ => format!("  {}", self.column_declaration_sql(column)),
            })
            .collect();
        if let (Some(pk), None) = (table.primary_key(), inline_pk) {
            definitions.push(format!("  PRIMARY KEY ({})", self.quote_list(&pk.columns)));
        }
        for fk in table.foreign_keys.values() {
            definitions.push(format!("  {}", self.foreign_key_constraint_sql(fk)));
        }

        let mut statements = vec![format!(
            "CREATE TABLE {} (\n{}\n);",
            self.quote_identifier(&table.name),
            definitions.join(",\n")
        )];
        for index in table.indexes.values().filter(|index| !index.primary) {
            statements.push(self.create_index_sql(&table.name, index));
        }
        statements
    }

    fn alter_columns_sql(&self, diff: &TableDiff) -> Result<Vec<String>> {
        let table = self.quote_identifier(&diff.name);
        let mut sql = Vec::new();

        for column in diff.added_columns.values() {
            // SQLite can only add nullable columns or columns with defaults
            if !column.nullable && column.default.is_none() {
                return Err(Error::MigrationError(format!(
                    "SQLite cannot add NOT NULL column `{}` to table `{}` without a default value",
                    column.name, diff.name
                )));
            }
            sql.push(format!(
                "ALTER TABLE {} ADD COLUMN {};",
                table,
                self.column_declaration_sql(column)
            ));
        }
        for (old_name, column) in &diff.renamed_columns {
            sql.push(format!(
                "ALTER TABLE {} RENAME COLUMN {} TO {};",
                table,
                self.quote_identifier(old_name),
                self.quote_identifier(&column.name)
            ));
        }
        if let Some(change) = diff.changed_columns.values().next() {
            return Err(Error::MigrationError(format!(
                "SQLite cannot alter the definition of column `{}` in table `{}`; the table has to be rebuilt",
                change.column_name, diff.name
            )));
        }
        for column_name in diff.removed_columns.keys() {
            sql.push(format!(
                "ALTER TABLE {} DROP COLUMN {};",
                table,
                self.quote_identifier(column_name)
            ));
        }
        Ok(sql)
    }

    fn create_index_sql(&self, table_name: &str, index: &Index) -> String {
        let unique = if index.unique { "UNIQUE " } else { "" };
        format!(
            "CREATE {}INDEX {} ON {} ({});",
            unique,
            self.quote_identifier(&index.name),
            self.quote_identifier(table_name),
            self.quote_list(&index.columns)
        )
    }

    fn drop_index_sql(&self, table_name: &str, index: &Index) -> Result<String> {
        if index.primary {
            return Err(Error::MigrationError(format!(
                "SQLite cannot change the primary key of existing table `{}`",
                table_name
            )));
        }
        Ok(format!("DROP INDEX {};", self.quote_identifier(&index.name)))
    }

    fn rename_index_sql(&self, table_name: &str, old_name: &str, index: &Index) -> Result<Vec<String>> {
        Ok(vec![
            format!("DROP INDEX {};", self.quote_identifier(old_name)),
            self.create_index_sql(table_name, index),
        ])
    }

    fn drop_foreign_key_sql(&self, table_name: &str, fk: &ForeignKey) -> Result<String> {
        Err(Error::MigrationError(format!(
            "SQLite cannot drop foreign key `{}` from existing table `{}`",
            fk.name, table_name
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn users() -> Table {
        let mut table = Table::new("users");
        table
            .add_column(Column::new("id", TypeKind::Integer).unsigned(true).autoincrement(true))
            .unwrap();
        table
            .add_column(Column::new("login", TypeKind::String).length(64).comment("user's login"))
            .unwrap();
        table
            .add_column(Column::new("status", TypeKind::String).length(10).nullable(true).default("new"))
            .unwrap();
        table.set_primary_key(vec!["id".to_string()]).unwrap();
        table
            .add_index(Index::new("users_login_idx", vec!["login".to_string()]).unique(true))
            .unwrap();
        table.set_option("comment", "accounts");
        table
    }

    #[rstest]
    #[case("42", "42")]
    #[case("-1.5", "-1.5")]
    #[case("CURRENT_TIMESTAMP", "CURRENT_TIMESTAMP")]
    #[case("current_timestamp(3)", "current_timestamp(3)")]
    #[case("(uuid())", "(uuid())")]
    #[case("pending", "'pending'")]
    #[case("it's", "'it''s'")]
    fn defaults_are_quoted_unless_expressions(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(quote_default(raw), expected);
    }

    #[rstest]
    #[case(Column::new("c", TypeKind::String), "VARCHAR(255)")]
    #[case(Column::new("c", TypeKind::Decimal).precision(12, 2), "DECIMAL(12, 2)")]
    #[case(Column::new("c", TypeKind::Boolean), "TINYINT(1)")]
    #[case(Column::new("c", TypeKind::BigInt).unsigned(true), "BIGINT UNSIGNED")]
    #[case(Column::new("c", TypeKind::Other("mediumtext".to_string())), "mediumtext")]
    #[case(Column::new("c", TypeKind::Other("enum('Active','Inactive')".to_string())), "enum('Active','Inactive')")]
    fn mysql_types(#[case] column: Column, #[case] expected: &str) {
        assert_eq!(MySqlDialect.column_type_sql(&column.column_type), expected);
    }

    #[test]
    fn mysql_column_declaration_carries_everything() {
        let table = users();
        assert_eq!(
            MySqlDialect.column_declaration_sql(table.column("id").unwrap()),
            "`id` INT UNSIGNED NOT NULL AUTO_INCREMENT"
        );
        assert_eq!(
            MySqlDialect.column_declaration_sql(table.column("login").unwrap()),
            "`login` VARCHAR(64) NOT NULL COMMENT 'user''s login'"
        );
        assert_eq!(
            MySqlDialect.column_declaration_sql(table.column("status").unwrap()),
            "`status` VARCHAR(10) DEFAULT 'new' NULL"
        );
    }

    #[test]
    fn mysql_create_table_inlines_primary_key_and_options() {
        let sql = MySqlDialect.create_table_sql(&users());

        assert_eq!(sql.len(), 2);
        assert!(sql[0].starts_with("CREATE TABLE `users` (\n  `id` INT UNSIGNED"));
        assert!(sql[0].contains("  PRIMARY KEY (`id`)\n)"));
        assert!(sql[0].ends_with("COMMENT = 'accounts';"));
        assert_eq!(sql[1], "CREATE UNIQUE INDEX `users_login_idx` ON `users` (`login`);");
    }

    #[test]
    fn postgres_create_table_comments_are_separate_statements() {
        let sql = PostgresDialect.create_table_sql(&users());

        assert!(sql[0].contains("\"id\" INTEGER GENERATED BY DEFAULT AS IDENTITY NOT NULL"));
        assert_eq!(sql[1], "COMMENT ON TABLE \"users\" IS 'accounts';");
        assert_eq!(sql[2], "COMMENT ON COLUMN \"users\".\"login\" IS 'user''s login';");
        assert_eq!(sql[3], "CREATE UNIQUE INDEX \"users_login_idx\" ON \"users\" (\"login\");");
    }

    #[test]
    fn sqlite_autoincrement_primary_key_is_inline() {
        let sql = SqliteDialect.create_table_sql(&users());

        assert!(sql[0].contains("\"id\" INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL"));
        assert!(!sql[0].contains("  PRIMARY KEY ("));
    }

    #[test]
    fn mysql_positions_columns() {
        let column = Column::new("name", TypeKind::String).length(255);

        assert_eq!(
            MySqlDialect.modify_column_position_clause(&column, None).unwrap(),
            "MODIFY `name` VARCHAR(255) NOT NULL FIRST"
        );
        assert_eq!(
            MySqlDialect.modify_column_position_clause(&column, Some("id")).unwrap(),
            "MODIFY `name` VARCHAR(255) NOT NULL AFTER `id`"
        );
        assert!(PostgresDialect.modify_column_position_clause(&column, None).is_err());
    }

    #[test]
    fn postgres_primary_key_is_dropped_by_its_catalog_name() {
        let pk = Index::primary(vec!["id".to_string()]);

        let sql = PostgresDialect.drop_index_sql("users", &pk).unwrap();

        assert!(sql.starts_with("DO $$"), "{}", sql);
        assert!(sql.contains("WHERE conrelid = '\"users\"'::regclass AND contype = 'p';"), "{}", sql);
        assert!(sql.contains("DROP CONSTRAINT %I', '\"users\"', pkey);"), "{}", sql);
        assert!(!sql.contains("users_pkey"));
        assert_eq!(
            PostgresDialect.drop_index_sql("users", &Index::new("users_login", vec!["login".to_string()])).unwrap(),
            "DROP INDEX \"users_login\";"
        );
    }

    #[test]
    fn foreign_key_clause() {
        let fk = ForeignKey::new("fk_country", vec!["country_id".to_string()], "country", vec!["id".to_string()])
            .on_delete("cascade");

        assert_eq!(
            MySqlDialect.add_foreign_key_sql("users", &fk).unwrap(),
            "ALTER TABLE `users` ADD CONSTRAINT `fk_country` FOREIGN KEY (`country_id`) REFERENCES `country` (`id`) ON DELETE CASCADE;"
        );
        assert!(SqliteDialect.add_foreign_key_sql("users", &fk).is_err());
    }

    #[test]
    fn unknown_driver_is_a_configuration_error() {
        assert!(matches!(dialect_for_driver("oracle"), Err(Error::ConfigError(_))));
        assert_eq!(dialect_for_driver("postgres").unwrap().name(), "postgres");
    }
}

//! Migration generator
//!
//! This module turns a schema diff into an ordered list of SQL statements. The
//! order keeps every statement valid when run one after another:
//!
//! 1. foreign keys of changed tables are dropped (removed or about to be redefined)
//! 2. foreign keys of removed tables are dropped
//! 3. removed and redefined indexes of changed tables are dropped
//! 4. new tables are created
//! 5. columns of changed tables are added, renamed, altered and dropped; indexes renamed
//! 6. added and redefined indexes of changed tables are created
//! 7. foreign keys of new tables, then of changed tables, are added
//! 8. removed tables are dropped

use tracing::debug;

use crate::error::Result;
use crate::schema::dialect::Dialect;
use crate::schema::diff::SchemaDiff;

/// Migration SQL generator
pub struct MigrationGenerator<'a> {
    dialect: &'a dyn Dialect,
}

impl<'a> MigrationGenerator<'a> {
    /// Create a new migration generator
    pub fn new(dialect: &'a dyn Dialect) -> Self {
        Self { dialect }
    }

    /// Generate migration SQL from a schema diff
    pub fn generate_migration_sql(&self, diff: &SchemaDiff) -> Result<Vec<String>> {
        let dialect = self.dialect;
        let mut migrations = Vec::new();

        for table_diff in diff.changed_tables.values() {
            let stale = table_diff
                .removed_foreign_keys
                .values()
                .chain(table_diff.changed_foreign_keys.values());
            for fk in stale {
                migrations.push(dialect.drop_foreign_key_sql(&table_diff.name, fk)?);
            }
        }

        if dialect.supports_foreign_key_alteration() {
            for table in &diff.removed_tables {
                for fk in table.foreign_keys.values() {
                    migrations.push(dialect.drop_foreign_key_sql(&table.name, fk)?);
                }
            }
        }

        for table_diff in diff.changed_tables.values() {
            for index in table_diff.removed_indexes.values() {
                migrations.push(dialect.drop_index_sql(&table_diff.name, index)?);
            }
            // Redefined indexes are dropped under their current name, which is unchanged
            for index in table_diff.changed_indexes.values() {
                migrations.push(dialect.drop_index_sql(&table_diff.name, index)?);
            }
        }

        for table in &diff.new_tables {
            debug!(table = %table.name, "Creating table");
            migrations.extend(dialect.create_table_sql(table));
        }

        for table_diff in diff.changed_tables.values() {
            debug!(table = %table_diff.name, "Altering table");
            migrations.extend(dialect.alter_columns_sql(table_diff)?);
            for (old_name, index) in &table_diff.renamed_indexes {
                migrations.extend(dialect.rename_index_sql(&table_diff.name, old_name, index)?);
            }
        }

        for table_diff in diff.changed_tables.values() {
            let fresh = table_diff
                .added_indexes
                .values()
                .chain(table_diff.changed_indexes.values());
            for index in fresh {
                migrations.push(dialect.create_index_sql(&table_diff.name, index));
            }
        }

        if dialect.supports_foreign_key_alteration() {
            for table in &diff.new_tables {
                for fk in table.foreign_keys.values() {
                    migrations.push(dialect.add_foreign_key_sql(&table.name, fk)?);
                }
            }
        }
        for table_diff in diff.changed_tables.values() {
            let fresh = table_diff
                .added_foreign_keys
                .values()
                .chain(table_diff.changed_foreign_keys.values());
            for fk in fresh {
                migrations.push(dialect.add_foreign_key_sql(&table_diff.name, fk)?);
            }
        }

        for table in &diff.removed_tables {
            debug!(table = %table.name, "Dropping table");
            migrations.push(dialect.drop_table_sql(&table.name));
        }

        Ok(migrations)
    }
}

/// Generate the statements for `diff` in `dialect`
pub fn to_sql(diff: &SchemaDiff, dialect: &dyn Dialect) -> Result<Vec<String>> {
    MigrationGenerator::new(dialect).generate_migration_sql(diff)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::schema::dialect::{MySqlDialect, PostgresDialect, SqliteDialect};
    use crate::schema::diff::{compare, CompareOptions};
    use crate::schema::types::{Column, ForeignKey, Index, Schema, Table, TypeKind};
    use pretty_assertions::assert_eq;

    fn table(name: &str, columns: &[&str]) -> Table {
        let mut table = Table::new(name);
        for column in columns {
            table.add_column(Column::new(column, TypeKind::Integer)).unwrap();
        }
        table
    }

    fn schema(tables: Vec<Table>) -> Schema {
        let mut schema = Schema::new();
        for table in tables {
            schema.add_table(table).unwrap();
        }
        schema
    }

    fn position(statements: &[String], needle: &str) -> usize {
        statements
            .iter()
            .position(|sql| sql.contains(needle))
            .unwrap_or_else(|| panic!("no statement contains {needle:?} in {statements:#?}"))
    }

    #[test]
    fn added_column_is_a_single_alter() {
        let a = schema(vec![table("t", &["id", "name"])]);
        let b = schema(vec![table("t", &["id", "name", "age"])]);
        let diff = compare(&a, &b);

        assert_eq!(
            to_sql(&diff, &MySqlDialect).unwrap(),
            vec!["ALTER TABLE `t` ADD `age` INT NOT NULL;".to_string()]
        );
        assert_eq!(
            to_sql(&diff, &PostgresDialect).unwrap(),
            vec!["ALTER TABLE \"t\" ADD COLUMN \"age\" INTEGER NOT NULL;".to_string()]
        );
    }

    #[test]
    fn empty_diff_yields_no_statements() {
        let s = schema(vec![table("t", &["id"])]);
        assert!(to_sql(&compare(&s, &s), &MySqlDialect).unwrap().is_empty());
    }

    #[test]
    fn mysql_coalesces_column_changes() {
        let a = schema(vec![table("t", &["id", "gone", "n"])]);
        let mut t = table("t", &["id"]);
        t.add_column(Column::new("n", TypeKind::BigInt)).unwrap();
        t.add_column(Column::new("fresh", TypeKind::Text).nullable(true)).unwrap();
        let b = schema(vec![t]);

        let sql = to_sql(&compare(&a, &b), &MySqlDialect).unwrap();

        assert_eq!(
            sql,
            vec!["ALTER TABLE `t` ADD `fresh` TEXT NULL, MODIFY `n` BIGINT NOT NULL, DROP `gone`;".to_string()]
        );
    }

    #[test]
    fn new_tables_are_created_before_foreign_keys_reference_them() {
        let a = schema(vec![table("users", &["id"])]);
        let mut users = table("users", &["id", "country_id"]);
        users
            .add_foreign_key(ForeignKey::new(
                "fk_users_country",
                vec!["country_id".to_string()],
                "country",
                vec!["id".to_string()],
            ))
            .unwrap();
        let mut country = table("country", &["id"]);
        country.set_primary_key(vec!["id".to_string()]).unwrap();
        let b = schema(vec![users, country]);

        let sql = to_sql(&compare(&a, &b), &MySqlDialect).unwrap();

        let create = position(&sql, "CREATE TABLE `country`");
        let add_column = position(&sql, "ADD `country_id`");
        let add_fk = position(&sql, "ADD CONSTRAINT `fk_users_country`");
        assert!(create < add_fk);
        assert!(add_column < add_fk);
    }

    #[test]
    fn foreign_keys_are_dropped_before_columns_and_tables() {
        let mut users = table("users", &["id", "country_id"]);
        users
            .add_foreign_key(ForeignKey::new(
                "fk_users_country",
                vec!["country_id".to_string()],
                "country",
                vec!["id".to_string()],
            ))
            .unwrap();
        let mut country = table("country", &["id", "region_id"]);
        country
            .add_foreign_key(ForeignKey::new(
                "fk_country_region",
                vec!["region_id".to_string()],
                "region",
                vec!["id".to_string()],
            ))
            .unwrap();
        let a = schema(vec![users, country, table("region", &["id"])]);
        let b = schema(vec![table("users", &["id"])]);

        let sql = to_sql(&compare(&a, &b), &MySqlDialect).unwrap();

        let drop_users_fk = position(&sql, "DROP FOREIGN KEY `fk_users_country`");
        let drop_country_fk = position(&sql, "DROP FOREIGN KEY `fk_country_region`");
        let drop_column = position(&sql, "DROP `country_id`");
        let drop_country = position(&sql, "DROP TABLE `country`");
        let drop_region = position(&sql, "DROP TABLE `region`");
        assert!(drop_users_fk < drop_column);
        assert!(drop_users_fk < drop_country);
        assert!(drop_country_fk < drop_region);
    }

    #[test]
    fn redefined_index_is_dropped_then_recreated() {
        let mut before = table("t", &["a", "b"]);
        before.add_index(Index::new("t_idx", vec!["a".to_string()])).unwrap();
        let mut after = table("t", &["a", "b"]);
        after
            .add_index(Index::new("t_idx", vec!["a".to_string(), "b".to_string()]).unique(true))
            .unwrap();

        let sql = to_sql(&compare(&schema(vec![before]), &schema(vec![after])), &MySqlDialect).unwrap();

        assert_eq!(
            sql,
            vec![
                "DROP INDEX `t_idx` ON `t`;".to_string(),
                "CREATE UNIQUE INDEX `t_idx` ON `t` (`a`, `b`);".to_string(),
            ]
        );
    }

    #[test]
    fn primary_key_change() {
        let mut before = table("t", &["a", "b"]);
        before.set_primary_key(vec!["a".to_string()]).unwrap();
        let mut after = table("t", &["a", "b"]);
        after.set_primary_key(vec!["a".to_string(), "b".to_string()]).unwrap();

        let sql = to_sql(&compare(&schema(vec![before]), &schema(vec![after])), &MySqlDialect).unwrap();

        assert_eq!(
            sql,
            vec![
                "ALTER TABLE `t` DROP PRIMARY KEY;".to_string(),
                "ALTER TABLE `t` ADD PRIMARY KEY (`a`, `b`);".to_string(),
            ]
        );
    }

    #[test]
    fn renames_use_dialect_syntax() {
        let mut before = table("t", &["id", "old"]);
        before.add_index(Index::new("old_idx", vec!["id".to_string()])).unwrap();
        let mut after = table("t", &["id", "new"]);
        after.add_index(Index::new("new_idx", vec!["id".to_string()])).unwrap();
        let diff = crate::schema::diff::SchemaDiff::compare(
            &schema(vec![before]),
            &schema(vec![after]),
            &CompareOptions { detect_renames: true },
        );

        assert_eq!(
            to_sql(&diff, &MySqlDialect).unwrap(),
            vec![
                "ALTER TABLE `t` CHANGE `old` `new` INT NOT NULL;".to_string(),
                "ALTER TABLE `t` RENAME INDEX `old_idx` TO `new_idx`;".to_string(),
            ]
        );
        assert_eq!(
            to_sql(&diff, &PostgresDialect).unwrap(),
            vec![
                "ALTER TABLE \"t\" RENAME COLUMN \"old\" TO \"new\";".to_string(),
                "ALTER INDEX \"old_idx\" RENAME TO \"new_idx\";".to_string(),
            ]
        );
    }

    #[test]
    fn postgres_alters_each_property() {
        let a = schema(vec![table("t", &["n"])]);
        let mut t = Table::new("t");
        t.add_column(Column::new("n", TypeKind::BigInt).nullable(true).default("0").comment("count"))
            .unwrap();
        let b = schema(vec![t]);

        let sql = to_sql(&compare(&a, &b), &PostgresDialect).unwrap();

        assert_eq!(
            sql,
            vec![
                "ALTER TABLE \"t\" ALTER COLUMN \"n\" TYPE BIGINT USING \"n\"::BIGINT;".to_string(),
                "ALTER TABLE \"t\" ALTER COLUMN \"n\" DROP NOT NULL;".to_string(),
                "ALTER TABLE \"t\" ALTER COLUMN \"n\" SET DEFAULT 0;".to_string(),
                "COMMENT ON COLUMN \"t\".\"n\" IS 'count';".to_string(),
            ]
        );
    }

    #[test]
    fn sqlite_refuses_column_redefinition() {
        let a = schema(vec![table("t", &["n"])]);
        let mut t = Table::new("t");
        t.add_column(Column::new("n", TypeKind::Text)).unwrap();
        let b = schema(vec![t]);

        let err = to_sql(&compare(&a, &b), &SqliteDialect).unwrap_err();
        assert!(matches!(err, Error::MigrationError(ref message) if message.contains("`n`")));
    }

    #[test]
    fn sqlite_inlines_foreign_keys_of_new_tables() {
        let mut users = table("users", &["id", "country_id"]);
        users
            .add_foreign_key(ForeignKey::new(
                "fk_users_country",
                vec!["country_id".to_string()],
                "country",
                vec!["id".to_string()],
            ))
            .unwrap();
        let b = schema(vec![table("country", &["id"]), users]);

        let sql = to_sql(&compare(&Schema::new(), &b), &SqliteDialect).unwrap();

        assert_eq!(sql.len(), 2);
        assert!(sql[1].contains("CONSTRAINT \"fk_users_country\" FOREIGN KEY (\"country_id\") REFERENCES \"country\" (\"id\")"));
    }

    #[test]
    fn output_is_reproducible() {
        let a = schema(vec![table("a", &["id"]), table("b", &["id"])]);
        let b = schema(vec![table("c", &["id"]), table("d", &["id"]), table("b", &["id", "x"])]);

        let first = to_sql(&compare(&a, &b), &MySqlDialect).unwrap();
        let second = to_sql(&compare(&a, &b), &MySqlDialect).unwrap();
        assert_eq!(first, second);
    }
}

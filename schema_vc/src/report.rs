//! Human-readable rendering of schema differences

use std::fmt::Write;

use crate::schema::diff::{SchemaDiff, TableDiff};
use crate::schema::types::{ForeignKey, Index};

/// Status report for a diff taken from the schema file to the live schema.
/// "added" and "deleted" describe what the database has compared to the file.
pub fn render_status(diff: &SchemaDiff) -> String {
    if diff.is_empty() {
        return "Schema up-to-date.\n".to_string();
    }

    let mut out = String::new();
    for table_diff in diff.changed_tables.values() {
        line(&mut out, format!("modified: table `{}`", table_diff.name));
        render_table_diff(&mut out, table_diff);
        line(&mut out, String::new());
    }
    for table in &diff.new_tables {
        line(&mut out, format!("added: table `{}`", table.name));
    }
    for table in &diff.removed_tables {
        line(&mut out, format!("deleted: table `{}`", table.name));
    }

    line(&mut out, String::new());
    line(&mut out, "You need to synchronize your database schema with your schema file:".to_string());
    line(&mut out, "- Command `dump` to save local changes into schema file.".to_string());
    line(&mut out, "- Command `apply` to migrate database version/discard local changes.".to_string());
    line(
        &mut out,
        "- Manual migration (you can start from a SQL script obtained by using command `apply --dry-run`).".to_string(),
    );
    out
}

fn render_table_diff(out: &mut String, diff: &TableDiff) {
    for name in diff.changed_columns.keys() {
        line(out, format!("  Properties changed on column `{}`.", name));
    }
    for (old_name, column) in &diff.renamed_columns {
        line(out, format!("  Column `{}` renamed to `{}`.", old_name, column.name));
    }
    for name in diff.added_columns.keys() {
        line(out, format!("  Added column `{}`.", name));
    }
    for name in diff.removed_columns.keys() {
        line(out, format!("  Removed column `{}`.", name));
    }
    for index in diff.changed_indexes.values() {
        line(out, format!("  Modified index `{}` on {}", index.name, desc_index(index)));
    }
    for (old_name, index) in &diff.renamed_indexes {
        line(out, format!("  Index `{}` renamed to `{}`.", old_name, index.name));
    }
    for index in diff.added_indexes.values() {
        line(out, format!("  Added index `{}` on {}", index.name, desc_index(index)));
    }
    for index in diff.removed_indexes.values() {
        line(out, format!("  Removed index `{}` on {}", index.name, desc_index(index)));
    }
    for fk in diff.changed_foreign_keys.values() {
        line(out, format!("  Modified foreign key `{}`: {}", fk.name, desc_foreign_key(fk)));
    }
    for fk in diff.added_foreign_keys.values() {
        line(out, format!("  Added foreign key `{}`: {}", fk.name, desc_foreign_key(fk)));
    }
    for fk in diff.removed_foreign_keys.values() {
        line(out, format!("  Removed foreign key `{}`: {}", fk.name, desc_foreign_key(fk)));
    }
}

fn line(out: &mut String, text: String) {
    // Writing to a String cannot fail
    let _ = writeln!(out, "{}", text);
}

fn column_list(columns: &[String]) -> String {
    match columns {
        [only] => format!("`{}`", only),
        _ => format!("(`{}`)", columns.join("`,`")),
    }
}

/// `` `col` ``, `` (`a`,`b`) ``, prefixed with `UNIQUE` or `PRIMARY` when relevant
pub fn desc_index(index: &Index) -> String {
    let list = column_list(&index.columns);
    if index.primary {
        format!("PRIMARY {}", list)
    } else if index.unique {
        format!("UNIQUE {}", list)
    } else {
        list
    }
}

/// `` `col` => `table`.`col` `` or `` (`a`,`b`) => `table` (`x`,`y`) ``
pub fn desc_foreign_key(fk: &ForeignKey) -> String {
    match (fk.columns.as_slice(), fk.ref_columns.as_slice()) {
        ([local], [foreign]) => format!("`{}` => `{}`.`{}`", local, fk.ref_table, foreign),
        _ => format!(
            "{} => `{}` {}",
            column_list(&fk.columns),
            fk.ref_table,
            column_list(&fk.ref_columns)
        ),
    }
}

/// Table counts shown before asking for confirmation
pub fn apply_summary(diff: &SchemaDiff) -> Vec<String> {
    [
        (diff.changed_tables.len(), "changed"),
        (diff.new_tables.len(), "new"),
        (diff.removed_tables.len(), "removed"),
    ]
    .into_iter()
    .filter(|(count, _)| *count > 0)
    .map(|(count, label)| format!("{} {} tables", count, label))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::diff::compare;
    use crate::schema::types::{Column, Schema, Table, TypeKind};
    use pretty_assertions::assert_eq;

    fn schema(tables: Vec<Table>) -> Schema {
        let mut schema = Schema::new();
        for table in tables {
            schema.add_table(table).unwrap();
        }
        schema
    }

    fn table(name: &str, columns: &[&str]) -> Table {
        let mut table = Table::new(name);
        for column in columns {
            table.add_column(Column::new(column, TypeKind::Integer)).unwrap();
        }
        table
    }

    #[test]
    fn synchronized_schemas_are_up_to_date() {
        let s = schema(vec![table("t", &["id"])]);
        assert_eq!(render_status(&compare(&s, &s)), "Schema up-to-date.\n");
    }

    #[test]
    fn lists_table_and_column_changes() {
        let file = schema(vec![table("t", &["id", "gone"]), table("old", &["id"])]);
        let mut live_t = table("t", &["id", "age"]);
        live_t.add_index(Index::new("t_age", vec!["age".to_string()]).unique(true)).unwrap();
        let live = schema(vec![live_t, table("fresh", &["id"])]);

        let report = render_status(&compare(&file, &live));

        let expected_head = "modified: table `t`\n  Added column `age`.\n  Removed column `gone`.\n  Added index `t_age` on UNIQUE `age`\n\nadded: table `fresh`\ndeleted: table `old`\n";
        assert!(report.starts_with(expected_head), "{}", report);
        assert!(report.contains("You need to synchronize"));
    }

    #[test]
    fn describes_composite_keys() {
        let index = Index::new("i", vec!["a".to_string(), "b".to_string()]);
        assert_eq!(desc_index(&index), "(`a`,`b`)");

        let fk = ForeignKey::new("f", vec!["a".to_string()], "other", vec!["id".to_string()]);
        assert_eq!(desc_foreign_key(&fk), "`a` => `other`.`id`");

        let fk = ForeignKey::new(
            "f",
            vec!["a".to_string(), "b".to_string()],
            "other",
            vec!["x".to_string(), "y".to_string()],
        );
        assert_eq!(desc_foreign_key(&fk), "(`a`,`b`) => `other` (`x`,`y`)");
    }

    #[test]
    fn summary_skips_empty_categories() {
        let before = schema(vec![table("a", &["id"])]);
        let after = schema(vec![table("a", &["id", "x"]), table("b", &["id"])]);

        assert_eq!(apply_summary(&compare(&before, &after)), vec!["1 changed tables", "1 new tables"]);
    }
}

//! Schema difference calculator
//!
//! This module compares two schema snapshots and calculates the differences.
//! Objects are matched by name; every list in the result follows the declaration
//! order of the snapshot it was taken from, so the same inputs always produce the
//! same diff (and the same SQL).

use indexmap::IndexMap;
use serde::Serialize;

use crate::schema::types::{Column, ColumnProperty, ForeignKey, Index, Schema, Table};

/// Comparator settings
#[derive(Debug, Clone, Copy, Default)]
pub struct CompareOptions {
    /// Pair a removed column/index with an added one of identical definition and
    /// report it as a rename. This is a heuristic: it only fires when the pairing is
    /// unambiguous, and it can still be wrong.
    pub detect_renames: bool,
}

/// Represents changes needed to turn one schema into another
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SchemaDiff {
    pub changed_tables: IndexMap<String, TableDiff>,
    pub new_tables: Vec<Table>,
    pub removed_tables: Vec<Table>,
}

/// Changes to a table present in both schemas
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableDiff {
    pub name: String,
    pub added_columns: IndexMap<String, Column>,
    pub removed_columns: IndexMap<String, Column>,
    pub changed_columns: IndexMap<String, ColumnChange>,
    /// Old name to renamed column
    pub renamed_columns: IndexMap<String, Column>,
    pub added_indexes: IndexMap<String, Index>,
    pub removed_indexes: IndexMap<String, Index>,
    /// Name to new definition
    pub changed_indexes: IndexMap<String, Index>,
    /// Old name to renamed index
    pub renamed_indexes: IndexMap<String, Index>,
    pub added_foreign_keys: IndexMap<String, ForeignKey>,
    pub removed_foreign_keys: IndexMap<String, ForeignKey>,
    /// Name to new definition
    pub changed_foreign_keys: IndexMap<String, ForeignKey>,
}

/// Represents a column change
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnChange {
    pub column_name: String,
    pub from: Column,
    pub to: Column,
    pub changed_properties: Vec<ColumnProperty>,
}

impl ColumnChange {
    pub fn has_changed(&self, property: ColumnProperty) -> bool {
        self.changed_properties.contains(&property)
    }

    /// Whether the type family or any size parameter changed
    pub fn type_changed(&self) -> bool {
        self.changed_properties.iter().any(|p| {
            matches!(
                p,
                ColumnProperty::Type
                    | ColumnProperty::Length
                    | ColumnProperty::Precision
                    | ColumnProperty::Scale
                    | ColumnProperty::Unsigned
            )
        })
    }
}

/// Compare two schemas with default options (no rename detection)
pub fn compare(from: &Schema, to: &Schema) -> SchemaDiff {
    SchemaDiff::compare(from, to, &CompareOptions::default())
}

impl SchemaDiff {
    /// Calculate what has to change to turn `from` into `to`
    pub fn compare(from: &Schema, to: &Schema, options: &CompareOptions) -> Self {
        // Tables to create (in target but not in current)
        let new_tables = to
            .tables
            .values()
            .filter(|table| !from.has_table(&table.name))
            .cloned()
            .collect();

        // Tables to drop (in current but not in target)
        let removed_tables = from
            .tables
            .values()
            .filter(|table| !to.has_table(&table.name))
            .cloned()
            .collect();

        let changed_tables = to
            .tables
            .values()
            .filter_map(|to_table| {
                let from_table = from.table(&to_table.name)?;
                let table_diff = TableDiff::compare(from_table, to_table, options);
                (!table_diff.is_empty()).then(|| (to_table.name.clone(), table_diff))
            })
            .collect();

        Self {
            changed_tables,
            new_tables,
            removed_tables,
        }
    }

    /// Check if the diff is empty (no changes needed)
    pub fn is_empty(&self) -> bool {
        self.changed_tables.is_empty() && self.new_tables.is_empty() && self.removed_tables.is_empty()
    }
}

impl TableDiff {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            added_columns: IndexMap::new(),
            removed_columns: IndexMap::new(),
            changed_columns: IndexMap::new(),
            renamed_columns: IndexMap::new(),
            added_indexes: IndexMap::new(),
            removed_indexes: IndexMap::new(),
            changed_indexes: IndexMap::new(),
            renamed_indexes: IndexMap::new(),
            added_foreign_keys: IndexMap::new(),
            removed_foreign_keys: IndexMap::new(),
            changed_foreign_keys: IndexMap::new(),
        }
    }

    /// Compare two versions of the same table
    pub fn compare(from: &Table, to: &Table, options: &CompareOptions) -> Self {
        let mut diff = Self::new(&to.name);

        for column in to.columns.values() {
            match from.column(&column.name) {
                None => {
                    diff.added_columns.insert(column.name.clone(), column.clone());
                }
                Some(old) => {
                    let changed_properties = old.changed_properties(column);
                    if !changed_properties.is_empty() {
                        diff.changed_columns.insert(
                            column.name.clone(),
                            ColumnChange {
                                column_name: column.name.clone(),
                                from: old.clone(),
                                to: column.clone(),
                                changed_properties,
                            },
                        );
                    }
                }
            }
        }
        diff.removed_columns = from
            .columns
            .values()
            .filter(|column| !to.has_column(&column.name))
            .map(|column| (column.name.clone(), column.clone()))
            .collect();

        for index in to.indexes.values() {
            match from.indexes.get(&index.name) {
                None => {
                    diff.added_indexes.insert(index.name.clone(), index.clone());
                }
                Some(old) if !old.same_definition(index) => {
                    diff.changed_indexes.insert(index.name.clone(), index.clone());
                }
                Some(_) => {}
            }
        }
        diff.removed_indexes = from
            .indexes
            .values()
            .filter(|index| !to.indexes.contains_key(&index.name))
            .map(|index| (index.name.clone(), index.clone()))
            .collect();

        for fk in to.foreign_keys.values() {
            match from.foreign_keys.get(&fk.name) {
                None => {
                    diff.added_foreign_keys.insert(fk.name.clone(), fk.clone());
                }
                Some(old) if old != fk => {
                    diff.changed_foreign_keys.insert(fk.name.clone(), fk.clone());
                }
                Some(_) => {}
            }
        }
        diff.removed_foreign_keys = from
            .foreign_keys
            .values()
            .filter(|fk| !to.foreign_keys.contains_key(&fk.name))
            .map(|fk| (fk.name.clone(), fk.clone()))
            .collect();

        if options.detect_renames {
            diff.renamed_columns = detect_renames(
                &mut diff.removed_columns,
                &mut diff.added_columns,
                Column::same_definition,
            );
            diff.renamed_indexes = detect_renames(
                &mut diff.removed_indexes,
                &mut diff.added_indexes,
                Index::same_definition,
            );
        }

        diff
    }

    /// Check if the table diff is empty (no changes needed)
    pub fn is_empty(&self) -> bool {
        self.added_columns.is_empty()
            && self.removed_columns.is_empty()
            && self.changed_columns.is_empty()
            && self.renamed_columns.is_empty()
            && self.added_indexes.is_empty()
            && self.removed_indexes.is_empty()
            && self.changed_indexes.is_empty()
            && self.renamed_indexes.is_empty()
            && self.added_foreign_keys.is_empty()
            && self.removed_foreign_keys.is_empty()
            && self.changed_foreign_keys.is_empty()
    }
}

/// Move unambiguous (removed, added) pairs with identical definitions out of the
/// removed/added maps and return them as old name -> new object.
///
/// A pair qualifies only when the added object is the single candidate for the
/// removed one and vice versa.
fn detect_renames<T: Clone>(
    removed: &mut IndexMap<String, T>,
    added: &mut IndexMap<String, T>,
    same_definition: fn(&T, &T) -> bool,
) -> IndexMap<String, T> {
    let candidates = |item: &T, pool: &IndexMap<String, T>| -> Vec<String> {
        pool.iter()
            .filter(|(_, other)| same_definition(item, other))
            .map(|(name, _)| name.clone())
            .collect()
    };

    let pairs: Vec<(String, String)> = {
        let (removed, added) = (&*removed, &*added);
        removed
            .iter()
            .filter_map(|(old_name, old)| {
                let [new_name]: [String; 1] = candidates(old, added).try_into().ok()?;
                let [back]: [String; 1] = candidates(&added[&new_name], removed).try_into().ok()?;
                (&back == old_name).then_some((old_name.clone(), new_name))
            })
            .collect()
    };

    let mut renamed = IndexMap::new();
    for (old_name, new_name) in pairs {
        removed.shift_remove(&old_name);
        if let Some(item) = added.shift_remove(&new_name) {
            renamed.insert(old_name, item);
        }
    }
    renamed
}

//! Column reorder planner
//!
//! Aligns a table's physical column order with a desired order using
//! `MODIFY ... FIRST | AFTER` clauses. The planner walks the desired order with one
//! cursor and a simulated copy of the physical order with another; every move it
//! plans is applied to the simulation, so the first `j` physical columns always
//! equal the columns placed so far.

use serde::Serialize;

use crate::error::Result;
use crate::schema::dialect::Dialect;
use crate::schema::types::Table;

/// One planned repositioning
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnMove {
    pub column: String,
    /// Column to place it after; `None` means first
    pub after: Option<String>,
}

/// Plan the moves that bring `table`'s columns into `order`.
///
/// Names in `order` that the table does not have are ignored, and so is any repeat
/// of a name already placed. Columns missing from `order` end up after all ordered
/// columns, keeping their relative order.
pub fn plan_reorder<S: AsRef<str>>(table: &Table, order: &[S]) -> Vec<ColumnMove> {
    let mut physical: Vec<&str> = table.column_names().collect();
    let mut moves = Vec::new();
    let mut previous: Option<&str> = None;
    let mut j = 0;

    for name in order.iter().map(AsRef::as_ref) {
        if !table.has_column(name) || physical[..j].contains(&name) {
            continue;
        }

        if physical[j] != name {
            let from = physical
                .iter()
                .position(|column| *column == name)
                .unwrap_or(j);
            let column = physical.remove(from);
            physical.insert(j, column);
            moves.push(ColumnMove {
                column: name.to_string(),
                after: previous.map(str::to_string),
            });
        }

        previous = Some(physical[j]);
        j += 1;
    }

    moves
}

/// Render the moves for `table` as a single `ALTER TABLE` statement, or `None`
/// when the columns are already in order.
pub fn reorder_sql<S: AsRef<str>>(dialect: &dyn Dialect, table: &Table, order: &[S]) -> Result<Option<String>> {
    let moves = plan_reorder(table, order);
    if moves.is_empty() {
        return Ok(None);
    }

    let mut clauses = Vec::with_capacity(moves.len());
    for column_move in &moves {
        // Moves only name columns of `table`
        if let Some(column) = table.column(&column_move.column) {
            clauses.push(dialect.modify_column_position_clause(column, column_move.after.as_deref())?);
        }
    }

    Ok(Some(format!(
        "ALTER TABLE {} {};",
        dialect.quote_identifier(&table.name),
        clauses.join(", ")
    )))
}

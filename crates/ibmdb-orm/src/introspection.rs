//! Schema introspection through the catalog functions.

use ibmdb::{Connection, Result, ResultRow};

// Positions in the CLI catalog result sets; names vary with the case policy.
const TABLE_NAME_POSITION: usize = 2;
const TABLE_TYPE_POSITION: usize = 3;
const COLUMN_NAME_POSITION: usize = 3;

#[derive(Debug, Clone, Copy, Default)]
pub struct DatabaseIntrospection;

impl DatabaseIntrospection {
    /// Names of tables and views visible in `schema` (all schemas if `None`).
    pub fn table_names(connection: &Connection, schema: Option<&str>) -> Result<Vec<String>> {
        let rows = connection.tables(schema, None)?;
        Ok(rows
            .iter()
            .filter(|row| is_relation(row))
            .filter_map(|row| text_at(row, TABLE_NAME_POSITION))
            .collect())
    }

    /// Column names of `table` in catalog order.
    pub fn column_names(
        connection: &Connection,
        schema: Option<&str>,
        table: &str,
    ) -> Result<Vec<String>> {
        let rows = connection.columns(schema, Some(table))?;
        Ok(rows
            .iter()
            .filter_map(|row| text_at(row, COLUMN_NAME_POSITION))
            .collect())
    }
}

fn is_relation(row: &ResultRow) -> bool {
    text_at(row, TABLE_TYPE_POSITION).is_none_or(|kind| kind == "TABLE" || kind == "VIEW")
}

fn text_at(row: &ResultRow, position: usize) -> Option<String> {
    row.get(position)
        .and_then(|value| value.as_str())
        .map(|s| s.trim_end().to_string())
}

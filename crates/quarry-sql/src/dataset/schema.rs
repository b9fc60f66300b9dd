//! Schema introspection.

use quarry_core::errors::DatasetError;
use quarry_core::models::{ColumnSchema, SchemaDescription, TableSchema};
use rusqlite::Connection;

/// Tables and views in creation order, with their columns.
pub fn introspect(conn: &Connection) -> Result<SchemaDescription, DatasetError> {
    let err = |e: rusqlite::Error| DatasetError::SchemaIntrospection {
        reason: e.to_string(),
    };

    let mut stmt = conn
        .prepare(
            "SELECT name FROM sqlite_master
             WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite_%'
             ORDER BY rowid",
        )
        .map_err(err)?;
    let names: Vec<String> = stmt
        .query_map([], |row| row.get(0))
        .map_err(err)?
        .collect::<Result<_, _>>()
        .map_err(err)?;

    let mut col_stmt = conn
        .prepare("SELECT name, type FROM pragma_table_info(?1) ORDER BY cid")
        .map_err(err)?;
    let mut tables = Vec::with_capacity(names.len());
    for name in names {
        let columns: Vec<ColumnSchema> = col_stmt
            .query_map([&name], |row| {
                Ok(ColumnSchema {
                    name: row.get(0)?,
                    data_type: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                })
            })
            .map_err(err)?
            .collect::<Result<_, _>>()
            .map_err(err)?;
        if !columns.is_empty() {
            tables.push(TableSchema { name, columns });
        }
    }
    Ok(SchemaDescription::new(tables))
}

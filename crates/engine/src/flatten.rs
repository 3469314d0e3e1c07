//! Flattening of `executeQueries` responses into named rows.

use api_types::query::{ExecuteQueriesResponse, ResultTable};
use serde::Deserialize;
use serde_json::Value;

use crate::{RawRecord, SourceError};

/// Converts an `executeQueries` body into one record per row of the first
/// table of the first result.
///
/// A body without results, tables or rows is a legitimate "no data" answer
/// and yields an empty vector. A body that is not the documented envelope,
/// or rows that are neither objects nor arrays, are a protocol error.
pub fn flatten(raw: &Value) -> Result<Vec<RawRecord>, SourceError> {
    let response = ExecuteQueriesResponse::deserialize(raw)
        .map_err(|err| SourceError::Protocol(format!("invalid executeQueries body: {err}")))?;

    let Some(table) = response
        .results
        .and_then(|results| results.into_iter().next())
        .and_then(|result| result.tables)
        .and_then(|tables| tables.into_iter().next())
    else {
        return Ok(Vec::new());
    };

    flatten_table(table)
}

fn flatten_table(table: ResultTable) -> Result<Vec<RawRecord>, SourceError> {
    let columns: Vec<Option<String>> = table
        .columns
        .unwrap_or_default()
        .into_iter()
        .map(|column| column.name)
        .collect();

    let rows = table.rows.unwrap_or_default();
    let mut records = Vec::with_capacity(rows.len());
    for (index, row) in rows.into_iter().enumerate() {
        let record = match row {
            Value::Object(cells) => cells
                .into_iter()
                .map(|(name, value)| (clean_column_name(&name).to_string(), value))
                .collect(),
            Value::Array(cells) => zip_row(&columns, cells),
            other => {
                return Err(SourceError::Protocol(format!(
                    "row {index} is neither an object nor an array: {other}"
                )));
            }
        };
        records.push(record);
    }
    Ok(records)
}

/// Pairs positional cells with column names. Short rows are padded with
/// nulls, surplus cells and unnamed columns are dropped.
fn zip_row(columns: &[Option<String>], cells: Vec<Value>) -> RawRecord {
    let mut cells = cells.into_iter();
    let mut record = RawRecord::new();
    for column in columns {
        let value = cells.next().unwrap_or(Value::Null);
        if let Some(name) = column {
            record.insert(clean_column_name(name).to_string(), value);
        }
    }
    record
}

/// `Table[Column]` becomes `Column`; names without `[` are kept.
pub fn clean_column_name(name: &str) -> &str {
    match name.split_once('[') {
        Some((_, rest)) => rest.trim_end_matches(']'),
        None => name,
    }
}

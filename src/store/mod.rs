pub mod memory;
pub mod sqlite;

use crate::core::record::{COLUMNS, FundRecord, IDENTIFIER_INDEX};
use rusqlite::types::Value;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error("Duplicate primary key '{0}'")]
    DuplicateKey(String),
    #[error("Value '{value}' violates the {column} column constraint")]
    Constraint { column: &'static str, value: String },
    #[error("Table {0} has not been provisioned")]
    NotProvisioned(String),
    #[error("Invalid table name: {0:?}")]
    InvalidTableName(String),
    #[error("Failed to create directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Destination table for fund records.
///
/// `provision` leaves an empty table with the current schema whatever its
/// previous state. `insert_chunk` inserts and commits a chunk as one unit:
/// either every record of the chunk lands or none does.
pub trait FundTable {
    fn table_name(&self) -> &str;

    fn provision(&mut self) -> Result<(), StoreError>;

    fn insert_chunk(&mut self, records: &[FundRecord]) -> Result<(), StoreError>;

    fn row_count(&self) -> Result<u64, StoreError>;
}

/// Checks `record` against the column widths of the table schema and
/// requires a digits-only identifier, mirroring the SQL `CHECK` clauses.
pub fn check_constraints(record: &FundRecord) -> Result<(), StoreError> {
    for (idx, (def, value)) in COLUMNS.iter().zip(record.values()).enumerate() {
        let Value::Text(text) = value else {
            continue;
        };
        let too_long = def.max_len().is_some_and(|max| text.chars().count() > max);
        let bad_key = idx == IDENTIFIER_INDEX && !text.chars().all(|c| c.is_ascii_digit());
        if too_long || bad_key {
            return Err(StoreError::Constraint {
                column: def.name,
                value: text,
            });
        }
    }
    Ok(())
}

/// Accepts plain SQL identifiers only, since table names end up inside DDL.
pub fn validate_table_name(name: &str) -> Result<(), StoreError> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidTableName(name.to_string()))
    }
}

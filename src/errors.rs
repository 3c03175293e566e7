use std::io;

use thiserror::Error;

use crate::table::LogicalType;
use crate::types::{ColumnName, TableName};

/// Error type for loading, normalization, key derivation, and join failures.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A row could not be parsed into the declared column count.
    /// Row-scoped; recoverable per [`crate::loader::MalformedRowPolicy`].
    #[error(
        "malformed record in '{location}' at row {row}: expected {expected} fields, found {found}"
    )]
    MalformedRecord {
        /// File or stream the row came from.
        location: String,
        /// Line number within the source, when the reader can report one.
        row: u64,
        /// Declared column count.
        expected: usize,
        /// Field count actually present in the row.
        found: usize,
    },
    /// A stage referenced a column that does not exist (or collides) in its
    /// input table. Fatal to the run; raised before any row processing.
    #[error("schema mismatch in table '{table}' on column '{column}': {details}")]
    SchemaMismatch {
        /// Offending table.
        table: TableName,
        /// Missing or colliding column.
        column: ColumnName,
        /// What went wrong with the column.
        details: String,
    },
    /// A cell failed coercion under [`crate::normalize::Leniency::Strict`].
    /// Under lenient mode the failure becomes a counted null instead.
    #[error("cannot coerce value '{value}' in column '{column}' to {target:?}")]
    TypeCoercion {
        /// Column being coerced.
        column: ColumnName,
        /// Text rendering of the uncoercible cell.
        value: String,
        /// Target logical type.
        target: LogicalType,
    },
    /// Parse-layer failure in the delimited reader (encoding, truncated quote).
    #[error("delimited parse failure in '{location}': {source}")]
    Delimited {
        /// File or stream the failure occurred in.
        location: String,
        /// Underlying reader error.
        #[source]
        source: csv::Error,
    },
    /// Transport-level I/O failure; retry is the host runner's concern.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// Invalid descriptor or stage configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl PipelineError {
    /// Schema mismatch for a column absent from `table`.
    pub fn missing_column(table: impl Into<TableName>, column: impl Into<ColumnName>) -> Self {
        Self::SchemaMismatch {
            table: table.into(),
            column: column.into(),
            details: "column not present".to_string(),
        }
    }

    /// Schema mismatch for a column that would be silently overwritten.
    pub fn duplicate_column(table: impl Into<TableName>, column: impl Into<ColumnName>) -> Self {
        Self::SchemaMismatch {
            table: table.into(),
            column: column.into(),
            details: "column already exists".to_string(),
        }
    }
}

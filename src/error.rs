use thiserror::Error;

/// Convenience result type for table construction and ingestion.
pub type TableResult<T> = Result<T, TableError>;

/// Error type returned by fallible table operations.
///
/// Normalization itself never fails; this enum covers ingestion, dataset construction and column
/// replacement.
#[derive(Debug, Error)]
pub enum TableError {
    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON input.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The input does not conform to the provided schema (missing columns, wrong arity, etc.).
    #[error("schema mismatch: {message}")]
    SchemaMismatch { message: String },

    /// A value could not be parsed into the required [`crate::types::DataType`].
    #[error("failed to parse value at row {row} column '{column}': {message} (raw='{raw}')")]
    ParseError {
        row: usize,
        column: String,
        raw: String,
        message: String,
    },

    /// The named column does not exist.
    #[error("column not found: '{name}'")]
    ColumnNotFound { name: String },

    /// A column has a different number of values than the table has rows.
    #[error("column '{column}' has {actual} values, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },
}

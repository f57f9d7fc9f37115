/// Error types for TripStats
///
/// Loading and derivation errors abort a whole query cycle. Aggregation errors
/// are scoped to the statistic group that produced them. Data integrity
/// problems found during aggregation are not errors at all: they travel as
/// warnings inside the result (see `stats::DataIntegrityWarning`).

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TripError {
    /// No dataset is registered for the requested city key, or its file is missing.
    #[error("no dataset available for city '{city}'")]
    DatasetNotFound { city: String },

    /// A record could not be loaded: missing required column or unparsable cell.
    /// `line` is 1-based and counts the header as line 1; 0 means the header itself.
    #[error("malformed record at line {line}, column '{column}': {reason}")]
    MalformedRecord {
        line: usize,
        column: String,
        reason: String,
    },

    #[error("column '{0}' not found")]
    ColumnNotFound(String),

    #[error("type mismatch in column '{column}': expected {expected}, found {found}")]
    TypeMismatch {
        column: String,
        expected: String,
        found: String,
    },

    /// A month/day/city selection outside the supported option set.
    #[error("invalid {field} selection '{value}'")]
    InvalidSelection { field: &'static str, value: String },

    #[error("row {index} out of range [0, {len})")]
    RowOutOfRange { index: usize, len: usize },

    #[error("failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TripError {
    pub(crate) fn malformed(line: usize, column: &str, reason: impl Into<String>) -> Self {
        TripError::MalformedRecord {
            line,
            column: column.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TripError>;

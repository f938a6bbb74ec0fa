//! Error types for source table loading.

use thiserror::Error;

/// Result type for loader operations.
pub type Result<T> = std::result::Result<T, SourceFormatError>;

/// A source table is malformed or incomplete.
///
/// Every variant names the source table so the pipeline can report which
/// input halted the run.
#[derive(Debug, Error)]
pub enum SourceFormatError {
    /// A column required by the source schema is absent
    #[error("{source_name}: missing required column '{column}' (found: {found})")]
    MissingColumn {
        /// Source table name
        source_name: String,
        /// Normalized name of the missing column
        column: String,
        /// Normalized columns that were present
        found: String,
    },

    /// No column could be identified as the fiscal-year key
    #[error("{source_name}: no year column (expected one of: {candidates})")]
    MissingYearColumn {
        /// Source table name
        source_name: String,
        /// Accepted year column names
        candidates: String,
    },

    /// Two headers normalize to the same column name
    #[error("{source_name}: duplicate column '{column}' after normalization")]
    DuplicateColumn {
        /// Source table name
        source_name: String,
        /// Normalized column name
        column: String,
    },

    /// The year cell holds no recognizable four-digit year
    #[error("{source_name} line {line}: cannot parse year from '{value}'")]
    InvalidYear {
        /// Source table name
        source_name: String,
        /// 1-based line number in the input
        line: u64,
        /// Raw cell contents
        value: String,
    },

    /// A schema column holds a non-numeric, non-missing value
    #[error("{source_name} line {line}: column '{column}' has non-numeric value '{value}'")]
    InvalidValue {
        /// Source table name
        source_name: String,
        /// 1-based line number in the input
        line: u64,
        /// Normalized column name
        column: String,
        /// Raw cell contents
        value: String,
    },

    /// The table has a header but no data rows
    #[error("{source_name}: table has no data rows")]
    Empty {
        /// Source table name
        source_name: String,
    },

    /// CSV decoding error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The source file could not be opened
    #[error("IO error reading {path}: {source}")]
    Io {
        /// Path that failed to open
        path: String,
        /// Underlying IO error
        source: std::io::Error,
    },
}

//! Error types for panel construction and validation.

use credence_data::SourceKind;
use serde::Serialize;
use thiserror::Error;

/// A structural defect that must never reach the estimator.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PanelIntegrityError {
    /// The panel has no rows
    #[error("panel is empty")]
    EmptyPanel,

    /// A row has no year key
    #[error("row {row}: missing year key")]
    MissingYear {
        /// Zero-based row index
        row: usize,
    },

    /// A year appears more than once
    #[error("duplicate year {year} ({count} rows)")]
    DuplicateYear {
        /// The repeated year
        year: i32,
        /// Number of rows carrying it
        count: usize,
    },

    /// Rows are not in non-decreasing year order
    #[error("row {row}: year {year} follows {previous}; panel must be sorted by year")]
    UnsortedYears {
        /// Zero-based row index
        row: usize,
        /// Year on this row
        year: i32,
        /// Year on the previous row
        previous: i32,
    },

    /// A year lies outside the documented coverage window
    #[error("year {year} outside coverage window {start}-{end}")]
    OutsideCoverage {
        /// Offending year
        year: i32,
        /// First covered year
        start: i32,
        /// Last covered year
        end: i32,
    },

    /// Years are absent from the sequence and not listed as documented gaps
    #[error("undocumented gap: years {from}-{to} absent from panel")]
    UndocumentedGap {
        /// First absent year
        from: i32,
        /// Last absent year
        to: i32,
    },

    /// A required core column is not in the panel
    #[error("missing required column '{column}'")]
    MissingColumn {
        /// Column name
        column: String,
    },

    /// A core column has more unexpected missing values than allowed
    #[error(
        "column '{column}': {missing} of {rows} values missing ({:.1}%), threshold {:.1}%",
        .fraction * 100.0,
        .threshold * 100.0
    )]
    ExcessMissingness {
        /// Column name
        column: String,
        /// Unexpected missing values
        missing: usize,
        /// Panel rows
        rows: usize,
        /// `missing / rows`
        fraction: f64,
        /// Configured maximum fraction
        threshold: f64,
    },
}

/// The validator rejected the panel.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("panel rejected with {} integrity violation(s): {}", .violations.len(), summarize(.violations))]
pub struct PanelRejected {
    /// Every violation found, in check order
    pub violations: Vec<PanelIntegrityError>,
}

fn summarize(violations: &[PanelIntegrityError]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors raised while building a panel.
#[derive(Debug, Error)]
pub enum PanelError {
    /// A source table was passed in the wrong slot
    #[error("expected a {expected} source table, got {actual}")]
    SourceKindMismatch {
        /// Kind required for this slot
        expected: SourceKind,
        /// Kind actually supplied
        actual: SourceKind,
    },

    /// Structural integrity failure found during construction
    #[error("panel integrity error: {0}")]
    Integrity(#[from] PanelIntegrityError),

    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),
}

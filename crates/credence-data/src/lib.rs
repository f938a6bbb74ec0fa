#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/credence/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod loader;
pub mod normalize;
pub mod source;

pub use error::{Result, SourceFormatError};
pub use loader::{load_source_path, load_source_reader};
pub use normalize::{normalize_column_name, parse_numeric, parse_year};
pub use source::{
    RawSourceRecord, SourceKind, SourceSchema, SourceSummary, SourceTable, YEAR_COLUMNS,
};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

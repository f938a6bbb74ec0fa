#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/credence/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod export;
pub mod manifest;
pub mod tables;
pub mod writer;

pub use export::{ExportError, ExportFormat, Exporter};
pub use manifest::{PanelSummary, RunManifest};
pub use tables::{ComparisonTable, RegressionSummary, SourceSummaryTable, StabilityTable};
pub use writer::{OutputWriter, spec_file_name};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

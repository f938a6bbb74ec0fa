#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/credence/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod builder;
pub mod error;
pub mod panel;
pub mod report;
pub mod schema;
pub mod validator;

pub use builder::{BuilderConfig, PanelBuilder, SourceSet};
pub use error::{PanelError, PanelIntegrityError, PanelRejected};
pub use panel::{AnalysisPanel, AnalysisPanelRow};
pub use report::{ColumnQuality, PanelQualityReport, PlausibilityWarning, YearGap};
pub use schema::{
    CORE_COLUMNS, DictionaryEntry, PANEL_SCHEMA, PlausibleRange, Provenance, VariableDef,
    VariableKind, YEAR,
};
pub use validator::{PanelValidator, ValidatedPanel, Validation, ValidationConfig, Verdict};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

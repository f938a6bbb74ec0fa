#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/credence/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod pipeline;

// Re-export main types from sub-crates
pub use credence_data as data;
pub use credence_model as model;
pub use credence_output as output;
pub use credence_panel as panel;

pub use config::{ConfigError, PipelineConfig, SourcePaths};
pub use pipeline::{Mode, Pipeline, PipelineError, PipelineOutput, Stage};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

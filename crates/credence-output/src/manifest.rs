//! Run manifest.

use crate::export::{ExportError, ExportFormat, Exporter, to_json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Panel summary recorded in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelSummary {
    /// Rows
    pub rows: usize,
    /// First year
    pub first_year: Option<i32>,
    /// Last year
    pub last_year: Option<i32>,
    /// Validator verdict
    pub accepted: bool,
    /// Plausibility flags raised
    pub warnings: usize,
}

/// What one pipeline run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    /// Producing tool version
    pub version: String,
    /// When the run finished
    pub generated_at: DateTime<Utc>,
    /// Files written, relative to the output directory
    pub files: Vec<String>,
    /// Panel summary, if a panel was built
    pub panel: Option<PanelSummary>,
    /// Specifications fitted successfully
    pub fitted: Vec<String>,
    /// Specifications that failed
    pub failed: Vec<String>,
}

impl RunManifest {
    /// Empty manifest stamped with the current time.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            generated_at: Utc::now(),
            files: Vec::new(),
            panel: None,
            fitted: Vec::new(),
            failed: Vec::new(),
        }
    }
}

impl Exporter for RunManifest {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Json | ExportFormat::PrettyJson => to_json(self, format),
            ExportFormat::Csv | ExportFormat::Markdown => Err(ExportError::UnsupportedFormat {
                format,
                what: "run manifest",
            }),
        }
    }
}

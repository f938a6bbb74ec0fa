//! Writes the standard file set into one output directory.

use crate::export::{ExportError, ExportFormat, Exporter};
use crate::manifest::RunManifest;
use crate::tables::{ComparisonTable, RegressionSummary, SourceSummaryTable, StabilityTable};
use credence_data::SourceSummary;
use credence_model::{RegressionResult, RobustnessReport};
use credence_panel::schema;
use credence_panel::{AnalysisPanel, PanelQualityReport};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Per-source input summary CSV
pub const SOURCE_SUMMARY_FILE: &str = "data_validation_summary.csv";
/// Per-source input report, Markdown
pub const SOURCE_REPORT_FILE: &str = "data_validation_report.md";
/// Panel CSV
pub const PANEL_FILE: &str = "final_panel.csv";
/// Variable dictionary CSV
pub const DICTIONARY_FILE: &str = "data_dictionary.csv";
/// Quality report stem; written as `.md` and `.json`
pub const QUALITY_STEM: &str = "final_panel_quality";
/// Baseline estimates in summary layout
pub const BASELINE_FILE: &str = "baseline_regression.csv";
/// Model comparison metrics
pub const METRICS_FILE: &str = "robustness_model_metrics.csv";
/// Long-form coefficient comparison
pub const COMPARISON_FILE: &str = "robustness_comparison_table.csv";
/// Coefficient stability
pub const STABILITY_FILE: &str = "coefficient_stability.csv";
/// Whole battery as JSON
pub const ROBUSTNESS_FILE: &str = "robustness.json";
/// Run manifest
pub const MANIFEST_FILE: &str = "run_manifest.json";

/// File name for a specification's tidy estimates.
///
/// Characters outside `[A-Za-z0-9_-]` become `_`.
pub fn spec_file_name(spec: &str) -> String {
    let stem: String = spec
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("{stem}.csv")
}

/// Writes pipeline outputs and records every file it produced.
#[derive(Debug, Clone)]
pub struct OutputWriter {
    out_dir: PathBuf,
    written: Vec<String>,
}

impl OutputWriter {
    /// Writer rooted at `out_dir`; the directory is created on demand.
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            written: Vec::new(),
        }
    }

    /// Output directory.
    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Files written so far, relative to the output directory, in order.
    pub fn written(&self) -> &[String] {
        &self.written
    }

    fn write(
        &mut self,
        name: &str,
        value: &impl Exporter,
        format: ExportFormat,
    ) -> Result<PathBuf, ExportError> {
        let path = self.out_dir.join(name);
        value.export_to_file(&path, format)?;
        info!(path = %path.display(), %format, "wrote output");
        if !self.written.iter().any(|w| w == name) {
            self.written.push(name.to_string());
        }
        Ok(path)
    }

    /// Write the per-source input summary as CSV and Markdown.
    pub fn write_source_summary(
        &mut self,
        summaries: &[SourceSummary],
    ) -> Result<Vec<PathBuf>, ExportError> {
        let table = SourceSummaryTable(summaries);
        let csv = self.write(SOURCE_SUMMARY_FILE, &table, ExportFormat::Csv)?;
        let md = self.write(SOURCE_REPORT_FILE, &table, ExportFormat::Markdown)?;
        Ok(vec![csv, md])
    }

    /// Write `final_panel.csv`.
    pub fn write_panel(&mut self, panel: &AnalysisPanel) -> Result<PathBuf, ExportError> {
        self.write(PANEL_FILE, panel, ExportFormat::Csv)
    }

    /// Write `data_dictionary.csv`, generated from the panel schema.
    pub fn write_dictionary(&mut self) -> Result<PathBuf, ExportError> {
        self.write(DICTIONARY_FILE, &schema::dictionary(), ExportFormat::Csv)
    }

    /// Write the quality report as Markdown and pretty JSON.
    pub fn write_quality_report(
        &mut self,
        report: &PanelQualityReport,
    ) -> Result<Vec<PathBuf>, ExportError> {
        let md = self.write(&format!("{QUALITY_STEM}.md"), report, ExportFormat::Markdown)?;
        let json = self.write(&format!("{QUALITY_STEM}.json"), report, ExportFormat::PrettyJson)?;
        Ok(vec![md, json])
    }

    /// Write `baseline_regression.csv` in summary layout.
    pub fn write_baseline(&mut self, result: &RegressionResult) -> Result<PathBuf, ExportError> {
        self.write(BASELINE_FILE, &RegressionSummary(result), ExportFormat::Csv)
    }

    /// Write one specification's tidy estimates to `<spec>.csv`.
    pub fn write_regression(&mut self, result: &RegressionResult) -> Result<PathBuf, ExportError> {
        self.write(&spec_file_name(&result.specification), result, ExportFormat::Csv)
    }

    /// Write the robustness battery: tidy estimates per fitted specification,
    /// comparison metrics, coefficient table, stability and the JSON report.
    pub fn write_robustness(&mut self, report: &RobustnessReport) -> Result<Vec<PathBuf>, ExportError> {
        let mut paths = Vec::new();
        for result in report.fitted() {
            paths.push(self.write_regression(result)?);
        }
        debug!(failed = report.n_failed(), "skipped tidy tables for failed specifications");
        paths.push(self.write(METRICS_FILE, report, ExportFormat::Csv)?);
        paths.push(self.write(COMPARISON_FILE, &ComparisonTable(report), ExportFormat::Csv)?);
        paths.push(self.write(STABILITY_FILE, &StabilityTable(report), ExportFormat::Csv)?);
        paths.push(self.write(ROBUSTNESS_FILE, report, ExportFormat::PrettyJson)?);
        Ok(paths)
    }

    /// Write `run_manifest.json`, listing every file written before it.
    pub fn write_manifest(&mut self, manifest: &mut RunManifest) -> Result<PathBuf, ExportError> {
        manifest.files = self.written.clone();
        self.write(MANIFEST_FILE, manifest, ExportFormat::PrettyJson)
    }

    /// Remove the output directory, if it exists.
    pub fn clean(&self) -> Result<(), ExportError> {
        match fs::remove_dir_all(&self.out_dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ExportError::io(&self.out_dir, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("spec_1_baseline", "spec_1_baseline.csv")]
    #[case("spec 5/funding", "spec_5_funding.csv")]
    #[case("a-b", "a-b.csv")]
    fn test_spec_file_name(#[case] spec: &str, #[case] expected: &str) {
        assert_eq!(spec_file_name(spec), expected);
    }

    #[test]
    fn test_written_records_once() {
        let dir = std::env::temp_dir().join(format!("credence-writer-{}", std::process::id()));
        let mut writer = OutputWriter::new(&dir);
        writer.write_dictionary().unwrap();
        writer.write_dictionary().unwrap();
        assert_eq!(writer.written(), [DICTIONARY_FILE]);
        assert!(dir.join(DICTIONARY_FILE).exists());
        writer.clean().unwrap();
        assert!(!dir.exists());
    }
}

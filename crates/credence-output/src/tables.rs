//! [`Exporter`] implementations for panel and regression outputs.

use crate::export::{ExportError, ExportFormat, Exporter, cell, finish, to_csv, to_json};
use credence_data::SourceSummary;
use credence_model::{InferenceDistribution, RegressionResult, RobustnessReport, SpecFamily};
use credence_panel::schema::DictionaryEntry;
use credence_panel::{AnalysisPanel, PanelQualityReport, YEAR};
use serde::Serialize;
use std::fmt::Write as _;

fn unsupported(format: ExportFormat, what: &'static str) -> ExportError {
    ExportError::UnsupportedFormat { format, what }
}

impl Exporter for AnalysisPanel {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Json | ExportFormat::PrettyJson => to_json(self, format),
            ExportFormat::Csv => {
                let mut wtr = csv::Writer::from_writer(vec![]);
                let mut header = vec![YEAR.to_string()];
                header.extend(self.columns().iter().cloned());
                wtr.write_record(&header)?;
                for row in self.rows() {
                    let mut record = vec![row.year.to_string()];
                    record.extend(self.columns().iter().map(|c| cell(row.get(c))));
                    wtr.write_record(&record)?;
                }
                finish(wtr)
            }
            ExportFormat::Markdown => Err(unsupported(format, "analysis panel")),
        }
    }
}

impl Exporter for Vec<DictionaryEntry> {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Json | ExportFormat::PrettyJson => to_json(self, format),
            ExportFormat::Csv => to_csv(self),
            ExportFormat::Markdown => {
                let mut md = String::from("| Variable | Kind | Definition | Source | Unit |\n");
                md.push_str("|----------|------|------------|--------|------|\n");
                for entry in self {
                    let _ = writeln!(
                        md,
                        "| `{}` | {} | {} | {} | {} |",
                        entry.variable, entry.kind, entry.definition, entry.source, entry.unit
                    );
                }
                Ok(md)
            }
        }
    }
}

#[derive(Serialize)]
struct ColumnQualityRecord<'a> {
    column: &'a str,
    core: bool,
    missing: usize,
    expected_missing: usize,
    missing_fraction: f64,
    min: Option<f64>,
    max: Option<f64>,
}

impl Exporter for PanelQualityReport {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Json | ExportFormat::PrettyJson => to_json(self, format),
            ExportFormat::Markdown => Ok(self.to_markdown()),
            ExportFormat::Csv => to_csv(self.column_quality.iter().map(|c| ColumnQualityRecord {
                column: &c.name,
                core: c.core,
                missing: c.missing,
                expected_missing: c.expected_missing,
                missing_fraction: c.missing_fraction,
                min: c.min,
                max: c.max,
            })),
        }
    }
}

#[derive(Serialize)]
struct SourceSummaryRecord<'a> {
    source: String,
    path: &'a str,
    rows: usize,
    columns: usize,
    first_year: Option<i32>,
    last_year: Option<i32>,
    duplicate_years: usize,
    missing_values: usize,
    column_names: String,
}

/// Input report: one row per loaded source table, before the merge.
#[derive(Debug, Clone, Copy)]
pub struct SourceSummaryTable<'a>(pub &'a [SourceSummary]);

impl Exporter for SourceSummaryTable<'_> {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Json | ExportFormat::PrettyJson => to_json(self.0, format),
            ExportFormat::Csv => to_csv(self.0.iter().map(|s| SourceSummaryRecord {
                source: s.source.to_string(),
                path: s.path.as_deref().unwrap_or_default(),
                rows: s.rows,
                columns: s.columns,
                first_year: s.first_year,
                last_year: s.last_year,
                duplicate_years: s.duplicate_years,
                missing_values: s.missing_values,
                column_names: s.column_names.join(";"),
            })),
            ExportFormat::Markdown => {
                let mut md = String::from("# Source validation report
");
                for s in self.0 {
                    let _ = writeln!(md, "
## {}
", s.source);
                    if let Some(path) = &s.path {
                        let _ = writeln!(md, "- File: `{path}`");
                    }
                    let _ = writeln!(md, "- Rows: {}", s.rows);
                    let _ = writeln!(md, "- Columns: {}", s.columns);
                    if let (Some(first), Some(last)) = (s.first_year, s.last_year) {
                        let _ = writeln!(md, "- Years: {first}-{last}");
                    }
                    if s.duplicate_years > 0 {
                        let _ = writeln!(md, "- Duplicate years: {}", s.duplicate_years);
                    }
                    let _ = writeln!(md, "- Missing values: {}", s.missing_values);
                    let names: Vec<String> = s.column_names.iter().map(|c| format!("`{c}`")).collect();
                    let _ = writeln!(md, "- Column names: {}", names.join(", "));
                }
                Ok(md)
            }
        }
    }
}

#[derive(Serialize)]
struct TidyRecord<'a> {
    term: &'a str,
    coef: f64,
    robust_se: f64,
    statistic: f64,
    p_value: f64,
    ci_low: f64,
    ci_high: f64,
}

fn tidy_records(result: &RegressionResult) -> impl Iterator<Item = TidyRecord<'_>> {
    result.terms.iter().map(|t| TidyRecord {
        term: &t.term,
        coef: t.coef,
        robust_se: t.robust_se,
        statistic: t.statistic,
        p_value: t.p_value,
        ci_low: t.ci_low,
        ci_high: t.ci_high,
    })
}

/// Statistic label and confidence bound labels, e.g. `z`, `[0.025`, `0.975]`.
fn labels(result: &RegressionResult) -> (&'static str, String, String) {
    let stat = match result.distribution {
        InferenceDistribution::Normal => "z",
        InferenceDistribution::StudentT => "t",
    };
    let tail = (1.0 - result.confidence_level) / 2.0;
    (stat, format!("[{tail:.3}"), format!("{:.3}]", 1.0 - tail))
}

/// Tidy per-term table: term, coef, robust_se, statistic, p_value, ci_low,
/// ci_high.
impl Exporter for RegressionResult {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Json | ExportFormat::PrettyJson => to_json(self, format),
            ExportFormat::Csv => to_csv(tidy_records(self)),
            ExportFormat::Markdown => {
                let (stat, low, high) = labels(self);
                let mut md = String::new();
                let _ = writeln!(md, "### {}\n", self.specification);
                let _ = writeln!(
                    md,
                    "`{}` on {} observations ({} dropped), {} covariance\n",
                    self.outcome, self.n_obs, self.n_dropped, self.covariance
                );
                let _ = writeln!(md, "| Term | Coef. | Std.Err. | {stat} | P>\\|{stat}\\| | {low} | {high} |");
                md.push_str("|------|-------|----------|---|------|------|------|\n");
                for t in &self.terms {
                    let _ = writeln!(
                        md,
                        "| {} | {:.4} | {:.4} | {:.3} | {:.4} | {:.4} | {:.4} |",
                        t.term, t.coef, t.robust_se, t.statistic, t.p_value, t.ci_low, t.ci_high
                    );
                }
                let _ = writeln!(
                    md,
                    "\nR² {:.4}, adj. R² {:.4}, AIC {:.3}, BIC {:.3}",
                    self.r_squared, self.adj_r_squared, self.aic, self.bic
                );
                Ok(md)
            }
        }
    }
}

/// One result in the classic regression summary layout, with
/// `Coef.`, `Std.Err.`, `z`/`t`, `P>|z|` and bound columns.
#[derive(Debug, Clone, Copy)]
pub struct RegressionSummary<'a>(pub &'a RegressionResult);

impl Exporter for RegressionSummary<'_> {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        let result = self.0;
        if format != ExportFormat::Csv {
            return result.export_to_string(format);
        }
        let (stat, low, high) = labels(result);
        let mut wtr = csv::Writer::from_writer(vec![]);
        let p_label = format!("P>|{stat}|");
        wtr.write_record(["", "Coef.", "Std.Err.", stat, p_label.as_str(), low.as_str(), high.as_str()])?;
        for t in &result.terms {
            wtr.write_record([
                t.term.clone(),
                t.coef.to_string(),
                t.robust_se.to_string(),
                t.statistic.to_string(),
                t.p_value.to_string(),
                t.ci_low.to_string(),
                t.ci_high.to_string(),
            ])?;
        }
        finish(wtr)
    }
}

/// Model comparison metrics; one row per specification, failures included.
impl Exporter for RobustnessReport {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Json | ExportFormat::PrettyJson => to_json(self, format),
            ExportFormat::Csv => to_csv(&self.comparison),
            ExportFormat::Markdown => {
                let mut md = String::from("## Robustness battery\n\n");
                md.push_str("| Spec | Status | N | R² | Adj. R² | AIC | BIC | ΔAIC | ΔBIC |\n");
                md.push_str("|------|--------|---|----|---------|-----|-----|------|------|\n");
                for row in &self.comparison {
                    let _ = writeln!(
                        md,
                        "| {} | {} | {} | {} | {} | {} | {} | {} | {} |",
                        row.spec,
                        row.status,
                        row.n_obs.map(|n| n.to_string()).unwrap_or_default(),
                        fixed(row.r2),
                        fixed(row.adj_r2),
                        fixed(row.aic),
                        fixed(row.bic),
                        fixed(row.delta_aic),
                        fixed(row.delta_bic),
                    );
                }
                for row in self.comparison.iter().filter(|r| r.error.is_some()) {
                    let _ = writeln!(md, "\n- `{}` failed: {}", row.spec, row.error.as_deref().unwrap_or_default());
                }
                let s = &self.selection;
                let _ = writeln!(
                    md,
                    "\nBest by AIC: {}; by BIC: {}; by adj. R²: {}",
                    s.best_by_aic.as_deref().unwrap_or("-"),
                    s.best_by_bic.as_deref().unwrap_or("-"),
                    s.best_by_adj_r2.as_deref().unwrap_or("-"),
                );
                Ok(md)
            }
        }
    }
}

fn fixed(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.4}")).unwrap_or_default()
}

#[derive(Serialize)]
struct ComparisonRecord<'a> {
    spec: &'a str,
    family: SpecFamily,
    term: &'a str,
    coef: f64,
    robust_se: f64,
    p_value: f64,
}

/// Long-form coefficient table across fitted specifications.
#[derive(Debug, Clone, Copy)]
pub struct ComparisonTable<'a>(pub &'a RobustnessReport);

impl ComparisonTable<'_> {
    fn records(&self) -> Vec<ComparisonRecord<'_>> {
        self.0
            .fitted()
            .flat_map(|r| {
                r.terms.iter().map(move |t| ComparisonRecord {
                    spec: &r.specification,
                    family: r.family,
                    term: &t.term,
                    coef: t.coef,
                    robust_se: t.robust_se,
                    p_value: t.p_value,
                })
            })
            .collect()
    }
}

impl Exporter for ComparisonTable<'_> {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        let records = self.records();
        match format {
            ExportFormat::Json | ExportFormat::PrettyJson => to_json(&records, format),
            ExportFormat::Csv => to_csv(records),
            ExportFormat::Markdown => Err(unsupported(format, "coefficient comparison table")),
        }
    }
}

#[derive(Serialize)]
struct StabilityRecord<'a> {
    term: &'a str,
    spec: &'a str,
    coef: f64,
    sign: String,
    p_value: f64,
    significant: bool,
    declared_in: usize,
    sign_consistent: bool,
    min: Option<f64>,
    max: Option<f64>,
    relative_spread: Option<f64>,
}

/// Per-regressor coefficient stability, one row per fitted estimate.
#[derive(Debug, Clone, Copy)]
pub struct StabilityTable<'a>(pub &'a RobustnessReport);

impl Exporter for StabilityTable<'_> {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Json | ExportFormat::PrettyJson => to_json(&self.0.stability, format),
            ExportFormat::Csv => to_csv(self.0.stability.iter().flat_map(|s| {
                s.entries.iter().map(move |e| StabilityRecord {
                    term: &s.term,
                    spec: &e.spec,
                    coef: e.coef,
                    sign: e.sign.to_string(),
                    p_value: e.p_value,
                    significant: e.significant,
                    declared_in: s.declared_in,
                    sign_consistent: s.sign_consistent,
                    min: s.min,
                    max: s.max,
                    relative_spread: s.relative_spread,
                })
            })),
            ExportFormat::Markdown => Err(unsupported(format, "coefficient stability table")),
        }
    }
}

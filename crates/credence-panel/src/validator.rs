//! Panel Validator
//!
//! Two tiers of checks:
//!
//! - integrity violations (duplicate, unsorted or out-of-window years,
//!   undocumented gaps, missing core columns, unexpected core missingness)
//!   reject the panel;
//! - plausibility flags (a ratio outside its documented range) are only
//!   reported, since a crisis year can legitimately be extreme.
//!
//! A rejected panel never becomes a [`ValidatedPanel`], the only panel type
//! the estimator accepts.

use crate::error::{PanelIntegrityError, PanelRejected};
use crate::panel::AnalysisPanel;
use crate::report::{ColumnQuality, PanelQualityReport, PlausibilityWarning, YearGap};
use crate::schema::{self, CORE_COLUMNS, YEAR};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::ops::Deref;
use tracing::{info, warn};

/// Validator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// First year of the documented coverage window (default: 1900)
    pub coverage_start: i32,

    /// Last year of the documented coverage window (default: 2099)
    pub coverage_end: i32,

    /// Years known to be absent from the anchor source
    pub documented_gaps: Vec<i32>,

    /// Maximum fraction of unexpected missing values in a core column
    /// (default: 0.0, i.e. any unexpected missing value is fatal)
    pub max_missing_fraction: f64,

    /// Columns whose missingness gates acceptance
    pub core_columns: Vec<String>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            coverage_start: 1900,
            coverage_end: 2099,
            documented_gaps: Vec::new(),
            max_missing_fraction: 0.0,
            core_columns: CORE_COLUMNS.iter().map(|c| (*c).to_string()).collect(),
        }
    }
}

/// A panel that passed every integrity check.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedPanel(AnalysisPanel);

impl ValidatedPanel {
    /// The underlying panel.
    pub const fn panel(&self) -> &AnalysisPanel {
        &self.0
    }

    /// Unwrap into the underlying panel.
    pub fn into_inner(self) -> AnalysisPanel {
        self.0
    }
}

impl Deref for ValidatedPanel {
    type Target = AnalysisPanel;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Accept or reject
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Every integrity check passed
    Accepted,
    /// At least one integrity check failed
    Rejected(PanelRejected),
}

/// Result of validating a panel: the report plus the verdict.
#[derive(Debug, Clone)]
pub struct Validation {
    /// Quality report, produced whether or not the panel is accepted
    pub report: PanelQualityReport,
    panel: AnalysisPanel,
}

impl Validation {
    /// The verdict.
    pub fn verdict(&self) -> Verdict {
        if self.report.is_accepted() {
            Verdict::Accepted
        } else {
            Verdict::Rejected(PanelRejected {
                violations: self.report.violations.clone(),
            })
        }
    }

    /// Returns true if the panel was accepted.
    pub fn is_accepted(&self) -> bool {
        self.report.is_accepted()
    }

    /// The validated panel, or every violation that rejected it.
    pub fn into_validated(self) -> Result<ValidatedPanel, PanelRejected> {
        match self.verdict() {
            Verdict::Accepted => Ok(ValidatedPanel(self.panel)),
            Verdict::Rejected(rejected) => Err(rejected),
        }
    }
}

/// Runs integrity and plausibility checks on a built panel.
#[derive(Debug, Default)]
pub struct PanelValidator {
    config: ValidationConfig,
}

impl PanelValidator {
    /// Create a validator with custom configuration.
    pub const fn with_config(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Current configuration.
    pub const fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Validate a panel, producing the quality report and verdict.
    pub fn validate(&self, panel: AnalysisPanel) -> Validation {
        let mut violations = Vec::new();

        if panel.is_empty() {
            violations.push(PanelIntegrityError::EmptyPanel);
        }

        let years = panel.years();
        let duplicate_years = self.check_years(&years, &mut violations);
        let gaps = self.check_gaps(&years, &mut violations);
        let has_predecessor = predecessor_mask(&years);

        let mut column_quality = Vec::with_capacity(panel.columns().len() + 1);
        column_quality.push(year_quality(&years, self.is_core(YEAR)));
        for name in panel.columns() {
            column_quality.push(column_quality_for(&panel, name, &has_predecessor, self.is_core(name)));
        }

        for core in &self.config.core_columns {
            if !panel.has_column(core) {
                violations.push(PanelIntegrityError::MissingColumn {
                    column: core.clone(),
                });
            }
        }

        if !panel.is_empty() {
            for quality in column_quality.iter().filter(|c| c.core) {
                let unexpected = quality.unexpected_missing();
                let fraction = unexpected as f64 / panel.len() as f64;
                if unexpected > 0 && fraction > self.config.max_missing_fraction {
                    violations.push(PanelIntegrityError::ExcessMissingness {
                        column: quality.name.clone(),
                        missing: unexpected,
                        rows: panel.len(),
                        fraction,
                        threshold: self.config.max_missing_fraction,
                    });
                }
            }
        }

        let warnings = plausibility_warnings(&panel);
        for warning in &warnings {
            warn!(%warning, "plausibility flag");
        }

        let (first_year, last_year) = panel.year_range().unzip();
        let report = PanelQualityReport {
            rows: panel.len(),
            columns: panel.columns().len() + 1,
            first_year,
            last_year,
            duplicate_years,
            gaps,
            column_quality,
            warnings,
            violations,
        };

        info!(
            rows = report.rows,
            warnings = report.warnings.len(),
            violations = report.violations.len(),
            accepted = report.is_accepted(),
            "validated analysis panel"
        );

        Validation { report, panel }
    }

    fn is_core(&self, name: &str) -> bool {
        self.config.core_columns.iter().any(|c| c == name)
    }

    /// Duplicate, ordering and coverage checks. Returns the duplicate row count.
    fn check_years(&self, years: &[i32], violations: &mut Vec<PanelIntegrityError>) -> usize {
        let mut counts: BTreeMap<i32, usize> = BTreeMap::new();
        for &year in years {
            *counts.entry(year).or_insert(0) += 1;
        }
        let mut duplicates = 0;
        for (&year, &count) in &counts {
            if count > 1 {
                duplicates += count - 1;
                violations.push(PanelIntegrityError::DuplicateYear { year, count });
            }
        }

        for (row, pair) in years.windows(2).enumerate() {
            if pair[1] < pair[0] {
                violations.push(PanelIntegrityError::UnsortedYears {
                    row: row + 1,
                    year: pair[1],
                    previous: pair[0],
                });
            }
        }

        let (start, end) = (self.config.coverage_start, self.config.coverage_end);
        for &year in counts.keys() {
            if year < start || year > end {
                violations.push(PanelIntegrityError::OutsideCoverage { year, start, end });
            }
        }

        duplicates
    }

    fn check_gaps(&self, years: &[i32], violations: &mut Vec<PanelIntegrityError>) -> Vec<YearGap> {
        let documented: HashSet<i32> = self.config.documented_gaps.iter().copied().collect();
        let mut distinct: Vec<i32> = years.to_vec();
        distinct.sort_unstable();
        distinct.dedup();

        let mut gaps = Vec::new();
        for pair in distinct.windows(2) {
            if pair[1] - pair[0] > 1 {
                let (from, to) = (pair[0] + 1, pair[1] - 1);
                let is_documented = (from..=to).all(|y| documented.contains(&y));
                if !is_documented {
                    violations.push(PanelIntegrityError::UndocumentedGap { from, to });
                }
                gaps.push(YearGap {
                    from,
                    to,
                    documented: is_documented,
                });
            }
        }
        gaps
    }
}

/// For each row, whether the previous row is the immediately preceding year.
fn predecessor_mask(years: &[i32]) -> Vec<bool> {
    let mut mask = Vec::with_capacity(years.len());
    for (i, &year) in years.iter().enumerate() {
        mask.push(i > 0 && year - years[i - 1] == 1);
    }
    mask
}

fn year_quality(years: &[i32], core: bool) -> ColumnQuality {
    ColumnQuality {
        name: YEAR.to_string(),
        core,
        missing: 0,
        expected_missing: 0,
        missing_fraction: 0.0,
        min: years.iter().min().map(|&y| f64::from(y)),
        max: years.iter().max().map(|&y| f64::from(y)),
    }
}

fn column_quality_for(
    panel: &AnalysisPanel,
    name: &str,
    has_predecessor: &[bool],
    core: bool,
) -> ColumnQuality {
    let lagged = schema::variable(name).is_some_and(|v| v.kind.is_lagged());
    let mut missing = 0;
    let mut expected_missing = 0;
    let mut min: Option<f64> = None;
    let mut max: Option<f64> = None;

    for (row, &has_prev) in panel.rows().iter().zip(has_predecessor) {
        match row.get(name) {
            Some(v) => {
                min = Some(min.map_or(v, |m| m.min(v)));
                max = Some(max.map_or(v, |m| m.max(v)));
            }
            None => {
                missing += 1;
                if lagged && !has_prev {
                    expected_missing += 1;
                }
            }
        }
    }

    let missing_fraction = if panel.is_empty() {
        0.0
    } else {
        missing as f64 / panel.len() as f64
    };

    ColumnQuality {
        name: name.to_string(),
        core,
        missing,
        expected_missing,
        missing_fraction,
        min,
        max,
    }
}

fn plausibility_warnings(panel: &AnalysisPanel) -> Vec<PlausibilityWarning> {
    let mut warnings = Vec::new();
    for (variable, range) in schema::bounded_variables() {
        for row in panel.rows() {
            if let Some(value) = row.get(variable.name)
                && !range.contains(value)
            {
                warnings.push(PlausibilityWarning {
                    column: variable.name.to_string(),
                    year: row.year,
                    value,
                    lower: range.lower,
                    upper: range.upper,
                });
            }
        }
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::AnalysisPanelRow;
    use rstest::rstest;

    /// A panel of consistent core columns over `years`, growth missing
    /// wherever the previous row is not the preceding year.
    fn core_panel(years: &[i32]) -> AnalysisPanel {
        let mask = predecessor_mask(years);
        let rows = years
            .iter()
            .zip(&mask)
            .map(|(&year, &has_prev)| {
                let t = f64::from(year - 2000);
                let growth = has_prev.then_some(0.1);
                let values = BTreeMap::from([
                    ("nominal_gdp".to_string(), Some(100.0 + t)),
                    ("log_nominal_gdp".to_string(), Some((100.0 + t).ln())),
                    ("nominal_gdp_growth".to_string(), growth),
                    ("bank_credit".to_string(), Some(50.0 + t)),
                    ("log_bank_credit".to_string(), Some((50.0 + t).ln())),
                    ("bank_credit_growth".to_string(), growth),
                    ("net_npa_ratio".to_string(), Some(0.03)),
                ]);
                AnalysisPanelRow { year, values }
            })
            .collect();
        let columns = CORE_COLUMNS[1..]
            .iter()
            .map(|c| (*c).to_string())
            .chain(std::iter::once("net_npa_ratio".to_string()))
            .collect();
        AnalysisPanel::new(columns, rows)
    }

    fn set(panel: &mut AnalysisPanel, year: i32, column: &str, value: Option<f64>) {
        let rows: Vec<AnalysisPanelRow> = panel
            .rows()
            .iter()
            .cloned()
            .map(|mut r| {
                if r.year == year {
                    r.values.insert(column.to_string(), value);
                }
                r
            })
            .collect();
        *panel = AnalysisPanel::new(panel.columns().to_vec(), rows);
    }

    #[test]
    fn test_clean_panel_accepted() {
        let years: Vec<i32> = (2002..=2024).collect();
        let validation = PanelValidator::default().validate(core_panel(&years));
        assert!(validation.is_accepted());
        let report = &validation.report;
        assert_eq!(report.rows, 23);
        assert_eq!(report.duplicate_years, 0);
        assert_eq!((report.first_year, report.last_year), (Some(2002), Some(2024)));
        let growth = report.column("bank_credit_growth").unwrap();
        assert_eq!(growth.missing, 1);
        assert_eq!(growth.expected_missing, 1);
        assert!(validation.into_validated().is_ok());
    }

    #[test]
    fn test_duplicate_year_rejected() {
        let validation = PanelValidator::default().validate(core_panel(&[2010, 2011, 2011, 2012]));
        assert!(!validation.is_accepted());
        assert_eq!(validation.report.duplicate_years, 1);
        let rejected = validation.into_validated().unwrap_err();
        assert!(rejected
            .violations
            .contains(&PanelIntegrityError::DuplicateYear { year: 2011, count: 2 }));
    }

    #[test]
    fn test_unsorted_rejected() {
        let validation = PanelValidator::default().validate(core_panel(&[2010, 2012, 2011]));
        assert!(validation.report.violations.iter().any(|v| matches!(
            v,
            PanelIntegrityError::UnsortedYears { year: 2011, previous: 2012, .. }
        )));
    }

    #[rstest]
    #[case(2000, 2030, true)]
    #[case(2011, 2030, false)]
    #[case(2000, 2011, false)]
    fn test_coverage_window(#[case] start: i32, #[case] end: i32, #[case] accepted: bool) {
        let config = ValidationConfig {
            coverage_start: start,
            coverage_end: end,
            ..Default::default()
        };
        let validation = PanelValidator::with_config(config).validate(core_panel(&[2010, 2011, 2012]));
        assert_eq!(validation.is_accepted(), accepted);
    }

    #[test]
    fn test_undocumented_gap_rejected_documented_gap_accepted() {
        let years = [2008, 2009, 2012, 2013];

        let validation = PanelValidator::default().validate(core_panel(&years));
        assert!(validation
            .report
            .violations
            .contains(&PanelIntegrityError::UndocumentedGap { from: 2010, to: 2011 }));

        let config = ValidationConfig {
            documented_gaps: vec![2010, 2011],
            ..Default::default()
        };
        let validation = PanelValidator::with_config(config).validate(core_panel(&years));
        assert!(validation.is_accepted(), "{:?}", validation.report.violations);
        assert_eq!(
            validation.report.gaps,
            vec![YearGap { from: 2010, to: 2011, documented: true }]
        );
        let growth = validation.report.column("bank_credit_growth").unwrap();
        assert_eq!(growth.missing, 2);
        assert_eq!(growth.expected_missing, 2);
    }

    #[test]
    fn test_unexpected_core_missingness_rejected() {
        let mut panel = core_panel(&[2010, 2011, 2012, 2013]);
        set(&mut panel, 2012, "bank_credit_growth", None);
        let validation = PanelValidator::default().validate(panel.clone());
        assert!(validation.report.violations.iter().any(|v| matches!(
            v,
            PanelIntegrityError::ExcessMissingness { column, missing: 1, rows: 4, .. }
                if column == "bank_credit_growth"
        )));

        let config = ValidationConfig {
            max_missing_fraction: 0.25,
            ..Default::default()
        };
        assert!(PanelValidator::with_config(config).validate(panel).is_accepted());
    }

    #[test]
    fn test_missing_core_column_rejected() {
        let panel = core_panel(&[2010, 2011]);
        let columns: Vec<String> = panel
            .columns()
            .iter()
            .filter(|c| *c != "bank_credit")
            .cloned()
            .collect();
        let panel = AnalysisPanel::new(columns, panel.rows().to_vec());
        let validation = PanelValidator::default().validate(panel);
        assert!(validation.report.violations.contains(&PanelIntegrityError::MissingColumn {
            column: "bank_credit".to_string()
        }));
    }

    #[test]
    fn test_empty_panel_rejected() {
        let validation = PanelValidator::default().validate(AnalysisPanel::new(Vec::new(), Vec::new()));
        assert!(validation.report.violations.contains(&PanelIntegrityError::EmptyPanel));
    }

    #[test]
    fn test_plausibility_flag_is_not_fatal() {
        let mut panel = core_panel(&[2010, 2011, 2012]);
        set(&mut panel, 2011, "net_npa_ratio", Some(1.4));
        let validation = PanelValidator::default().validate(panel);
        assert!(validation.is_accepted());
        assert_eq!(validation.report.warnings.len(), 1);
        let warning = &validation.report.warnings[0];
        assert_eq!(warning.column, "net_npa_ratio");
        assert_eq!(warning.year, 2011);
        assert_eq!(warning.upper, 1.0);
    }

    #[test]
    fn test_min_max_tracked() {
        let validation = PanelValidator::default().validate(core_panel(&[2010, 2011, 2012]));
        let gdp = validation.report.column("nominal_gdp").unwrap();
        assert_eq!(gdp.min, Some(110.0));
        assert_eq!(gdp.max, Some(112.0));
        let year = validation.report.column("year").unwrap();
        assert_eq!(year.min, Some(2010.0));
    }

    #[test]
    fn test_markdown_report() {
        let validation = PanelValidator::default().validate(core_panel(&[2010, 2011, 2011]));
        let md = validation.report.to_markdown();
        assert!(md.contains("# Final Panel Quality Report"));
        assert!(md.contains("REJECTED"));
        assert!(md.contains("duplicate year 2011"));
        assert!(md.contains("`bank_credit_growth` missing"));
    }
}

//! Panel quality report.

use crate::error::PanelIntegrityError;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// A ratio value outside its plausible range. Reported, never fatal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlausibilityWarning {
    /// Column name
    pub column: String,
    /// Year of the value
    pub year: i32,
    /// The offending value
    pub value: f64,
    /// Exclusive lower bound
    pub lower: f64,
    /// Exclusive upper bound
    pub upper: f64,
}

impl std::fmt::Display for PlausibilityWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} = {} in {} outside plausible range ({}, {})",
            self.column, self.value, self.year, self.lower, self.upper
        )
    }
}

/// Absent years between two consecutive panel years.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearGap {
    /// First absent year
    pub from: i32,
    /// Last absent year
    pub to: i32,
    /// Every absent year is listed as a documented gap
    pub documented: bool,
}

/// Per-column quality summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnQuality {
    /// Column name
    pub name: String,
    /// Column gates acceptance
    pub core: bool,
    /// Missing values
    pub missing: usize,
    /// Missing values expected from lag initialization
    pub expected_missing: usize,
    /// `missing / rows`
    pub missing_fraction: f64,
    /// Minimum non-missing value
    pub min: Option<f64>,
    /// Maximum non-missing value
    pub max: Option<f64>,
}

impl ColumnQuality {
    /// Missing values not explained by lag initialization.
    pub const fn unexpected_missing(&self) -> usize {
        self.missing.saturating_sub(self.expected_missing)
    }
}

/// Row and column counts, missingness, ranges and flags for one panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelQualityReport {
    /// Number of rows
    pub rows: usize,
    /// Number of columns, `year` included
    pub columns: usize,
    /// First year
    pub first_year: Option<i32>,
    /// Last year
    pub last_year: Option<i32>,
    /// Rows whose year already appeared on an earlier row
    pub duplicate_years: usize,
    /// Gaps in the year sequence
    pub gaps: Vec<YearGap>,
    /// Per-column summaries, `year` first
    pub column_quality: Vec<ColumnQuality>,
    /// Non-fatal plausibility flags
    pub warnings: Vec<PlausibilityWarning>,
    /// Fatal integrity violations
    pub violations: Vec<PanelIntegrityError>,
}

impl PanelQualityReport {
    /// Returns true if no fatal violation was found.
    pub fn is_accepted(&self) -> bool {
        self.violations.is_empty()
    }

    /// Quality summary of one column.
    pub fn column(&self, name: &str) -> Option<&ColumnQuality> {
        self.column_quality.iter().find(|c| c.name == name)
    }

    /// Render the human-auditable Markdown report.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        md.push_str("# Final Panel Quality Report\n\n");
        let _ = writeln!(
            md,
            "- Verdict: **{}**",
            if self.is_accepted() { "ACCEPTED" } else { "REJECTED" }
        );
        let _ = writeln!(md, "- Rows: **{}**", self.rows);
        let _ = writeln!(md, "- Columns: **{}**", self.columns);
        let _ = writeln!(md, "- Duplicate years: **{}**", self.duplicate_years);
        if let (Some(first), Some(last)) = (self.first_year, self.last_year) {
            let _ = writeln!(md, "- Year range: **{first}-{last}**");
        }
        for gap in &self.gaps {
            let _ = writeln!(
                md,
                "- Gap: {}-{} ({})",
                gap.from,
                gap.to,
                if gap.documented { "documented" } else { "undocumented" }
            );
        }

        if !self.violations.is_empty() {
            md.push_str("\n## Integrity violations\n\n");
            for violation in &self.violations {
                let _ = writeln!(md, "- {violation}");
            }
        }

        md.push_str("\n## Core column missingness\n\n");
        for column in self.column_quality.iter().filter(|c| c.core) {
            let _ = writeln!(
                md,
                "- `{}` missing: **{:.1}%** ({} expected)",
                column.name,
                column.missing_fraction * 100.0,
                column.expected_missing
            );
        }

        md.push_str("\n## Column summary\n\n");
        md.push_str("| Column | Missing | Missing % | Min | Max |\n");
        md.push_str("|--------|---------|-----------|-----|-----|\n");
        for column in &self.column_quality {
            let _ = writeln!(
                md,
                "| {} | {} | {:.1}% | {} | {} |",
                column.name,
                column.missing,
                column.missing_fraction * 100.0,
                fmt_opt(column.min),
                fmt_opt(column.max)
            );
        }

        md.push_str("\n## Plausibility warnings\n\n");
        if self.warnings.is_empty() {
            md.push_str("- none\n");
        }
        for warning in &self.warnings {
            let _ = writeln!(md, "- {warning}");
        }

        md
    }
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.6}"))
}

//! Source table schemas and raw records.
//!
//! Three independently curated annual tables feed the panel:
//!
//! | Source | Role | Required columns |
//! |---|---|---|
//! | [`SourceKind::Macro`] | anchor (one panel row per year) | `nominal_gdp`, `bank_credit` |
//! | [`SourceKind::Capital`] | balance sheet / capital adequacy | Tier I/II capital, required capital, RWA, net NPA, net advances |
//! | [`SourceKind::Leverage`] | leverage and funding | `total_assets`, `deposits` |

use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Header names accepted as the fiscal-year key, after normalization.
pub const YEAR_COLUMNS: &[&str] = &["year", "years", "fiscal_year", "fy", "period"];

/// Identifies one of the source tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Nominal GDP and bank credit; the anchor table
    #[display("business_cycle")]
    Macro,
    /// Regulatory capital, risk-weighted assets and asset quality
    #[display("balance_sheet")]
    Capital,
    /// Total assets and funding
    #[display("leverage")]
    Leverage,
}

impl SourceKind {
    /// All source kinds, anchor first.
    pub const ALL: [Self; 3] = [Self::Macro, Self::Capital, Self::Leverage];

    /// The column contract for this source.
    pub fn schema(&self) -> &'static SourceSchema {
        match self {
            Self::Macro => &MACRO_SCHEMA,
            Self::Capital => &CAPITAL_SCHEMA,
            Self::Leverage => &LEVERAGE_SCHEMA,
        }
    }
}

/// Column contract for one source table.
#[derive(Debug, Clone)]
pub struct SourceSchema {
    /// Which source this schema describes
    pub kind: SourceKind,
    /// Human-readable description of the table
    pub description: &'static str,
    /// Columns that must be present (normalized names)
    pub required: &'static [&'static str],
    /// Columns that are loaded when present
    pub optional: &'static [&'static str],
    /// `(normalized header, canonical column)` renames applied before lookup
    pub aliases: &'static [(&'static str, &'static str)],
}

impl SourceSchema {
    /// Map a normalized header to its canonical column name.
    pub fn canonical<'a>(&self, normalized: &'a str) -> &'a str {
        self.aliases
            .iter()
            .find(|(from, _)| *from == normalized)
            .map_or(normalized, |(_, to)| *to)
    }

    /// Returns true if the column is part of this schema.
    pub fn is_known(&self, column: &str) -> bool {
        self.required.contains(&column) || self.optional.contains(&column)
    }

    /// Required and optional columns, in declaration order.
    pub fn columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.required.iter().chain(self.optional.iter()).copied()
    }
}

static MACRO_SCHEMA: SourceSchema = SourceSchema {
    kind: SourceKind::Macro,
    description: "Business cycle link: nominal GDP and scheduled commercial bank credit",
    required: &["nominal_gdp", "bank_credit"],
    optional: &[],
    aliases: &[
        ("gdp", "nominal_gdp"),
        ("gdp_level", "nominal_gdp"),
        ("nominal_gdp_level", "nominal_gdp"),
        ("bank_credit_level", "bank_credit"),
        ("scb_credit", "bank_credit"),
    ],
};

static CAPITAL_SCHEMA: SourceSchema = SourceSchema {
    kind: SourceKind::Capital,
    description: "Balance sheet analysis: regulatory capital, risk-weighted assets, asset quality",
    required: &[
        "tier1_capital",
        "tier2_capital",
        "capital_requirement",
        "total_rwa",
        "net_npa",
        "net_advances",
    ],
    optional: &[],
    aliases: &[
        ("tier_i_capital", "tier1_capital"),
        ("tier_1_capital", "tier1_capital"),
        ("tier_ii_capital", "tier2_capital"),
        ("tier_2_capital", "tier2_capital"),
        ("capital_requiremnt", "capital_requirement"),
        ("required_capital", "capital_requirement"),
        ("rwa", "total_rwa"),
        ("total_risk_weighted_assets", "total_rwa"),
        ("net_npas", "net_npa"),
        ("net_npa_level", "net_npa"),
    ],
};

static LEVERAGE_SCHEMA: SourceSchema = SourceSchema {
    kind: SourceKind::Leverage,
    description: "Leverage analysis: total assets, deposits and repo borrowing",
    required: &["total_assets", "deposits"],
    optional: &["repos"],
    aliases: &[
        ("total_assets_level", "total_assets"),
        ("deposits_level", "deposits"),
        ("repos_level", "repos"),
    ],
};

/// One row of one source table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSourceRecord {
    /// Canonical fiscal year
    pub year: i32,
    /// Line in the input the row came from
    pub line: u64,
    /// Schema columns; `None` is an explicit missing value
    pub fields: BTreeMap<String, Option<f64>>,
}

impl RawSourceRecord {
    /// Value of a field, `None` if missing or absent.
    pub fn get(&self, column: &str) -> Option<f64> {
        self.fields.get(column).copied().flatten()
    }
}

/// A loaded, normalized source table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceTable {
    /// Which source this is
    pub kind: SourceKind,
    /// Loaded schema columns, in header order (year excluded)
    pub columns: Vec<String>,
    /// Rows in input order
    pub records: Vec<RawSourceRecord>,
}

impl SourceTable {
    /// Number of rows.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Years in input order (duplicates preserved).
    pub fn years(&self) -> Vec<i32> {
        self.records.iter().map(|r| r.year).collect()
    }

    /// One column's values in row order.
    pub fn column_values(&self, column: &str) -> Vec<Option<f64>> {
        self.records.iter().map(|r| r.get(column)).collect()
    }

    /// Shape of the table as loaded, before any join.
    pub fn summary(&self) -> SourceSummary {
        let years = self.years();
        let mut seen = BTreeSet::new();
        let duplicate_years = years.iter().filter(|y| !seen.insert(**y)).count();
        let missing_values = self
            .records
            .iter()
            .map(|r| self.columns.iter().filter(|c| r.get(c).is_none()).count())
            .sum();
        SourceSummary {
            source: self.kind,
            path: None,
            rows: self.len(),
            columns: self.columns.len() + 1,
            first_year: years.iter().min().copied(),
            last_year: years.iter().max().copied(),
            duplicate_years,
            missing_values,
            column_names: self.columns.clone(),
        }
    }

    /// Build a table directly from records, e.g. for in-memory fixtures.
    pub fn from_records(kind: SourceKind, records: Vec<RawSourceRecord>) -> Self {
        let columns = kind
            .schema()
            .columns()
            .filter(|c| records.iter().any(|r| r.fields.contains_key(*c)))
            .map(str::to_string)
            .collect();
        Self {
            kind,
            columns,
            records,
        }
    }
}

/// Per-source input report: one loaded table's shape before the merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSummary {
    /// Which source
    pub source: SourceKind,
    /// File the table was read from, when loaded from disk
    pub path: Option<String>,
    /// Number of rows
    pub rows: usize,
    /// Number of columns, year included
    pub columns: usize,
    /// Earliest year
    pub first_year: Option<i32>,
    /// Latest year
    pub last_year: Option<i32>,
    /// Rows whose year already appeared on an earlier row
    pub duplicate_years: usize,
    /// Missing cells across the schema columns
    pub missing_values: usize,
    /// Loaded schema columns, in header order (year excluded)
    pub column_names: Vec<String>,
}

impl SourceSummary {
    /// Attach the file the table was read from.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

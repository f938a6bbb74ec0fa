//! Panel Schema
//!
//! The one named, typed variable list shared by the builder, the validator,
//! the specification registry and the estimator. Export order, derivation
//! kind, units and plausibility bounds all come from here.

use credence_data::SourceKind;
use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Name of the fiscal-year key column.
pub const YEAR: &str = "year";

/// Columns whose integrity gates acceptance of the panel.
pub const CORE_COLUMNS: &[&str] = &[
    "year",
    "nominal_gdp",
    "log_nominal_gdp",
    "nominal_gdp_growth",
    "bank_credit",
    "log_bank_credit",
    "bank_credit_growth",
];

/// How a variable is obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableKind {
    /// The fiscal-year key
    #[display("identifier")]
    Identifier,
    /// A level read from a source table, or a sum of such levels
    #[display("level")]
    Level,
    /// Natural log of a level
    #[display("log")]
    Log,
    /// One-year log difference
    #[display("growth")]
    Growth,
    /// One-year first difference of a ratio
    #[display("difference")]
    Difference,
    /// Numerator over denominator
    #[display("ratio")]
    Ratio,
}

impl VariableKind {
    /// True for variables that need the prior year and are therefore
    /// undefined on the first row and after a gap.
    pub const fn is_lagged(&self) -> bool {
        matches!(self, Self::Growth | Self::Difference)
    }
}

/// Where a variable's values originate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Read directly from a source table
    Source(SourceKind),
    /// Computed by the panel builder
    Derived,
}

/// Open interval a ratio is expected to fall in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlausibleRange {
    /// Exclusive lower bound
    pub lower: f64,
    /// Exclusive upper bound
    pub upper: f64,
}

impl PlausibleRange {
    /// Create a new range.
    pub const fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    /// Returns true if `value` lies strictly inside the range.
    pub fn contains(&self, value: f64) -> bool {
        value > self.lower && value < self.upper
    }
}

const UNIT_RANGE: PlausibleRange = PlausibleRange::new(0.0, 1.0);
const EXTENDED_RANGE: PlausibleRange = PlausibleRange::new(0.0, 2.0);

/// Variable metadata
#[derive(Debug, Clone)]
pub struct VariableDef {
    /// Column name (unique identifier)
    pub name: &'static str,
    /// Derivation kind
    pub kind: VariableKind,
    /// Where the values come from
    pub provenance: Provenance,
    /// Human-readable definition
    pub definition: &'static str,
    /// Unit of measurement
    pub unit: &'static str,
    /// Plausibility bounds, for ratio-type variables
    pub bounds: Option<PlausibleRange>,
}

const fn level(name: &'static str, source: SourceKind, definition: &'static str) -> VariableDef {
    VariableDef {
        name,
        kind: VariableKind::Level,
        provenance: Provenance::Source(source),
        definition,
        unit: "INR crore",
        bounds: None,
    }
}

const fn derived(
    name: &'static str,
    kind: VariableKind,
    definition: &'static str,
    unit: &'static str,
    bounds: Option<PlausibleRange>,
) -> VariableDef {
    VariableDef {
        name,
        kind,
        provenance: Provenance::Derived,
        definition,
        unit,
        bounds,
    }
}

/// The panel's variables, in export order.
pub static PANEL_SCHEMA: &[VariableDef] = &[
    VariableDef {
        name: YEAR,
        kind: VariableKind::Identifier,
        provenance: Provenance::Source(SourceKind::Macro),
        definition: "Fiscal year (leading calendar year of the April-March fiscal year)",
        unit: "year",
        bounds: None,
    },
    level("nominal_gdp", SourceKind::Macro, "Nominal gross domestic product"),
    derived("log_nominal_gdp", VariableKind::Log, "ln(nominal_gdp)", "log points", None),
    derived(
        "nominal_gdp_growth",
        VariableKind::Growth,
        "log_nominal_gdp(t) - log_nominal_gdp(t-1)",
        "log difference",
        None,
    ),
    level("bank_credit", SourceKind::Macro, "Scheduled commercial bank credit outstanding"),
    derived("log_bank_credit", VariableKind::Log, "ln(bank_credit)", "log points", None),
    derived(
        "bank_credit_growth",
        VariableKind::Growth,
        "log_bank_credit(t) - log_bank_credit(t-1)",
        "log difference",
        None,
    ),
    level("tier1_capital", SourceKind::Capital, "Tier I regulatory capital"),
    level("tier2_capital", SourceKind::Capital, "Tier II regulatory capital"),
    derived(
        "total_capital",
        VariableKind::Level,
        "tier1_capital + tier2_capital",
        "INR crore",
        None,
    ),
    level(
        "capital_requirement",
        SourceKind::Capital,
        "Required regulatory capital at the prescribed minimum CRAR",
    ),
    level("total_rwa", SourceKind::Capital, "Total risk-weighted assets"),
    level("net_npa", SourceKind::Capital, "Net non-performing assets"),
    level("net_advances", SourceKind::Capital, "Net advances"),
    level("total_assets", SourceKind::Leverage, "Total assets"),
    level("deposits", SourceKind::Leverage, "Aggregate deposits"),
    level("repos", SourceKind::Leverage, "Borrowing under repo operations"),
    derived("log_deposits", VariableKind::Log, "ln(deposits)", "log points", None),
    derived(
        "deposits_growth",
        VariableKind::Growth,
        "log_deposits(t) - log_deposits(t-1)",
        "log difference",
        None,
    ),
    derived(
        "crar",
        VariableKind::Ratio,
        "total_capital / total_rwa (capital to risk-weighted assets ratio)",
        "ratio",
        Some(EXTENDED_RANGE),
    ),
    derived(
        "capital_surplus_ratio",
        VariableKind::Ratio,
        "(total_capital - capital_requirement) / total_rwa",
        "ratio",
        Some(UNIT_RANGE),
    ),
    derived(
        "net_npa_ratio",
        VariableKind::Ratio,
        "net_npa / net_advances",
        "ratio",
        Some(UNIT_RANGE),
    ),
    derived(
        "leverage_ratio",
        VariableKind::Ratio,
        "total_capital / total_assets",
        "ratio",
        Some(EXTENDED_RANGE),
    ),
    derived(
        "rw_density",
        VariableKind::Ratio,
        "total_rwa / total_assets",
        "ratio",
        Some(EXTENDED_RANGE),
    ),
    derived(
        "change_in_rw",
        VariableKind::Difference,
        "rw_density(t) - rw_density(t-1)",
        "ratio difference",
        None,
    ),
    derived(
        "credit_to_deposit_ratio",
        VariableKind::Ratio,
        "bank_credit / deposits",
        "ratio",
        Some(EXTENDED_RANGE),
    ),
    derived(
        "credit_to_gdp_ratio",
        VariableKind::Ratio,
        "bank_credit / nominal_gdp",
        "ratio",
        Some(EXTENDED_RANGE),
    ),
];

/// Look up a variable by name.
pub fn variable(name: &str) -> Option<&'static VariableDef> {
    PANEL_SCHEMA.iter().find(|v| v.name == name)
}

/// Returns true if `name` is a panel variable.
pub fn is_variable(name: &str) -> bool {
    variable(name).is_some()
}

/// All variable names in export order, `year` first.
pub fn variable_names() -> Vec<&'static str> {
    PANEL_SCHEMA.iter().map(|v| v.name).collect()
}

/// Variables that carry plausibility bounds.
pub fn bounded_variables() -> impl Iterator<Item = (&'static VariableDef, PlausibleRange)> {
    PANEL_SCHEMA
        .iter()
        .filter_map(|v| v.bounds.map(|range| (v, range)))
}

/// Level columns read from one source table.
pub fn source_columns(kind: SourceKind) -> Vec<&'static str> {
    PANEL_SCHEMA
        .iter()
        .filter(|v| v.kind == VariableKind::Level && v.provenance == Provenance::Source(kind))
        .map(|v| v.name)
        .collect()
}

/// One row of the variable dictionary export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DictionaryEntry {
    /// Variable name
    pub variable: String,
    /// Derivation kind
    pub kind: String,
    /// Human-readable definition
    pub definition: String,
    /// Source table or `derived`
    pub source: String,
    /// Unit of measurement
    pub unit: String,
    /// Exclusive lower plausibility bound
    pub lower_bound: Option<f64>,
    /// Exclusive upper plausibility bound
    pub upper_bound: Option<f64>,
}

/// The variable dictionary, generated from the schema.
pub fn dictionary() -> Vec<DictionaryEntry> {
    PANEL_SCHEMA
        .iter()
        .map(|v| DictionaryEntry {
            variable: v.name.to_string(),
            kind: v.kind.to_string(),
            definition: v.definition.to_string(),
            source: match v.provenance {
                Provenance::Source(kind) => format!("RBI Database on Indian Economy ({kind})"),
                Provenance::Derived => "derived".to_string(),
            },
            unit: v.unit.to_string(),
            lower_bound: v.bounds.map(|b| b.lower),
            upper_bound: v.bounds.map(|b| b.upper),
        })
        .collect()
}

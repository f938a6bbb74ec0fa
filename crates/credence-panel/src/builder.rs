//! Panel Builder
//!
//! Joins the auxiliary source tables onto the macro anchor table by fiscal
//! year and derives the computed variables. Derivation runs in stages:
//!
//! 1. levels (`total_capital = tier1 + tier2`)
//! 2. logs, null unless the level is strictly positive
//! 3. one-year growth rates and first differences, null unless the previous
//!    row is the immediately preceding calendar year
//! 4. ratios from their defining numerator and denominator, null unless the
//!    denominator exceeds the configured floor
//!
//! The anchor defines the row set: a year missing from an auxiliary table
//! keeps its row with nulls in that table's columns.

use crate::error::PanelError;
use crate::panel::AnalysisPanel;
use crate::schema::{self, PANEL_SCHEMA, YEAR};
use credence_data::{SourceKind, SourceTable};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Panel builder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Ratios are null unless the denominator is strictly greater than this
    /// (default: 0.0)
    pub min_denominator: f64,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            min_denominator: 0.0,
        }
    }
}

/// The three loaded source tables, checked by kind.
#[derive(Debug, Clone)]
pub struct SourceSet {
    anchor: SourceTable,
    capital: SourceTable,
    leverage: SourceTable,
}

impl SourceSet {
    /// Group the source tables, checking each sits in its slot.
    pub fn new(
        anchor: SourceTable,
        capital: SourceTable,
        leverage: SourceTable,
    ) -> Result<Self, PanelError> {
        for (table, expected) in [
            (&anchor, SourceKind::Macro),
            (&capital, SourceKind::Capital),
            (&leverage, SourceKind::Leverage),
        ] {
            if table.kind != expected {
                return Err(PanelError::SourceKindMismatch {
                    expected,
                    actual: table.kind,
                });
            }
        }
        Ok(Self {
            anchor,
            capital,
            leverage,
        })
    }

    /// The macro anchor table.
    pub const fn anchor(&self) -> &SourceTable {
        &self.anchor
    }

    /// The capital adequacy table.
    pub const fn capital(&self) -> &SourceTable {
        &self.capital
    }

    /// The leverage table.
    pub const fn leverage(&self) -> &SourceTable {
        &self.leverage
    }
}

/// Builds the analysis panel from the source tables.
#[derive(Debug, Default)]
pub struct PanelBuilder {
    config: BuilderConfig,
}

impl PanelBuilder {
    /// Create a builder with custom configuration.
    pub const fn with_config(config: BuilderConfig) -> Self {
        Self { config }
    }

    /// Current configuration.
    pub const fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// Join and derive, returning the lazy plan's result as a frame with
    /// the schema's columns in export order.
    pub fn build_frame(&self, sources: &SourceSet) -> Result<DataFrame, PanelError> {
        let anchor = source_frame(sources.anchor())?.lazy();
        let capital = source_frame(sources.capital())?.lazy();
        let leverage = source_frame(sources.leverage())?.lazy();

        let joined = anchor
            .join(
                capital,
                [col(YEAR)],
                [col(YEAR)],
                JoinArgs::new(JoinType::Left),
            )
            .join(
                leverage,
                [col(YEAR)],
                [col(YEAR)],
                JoinArgs::new(JoinType::Left),
            )
            .sort([YEAR], Default::default());

        let min_den = self.config.min_denominator;

        let derived = joined
            // Stage 1: levels
            .with_columns([(col("tier1_capital") + col("tier2_capital")).alias("total_capital")])
            // Stage 2: logs
            .with_columns([
                positive_log("nominal_gdp").alias("log_nominal_gdp"),
                positive_log("bank_credit").alias("log_bank_credit"),
                positive_log("deposits").alias("log_deposits"),
            ])
            // Stage 4 runs before stage 3 for rw_density, which change_in_rw lags
            .with_columns([
                ratio(col("total_capital"), "total_rwa", min_den).alias("crar"),
                ratio(
                    col("total_capital") - col("capital_requirement"),
                    "total_rwa",
                    min_den,
                )
                .alias("capital_surplus_ratio"),
                ratio(col("net_npa"), "net_advances", min_den).alias("net_npa_ratio"),
                ratio(col("total_capital"), "total_assets", min_den).alias("leverage_ratio"),
                ratio(col("total_rwa"), "total_assets", min_den).alias("rw_density"),
                ratio(col("bank_credit"), "deposits", min_den).alias("credit_to_deposit_ratio"),
                ratio(col("bank_credit"), "nominal_gdp", min_den).alias("credit_to_gdp_ratio"),
            ])
            // Stage 3: one-year changes
            .with_columns([
                one_year_change("log_nominal_gdp").alias("nominal_gdp_growth"),
                one_year_change("log_bank_credit").alias("bank_credit_growth"),
                one_year_change("log_deposits").alias("deposits_growth"),
                one_year_change("rw_density").alias("change_in_rw"),
            ])
            .select(
                PANEL_SCHEMA
                    .iter()
                    .map(|v| col(v.name))
                    .collect::<Vec<_>>(),
            );

        Ok(derived.collect()?)
    }

    /// Build the typed analysis panel.
    pub fn build(&self, sources: &SourceSet) -> Result<AnalysisPanel, PanelError> {
        let frame = self.build_frame(sources)?;
        let panel = AnalysisPanel::from_frame(&frame)?;

        for (table, name) in [
            (sources.capital(), "capital"),
            (sources.leverage(), "leverage"),
        ] {
            let unmatched = panel
                .years()
                .into_iter()
                .filter(|y| !table.records.iter().any(|r| r.year == *y))
                .count();
            if unmatched > 0 {
                debug!(source = name, unmatched, "anchor years absent from auxiliary source");
            }
        }

        info!(
            rows = panel.len(),
            columns = panel.columns().len() + 1,
            "built analysis panel"
        );
        Ok(panel)
    }
}

/// Frame with an Int32 `year` column plus one Float64 column per schema
/// level of this source. Schema columns absent from the table are all null.
fn source_frame(table: &SourceTable) -> PolarsResult<DataFrame> {
    let mut columns: Vec<Column> = vec![Series::new(YEAR.into(), table.years()).into()];
    for name in schema::source_columns(table.kind) {
        columns.push(Series::new(name.into(), table.column_values(name)).into());
    }
    DataFrame::new(columns)
}

/// Natural log, null unless the value is strictly positive.
fn positive_log(name: &str) -> Expr {
    let ln = col(name).apply(
        |c: Column| {
            let s = c.as_materialized_series();
            Ok(Some(s.f64()?.apply_values(|v| v.ln()).into_series().into()))
        },
        GetOutput::from_type(DataType::Float64),
    );
    when(col(name).gt(lit(0.0)))
        .then(ln)
        .otherwise(lit(NULL))
}

/// `numerator / denominator`, null unless the denominator exceeds `floor`.
fn ratio(numerator: Expr, denominator: &str, floor: f64) -> Expr {
    when(col(denominator).gt(lit(floor)))
        .then(numerator / col(denominator))
        .otherwise(lit(NULL))
}

/// `x(t) - x(t-1)`, null unless the previous row is year `t - 1`.
fn one_year_change(name: &str) -> Expr {
    let consecutive = (col(YEAR) - col(YEAR).shift(lit(1i64))).eq(lit(1));
    when(consecutive)
        .then(col(name) - col(name).shift(lit(1i64)))
        .otherwise(lit(NULL))
}

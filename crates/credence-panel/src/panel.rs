//! The unified annual panel.

use crate::error::{PanelError, PanelIntegrityError};
use crate::schema::YEAR;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One fiscal year of the panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisPanelRow {
    /// Fiscal year key
    pub year: i32,
    /// Variable values; `None` is an explicit missing marker
    pub values: BTreeMap<String, Option<f64>>,
}

impl AnalysisPanelRow {
    /// Value of a variable, `None` if missing or not in the panel.
    pub fn get(&self, column: &str) -> Option<f64> {
        self.values.get(column).copied().flatten()
    }
}

/// The analysis panel: one row per year, one column per variable.
///
/// Built once, then only read. Column order is the schema's export order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisPanel {
    columns: Vec<String>,
    rows: Vec<AnalysisPanelRow>,
}

impl AnalysisPanel {
    /// Create a panel from rows. `columns` excludes `year`.
    ///
    /// Rows are kept in the order given; the validator checks ordering.
    pub fn new(columns: Vec<String>, rows: Vec<AnalysisPanelRow>) -> Self {
        Self { columns, rows }
    }

    /// Materialize a polars frame with an integer `year` column.
    ///
    /// A null year is a fatal integrity error. Non-finite values become
    /// missing.
    pub fn from_frame(df: &DataFrame) -> Result<Self, PanelError> {
        let year_col = df.column(YEAR)?.cast(&DataType::Int32)?;
        let years = year_col.i32()?;

        let mut rows = Vec::with_capacity(df.height());
        for (row, year) in years.into_iter().enumerate() {
            let year = year.ok_or(PanelIntegrityError::MissingYear { row })?;
            rows.push(AnalysisPanelRow {
                year,
                values: BTreeMap::new(),
            });
        }

        let mut columns = Vec::new();
        for name in df.get_column_names() {
            if name.as_str() == YEAR {
                continue;
            }
            let values = df.column(name.as_str())?.cast(&DataType::Float64)?;
            let values = values.f64()?;
            for (row, value) in rows.iter_mut().zip(values.into_iter()) {
                row.values
                    .insert(name.to_string(), value.filter(|v| v.is_finite()));
            }
            columns.push(name.to_string());
        }

        Ok(Self { columns, rows })
    }

    /// Convert back to a polars frame, `year` first.
    pub fn to_frame(&self) -> PolarsResult<DataFrame> {
        let mut frame_columns: Vec<Column> = Vec::with_capacity(self.columns.len() + 1);
        frame_columns.push(Series::new(YEAR.into(), self.years()).into());
        for name in &self.columns {
            let values: Vec<Option<f64>> = self.rows.iter().map(|r| r.get(name)).collect();
            frame_columns.push(Series::new(name.as_str().into(), values).into());
        }
        DataFrame::new(frame_columns)
    }

    /// Variable columns, excluding `year`.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns true if the panel has the variable (or it is `year`).
    pub fn has_column(&self, name: &str) -> bool {
        name == YEAR || self.columns.iter().any(|c| c == name)
    }

    /// Rows in panel order.
    pub fn rows(&self) -> &[AnalysisPanelRow] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if there are no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Years in row order.
    pub fn years(&self) -> Vec<i32> {
        self.rows.iter().map(|r| r.year).collect()
    }

    /// First and last year, if any rows exist.
    pub fn year_range(&self) -> Option<(i32, i32)> {
        let min = self.rows.iter().map(|r| r.year).min()?;
        let max = self.rows.iter().map(|r| r.year).max()?;
        Some((min, max))
    }

    /// One column's values in row order, `None` if the column is unknown.
    pub fn column(&self, name: &str) -> Option<Vec<Option<f64>>> {
        if name == YEAR {
            return Some(self.rows.iter().map(|r| Some(f64::from(r.year))).collect());
        }
        self.has_column(name)
            .then(|| self.rows.iter().map(|r| r.get(name)).collect())
    }

    /// The row for a year, if present.
    pub fn row(&self, year: i32) -> Option<&AnalysisPanelRow> {
        self.rows.iter().find(|r| r.year == year)
    }

    /// Value of one variable in one year.
    pub fn value(&self, year: i32, column: &str) -> Option<f64> {
        self.row(year).and_then(|r| r.get(column))
    }
}

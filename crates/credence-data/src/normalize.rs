//! Column-name normalization and cell parsing.
//!
//! Curated spreadsheets name the same concept many ways ("Tier I Capital",
//! "CRAR (%)", "Leverage Ratio(TRC/TA)"). Headers are folded to lowercase
//! snake case before any schema lookup, and cells are parsed strictly:
//! a recognised missing token becomes `None`, anything else that is not a
//! number is an error for the caller to report.

use regex::Regex;
use std::num::ParseFloatError;
use std::sync::LazyLock;

static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static DASH_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-+").unwrap());
static UNDERSCORE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"__+").unwrap());
static YEAR_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(19\d{2}|20\d{2})").unwrap());

/// Cell contents treated as an explicit missing value.
pub const MISSING_TOKENS: &[&str] = &["", "na", "n/a", "nan", "-", "null", "none", ".."];

/// Normalize a raw header into a lowercase snake-case column name.
///
/// # Example
/// ```
/// use credence_data::normalize_column_name;
///
/// assert_eq!(normalize_column_name(" Tier I Capital "), "tier_i_capital");
/// assert_eq!(normalize_column_name("Leverage Ratio(TRC/TA)"), "leverage_ratiotrc_to_ta");
/// assert_eq!(normalize_column_name("CRAR (%)"), "crar_pct");
/// ```
pub fn normalize_column_name(raw: &str) -> String {
    let name = raw
        .trim()
        .replace(['\u{2013}', '\u{2014}'], "-")
        .replace('/', "_to_")
        .replace(['(', ')'], "")
        .replace('%', "pct");
    let name = WHITESPACE_RUN.replace_all(&name, "_");
    let name = DASH_RUN.replace_all(&name, "_");
    let name = UNDERSCORE_RUN.replace_all(&name, "_");
    name.to_lowercase().trim_matches('_').to_string()
}

/// Extract the fiscal year from a cell.
///
/// The first 19xx/20xx token wins, so `2002-03`, `FY2004` and `2005.0` all
/// resolve to their leading calendar year.
pub fn parse_year(raw: &str) -> Option<i32> {
    YEAR_TOKEN
        .find(raw.trim())
        .and_then(|m| m.as_str().parse().ok())
}

/// Returns true if the cell is a recognised missing-value token.
pub fn is_missing_token(raw: &str) -> bool {
    let cell = raw.trim();
    MISSING_TOKENS.iter().any(|t| cell.eq_ignore_ascii_case(t))
}

/// Parse a numeric cell.
///
/// Missing tokens yield `Ok(None)`. Thousands separators are stripped.
/// Non-finite results (`inf`) are treated as missing.
pub fn parse_numeric(raw: &str) -> Result<Option<f64>, ParseFloatError> {
    if is_missing_token(raw) {
        return Ok(None);
    }
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    let value: f64 = cleaned.parse()?;
    Ok(value.is_finite().then_some(value))
}

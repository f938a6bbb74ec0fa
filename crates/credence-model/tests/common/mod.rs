//! Shared fixture: a 23-year panel, 2002..=2024, generated from a known
//! linear model with deterministic noise.

use credence_panel::{AnalysisPanel, AnalysisPanelRow, PanelValidator, ValidatedPanel};
use std::collections::BTreeMap;

const COLUMNS: &[&str] = &[
    "nominal_gdp",
    "log_nominal_gdp",
    "nominal_gdp_growth",
    "bank_credit",
    "log_bank_credit",
    "bank_credit_growth",
    "crar",
    "capital_surplus_ratio",
    "net_npa_ratio",
    "leverage_ratio",
    "change_in_rw",
];

/// Deterministic pseudo-noise in [-0.5, 0.5), splitmix64-hashed.
fn noise(seed: u64) -> f64 {
    let mut z = seed.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^= z >> 31;
    (z >> 11) as f64 / (1u64 << 53) as f64 - 0.5
}

/// 2002..=2024; growth and differences missing in the first year.
pub(crate) fn panel() -> ValidatedPanel {
    let mut log_gdp = 14.0;
    let mut log_credit = 13.0;
    let mut rw_prev: f64 = 0.55;
    let mut rows = Vec::new();

    for (i, year) in (2002..=2024).enumerate() {
        let t = i as u64;
        let gdp_growth = 0.11 + 0.03 * noise(t);
        let npa = 0.03 + 0.02 * (noise(t + 100) + 0.5);
        let surplus = 0.03 + 0.02 * (noise(t + 200) + 0.5);
        let crar = surplus + 0.09 + 0.005 * noise(t + 300);
        let leverage = 0.06 + 0.01 * noise(t + 400);
        let rw = 0.55 + 0.05 * noise(t + 500);
        let change_rw = rw - rw_prev;
        let credit_growth = 0.05 + 0.6 * gdp_growth - 1.2 * npa + 0.4 * surplus + 0.2 * change_rw
            + 0.01 * noise(t + 600);

        let first = i == 0;
        if !first {
            log_gdp += gdp_growth;
            log_credit += credit_growth;
        }
        let lagged = |v: f64| (!first).then_some(v);

        let values = BTreeMap::from([
            ("nominal_gdp".to_string(), Some(f64::exp(log_gdp))),
            ("log_nominal_gdp".to_string(), Some(log_gdp)),
            ("nominal_gdp_growth".to_string(), lagged(gdp_growth)),
            ("bank_credit".to_string(), Some(f64::exp(log_credit))),
            ("log_bank_credit".to_string(), Some(log_credit)),
            ("bank_credit_growth".to_string(), lagged(credit_growth)),
            ("crar".to_string(), Some(crar)),
            ("capital_surplus_ratio".to_string(), Some(surplus)),
            ("net_npa_ratio".to_string(), Some(npa)),
            ("leverage_ratio".to_string(), Some(leverage)),
            ("change_in_rw".to_string(), lagged(change_rw)),
        ]);
        rows.push(AnalysisPanelRow { year, values });
        rw_prev = rw;
    }

    let panel = AnalysisPanel::new(COLUMNS.iter().map(|c| (*c).to_string()).collect(), rows);
    PanelValidator::default()
        .validate(panel)
        .into_validated()
        .unwrap()
}

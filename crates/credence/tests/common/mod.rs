//! Shared fixture: source CSVs generated with deterministic noise and
//! written to a scratch directory.

use credence::PipelineConfig;
use credence_data::SourceKind;
use std::fs;
use std::path::{Path, PathBuf};

/// Deterministic pseudo-noise in [-0.5, 0.5), splitmix64-hashed.
fn noise(seed: u64) -> f64 {
    let mut z = seed.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^= z >> 31;
    (z >> 11) as f64 / (1u64 << 53) as f64 - 0.5
}

fn macro_csv(years: &[i32]) -> String {
    let mut csv = String::from("Year,Nominal GDP,Bank Credit\n");
    let (mut gdp, mut credit) = (2_000_000.0, 600_000.0);
    for (i, year) in years.iter().enumerate() {
        let t = i as u64;
        if i > 0 {
            gdp *= 1.11 + 0.04 * noise(t);
            credit *= 1.14 + 0.06 * noise(t + 50);
        }
        csv.push_str(&format!("{year}-{:02},{gdp:.1},{credit:.1}\n", (year + 1) % 100));
    }
    csv
}

fn capital_csv(years: &[i32]) -> String {
    let mut csv = String::from(
        "year,tier1_capital,tier2_capital,capital_requirement,total_rwa,net_npa,net_advances\n",
    );
    let mut rwa = 800_000.0;
    for (i, year) in years.iter().enumerate() {
        let t = i as u64;
        if i > 0 {
            rwa *= 1.12 + 0.05 * noise(t + 100);
        }
        let advances = 1.6 * rwa * (1.0 + 0.1 * noise(t + 200));
        csv.push_str(&format!(
            "{year},{:.1},{:.1},{:.1},{rwa:.1},{:.1},{advances:.1}\n",
            rwa * (0.10 + 0.02 * noise(t + 300)),
            rwa * (0.03 + 0.01 * noise(t + 400)),
            rwa * (0.09 + 0.005 * noise(t + 500)),
            advances * (0.03 + 0.02 * noise(t + 600)),
        ));
    }
    csv
}

fn leverage_csv(years: &[i32]) -> String {
    let mut csv = String::from("fiscal_year,total_assets,deposits,repos\n");
    let mut assets = 1_500_000.0;
    for (i, year) in years.iter().enumerate() {
        let t = i as u64;
        if i > 0 {
            assets *= 1.12 + 0.04 * noise(t + 700);
        }
        csv.push_str(&format!(
            "{year},{assets:.1},{:.1},\n",
            assets * (0.7 + 0.05 * noise(t + 800))
        ));
    }
    csv
}

/// Fresh per-process directory under the system temp dir.
pub(crate) fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("credence-pipeline-{name}-{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

/// Writes the three source tables into `dir` and points a config at them.
pub(crate) fn config(dir: &Path, anchor_years: &[i32], aux_years: &[i32]) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    for (kind, name, text) in [
        (SourceKind::Macro, "business_cycle.csv", macro_csv(anchor_years)),
        (SourceKind::Capital, "balance_sheet.csv", capital_csv(aux_years)),
        (SourceKind::Leverage, "leverage.csv", leverage_csv(aux_years)),
    ] {
        let path = dir.join(name);
        fs::write(&path, text).unwrap();
        config.sources.set(kind, path);
    }
    config.out_dir = dir.join("outputs");
    config
}

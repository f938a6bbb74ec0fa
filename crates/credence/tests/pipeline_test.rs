//! End-to-end runs over CSV sources written to a temporary directory

mod common;

use approx::assert_relative_eq;
use common::{config, scratch};
use credence::{Mode, Pipeline, PipelineError, Stage};
use credence_data::SourceKind;
use credence_output::RunManifest;
use std::fs;

#[test]
fn test_full_run_writes_every_output() {
    let dir = scratch("full");
    let years: Vec<i32> = (2002..=2024).collect();
    let config = config(&dir, &years, &years);
    let out_dir = config.out_dir.clone();

    let output = Pipeline::new(config).run(Mode::Full).unwrap();

    assert_eq!(output.panel.len(), 23);
    let baseline = output.baseline.as_ref().unwrap();
    assert_eq!(baseline.n_obs, 22);
    assert_eq!(baseline.df_resid, 16);

    let battery = output.robustness.as_ref().unwrap();
    assert_eq!(battery.comparison.len(), 4);
    let from_battery = battery.result("spec_1_baseline").unwrap();
    assert_relative_eq!(from_battery.r_squared, baseline.r_squared, epsilon = 1e-12);

    let manifest: RunManifest =
        serde_json::from_str(&fs::read_to_string(out_dir.join("run_manifest.json")).unwrap())
            .unwrap();
    assert_eq!(manifest.fitted.len() + manifest.failed.len(), 4);
    for file in &manifest.files {
        assert!(out_dir.join(file).exists(), "{file} listed but missing");
    }
    for file in [
        "data_validation_summary.csv",
        "data_validation_report.md",
        "final_panel.csv",
        "data_dictionary.csv",
        "final_panel_quality.md",
        "final_panel_quality.json",
        "baseline_regression.csv",
        "robustness_model_metrics.csv",
        "robustness_comparison_table.csv",
        "coefficient_stability.csv",
        "robustness.json",
    ] {
        assert!(manifest.files.iter().any(|f| f == file), "{file} not in manifest");
    }

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_build_mode_skips_estimation() {
    let dir = scratch("build");
    let years: Vec<i32> = (2010..=2016).collect();
    let config = config(&dir, &years, &years);
    let out_dir = config.out_dir.clone();

    let output = Pipeline::new(config).run(Mode::Build).unwrap();

    assert!(output.baseline.is_none());
    assert!(output.robustness.is_none());
    assert!(out_dir.join("final_panel.csv").exists());
    assert!(!out_dir.join("baseline_regression.csv").exists());
    assert_eq!(output.manifest.panel.as_ref().unwrap().rows, 7);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_rejected_panel_halts_with_quality_report() {
    let dir = scratch("rejected");
    let years = [2010, 2011, 2013, 2014];
    let config = config(&dir, &years, &years);
    let out_dir = config.out_dir.clone();

    let err = Pipeline::new(config).run(Mode::Full).unwrap_err();

    assert_eq!(err.stage(), Stage::Validate);
    assert!(matches!(err, PipelineError::Rejected { .. }));
    assert!(out_dir.join("final_panel_quality.md").exists());
    assert!(!out_dir.join("final_panel.csv").exists());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_documented_gap_is_accepted() {
    let dir = scratch("documented");
    let years = [2010, 2011, 2013, 2014, 2015];
    let mut config = config(&dir, &years, &years);
    config.validation.documented_gaps = vec![2012];

    let output = Pipeline::new(config).run(Mode::Build).unwrap();
    assert_eq!(output.panel.len(), 5);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_malformed_source_halts_at_load() {
    let dir = scratch("malformed");
    let years: Vec<i32> = (2010..=2014).collect();
    let config = config(&dir, &years, &years);
    fs::write(config.sources.get(SourceKind::Leverage), "fiscal_year,deposits\n2010,1.0\n").unwrap();
    let out_dir = config.out_dir.clone();

    let err = Pipeline::new(config).run(Mode::Full).unwrap_err();

    assert_eq!(err.stage(), Stage::Load);
    assert!(err.to_string().contains("total_assets"), "{err}");
    assert!(!out_dir.exists());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_source_summary_written_before_merge() {
    let dir = scratch("sources");
    let anchor: Vec<i32> = (2010..=2016).collect();
    let aux: Vec<i32> = (2011..=2016).collect();
    let config = config(&dir, &anchor, &aux);
    let out_dir = config.out_dir.clone();

    let output = Pipeline::new(config).run(Mode::Build).unwrap();

    let kinds: Vec<SourceKind> = output.sources.iter().map(|s| s.source).collect();
    assert_eq!(kinds, SourceKind::ALL);
    let macro_summary = &output.sources[0];
    assert_eq!(macro_summary.rows, 7);
    assert_eq!(macro_summary.columns, 3);
    assert_eq!(macro_summary.first_year, Some(2010));
    assert!(macro_summary.path.as_deref().unwrap().ends_with("business_cycle.csv"));
    let capital = &output.sources[1];
    assert_eq!(capital.rows, 6);
    assert_eq!(capital.first_year, Some(2011));
    assert_eq!(output.sources[2].column_names, vec!["total_assets", "deposits", "repos"]);
    assert_eq!(output.sources[2].missing_values, 6);

    let csv = fs::read_to_string(out_dir.join("data_validation_summary.csv")).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("source,path,rows,columns"));
    assert!(lines[1].starts_with("business_cycle,"));
    let report = fs::read_to_string(out_dir.join("data_validation_report.md")).unwrap();
    assert!(report.contains("## balance_sheet"));
    assert!(output.manifest.files.iter().any(|f| f == "data_validation_summary.csv"));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_rejected_run_keeps_source_summary() {
    let dir = scratch("rejected-sources");
    let years = [2010, 2011, 2013];
    let config = config(&dir, &years, &years);
    let out_dir = config.out_dir.clone();

    let err = Pipeline::new(config).run(Mode::Full).unwrap_err();

    assert_eq!(err.stage(), Stage::Validate);
    let csv = fs::read_to_string(out_dir.join("data_validation_summary.csv")).unwrap();
    assert!(csv.lines().nth(1).unwrap().contains(",3,3,2010,2013,0,0,"), "{csv}");

    let _ = fs::remove_dir_all(&dir);
}

//! Robustness Engine
//!
//! Fits every registered specification against the same validated panel and
//! compares them. A failing specification is recorded with its reason and
//! never aborts the battery.

use crate::error::EstimationError;
use crate::estimator::{Estimator, EstimatorConfig, RegressionResult};
use crate::registry::{INTERCEPT, RegressionSpecification, SpecFamily, SpecificationRegistry};
use credence_panel::ValidatedPanel;
use derive_more::Display;
use serde::Serialize;
use tracing::{info, warn};

/// Fit or failure of one specification.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FitOutcome {
    /// Estimated successfully
    Fitted {
        /// The estimates
        result: RegressionResult,
    },
    /// Could not be estimated
    Failed {
        /// Why
        error: EstimationError,
    },
}

impl FitOutcome {
    /// The result, if fitted.
    pub const fn result(&self) -> Option<&RegressionResult> {
        match self {
            Self::Fitted { result } => Some(result),
            Self::Failed { .. } => None,
        }
    }

    /// The error, if failed.
    pub const fn error(&self) -> Option<&EstimationError> {
        match self {
            Self::Fitted { .. } => None,
            Self::Failed { error } => Some(error),
        }
    }
}

impl From<Result<RegressionResult, EstimationError>> for FitOutcome {
    fn from(result: Result<RegressionResult, EstimationError>) -> Self {
        match result {
            Ok(result) => Self::Fitted { result },
            Err(error) => Self::Failed { error },
        }
    }
}

/// One specification and its outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpecOutcome {
    /// The specification as registered
    pub specification: RegressionSpecification,
    /// Fit or failure
    pub outcome: FitOutcome,
}

/// One row of the model comparison table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    /// Specification name
    pub spec: String,
    /// Specification family
    pub family: SpecFamily,
    /// `fitted` or `failed`
    pub status: &'static str,
    /// Observations used
    pub n_obs: Option<usize>,
    /// Rows dropped by listwise deletion
    pub n_dropped: Option<usize>,
    /// R²
    pub r2: Option<f64>,
    /// Adjusted R²
    pub adj_r2: Option<f64>,
    /// AIC
    pub aic: Option<f64>,
    /// BIC
    pub bic: Option<f64>,
    /// Residual degrees of freedom
    pub df_resid: Option<usize>,
    /// AIC minus the best AIC
    pub delta_aic: Option<f64>,
    /// BIC minus the best BIC
    pub delta_bic: Option<f64>,
    /// Failure reason
    pub error: Option<String>,
}

/// Coefficient sign
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Sign {
    /// Strictly positive
    #[display("+")]
    Positive,
    /// Strictly negative
    #[display("-")]
    Negative,
    /// Exactly zero
    #[display("0")]
    Zero,
}

impl Sign {
    fn of(value: f64) -> Self {
        if value > 0.0 {
            Self::Positive
        } else if value < 0.0 {
            Self::Negative
        } else {
            Self::Zero
        }
    }
}

/// A regressor's estimate in one fitted specification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StabilityEntry {
    /// Specification name
    pub spec: String,
    /// Coefficient
    pub coef: f64,
    /// Sign of the coefficient
    pub sign: Sign,
    /// p-value
    pub p_value: f64,
    /// p-value below the significance level
    pub significant: bool,
}

/// How one regressor's coefficient moves across specifications.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoefficientStability {
    /// Regressor name
    pub term: String,
    /// Specifications declaring the regressor
    pub declared_in: usize,
    /// Estimates from the fitted specifications, registration order
    pub entries: Vec<StabilityEntry>,
    /// Every fitted estimate has the same nonzero sign
    pub sign_consistent: bool,
    /// Smallest coefficient
    pub min: Option<f64>,
    /// Largest coefficient
    pub max: Option<f64>,
    /// `(max − min) / mean |coef|`
    pub relative_spread: Option<f64>,
}

/// Best specification by each criterion, among fitted ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SelectionMetrics {
    /// Lowest AIC
    pub best_by_aic: Option<String>,
    /// Lowest BIC
    pub best_by_bic: Option<String>,
    /// Highest adjusted R²
    pub best_by_adj_r2: Option<String>,
}

/// Everything the battery produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RobustnessReport {
    /// Outcomes in registration order
    pub outcomes: Vec<SpecOutcome>,
    /// One row per specification, registration order
    pub comparison: Vec<ComparisonRow>,
    /// Regressors declared in more than one specification
    pub stability: Vec<CoefficientStability>,
    /// Best specifications
    pub selection: SelectionMetrics,
    /// Significance level used for stability flags
    pub alpha: f64,
}

impl RobustnessReport {
    /// Outcome of one specification.
    pub fn outcome(&self, spec: &str) -> Option<&FitOutcome> {
        self.outcomes
            .iter()
            .find(|o| o.specification.name == spec)
            .map(|o| &o.outcome)
    }

    /// Result of one specification, if it was fitted.
    pub fn result(&self, spec: &str) -> Option<&RegressionResult> {
        self.outcome(spec).and_then(FitOutcome::result)
    }

    /// Fitted results in registration order.
    pub fn fitted(&self) -> impl Iterator<Item = &RegressionResult> {
        self.outcomes.iter().filter_map(|o| o.outcome.result())
    }

    /// Number of specifications that failed.
    pub fn n_failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.outcome.error().is_some())
            .count()
    }

    /// Stability summary of one regressor.
    pub fn stability_of(&self, term: &str) -> Option<&CoefficientStability> {
        self.stability.iter().find(|s| s.term == term)
    }
}

/// Runs the registry's specifications through one estimator.
#[derive(Debug, Default, Clone)]
pub struct RobustnessEngine {
    estimator: Estimator,
}

impl RobustnessEngine {
    /// Engine with a custom estimator configuration.
    pub const fn with_config(config: EstimatorConfig) -> Self {
        Self {
            estimator: Estimator::with_config(config),
        }
    }

    /// The estimator used for every specification.
    pub const fn estimator(&self) -> &Estimator {
        &self.estimator
    }

    /// Fit every specification and build the comparison.
    pub fn run(&self, registry: &SpecificationRegistry, panel: &ValidatedPanel) -> RobustnessReport {
        let outcomes: Vec<SpecOutcome> = registry
            .iter()
            .map(|spec| {
                let outcome = FitOutcome::from(self.estimator.fit(spec, panel));
                if let FitOutcome::Failed { error } = &outcome {
                    warn!(specification = %spec.name, %error, "specification failed");
                }
                SpecOutcome {
                    specification: spec.clone(),
                    outcome,
                }
            })
            .collect();

        let alpha = self.estimator.config().alpha();
        let selection = select(&outcomes);
        let comparison = comparison_table(&outcomes);
        let stability = coefficient_stability(&outcomes, alpha);

        let fitted = outcomes.iter().filter(|o| o.outcome.result().is_some()).count();
        info!(
            specifications = outcomes.len(),
            fitted,
            failed = outcomes.len() - fitted,
            best_by_aic = selection.best_by_aic.as_deref().unwrap_or("-"),
            "robustness battery complete"
        );

        RobustnessReport {
            outcomes,
            comparison,
            stability,
            selection,
            alpha,
        }
    }
}

fn comparison_table(outcomes: &[SpecOutcome]) -> Vec<ComparisonRow> {
    let best_aic = best(outcomes, |r| r.aic, f64::lt).map(|r| r.aic);
    let best_bic = best(outcomes, |r| r.bic, f64::lt).map(|r| r.bic);

    outcomes
        .iter()
        .map(|o| {
            let spec = &o.specification;
            match &o.outcome {
                FitOutcome::Fitted { result } => ComparisonRow {
                    spec: spec.name.clone(),
                    family: spec.family,
                    status: "fitted",
                    n_obs: Some(result.n_obs),
                    n_dropped: Some(result.n_dropped),
                    r2: Some(result.r_squared),
                    adj_r2: Some(result.adj_r_squared),
                    aic: Some(result.aic),
                    bic: Some(result.bic),
                    df_resid: Some(result.df_resid),
                    delta_aic: best_aic.map(|b| result.aic - b),
                    delta_bic: best_bic.map(|b| result.bic - b),
                    error: None,
                },
                FitOutcome::Failed { error } => ComparisonRow {
                    spec: spec.name.clone(),
                    family: spec.family,
                    status: "failed",
                    n_obs: None,
                    n_dropped: None,
                    r2: None,
                    adj_r2: None,
                    aic: None,
                    bic: None,
                    df_resid: None,
                    delta_aic: None,
                    delta_bic: None,
                    error: Some(error.to_string()),
                },
            }
        })
        .collect()
}

/// First fitted result whose finite metric beats every other under `better`.
fn best<'a>(
    outcomes: &'a [SpecOutcome],
    metric: impl Fn(&RegressionResult) -> f64,
    better: impl Fn(&f64, &f64) -> bool,
) -> Option<&'a RegressionResult> {
    let mut best: Option<&RegressionResult> = None;
    for result in outcomes.iter().filter_map(|o| o.outcome.result()) {
        let value = metric(result);
        if !value.is_finite() {
            continue;
        }
        if best.is_none_or(|b| better(&value, &metric(b))) {
            best = Some(result);
        }
    }
    best
}

fn select(outcomes: &[SpecOutcome]) -> SelectionMetrics {
    let name = |r: &RegressionResult| r.specification.clone();
    SelectionMetrics {
        best_by_aic: best(outcomes, |r| r.aic, f64::lt).map(name),
        best_by_bic: best(outcomes, |r| r.bic, f64::lt).map(name),
        best_by_adj_r2: best(outcomes, |r| r.adj_r_squared, f64::gt).map(name),
    }
}

fn coefficient_stability(outcomes: &[SpecOutcome], alpha: f64) -> Vec<CoefficientStability> {
    let mut terms: Vec<&str> = Vec::new();
    for o in outcomes {
        for regressor in &o.specification.regressors {
            if regressor != INTERCEPT && !terms.contains(&regressor.as_str()) {
                terms.push(regressor);
            }
        }
    }

    terms
        .into_iter()
        .filter_map(|term| {
            let declared_in = outcomes
                .iter()
                .filter(|o| o.specification.has_regressor(term))
                .count();
            if declared_in < 2 {
                return None;
            }

            let entries: Vec<StabilityEntry> = outcomes
                .iter()
                .filter_map(|o| o.outcome.result())
                .filter_map(|r| r.term(term).map(|t| (r, t)))
                .map(|(r, t)| StabilityEntry {
                    spec: r.specification.clone(),
                    coef: t.coef,
                    sign: Sign::of(t.coef),
                    p_value: t.p_value,
                    significant: t.is_significant(alpha),
                })
                .collect();

            let sign_consistent = entries.first().is_some_and(|first| {
                first.sign != Sign::Zero && entries.iter().all(|e| e.sign == first.sign)
            });
            let min = entries.iter().map(|e| e.coef).reduce(f64::min);
            let max = entries.iter().map(|e| e.coef).reduce(f64::max);
            let relative_spread = match (min, max) {
                (Some(min), Some(max)) => {
                    let mean_abs =
                        entries.iter().map(|e| e.coef.abs()).sum::<f64>() / entries.len() as f64;
                    (mean_abs > 0.0).then(|| (max - min) / mean_abs)
                }
                _ => None,
            };

            Some(CoefficientStability {
                term: term.to_string(),
                declared_in,
                entries,
                sign_consistent,
                min,
                max,
                relative_spread,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RegressionSpecification;
    use approx::assert_relative_eq;
    use credence_panel::{AnalysisPanel, AnalysisPanelRow, PanelValidator, ValidationConfig};
    use std::collections::BTreeMap;

    fn panel() -> ValidatedPanel {
        let x1 = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let x2 = [0.5, 0.1, 0.9, 0.3, 0.8, 0.2, 0.7, 0.4];
        let rows = (0..8)
            .map(|i| AnalysisPanelRow {
                year: 2010 + i as i32,
                values: BTreeMap::from([
                    (
                        "bank_credit_growth".to_string(),
                        Some(0.5 + 0.3 * x1[i] - 0.8 * x2[i] + 0.05 * (i as f64 % 3.0 - 1.0)),
                    ),
                    ("net_npa_ratio".to_string(), Some(x1[i])),
                    ("change_in_rw".to_string(), Some(x2[i])),
                    ("crar".to_string(), Some(2.0 * x1[i])),
                ]),
            })
            .collect();
        let panel = AnalysisPanel::new(
            vec![
                "bank_credit_growth".into(),
                "net_npa_ratio".into(),
                "change_in_rw".into(),
                "crar".into(),
            ],
            rows,
        );
        let config = ValidationConfig {
            core_columns: vec!["year".into()],
            ..Default::default()
        };
        PanelValidator::with_config(config)
            .validate(panel)
            .into_validated()
            .unwrap()
    }

    fn registry() -> SpecificationRegistry {
        let mut registry = SpecificationRegistry::new();
        for (name, regressors) in [
            ("both", &["net_npa_ratio", "change_in_rw"][..]),
            ("npa_only", &["net_npa_ratio"][..]),
            ("collinear", &["net_npa_ratio", "crar"][..]),
            ("rw_only", &["change_in_rw"][..]),
        ] {
            registry
                .register(RegressionSpecification::new(name, SpecFamily::Custom, regressors))
                .unwrap();
        }
        registry
    }

    #[test]
    fn test_one_row_per_specification() {
        let report = RobustnessEngine::default().run(&registry(), &panel());
        let names: Vec<&str> = report.comparison.iter().map(|r| r.spec.as_str()).collect();
        assert_eq!(names, vec!["both", "npa_only", "collinear", "rw_only"]);
        assert_eq!(report.n_failed(), 1);

        let failed = &report.comparison[2];
        assert_eq!(failed.status, "failed");
        assert!(failed.error.as_deref().unwrap().contains("singular"));
        assert!(failed.aic.is_none());
    }

    #[test]
    fn test_selection_prefers_true_model() {
        let report = RobustnessEngine::default().run(&registry(), &panel());
        assert_eq!(report.selection.best_by_aic.as_deref(), Some("both"));
        assert_eq!(report.selection.best_by_adj_r2.as_deref(), Some("both"));
        let best = &report.comparison[0];
        assert_eq!(best.delta_aic, Some(0.0));
        assert!(report.comparison[1].delta_aic.unwrap() > 0.0);
    }

    #[test]
    fn test_coefficient_stability() {
        let report = RobustnessEngine::default().run(&registry(), &panel());

        let npa = report.stability_of("net_npa_ratio").unwrap();
        assert_eq!(npa.declared_in, 3);
        assert_eq!(npa.entries.len(), 2);
        assert_eq!(npa.entries[0].spec, "both");
        assert!(npa.sign_consistent);
        assert_eq!(npa.entries[0].sign, Sign::Positive);
        let (min, max) = (npa.min.unwrap(), npa.max.unwrap());
        assert!(min <= max);
        let mean_abs = (npa.entries[0].coef.abs() + npa.entries[1].coef.abs()) / 2.0;
        assert_relative_eq!(npa.relative_spread.unwrap(), (max - min) / mean_abs);

        assert!(report.stability_of("change_in_rw").is_some());
        assert!(report.stability_of("crar").is_none());
    }

    #[test]
    fn test_refit_leaves_other_rows_unchanged() {
        let engine = RobustnessEngine::default();
        let first = engine.run(&registry(), &panel());

        let mut extended = registry();
        extended
            .register(RegressionSpecification::new(
                "npa_again",
                SpecFamily::Custom,
                &["net_npa_ratio"],
            ))
            .unwrap();
        let second = engine.run(&extended, &panel());

        assert_eq!(first.result("both"), second.result("both"));
        assert_eq!(
            first.result("npa_only").unwrap().coefficients(),
            second.result("npa_again").unwrap().coefficients()
        );
    }

    #[test]
    fn test_empty_registry() {
        let report = RobustnessEngine::default().run(&SpecificationRegistry::new(), &panel());
        assert!(report.comparison.is_empty());
        assert_eq!(report.selection, SelectionMetrics::default());
    }
}

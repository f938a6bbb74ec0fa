//! Estimator
//!
//! Ordinary least squares with an intercept and a sandwich covariance
//! `(X'X)⁻¹ X'ΩX (X'X)⁻¹`, where `Ω = diag(ω_i)`:
//!
//! | type | ω_i | scale |
//! |------|-----|-------|
//! | HC0 | e_i² | 1 |
//! | HC1 | e_i² | n / (n − k) |
//! | HC2 | e_i² / (1 − h_i) | 1 |
//! | HC3 | e_i² / (1 − h_i)² | 1 |
//!
//! with `h_i = x_iᵀ(X'X)⁻¹x_i` the leverage of observation `i`. `NonRobust`
//! is the classical `σ̂²(X'X)⁻¹` with `σ̂² = SSR / (n − k)`.
//!
//! Rows with a missing value in the outcome or any regressor are dropped
//! listwise, per specification.

use crate::error::{EstimationError, LinalgError};
use crate::linalg::{self, SINGULAR_RATIO};
use crate::registry::{RegressionSpecification, SpecFamily};
use credence_panel::ValidatedPanel;
use derive_more::Display;
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal, StudentsT};
use std::f64::consts::PI;
use tracing::debug;

/// Covariance estimator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, Serialize, Deserialize)]
pub enum CovarianceType {
    /// White
    #[display("HC0")]
    #[serde(rename = "HC0")]
    Hc0,
    /// White with `n / (n − k)` small-sample scaling
    #[default]
    #[display("HC1")]
    #[serde(rename = "HC1")]
    Hc1,
    /// Leverage-adjusted
    #[display("HC2")]
    #[serde(rename = "HC2")]
    Hc2,
    /// Jackknife-like
    #[display("HC3")]
    #[serde(rename = "HC3")]
    Hc3,
    /// Classical homoskedastic
    #[display("nonrobust")]
    #[serde(rename = "nonrobust")]
    NonRobust,
}

/// Reference distribution for test statistics and intervals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InferenceDistribution {
    /// Standard normal (z statistics)
    #[default]
    #[display("normal")]
    Normal,
    /// Student-t with residual degrees of freedom
    #[display("student_t")]
    StudentT,
}

/// Estimator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Covariance estimator (default: HC1)
    pub covariance: CovarianceType,

    /// Reference distribution (default: Normal)
    pub distribution: InferenceDistribution,

    /// Confidence interval level (default: 0.95)
    pub confidence_level: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            covariance: CovarianceType::Hc1,
            distribution: InferenceDistribution::Normal,
            confidence_level: 0.95,
        }
    }
}

impl EstimatorConfig {
    /// Significance level matching the confidence level.
    pub fn alpha(&self) -> f64 {
        1.0 - self.confidence_level
    }
}

/// Estimate for one term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermEstimate {
    /// Term name (`const` or a regressor)
    pub term: String,
    /// Coefficient
    pub coef: f64,
    /// Standard error under the configured covariance
    pub robust_se: f64,
    /// `coef / robust_se`
    pub statistic: f64,
    /// Two-sided p-value
    pub p_value: f64,
    /// Lower confidence bound
    pub ci_low: f64,
    /// Upper confidence bound
    pub ci_high: f64,
}

impl TermEstimate {
    /// Returns true if the two-sided p-value is below `alpha`.
    pub fn is_significant(&self, alpha: f64) -> bool {
        self.p_value < alpha
    }
}

/// A fitted specification. Immutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionResult {
    /// Specification name
    pub specification: String,
    /// Specification family
    pub family: SpecFamily,
    /// Dependent variable
    pub outcome: String,
    /// Per-term estimates, `const` first, then regressors in order
    pub terms: Vec<TermEstimate>,
    /// Coefficient of determination
    pub r_squared: f64,
    /// Adjusted R²
    pub adj_r_squared: f64,
    /// Observations used
    pub n_obs: usize,
    /// Rows dropped by listwise deletion
    pub n_dropped: usize,
    /// Years of the observations used
    pub years_used: Vec<i32>,
    /// Residual degrees of freedom `n − k`
    pub df_resid: usize,
    /// Model degrees of freedom, regressors excluding the intercept
    pub df_model: usize,
    /// Sum of squared residuals
    pub ssr: f64,
    /// Gaussian log-likelihood
    pub log_likelihood: f64,
    /// Akaike information criterion
    pub aic: f64,
    /// Bayesian information criterion
    pub bic: f64,
    /// Covariance estimator used
    pub covariance: CovarianceType,
    /// Reference distribution used
    pub distribution: InferenceDistribution,
    /// Confidence interval level
    pub confidence_level: f64,
    /// Condition number of the unit-diagonal rescaled `X'X`
    pub condition_number: f64,
}

impl RegressionResult {
    /// Estimate for one term.
    pub fn term(&self, name: &str) -> Option<&TermEstimate> {
        self.terms.iter().find(|t| t.term == name)
    }

    /// Coefficient of one term.
    pub fn coefficient(&self, name: &str) -> Option<f64> {
        self.term(name).map(|t| t.coef)
    }

    /// Coefficients in term order.
    pub fn coefficients(&self) -> Vec<f64> {
        self.terms.iter().map(|t| t.coef).collect()
    }

    /// Number of estimated parameters.
    pub fn n_params(&self) -> usize {
        self.terms.len()
    }
}

/// Complete-case design for one specification.
#[derive(Debug, Clone)]
struct Design {
    x: Array2<f64>,
    y: Array1<f64>,
    years: Vec<i32>,
    n_dropped: usize,
}

/// Fits specifications on a validated panel. Pure and deterministic.
#[derive(Debug, Default, Clone)]
pub struct Estimator {
    config: EstimatorConfig,
}

impl Estimator {
    /// Create an estimator with custom configuration.
    pub const fn with_config(config: EstimatorConfig) -> Self {
        Self { config }
    }

    /// Current configuration.
    pub const fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    /// Fit one specification.
    pub fn fit(
        &self,
        spec: &RegressionSpecification,
        panel: &ValidatedPanel,
    ) -> Result<RegressionResult, EstimationError> {
        let name = spec.name.as_str();
        let k = spec.n_params();
        if k == 0 {
            return Err(EstimationError::EmptyDesign {
                specification: name.to_string(),
            });
        }

        let design = listwise_design(spec, panel)?;
        let n = design.y.len();
        // n ≥ regressors + 1 and at least one residual degree of freedom
        let required = (spec.regressors.len() + 1).max(k + 1);
        if n < required {
            return Err(EstimationError::InsufficientObservations {
                specification: name.to_string(),
                n_obs: n,
                required,
            });
        }

        let Design {
            x,
            y,
            years,
            n_dropped,
        } = design;

        let xtx = x.t().dot(&x);
        let inverse = linalg::scaled_inverse(&xtx, SINGULAR_RATIO).map_err(|err| match err {
            err @ LinalgError::DimensionMismatch { .. } => EstimationError::Linalg(err),
            LinalgError::Singular { ratio } => EstimationError::SingularDesign {
                specification: name.to_string(),
                condition_number: if ratio > 0.0 { 1.0 / ratio } else { f64::INFINITY },
            },
        })?;
        let xtx_inv = inverse.inverse;

        let beta = xtx_inv.dot(&x.t().dot(&y));
        let residuals = &y - &x.dot(&beta);
        let ssr = residuals.dot(&residuals);

        let n_f = n as f64;
        let k_f = k as f64;
        let df_resid = n - k;
        let df_model = k - usize::from(spec.intercept);

        let tss = if spec.intercept {
            let mean = y.mean().unwrap_or(0.0);
            y.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
        } else {
            y.dot(&y)
        };
        let r_squared = 1.0 - ssr / tss;
        let adj_r_squared = if spec.intercept {
            1.0 - (1.0 - r_squared) * (n_f - 1.0) / df_resid as f64
        } else {
            1.0 - (1.0 - r_squared) * n_f / df_resid as f64
        };

        let log_likelihood = -n_f / 2.0 * ((2.0 * PI).ln() + (ssr / n_f).ln() + 1.0);
        let aic = -2.0 * log_likelihood + 2.0 * k_f;
        let bic = -2.0 * log_likelihood + k_f * n_f.ln();

        let cov = self.covariance(&x, &residuals, &xtx_inv, ssr, df_resid);
        let terms = self.term_estimates(spec, &beta, &cov, df_resid)?;

        debug!(
            specification = name,
            n_obs = n,
            n_dropped,
            r_squared,
            condition_number = inverse.condition_number,
            "fitted specification"
        );

        Ok(RegressionResult {
            specification: spec.name.clone(),
            family: spec.family,
            outcome: spec.outcome.clone(),
            terms,
            r_squared,
            adj_r_squared,
            n_obs: n,
            n_dropped,
            years_used: years,
            df_resid,
            df_model,
            ssr,
            log_likelihood,
            aic,
            bic,
            covariance: self.config.covariance,
            distribution: self.config.distribution,
            confidence_level: self.config.confidence_level,
            condition_number: inverse.condition_number,
        })
    }

    fn covariance(
        &self,
        x: &Array2<f64>,
        residuals: &Array1<f64>,
        xtx_inv: &Array2<f64>,
        ssr: f64,
        df_resid: usize,
    ) -> Array2<f64> {
        let (n, k) = x.dim();

        let weights: Array1<f64> = match self.config.covariance {
            CovarianceType::NonRobust => {
                return xtx_inv * (ssr / df_resid as f64);
            }
            CovarianceType::Hc0 | CovarianceType::Hc1 => residuals.mapv(|e| e * e),
            CovarianceType::Hc2 | CovarianceType::Hc3 => {
                let power = if self.config.covariance == CovarianceType::Hc2 { 1 } else { 2 };
                let leverage = x.dot(xtx_inv) * x;
                let leverage = leverage.sum_axis(Axis(1));
                residuals
                    .iter()
                    .zip(&leverage)
                    .map(|(e, h)| e * e / (1.0 - h).powi(power))
                    .collect()
            }
        };

        // Meat: Σ ω_i x_i x_iᵀ
        let weighted = x * &weights.insert_axis(Axis(1));
        let meat = x.t().dot(&weighted);
        let mut cov = xtx_inv.dot(&meat).dot(xtx_inv);

        if self.config.covariance == CovarianceType::Hc1 {
            cov *= n as f64 / (n - k) as f64;
        }
        cov
    }

    fn term_estimates(
        &self,
        spec: &RegressionSpecification,
        beta: &Array1<f64>,
        cov: &Array2<f64>,
        df_resid: usize,
    ) -> Result<Vec<TermEstimate>, EstimationError> {
        let reference = Reference::new(self.config.distribution, df_resid).map_err(|reason| {
            EstimationError::Distribution {
                specification: spec.name.clone(),
                reason,
            }
        })?;
        let critical = reference.quantile(1.0 - self.config.alpha() / 2.0);

        Ok(spec
            .terms()
            .into_iter()
            .zip(beta.iter().zip(cov.diag()))
            .map(|(term, (&coef, &var))| {
                let se = var.max(0.0).sqrt();
                let statistic = coef / se;
                TermEstimate {
                    term,
                    coef,
                    robust_se: se,
                    statistic,
                    p_value: 2.0 * reference.survival(statistic.abs()),
                    ci_low: coef - critical * se,
                    ci_high: coef + critical * se,
                }
            })
            .collect())
    }
}

enum Reference {
    Normal(Normal),
    StudentT(StudentsT),
}

impl Reference {
    fn new(distribution: InferenceDistribution, df: usize) -> Result<Self, String> {
        match distribution {
            InferenceDistribution::Normal => Normal::new(0.0, 1.0)
                .map(Self::Normal)
                .map_err(|e| e.to_string()),
            InferenceDistribution::StudentT => StudentsT::new(0.0, 1.0, df as f64)
                .map(Self::StudentT)
                .map_err(|e| e.to_string()),
        }
    }

    fn survival(&self, x: f64) -> f64 {
        match self {
            Self::Normal(d) => d.sf(x),
            Self::StudentT(d) => d.sf(x),
        }
    }

    fn quantile(&self, p: f64) -> f64 {
        match self {
            Self::Normal(d) => d.inverse_cdf(p),
            Self::StudentT(d) => d.inverse_cdf(p),
        }
    }
}

/// Select complete rows and build `X` (intercept column first) and `y`.
fn listwise_design(
    spec: &RegressionSpecification,
    panel: &ValidatedPanel,
) -> Result<Design, EstimationError> {
    for variable in std::iter::once(&spec.outcome).chain(&spec.regressors) {
        if !panel.has_column(variable) {
            return Err(EstimationError::UnknownVariable {
                specification: spec.name.clone(),
                variable: variable.clone(),
            });
        }
    }

    let k = spec.n_params();
    let mut x_values = Vec::new();
    let mut y_values = Vec::new();
    let mut years = Vec::new();
    let mut n_dropped = 0;

    for row in panel.rows() {
        let outcome = row.get(&spec.outcome);
        let regressors: Option<Vec<f64>> = spec.regressors.iter().map(|r| row.get(r)).collect();
        match (outcome, regressors) {
            (Some(y), Some(xs)) => {
                if spec.intercept {
                    x_values.push(1.0);
                }
                x_values.extend(xs);
                y_values.push(y);
                years.push(row.year);
            }
            _ => n_dropped += 1,
        }
    }

    let n = y_values.len();
    let len = x_values.len();
    let x = Array2::from_shape_vec((n, k), x_values).map_err(|_| {
        EstimationError::Linalg(LinalgError::DimensionMismatch {
            expected: n * k,
            actual: len,
        })
    })?;

    Ok(Design {
        x,
        y: Array1::from(y_values),
        years,
        n_dropped,
    })
}

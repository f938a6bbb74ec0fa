//! Specification Registry
//!
//! Ordered list of regression specifications run by the robustness battery.
//! Every variable name is checked against the panel schema once, at
//! registration; the estimator never needs to know which specifications
//! exist.

use crate::error::RegistryError;
use credence_panel::schema;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Outcome variable of every standard specification
pub const OUTCOME: &str = "bank_credit_growth";

/// Intercept term name
pub const INTERCEPT: &str = "const";

/// Specification families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum SpecFamily {
    /// Capital surplus, GDP growth, asset quality, risk-weight change, leverage
    Baseline,
    /// Baseline with CRAR in place of the capital surplus ratio
    CrarSubstitution,
    /// Asset quality, risk-weight change and GDP growth only
    CoreRiskOnly,
    /// Baseline without the GDP growth control
    GdpControlDropped,
    /// User-registered
    Custom,
}

/// One regression specification. Immutable once registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegressionSpecification {
    /// Unique, human-readable name
    pub name: String,
    /// Family tag
    pub family: SpecFamily,
    /// Dependent variable
    pub outcome: String,
    /// Regressors, in term order
    pub regressors: Vec<String>,
    /// Estimate an intercept (`const`, first term)
    pub intercept: bool,
}

impl RegressionSpecification {
    /// Specification of [`OUTCOME`] on `regressors`, with an intercept.
    pub fn new(name: impl Into<String>, family: SpecFamily, regressors: &[&str]) -> Self {
        Self {
            name: name.into(),
            family,
            outcome: OUTCOME.to_string(),
            regressors: regressors.iter().map(|r| (*r).to_string()).collect(),
            intercept: true,
        }
    }

    /// Replace the outcome variable.
    pub fn with_outcome(mut self, outcome: impl Into<String>) -> Self {
        self.outcome = outcome.into();
        self
    }

    /// Drop the intercept.
    pub fn without_intercept(mut self) -> Self {
        self.intercept = false;
        self
    }

    /// Term names in estimation order, `const` first if present.
    pub fn terms(&self) -> Vec<String> {
        let intercept = self.intercept.then(|| INTERCEPT.to_string());
        intercept.into_iter().chain(self.regressors.iter().cloned()).collect()
    }

    /// Number of estimated parameters.
    pub fn n_params(&self) -> usize {
        self.regressors.len() + usize::from(self.intercept)
    }

    /// Returns true if `variable` is one of the regressors.
    pub fn has_regressor(&self, variable: &str) -> bool {
        self.regressors.iter().any(|r| r == variable)
    }

    /// Check the specification on its own, without reference to others.
    pub fn check(&self) -> Result<(), RegistryError> {
        let name = || self.name.clone();
        if self.name.trim().is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.regressors.is_empty() {
            return Err(RegistryError::EmptyRegressors { name: name() });
        }
        if !schema::is_variable(&self.outcome) {
            return Err(RegistryError::UnknownVariable {
                name: name(),
                variable: self.outcome.clone(),
            });
        }

        let mut seen = HashSet::new();
        for variable in &self.regressors {
            if !schema::is_variable(variable) {
                return Err(RegistryError::UnknownVariable {
                    name: name(),
                    variable: variable.clone(),
                });
            }
            if *variable == self.outcome {
                return Err(RegistryError::OutcomeAsRegressor {
                    name: name(),
                    variable: variable.clone(),
                });
            }
            if !seen.insert(variable.as_str()) {
                return Err(RegistryError::RepeatedRegressor {
                    name: name(),
                    variable: variable.clone(),
                });
            }
        }
        Ok(())
    }
}

const BASELINE: &[&str] = &[
    "capital_surplus_ratio",
    "nominal_gdp_growth",
    "net_npa_ratio",
    "change_in_rw",
    "leverage_ratio",
];

/// The four standard specifications, in battery order.
pub fn standard_specifications() -> Vec<RegressionSpecification> {
    vec![
        RegressionSpecification::new("spec_1_baseline", SpecFamily::Baseline, BASELINE),
        RegressionSpecification::new(
            "spec_2_replace_capital_with_crar",
            SpecFamily::CrarSubstitution,
            &[
                "crar",
                "nominal_gdp_growth",
                "net_npa_ratio",
                "change_in_rw",
                "leverage_ratio",
            ],
        ),
        RegressionSpecification::new(
            "spec_3_core_risk_only",
            SpecFamily::CoreRiskOnly,
            &["net_npa_ratio", "change_in_rw", "nominal_gdp_growth"],
        ),
        RegressionSpecification::new(
            "spec_4_drop_gdp_control",
            SpecFamily::GdpControlDropped,
            &[
                "capital_surplus_ratio",
                "net_npa_ratio",
                "change_in_rw",
                "leverage_ratio",
            ],
        ),
    ]
}

/// Ordered, append-only collection of specifications.
///
/// Serializes as a plain list; deserializing registers each entry in turn,
/// so a loaded registry passes the same checks as [`register`](Self::register).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(
    try_from = "Vec<RegressionSpecification>",
    into = "Vec<RegressionSpecification>"
)]
pub struct SpecificationRegistry {
    specs: Vec<RegressionSpecification>,
}

impl SpecificationRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the standard specifications.
    pub fn standard() -> Self {
        Self {
            specs: standard_specifications(),
        }
    }

    /// Append a specification.
    pub fn register(&mut self, spec: RegressionSpecification) -> Result<(), RegistryError> {
        spec.check()?;
        if self.get(&spec.name).is_some() {
            return Err(RegistryError::DuplicateName { name: spec.name });
        }
        self.specs.push(spec);
        Ok(())
    }

    /// Look up a specification by name.
    pub fn get(&self, name: &str) -> Option<&RegressionSpecification> {
        self.specs.iter().find(|s| s.name == name)
    }

    /// First specification of the Baseline family.
    pub fn baseline(&self) -> Option<&RegressionSpecification> {
        self.specs.iter().find(|s| s.family == SpecFamily::Baseline)
    }

    /// Specifications of one family, in registration order.
    pub fn by_family(&self, family: SpecFamily) -> Vec<&RegressionSpecification> {
        self.specs.iter().filter(|s| s.family == family).collect()
    }

    /// Specifications in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &RegressionSpecification> {
        self.specs.iter()
    }

    /// Names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.specs.iter().map(|s| s.name.as_str()).collect()
    }

    /// Number of specifications.
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Returns true if no specification is registered.
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl TryFrom<Vec<RegressionSpecification>> for SpecificationRegistry {
    type Error = RegistryError;

    fn try_from(specs: Vec<RegressionSpecification>) -> Result<Self, Self::Error> {
        let mut registry = Self::new();
        for spec in specs {
            registry.register(spec)?;
        }
        Ok(registry)
    }
}

impl From<SpecificationRegistry> for Vec<RegressionSpecification> {
    fn from(registry: SpecificationRegistry) -> Self {
        registry.specs
    }
}

impl<'a> IntoIterator for &'a SpecificationRegistry {
    type Item = &'a RegressionSpecification;
    type IntoIter = std::slice::Iter<'a, RegressionSpecification>;

    fn into_iter(self) -> Self::IntoIter {
        self.specs.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_standard_registry() {
        let registry = SpecificationRegistry::standard();
        assert_eq!(
            registry.names(),
            vec![
                "spec_1_baseline",
                "spec_2_replace_capital_with_crar",
                "spec_3_core_risk_only",
                "spec_4_drop_gdp_control",
            ]
        );
        for spec in &registry {
            assert!(spec.check().is_ok(), "{}", spec.name);
            assert_eq!(spec.outcome, OUTCOME);
        }
    }

    #[test]
    fn test_standard_families_relate_to_baseline() {
        let registry = SpecificationRegistry::standard();
        let baseline = registry.baseline().unwrap();
        assert_eq!(baseline.terms()[0], INTERCEPT);
        assert_eq!(baseline.n_params(), 6);

        let crar = registry.by_family(SpecFamily::CrarSubstitution)[0];
        assert_eq!(crar.regressors[0], "crar");
        assert_eq!(crar.regressors[1..], baseline.regressors[1..]);

        let dropped = registry.by_family(SpecFamily::GdpControlDropped)[0];
        let expected: Vec<String> = baseline
            .regressors
            .iter()
            .filter(|r| *r != "nominal_gdp_growth")
            .cloned()
            .collect();
        assert_eq!(dropped.regressors, expected);
    }

    #[test]
    fn test_register_appends() {
        let mut registry = SpecificationRegistry::standard();
        let spec = RegressionSpecification::new(
            "spec_5_funding",
            SpecFamily::Custom,
            &["credit_to_deposit_ratio", "nominal_gdp_growth"],
        );
        registry.register(spec).unwrap();
        assert_eq!(registry.len(), 5);
        assert_eq!(registry.names()[4], "spec_5_funding");
    }

    #[rstest]
    #[case::duplicate(
        RegressionSpecification::new("spec_1_baseline", SpecFamily::Custom, &["crar"]),
        RegistryError::DuplicateName { name: "spec_1_baseline".into() }
    )]
    #[case::empty(
        RegressionSpecification::new("s", SpecFamily::Custom, &[]),
        RegistryError::EmptyRegressors { name: "s".into() }
    )]
    #[case::repeated(
        RegressionSpecification::new("s", SpecFamily::Custom, &["crar", "crar"]),
        RegistryError::RepeatedRegressor { name: "s".into(), variable: "crar".into() }
    )]
    #[case::outcome(
        RegressionSpecification::new("s", SpecFamily::Custom, &["crar", "bank_credit_growth"]),
        RegistryError::OutcomeAsRegressor { name: "s".into(), variable: "bank_credit_growth".into() }
    )]
    #[case::unknown(
        RegressionSpecification::new("s", SpecFamily::Custom, &["gdp_growth"]),
        RegistryError::UnknownVariable { name: "s".into(), variable: "gdp_growth".into() }
    )]
    #[case::unknown_outcome(
        RegressionSpecification::new("s", SpecFamily::Custom, &["crar"]).with_outcome("credit"),
        RegistryError::UnknownVariable { name: "s".into(), variable: "credit".into() }
    )]
    #[case::blank_name(
        RegressionSpecification::new("  ", SpecFamily::Custom, &["crar"]),
        RegistryError::EmptyName
    )]
    fn test_register_rejects(#[case] spec: RegressionSpecification, #[case] expected: RegistryError) {
        let mut registry = SpecificationRegistry::standard();
        assert_eq!(registry.register(spec), Err(expected));
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn test_serde_round_trip_keeps_order() {
        let json = serde_json::to_string(&SpecificationRegistry::standard()).unwrap();
        assert!(json.starts_with('['));
        let back: SpecificationRegistry = serde_json::from_str(&json).unwrap();
        assert_eq!(back.names(), SpecificationRegistry::standard().names());
    }

    #[rstest]
    #[case::empty(r#"[{"name":"s","family":"Custom","outcome":"bank_credit_growth","regressors":[],"intercept":true}]"#)]
    #[case::repeated(r#"[{"name":"s","family":"Custom","outcome":"bank_credit_growth","regressors":["crar","crar"],"intercept":true}]"#)]
    #[case::outcome(r#"[{"name":"s","family":"Custom","outcome":"bank_credit_growth","regressors":["bank_credit_growth"],"intercept":true}]"#)]
    #[case::unknown(r#"[{"name":"s","family":"Custom","outcome":"bank_credit_growth","regressors":["gdp_growth"],"intercept":true}]"#)]
    #[case::duplicate(r#"[{"name":"s","family":"Custom","outcome":"bank_credit_growth","regressors":["crar"],"intercept":true},{"name":"s","family":"Custom","outcome":"bank_credit_growth","regressors":["net_npa_ratio"],"intercept":true}]"#)]
    fn test_deserialize_runs_registration_checks(#[case] json: &str) {
        let err = serde_json::from_str::<SpecificationRegistry>(json).unwrap_err();
        assert!(err.is_data(), "{err}");
    }

    #[test]
    fn test_without_intercept_terms() {
        let spec = RegressionSpecification::new("s", SpecFamily::Custom, &["crar"]).without_intercept();
        assert_eq!(spec.terms(), vec!["crar".to_string()]);
        assert_eq!(spec.n_params(), 1);
    }
}

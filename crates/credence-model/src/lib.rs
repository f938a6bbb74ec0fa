#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/credence/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod estimator;
pub mod linalg;
pub mod registry;
pub mod robustness;

pub use error::{EstimationError, LinalgError, RegistryError};
pub use estimator::{
    CovarianceType, Estimator, EstimatorConfig, InferenceDistribution, RegressionResult,
    TermEstimate,
};
pub use registry::{
    INTERCEPT, OUTCOME, RegressionSpecification, SpecFamily, SpecificationRegistry,
    standard_specifications,
};
pub use robustness::{
    CoefficientStability, ComparisonRow, FitOutcome, RobustnessEngine, RobustnessReport,
    SelectionMetrics, Sign, SpecOutcome, StabilityEntry,
};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Error types for specification registration and estimation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A specification the registry refuses to accept.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegistryError {
    /// Specification name is empty
    #[error("specification name is empty")]
    EmptyName,

    /// A specification with this name is already registered
    #[error("specification '{name}' is already registered")]
    DuplicateName {
        /// Specification name
        name: String,
    },

    /// No regressors listed
    #[error("specification '{name}' has no regressors")]
    EmptyRegressors {
        /// Specification name
        name: String,
    },

    /// The same regressor listed twice
    #[error("specification '{name}' lists regressor '{variable}' more than once")]
    RepeatedRegressor {
        /// Specification name
        name: String,
        /// Repeated variable
        variable: String,
    },

    /// The outcome also appears among the regressors
    #[error("specification '{name}' uses outcome '{variable}' as a regressor")]
    OutcomeAsRegressor {
        /// Specification name
        name: String,
        /// Outcome variable
        variable: String,
    },

    /// A variable not defined in the panel schema
    #[error("specification '{name}' names unknown variable '{variable}'")]
    UnknownVariable {
        /// Specification name
        name: String,
        /// Unknown variable
        variable: String,
    },
}

/// Linear algebra failures.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LinalgError {
    /// Matrix is not square or shapes disagree
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Actual dimension
        actual: usize,
    },

    /// Smallest to largest eigenvalue ratio below the tolerance
    #[error("matrix is numerically singular (eigenvalue ratio {ratio:e})")]
    Singular {
        /// Smallest over largest eigenvalue
        ratio: f64,
    },
}

/// Why one specification could not be fitted.
///
/// Fatal for that specification only; the robustness battery records it
/// and moves on.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "error", rename_all = "snake_case")]
pub enum EstimationError {
    /// A specification variable is not a panel column
    #[error("specification '{specification}': variable '{variable}' not in panel")]
    UnknownVariable {
        /// Specification name
        specification: String,
        /// Missing column
        variable: String,
    },

    /// Too few complete rows after listwise deletion
    #[error(
        "specification '{specification}': {n_obs} complete observations, at least {required} required"
    )]
    InsufficientObservations {
        /// Specification name
        specification: String,
        /// Complete rows
        n_obs: usize,
        /// Minimum complete rows
        required: usize,
    },

    /// Perfect or numerical collinearity in the design
    #[error(
        "specification '{specification}': singular design matrix (scaled condition number {condition_number:e})"
    )]
    SingularDesign {
        /// Specification name
        specification: String,
        /// Scaled condition number, infinite for exact singularity
        condition_number: f64,
    },

    /// Neither an intercept nor any regressor
    #[error("specification '{specification}': design has no terms")]
    EmptyDesign {
        /// Specification name
        specification: String,
    },

    /// Reference distribution could not be constructed
    #[error("specification '{specification}': {reason}")]
    Distribution {
        /// Specification name
        specification: String,
        /// Failure reason
        reason: String,
    },

    /// Linear algebra failure
    #[error("linear algebra error: {0}")]
    Linalg(#[from] LinalgError),
}

impl EstimationError {
    /// Name of the specification that failed, if known.
    pub fn specification(&self) -> Option<&str> {
        match self {
            Self::UnknownVariable { specification, .. }
            | Self::InsufficientObservations { specification, .. }
            | Self::SingularDesign { specification, .. }
            | Self::EmptyDesign { specification }
            | Self::Distribution { specification, .. } => Some(specification),
            Self::Linalg(_) => None,
        }
    }
}

//! Regression Models
//!
//! Small ndarray-based regressors used by the training workflow and the
//! regularized ANOVA:
//! - `LinearRegression` (ordinary least squares)
//! - `Lasso` (L1-regularized least squares, coordinate descent)
//! - `DecisionTreeRegressor` and `RandomForestRegressor` (variance-reduction
//!   CART trees, bagged for the forest)
//!
//! Every model implements `Regressor`; tree models also implement
//! `TreeExplainable` so SHAP values can be computed from their structure.

pub mod forest;
pub mod linear;
pub mod metrics;
pub mod tree;

pub use forest::{ForestConfig, RandomForestRegressor};
pub use linear::{Lasso, LinearRegression};
pub use metrics::{mean_squared_error, r2_score};
pub use tree::{DecisionTreeRegressor, Tree, TreeConfig, TreeNode};

use ndarray::{Array1, Array2};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Model has not been fitted yet")]
    NotFitted,

    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Empty training input")]
    EmptyInput,

    #[error("Singular matrix: {0}")]
    SingularMatrix(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A fit/predict regression model.
pub trait Regressor {
    /// Model family name, used as the artifact flavor.
    fn name(&self) -> &'static str;

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<(), ModelError>;

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>, ModelError>;

    /// Hyperparameters as key/value pairs for experiment tracking.
    fn params(&self) -> Vec<(String, String)> {
        Vec::new()
    }

    /// JSON form of the fitted model, logged as the run artifact.
    fn to_artifact(&self) -> Result<serde_json::Value, ModelError>;
}

/// Tree models whose structure can be walked for SHAP values.
pub trait TreeExplainable {
    /// Fitted trees. A prediction is the mean of the tree outputs.
    fn trees(&self) -> Result<Vec<&Tree>, ModelError>;

    fn n_features(&self) -> Option<usize>;
}

/// Shared shape checks for `fit`.
pub(crate) fn check_fit_input(x: &Array2<f64>, y: &Array1<f64>) -> Result<(), ModelError> {
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(ModelError::EmptyInput);
    }
    if x.nrows() != y.len() {
        return Err(ModelError::DimensionMismatch {
            expected: x.nrows(),
            got: y.len(),
        });
    }
    Ok(())
}

/// Shared shape check for `predict`.
pub(crate) fn check_features(x: &Array2<f64>, expected: usize) -> Result<(), ModelError> {
    if x.ncols() != expected {
        return Err(ModelError::DimensionMismatch {
            expected,
            got: x.ncols(),
        });
    }
    Ok(())
}

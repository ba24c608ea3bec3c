//! Linear models: ordinary least squares and Lasso
//!
//! Both fit an intercept by centering the features and the target.

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{check_features, check_fit_input, ModelError, Regressor};

/// Pivots smaller than this are treated as zero.
const PIVOT_EPSILON: f64 = 1e-12;

/// Ordinary least squares regression.
///
/// Solves the normal equations `X'X β = X'y` on centered data with Gaussian
/// elimination (partial pivoting).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinearRegression {
    coefficients: Option<Vec<f64>>,
    intercept: f64,
}

impl LinearRegression {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn coefficients(&self) -> Option<&[f64]> {
        self.coefficients.as_deref()
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }
}

impl Regressor for LinearRegression {
    fn name(&self) -> &'static str {
        "linear_regression"
    }

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<(), ModelError> {
        check_fit_input(x, y)?;
        let (xc, yc, x_mean, y_mean) = center(x, y)?;

        let xtx = xc.t().dot(&xc);
        let xty = xc.t().dot(&yc);
        let beta = solve(xtx, xty)?;

        self.intercept = y_mean - x_mean.dot(&beta);
        self.coefficients = Some(beta.to_vec());
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>, ModelError> {
        let coef = self.coefficients.as_ref().ok_or(ModelError::NotFitted)?;
        linear_predict(x, coef, self.intercept)
    }

    fn to_artifact(&self) -> Result<serde_json::Value, ModelError> {
        Ok(serde_json::to_value(self)?)
    }
}

/// L1-regularized least squares.
///
/// Minimizes `1/(2n) ||y - b - Xβ||² + α ||β||₁` by cyclic coordinate
/// descent with soft thresholding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lasso {
    alpha: f64,
    max_iter: usize,
    tol: f64,
    coefficients: Option<Vec<f64>>,
    intercept: f64,
    n_iter: usize,
}

impl Default for Lasso {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl Lasso {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            max_iter: 1000,
            tol: 1e-4,
            coefficients: None,
            intercept: 0.0,
            n_iter: 0,
        }
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn coefficients(&self) -> Option<&[f64]> {
        self.coefficients.as_deref()
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Coordinate-descent sweeps used by the last fit.
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }
}

impl Regressor for Lasso {
    fn name(&self) -> &'static str {
        "lasso"
    }

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<(), ModelError> {
        check_fit_input(x, y)?;
        if self.alpha.is_nan() || self.alpha < 0.0 {
            return Err(ModelError::InvalidParameter(format!(
                "alpha must be non-negative, got {}",
                self.alpha
            )));
        }

        let (xc, yc, x_mean, y_mean) = center(x, y)?;
        let n = xc.nrows() as f64;
        let p = xc.ncols();

        let col_norms: Vec<f64> = (0..p)
            .map(|j| xc.column(j).iter().map(|v| v * v).sum::<f64>() / n)
            .collect();

        let mut beta = Array1::<f64>::zeros(p);
        let mut residual = yc;
        let mut sweeps = 0;

        for iter in 0..self.max_iter {
            sweeps = iter + 1;
            let mut max_change: f64 = 0.0;
            let mut max_coef: f64 = 0.0;

            for j in 0..p {
                if col_norms[j] == 0.0 {
                    continue;
                }
                let column = xc.column(j);
                let old = beta[j];
                let rho = column
                    .iter()
                    .zip(residual.iter())
                    .map(|(xv, r)| xv * (r + xv * old))
                    .sum::<f64>()
                    / n;
                let new = soft_threshold(rho, self.alpha) / col_norms[j];

                if new != old {
                    let delta = new - old;
                    residual.scaled_add(-delta, &column);
                    beta[j] = new;
                }
                max_change = max_change.max((new - old).abs());
                max_coef = max_coef.max(new.abs());
            }

            if max_coef == 0.0 || max_change <= self.tol * max_coef {
                break;
            }
        }

        debug!(alpha = self.alpha, sweeps, "Lasso fit");
        self.intercept = y_mean - x_mean.dot(&beta);
        self.coefficients = Some(beta.to_vec());
        self.n_iter = sweeps;
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>, ModelError> {
        let coef = self.coefficients.as_ref().ok_or(ModelError::NotFitted)?;
        linear_predict(x, coef, self.intercept)
    }

    fn params(&self) -> Vec<(String, String)> {
        vec![
            ("alpha".to_string(), self.alpha.to_string()),
            ("max_iter".to_string(), self.max_iter.to_string()),
            ("tol".to_string(), self.tol.to_string()),
        ]
    }

    fn to_artifact(&self) -> Result<serde_json::Value, ModelError> {
        Ok(serde_json::to_value(self)?)
    }
}

fn soft_threshold(value: f64, lambda: f64) -> f64 {
    if value > lambda {
        value - lambda
    } else if value < -lambda {
        value + lambda
    } else {
        0.0
    }
}

/// Centered features and target plus the means used.
fn center(
    x: &Array2<f64>,
    y: &Array1<f64>,
) -> Result<(Array2<f64>, Array1<f64>, Array1<f64>, f64), ModelError> {
    let x_mean = x.mean_axis(Axis(0)).ok_or(ModelError::EmptyInput)?;
    let y_mean = y.mean().ok_or(ModelError::EmptyInput)?;
    Ok((x - &x_mean, y - y_mean, x_mean, y_mean))
}

fn linear_predict(x: &Array2<f64>, coef: &[f64], intercept: f64) -> Result<Array1<f64>, ModelError> {
    check_features(x, coef.len())?;
    let beta = Array1::from(coef.to_vec());
    Ok(x.dot(&beta) + intercept)
}

/// Solve `a · β = b` by Gaussian elimination with partial pivoting.
fn solve(mut a: Array2<f64>, mut b: Array1<f64>) -> Result<Array1<f64>, ModelError> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| a[[i, col]].abs().total_cmp(&a[[j, col]].abs()))
            .unwrap_or(col);
        if a[[pivot, col]].abs() < PIVOT_EPSILON {
            return Err(ModelError::SingularMatrix(format!(
                "no pivot in column {col}"
            )));
        }
        if pivot != col {
            for k in 0..n {
                a.swap([col, k], [pivot, k]);
            }
            b.swap(col, pivot);
        }
        for row in col + 1..n {
            let factor = a[[row, col]] / a[[col, col]];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[[row, k]] -= factor * a[[col, k]];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut beta = Array1::<f64>::zeros(n);
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[[row, k]] * beta[k]).sum();
        beta[row] = (b[row] - tail) / a[[row, row]];
    }
    Ok(beta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn plane() -> (Array2<f64>, Array1<f64>) {
        // y = 3 + 2 x1 - x2
        let x = array![
            [0.0, 1.0],
            [1.0, 0.0],
            [2.0, 2.0],
            [3.0, 1.0],
            [4.0, 3.0],
            [5.0, 0.5]
        ];
        let y = x.map_axis(Axis(1), |r| 3.0 + 2.0 * r[0] - r[1]);
        (x, y)
    }

    #[test]
    fn test_ols_recovers_plane() {
        let (x, y) = plane();
        let mut model = LinearRegression::new();
        model.fit(&x, &y).unwrap();
        let coef = model.coefficients().unwrap();
        assert!((coef[0] - 2.0).abs() < 1e-9);
        assert!((coef[1] + 1.0).abs() < 1e-9);
        assert!((model.intercept() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_ols_singular_matrix() {
        let x = array![[1.0, 2.0], [2.0, 4.0], [3.0, 6.0]];
        let y = array![1.0, 2.0, 3.0];
        assert!(matches!(
            LinearRegression::new().fit(&x, &y),
            Err(ModelError::SingularMatrix(_))
        ));
    }

    #[test]
    fn test_lasso_small_alpha_matches_ols() {
        let (x, y) = plane();
        let mut lasso = Lasso::new(1e-8).with_tol(1e-12).with_max_iter(10_000);
        lasso.fit(&x, &y).unwrap();
        let coef = lasso.coefficients().unwrap();
        assert!((coef[0] - 2.0).abs() < 1e-4);
        assert!((coef[1] + 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_lasso_large_alpha_zeroes_coefficients() {
        let (x, y) = plane();
        let mut lasso = Lasso::new(1e6);
        lasso.fit(&x, &y).unwrap();
        assert!(lasso.coefficients().unwrap().iter().all(|&c| c == 0.0));
        let mean = y.mean().unwrap();
        assert!((lasso.intercept() - mean).abs() < 1e-12);
    }

    #[test]
    fn test_predict_before_fit() {
        let (x, _) = plane();
        assert!(matches!(
            Lasso::default().predict(&x),
            Err(ModelError::NotFitted)
        ));
    }

    #[test]
    fn test_predict_checks_width() {
        let (x, y) = plane();
        let mut model = LinearRegression::new();
        model.fit(&x, &y).unwrap();
        assert!(matches!(
            model.predict(&array![[1.0]]),
            Err(ModelError::DimensionMismatch { expected: 2, got: 1 })
        ));
    }
}

//! Regression metrics

use ndarray::Array1;

/// Mean squared error. NaN for empty input.
pub fn mean_squared_error(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    let n = y_true.len() as f64;
    y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(&t, &p)| (t - p).powi(2))
        .sum::<f64>()
        / n
}

/// Coefficient of determination.
///
/// A constant target scores 1.0 when predicted exactly, otherwise 0.0.
pub fn r2_score(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    let n = y_true.len() as f64;
    let mean = y_true.sum() / n;

    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(&t, &p)| (t - p).powi(2))
        .sum();
    let ss_tot: f64 = y_true.iter().map(|&t| (t - mean).powi(2)).sum();

    if ss_tot == 0.0 {
        if ss_res == 0.0 {
            1.0
        } else {
            0.0
        }
    } else {
        1.0 - ss_res / ss_tot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_mse() {
        let t = array![1.0, 2.0, 3.0];
        let p = array![1.0, 2.0, 5.0];
        assert!((mean_squared_error(&t, &p) - 4.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_r2_perfect_and_mean() {
        let t = array![1.0, 2.0, 3.0];
        assert_eq!(r2_score(&t, &t), 1.0);
        assert!(r2_score(&t, &array![2.0, 2.0, 2.0]).abs() < 1e-12);
    }

    #[test]
    fn test_r2_constant_target() {
        let t = array![4.0, 4.0];
        assert_eq!(r2_score(&t, &array![4.0, 4.0]), 1.0);
        assert_eq!(r2_score(&t, &array![3.0, 4.0]), 0.0);
    }
}

//! Tree SHAP
//!
//! Exact path-dependent SHAP values for tree models (Lundberg et al. 2018,
//! Algorithm 2). Node covers are the training sample counts, so the
//! expected value of a tree is its root value.
//!
//! Local accuracy holds per row: `expected_value + sum(values[row]) == f(x)`.
//!
//! # References
//!
//! - Lundberg, S. M., Erion, G. G., & Lee, S. I. (2018). Consistent
//!   Individualized Feature Attribution for Tree Ensembles.

use ndarray::{Array1, Array2, ArrayView1, Axis};
use std::path::PathBuf;
use tracing::debug;

use crate::charts::{BarChart, Chart, ChartError, ChartSink};
use crate::models::{check_features, ModelError, Tree, TreeExplainable, TreeNode};

/// Per-row, per-feature attributions.
#[derive(Debug, Clone)]
pub struct ShapValues {
    /// rows × features
    pub values: Array2<f64>,
    /// Mean model output over the training data
    pub expected_value: f64,
}

impl ShapValues {
    /// Mean absolute SHAP value per feature.
    pub fn mean_abs(&self) -> Array1<f64> {
        if self.values.nrows() == 0 {
            return Array1::zeros(self.values.ncols());
        }
        self.values.map(|v| v.abs()).mean_axis(Axis(0)).unwrap_or_default()
    }

    /// `expected_value + sum(values[row])`
    pub fn reconstruct(&self) -> Array1<f64> {
        self.values.sum_axis(Axis(1)) + self.expected_value
    }
}

#[derive(Debug, Clone, Copy)]
struct PathElement {
    feature: Option<usize>,
    zero_fraction: f64,
    one_fraction: f64,
    weight: f64,
}

fn extend_path(path: &mut Vec<PathElement>, zero_fraction: f64, one_fraction: f64, feature: Option<usize>) {
    let depth = path.len();
    path.push(PathElement {
        feature,
        zero_fraction,
        one_fraction,
        weight: if depth == 0 { 1.0 } else { 0.0 },
    });
    let denom = (depth + 1) as f64;
    for i in (0..depth).rev() {
        path[i + 1].weight += one_fraction * path[i].weight * (i + 1) as f64 / denom;
        path[i].weight = zero_fraction * path[i].weight * (depth - i) as f64 / denom;
    }
}

/// Undo the extension of element `index`.
fn unwind_path(path: &[PathElement], index: usize) -> Vec<PathElement> {
    let len = path.len();
    let one = path[index].one_fraction;
    let zero = path[index].zero_fraction;
    let mut out = path.to_vec();
    let mut next = out[len - 1].weight;

    for j in (0..len - 1).rev() {
        if one != 0.0 {
            let tmp = out[j].weight;
            out[j].weight = next * len as f64 / ((j + 1) as f64 * one);
            next = tmp - out[j].weight * zero * (len - 1 - j) as f64 / len as f64;
        } else {
            out[j].weight = out[j].weight * len as f64 / (zero * (len - 1 - j) as f64);
        }
    }
    for j in index..len - 1 {
        out[j].feature = out[j + 1].feature;
        out[j].zero_fraction = out[j + 1].zero_fraction;
        out[j].one_fraction = out[j + 1].one_fraction;
    }
    out.truncate(len - 1);
    out
}

fn unwound_weight_sum(path: &[PathElement], index: usize) -> f64 {
    unwind_path(path, index).iter().map(|e| e.weight).sum()
}

#[allow(clippy::too_many_arguments)]
fn recurse(
    tree: &Tree,
    row: ArrayView1<f64>,
    phi: &mut [f64],
    node_id: usize,
    parent_path: &[PathElement],
    zero_fraction: f64,
    one_fraction: f64,
    feature: Option<usize>,
) {
    let mut path = parent_path.to_vec();
    extend_path(&mut path, zero_fraction, one_fraction, feature);

    match tree.node(node_id) {
        TreeNode::Leaf { value, .. } => {
            for i in 1..path.len() {
                if let Some(f) = path[i].feature {
                    let w = unwound_weight_sum(&path, i);
                    phi[f] += w * (path[i].one_fraction - path[i].zero_fraction) * value;
                }
            }
        }
        TreeNode::Split {
            feature: split,
            threshold,
            left,
            right,
            n_samples,
            ..
        } => {
            let (hot, cold) = if row[*split] <= *threshold {
                (*left, *right)
            } else {
                (*right, *left)
            };

            let mut incoming_zero = 1.0;
            let mut incoming_one = 1.0;
            if let Some(k) = (1..path.len()).find(|&k| path[k].feature == Some(*split)) {
                incoming_zero = path[k].zero_fraction;
                incoming_one = path[k].one_fraction;
                path = unwind_path(&path, k);
            }

            let cover = *n_samples as f64;
            let hot_fraction = tree.node(hot).n_samples() as f64 / cover;
            let cold_fraction = tree.node(cold).n_samples() as f64 / cover;
            recurse(
                tree,
                row,
                phi,
                hot,
                &path,
                incoming_zero * hot_fraction,
                incoming_one,
                Some(*split),
            );
            recurse(
                tree,
                row,
                phi,
                cold,
                &path,
                incoming_zero * cold_fraction,
                0.0,
                Some(*split),
            );
        }
    }
}

/// SHAP values of one tree for one row.
fn tree_shap(tree: &Tree, row: ArrayView1<f64>, n_features: usize) -> Vec<f64> {
    let mut phi = vec![0.0; n_features];
    recurse(tree, row, &mut phi, 0, &[], 1.0, 1.0, None);
    phi
}

/// Exact SHAP values for every row of `x_test`. Ensemble attributions are
/// the mean of the per-tree attributions.
pub fn explain_model_with_shap(
    model: &dyn TreeExplainable,
    x_test: &Array2<f64>,
) -> Result<ShapValues, ModelError> {
    let trees = model.trees()?;
    let n_features = model.n_features().ok_or(ModelError::NotFitted)?;
    check_features(x_test, n_features)?;

    let n_trees = trees.len() as f64;
    let expected_value = trees.iter().map(|t| t.node(0).value()).sum::<f64>() / n_trees;

    let mut values = Array2::<f64>::zeros((x_test.nrows(), n_features));
    for (i, row) in x_test.rows().into_iter().enumerate() {
        for tree in &trees {
            for (j, phi) in tree_shap(tree, row, n_features).into_iter().enumerate() {
                values[[i, j]] += phi / n_trees;
            }
        }
    }
    debug!(rows = x_test.nrows(), trees = trees.len(), "Computed SHAP values");

    Ok(ShapValues {
        values,
        expected_value,
    })
}

/// Bar chart of mean |SHAP| per feature, most important first.
pub fn shap_summary_plot(
    sink: &mut ChartSink,
    shap: &ShapValues,
    feature_names: &[String],
) -> Result<PathBuf, ChartError> {
    let mut importance: Vec<(String, f64)> = shap
        .mean_abs()
        .iter()
        .enumerate()
        .map(|(j, &v)| {
            let name = feature_names
                .get(j)
                .cloned()
                .unwrap_or_else(|| format!("feature_{j}"));
            (name, v)
        })
        .collect();
    importance.sort_by(|a, b| b.1.total_cmp(&a.1));

    let (categories, values) = importance.into_iter().unzip();
    sink.save_chart(
        "SHAP Summary",
        Chart::Bar(BarChart {
            title: "SHAP Feature Importance".to_string(),
            x_label: "Feature".to_string(),
            y_label: "mean(|SHAP value|)".to_string(),
            categories,
            values,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        DecisionTreeRegressor, ForestConfig, RandomForestRegressor, Regressor, TreeConfig,
    };
    use ndarray::{array, Array1};

    fn data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((120, 3), |(i, j)| ((i * (j + 3) + j * 7) % 23) as f64);
        let y = x.map_axis(Axis(1), |r| {
            let interaction = if r[0] > 10.0 && r[1] < 12.0 { 25.0 } else { 0.0 };
            2.0 * r[0] - r[1] + interaction
        });
        (x, y)
    }

    fn assert_additive(shap: &ShapValues, predictions: &Array1<f64>) {
        for (rebuilt, pred) in shap.reconstruct().iter().zip(predictions.iter()) {
            let tol = 1e-6 * pred.abs().max(1.0);
            assert!((rebuilt - pred).abs() < tol, "{rebuilt} vs {pred}");
        }
    }

    #[test]
    fn test_tree_local_accuracy() {
        let (x, y) = data();
        let mut model = DecisionTreeRegressor::new(TreeConfig {
            max_depth: Some(5),
            ..Default::default()
        });
        model.fit(&x, &y).unwrap();
        let shap = explain_model_with_shap(&model, &x).unwrap();
        assert_eq!(shap.values.dim(), (120, 3));
        assert_additive(&shap, &model.predict(&x).unwrap());
    }

    #[test]
    fn test_forest_local_accuracy() {
        let (x, y) = data();
        let mut model = RandomForestRegressor::new(ForestConfig {
            n_estimators: 8,
            tree: TreeConfig {
                max_depth: Some(4),
                ..Default::default()
            },
            ..Default::default()
        });
        model.fit(&x, &y).unwrap();
        let shap = explain_model_with_shap(&model, &x).unwrap();
        assert_additive(&shap, &model.predict(&x).unwrap());
    }

    #[test]
    fn test_stump_attribution() {
        // y depends on feature 1 only
        let x = array![[0.0, 0.0], [5.0, 0.0], [0.0, 1.0], [5.0, 1.0]];
        let y = array![0.0, 0.0, 10.0, 10.0];
        let mut model = DecisionTreeRegressor::new(TreeConfig::default());
        model.fit(&x, &y).unwrap();

        let shap = explain_model_with_shap(&model, &x).unwrap();
        assert!((shap.expected_value - 5.0).abs() < 1e-12);
        assert!((shap.values[[0, 1]] + 5.0).abs() < 1e-12);
        assert!((shap.values[[3, 1]] - 5.0).abs() < 1e-12);
        assert!(shap.values.column(0).iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn test_unfitted_and_wrong_width() {
        let model = DecisionTreeRegressor::new(TreeConfig::default());
        assert!(matches!(
            explain_model_with_shap(&model, &array![[1.0]]),
            Err(ModelError::NotFitted)
        ));

        let (x, y) = data();
        let mut model = DecisionTreeRegressor::new(TreeConfig::default());
        model.fit(&x, &y).unwrap();
        assert!(matches!(
            explain_model_with_shap(&model, &array![[1.0, 2.0]]),
            Err(ModelError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_summary_plot_orders_features() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = ChartSink::new(dir.path()).unwrap();
        let shap = ShapValues {
            values: array![[0.1, -3.0], [0.2, 2.0]],
            expected_value: 0.0,
        };
        let importance = shap.mean_abs();
        assert!((importance[0] - 0.15).abs() < 1e-12);
        assert!((importance[1] - 2.5).abs() < 1e-12);
        let path = shap_summary_plot(&mut sink, &shap, &["a".to_string(), "b".to_string()]).unwrap();
        let svg = std::fs::read_to_string(path).unwrap();
        assert!(svg.find(">b<").unwrap() < svg.find(">a<").unwrap());
    }
}

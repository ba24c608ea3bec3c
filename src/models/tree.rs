//! Decision tree regressor
//!
//! CART regression tree grown by greedy variance reduction. Nodes live in a
//! flat arena (`Tree::nodes`, root at index 0) so the structure can be
//! serialized and walked by the SHAP explainer. Rows with
//! `x[feature] <= threshold` go left.

use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{check_features, check_fit_input, ModelError, Regressor, TreeExplainable};

/// Splits must reduce the squared error by more than this.
const MIN_IMPROVEMENT: f64 = 1e-12;

/// Growth limits for a single tree.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Maximum depth (root has depth 0). `None` grows until leaves are pure.
    pub max_depth: Option<usize>,
    /// Minimum samples required to split a node
    pub min_samples_split: usize,
    /// Minimum samples in each leaf
    pub min_samples_leaf: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

/// Arena node. `value` is the mean target of the training rows reaching it
/// and `n_samples` their count (the node cover).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    Leaf {
        value: f64,
        n_samples: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        value: f64,
        n_samples: usize,
    },
}

impl TreeNode {
    pub fn value(&self) -> f64 {
        match self {
            TreeNode::Leaf { value, .. } | TreeNode::Split { value, .. } => *value,
        }
    }

    pub fn n_samples(&self) -> usize {
        match self {
            TreeNode::Leaf { n_samples, .. } | TreeNode::Split { n_samples, .. } => *n_samples,
        }
    }
}

/// A fitted tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    nodes: Vec<TreeNode>,
}

impl Tree {
    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub fn node(&self, id: usize) -> &TreeNode {
        &self.nodes[id]
    }

    pub fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        let mut id = 0;
        loop {
            match &self.nodes[id] {
                TreeNode::Leaf { value, .. } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    id = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, TreeNode::Leaf { .. }))
            .count()
    }

    pub fn depth(&self) -> usize {
        fn walk(tree: &Tree, id: usize) -> usize {
            match tree.node(id) {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => 1 + walk(tree, *left).max(walk(tree, *right)),
            }
        }
        walk(self, 0)
    }

    /// Grow a tree on the given rows of `x`/`y`.
    pub(crate) fn grow(x: &Array2<f64>, y: &Array1<f64>, config: &TreeConfig) -> Self {
        let mut nodes = Vec::new();
        let rows: Vec<usize> = (0..x.nrows()).collect();
        grow_node(x, y, rows, 0, config, &mut nodes);
        Self { nodes }
    }
}

struct Split {
    feature: usize,
    threshold: f64,
    sse: f64,
}

fn grow_node(
    x: &Array2<f64>,
    y: &Array1<f64>,
    rows: Vec<usize>,
    depth: usize,
    config: &TreeConfig,
    nodes: &mut Vec<TreeNode>,
) -> usize {
    let n = rows.len();
    let sum: f64 = rows.iter().map(|&r| y[r]).sum();
    let sum_sq: f64 = rows.iter().map(|&r| y[r] * y[r]).sum();
    let value = sum / n as f64;
    let parent_sse = sum_sq - sum * sum / n as f64;

    let id = nodes.len();
    nodes.push(TreeNode::Leaf {
        value,
        n_samples: n,
    });

    let depth_ok = config.max_depth.map_or(true, |max| depth < max);
    let min_leaf = config.min_samples_leaf.max(1);
    if !depth_ok || n < config.min_samples_split || n < 2 * min_leaf || parent_sse <= MIN_IMPROVEMENT
    {
        return id;
    }

    let Some(split) = best_split(x, y, &rows, min_leaf) else {
        return id;
    };
    if split.sse >= parent_sse - MIN_IMPROVEMENT {
        return id;
    }

    let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
        .into_iter()
        .partition(|&r| x[[r, split.feature]] <= split.threshold);

    let left = grow_node(x, y, left_rows, depth + 1, config, nodes);
    let right = grow_node(x, y, right_rows, depth + 1, config, nodes);
    nodes[id] = TreeNode::Split {
        feature: split.feature,
        threshold: split.threshold,
        left,
        right,
        value,
        n_samples: n,
    };
    id
}

/// Lowest total squared error split over all features and thresholds.
fn best_split(x: &Array2<f64>, y: &Array1<f64>, rows: &[usize], min_leaf: usize) -> Option<Split> {
    let n = rows.len();
    let mut best: Option<Split> = None;
    let mut sorted = rows.to_vec();

    for feature in 0..x.ncols() {
        sorted.sort_by(|&a, &b| x[[a, feature]].total_cmp(&x[[b, feature]]));

        let total: f64 = sorted.iter().map(|&r| y[r]).sum();
        let total_sq: f64 = sorted.iter().map(|&r| y[r] * y[r]).sum();
        let mut left_sum = 0.0;
        let mut left_sq = 0.0;

        for i in 0..n - 1 {
            let yi = y[sorted[i]];
            left_sum += yi;
            left_sq += yi * yi;

            let n_left = i + 1;
            let n_right = n - n_left;
            if n_left < min_leaf || n_right < min_leaf {
                continue;
            }
            let lo = x[[sorted[i], feature]];
            let hi = x[[sorted[i + 1], feature]];
            if lo >= hi {
                continue;
            }

            let right_sum = total - left_sum;
            let right_sq = total_sq - left_sq;
            let sse = (left_sq - left_sum * left_sum / n_left as f64)
                + (right_sq - right_sum * right_sum / n_right as f64);

            if best.as_ref().map_or(true, |b| sse < b.sse) {
                let mid = lo + (hi - lo) / 2.0;
                best = Some(Split {
                    feature,
                    threshold: if mid < hi { mid } else { lo },
                    sse,
                });
            }
        }
    }
    best
}

/// Single regression tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DecisionTreeRegressor {
    config: TreeConfig,
    tree: Option<Tree>,
    n_features: Option<usize>,
}

impl DecisionTreeRegressor {
    pub fn new(config: TreeConfig) -> Self {
        Self {
            config,
            tree: None,
            n_features: None,
        }
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    pub fn tree(&self) -> Option<&Tree> {
        self.tree.as_ref()
    }
}

impl Regressor for DecisionTreeRegressor {
    fn name(&self) -> &'static str {
        "decision_tree"
    }

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<(), ModelError> {
        check_fit_input(x, y)?;
        let tree = Tree::grow(x, y, &self.config);
        debug!(
            leaves = tree.n_leaves(),
            depth = tree.depth(),
            "Decision tree fit"
        );
        self.tree = Some(tree);
        self.n_features = Some(x.ncols());
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>, ModelError> {
        let tree = self.tree.as_ref().ok_or(ModelError::NotFitted)?;
        check_features(x, self.n_features.unwrap_or_default())?;
        Ok(x.rows().into_iter().map(|row| tree.predict_row(row)).collect())
    }

    fn params(&self) -> Vec<(String, String)> {
        tree_params(&self.config)
    }

    fn to_artifact(&self) -> Result<serde_json::Value, ModelError> {
        Ok(serde_json::to_value(self)?)
    }
}

impl TreeExplainable for DecisionTreeRegressor {
    fn trees(&self) -> Result<Vec<&Tree>, ModelError> {
        self.tree
            .as_ref()
            .map(|t| vec![t])
            .ok_or(ModelError::NotFitted)
    }

    fn n_features(&self) -> Option<usize> {
        self.n_features
    }
}

pub(crate) fn tree_params(config: &TreeConfig) -> Vec<(String, String)> {
    vec![
        (
            "max_depth".to_string(),
            config
                .max_depth
                .map_or_else(|| "None".to_string(), |d| d.to_string()),
        ),
        (
            "min_samples_split".to_string(),
            config.min_samples_split.to_string(),
        ),
        (
            "min_samples_leaf".to_string(),
            config.min_samples_leaf.to_string(),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn step() -> (Array2<f64>, Array1<f64>) {
        let x = array![[1.0], [2.0], [3.0], [10.0], [11.0], [12.0]];
        let y = array![5.0, 5.0, 5.0, 20.0, 20.0, 20.0];
        (x, y)
    }

    #[test]
    fn test_tree_learns_step() {
        let (x, y) = step();
        let mut tree = DecisionTreeRegressor::default();
        tree.fit(&x, &y).unwrap();
        let fitted = tree.tree().unwrap();
        assert_eq!(fitted.n_leaves(), 2);
        match fitted.node(0) {
            TreeNode::Split { threshold, .. } => assert!((threshold - 6.5).abs() < 1e-12),
            TreeNode::Leaf { .. } => panic!("root should split"),
        }
        let pred = tree.predict(&array![[0.0], [6.0], [7.0], [50.0]]).unwrap();
        assert_eq!(pred.to_vec(), vec![5.0, 5.0, 20.0, 20.0]);
    }

    #[test]
    fn test_max_depth_zero_is_mean() {
        let (x, y) = step();
        let mut tree = DecisionTreeRegressor::new(TreeConfig {
            max_depth: Some(0),
            ..Default::default()
        });
        tree.fit(&x, &y).unwrap();
        let pred = tree.predict(&array![[1.0]]).unwrap();
        assert!((pred[0] - 12.5).abs() < 1e-12);
    }

    #[test]
    fn test_min_samples_leaf_respected() {
        let x = array![[1.0], [2.0], [3.0], [4.0]];
        let y = array![0.0, 0.0, 0.0, 100.0];
        let mut tree = DecisionTreeRegressor::new(TreeConfig {
            min_samples_leaf: 2,
            ..Default::default()
        });
        tree.fit(&x, &y).unwrap();
        for node in tree.tree().unwrap().nodes() {
            assert!(node.n_samples() >= 2);
        }
    }

    #[test]
    fn test_node_covers_add_up() {
        let (x, y) = step();
        let mut tree = DecisionTreeRegressor::default();
        tree.fit(&x, &y).unwrap();
        let fitted = tree.tree().unwrap();
        if let TreeNode::Split {
            left,
            right,
            n_samples,
            ..
        } = fitted.node(0)
        {
            assert_eq!(
                fitted.node(*left).n_samples() + fitted.node(*right).n_samples(),
                *n_samples
            );
        }
    }

    #[test]
    fn test_artifact_roundtrips() {
        let (x, y) = step();
        let mut tree = DecisionTreeRegressor::default();
        tree.fit(&x, &y).unwrap();
        let json = tree.to_artifact().unwrap();
        let back: DecisionTreeRegressor = serde_json::from_value(json).unwrap();
        assert_eq!(back.tree(), tree.tree());
    }
}

//! Random forest regressor
//!
//! Bagged regression trees: each tree is grown on a bootstrap sample drawn
//! with `StdRng::seed_from_u64(seed + i)` and predictions are averaged.

use ndarray::{Array1, Array2, Axis};
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::tree::{tree_params, Tree, TreeConfig};
use super::{check_features, check_fit_input, ModelError, Regressor, TreeExplainable};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForestConfig {
    pub n_estimators: usize,
    pub tree: TreeConfig,
    /// Draw a bootstrap sample per tree (otherwise every tree sees all rows)
    pub bootstrap: bool,
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            tree: TreeConfig::default(),
            bootstrap: true,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RandomForestRegressor {
    config: ForestConfig,
    trees: Vec<Tree>,
    n_features: Option<usize>,
}

impl RandomForestRegressor {
    pub fn new(config: ForestConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            n_features: None,
        }
    }

    pub fn config(&self) -> &ForestConfig {
        &self.config
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl Regressor for RandomForestRegressor {
    fn name(&self) -> &'static str {
        "random_forest"
    }

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<(), ModelError> {
        check_fit_input(x, y)?;
        if self.config.n_estimators == 0 {
            return Err(ModelError::InvalidParameter(
                "n_estimators must be at least 1".to_string(),
            ));
        }

        let n = x.nrows();
        self.trees = (0..self.config.n_estimators)
            .map(|i| {
                if self.config.bootstrap {
                    let mut rng = StdRng::seed_from_u64(self.config.seed.wrapping_add(i as u64));
                    let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                    let xs = x.select(Axis(0), &sample);
                    let ys = y.select(Axis(0), &sample);
                    Tree::grow(&xs, &ys, &self.config.tree)
                } else {
                    Tree::grow(x, y, &self.config.tree)
                }
            })
            .collect();
        self.n_features = Some(x.ncols());

        debug!(trees = self.trees.len(), rows = n, "Random forest fit");
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>, ModelError> {
        if self.trees.is_empty() {
            return Err(ModelError::NotFitted);
        }
        check_features(x, self.n_features.unwrap_or_default())?;
        let n_trees = self.trees.len() as f64;
        Ok(x
            .rows()
            .into_iter()
            .map(|row| self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>() / n_trees)
            .collect())
    }

    fn params(&self) -> Vec<(String, String)> {
        let mut params = tree_params(&self.config.tree);
        params.push((
            "n_estimators".to_string(),
            self.config.n_estimators.to_string(),
        ));
        params.push(("bootstrap".to_string(), self.config.bootstrap.to_string()));
        params.push(("seed".to_string(), self.config.seed.to_string()));
        params
    }

    fn to_artifact(&self) -> Result<serde_json::Value, ModelError> {
        Ok(serde_json::to_value(self)?)
    }
}

impl TreeExplainable for RandomForestRegressor {
    fn trees(&self) -> Result<Vec<&Tree>, ModelError> {
        if self.trees.is_empty() {
            return Err(ModelError::NotFitted);
        }
        Ok(self.trees.iter().collect())
    }

    fn n_features(&self) -> Option<usize> {
        self.n_features
    }
}

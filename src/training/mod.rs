//! Model Training
//!
//! Train/test splitting, tracked training runs and SHAP explanations.
//!
//! A training run:
//! 1. `initialize_tracking` selects the experiment and opens/closes a run
//! 2. `train_and_log_model` re-opens that run, fits, scores on the test
//!    split and logs metrics and the model artifact
//! 3. `explain_model_with_shap` attributes tree-model predictions to features

pub mod shap;

pub use shap::{explain_model_with_shap, shap_summary_plot, ShapValues};

use chrono::Utc;
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::charts::ChartError;
use crate::data::{DataError, Dataset};
use crate::models::{mean_squared_error, r2_score, ModelError, Regressor};
use crate::tracking::{
    ColSpec, ExperimentTracker, InputExample, ModelArtifact, ModelSignature, RunGuard,
    TrackingError,
};

#[derive(Debug, Error)]
pub enum TrainingError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Tracking(#[from] TrackingError),

    #[error(transparent)]
    Chart(#[from] ChartError),

    #[error("Invalid split: {0}")]
    InvalidSplit(String),
}

/// Rows of features and targets divided into train and test parts.
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub x_train: Array2<f64>,
    pub x_test: Array2<f64>,
    pub y_train: Array1<f64>,
    pub y_test: Array1<f64>,
    pub feature_names: Vec<String>,
}

/// Shuffle rows with a seeded RNG and hold out `test_fraction` of them.
///
/// The test size is `ceil(n * test_fraction)`; both parts must be non-empty.
pub fn train_test_split(
    x: &Array2<f64>,
    y: &Array1<f64>,
    test_fraction: f64,
    seed: u64,
) -> Result<TrainTestSplit, TrainingError> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(TrainingError::InvalidSplit(format!(
            "test fraction must be in (0, 1), got {test_fraction}"
        )));
    }
    let n = x.nrows();
    if n != y.len() {
        return Err(ModelError::DimensionMismatch {
            expected: n,
            got: y.len(),
        }
        .into());
    }
    let n_test = (n as f64 * test_fraction).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(TrainingError::InvalidSplit(format!(
            "{n} rows cannot be split with test fraction {test_fraction}"
        )));
    }

    let mut rows: Vec<usize> = (0..n).collect();
    rows.shuffle(&mut StdRng::seed_from_u64(seed));
    let (test_rows, train_rows) = rows.split_at(n_test);

    Ok(TrainTestSplit {
        x_train: x.select(Axis(0), train_rows),
        x_test: x.select(Axis(0), test_rows),
        y_train: y.select(Axis(0), train_rows),
        y_test: y.select(Axis(0), test_rows),
        feature_names: (0..x.ncols()).map(|j| format!("feature_{j}")).collect(),
    })
}

/// Split a dataset on named numeric feature and target columns.
/// Rows with a null in any of those columns are dropped first.
pub fn prepare_split(
    data: &Dataset,
    target: &str,
    features: &[&str],
    test_fraction: f64,
    seed: u64,
) -> Result<TrainTestSplit, TrainingError> {
    let mut used: Vec<&[Option<f64>]> = Vec::with_capacity(features.len() + 1);
    for name in features.iter().chain(std::iter::once(&target)) {
        used.push(data.numeric(name)?);
    }
    let complete = data.filter_rows(|row| used.iter().all(|col| col[row].is_some()));
    let dropped = data.n_rows() - complete.n_rows();
    if dropped > 0 {
        info!(dropped, "Dropped rows with missing model inputs");
    }

    let x = complete.to_matrix(features)?;
    let y = complete.to_vector(target)?;
    let mut split = train_test_split(&x, &y, test_fraction, seed)?;
    split.feature_names = features.iter().map(|f| (*f).to_string()).collect();
    Ok(split)
}

/// Test-set scores of one training run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrainingOutcome {
    pub mse: f64,
    pub r2: f64,
}

/// Select or create the experiment, open and close a run, return its id.
pub fn initialize_tracking<T: ExperimentTracker + ?Sized>(
    tracker: &T,
    experiment_name: &str,
) -> Result<String, TrainingError> {
    let experiment_id = tracker.get_or_create_experiment(experiment_name)?;
    let run = RunGuard::start(tracker, &experiment_id)?;
    let run_id = run.run_id().to_string();
    run.finish()?;
    info!(
        experiment = experiment_name,
        run_id = %run_id,
        backend = tracker.backend(),
        "Tracking initialized"
    );
    Ok(run_id)
}

/// Schema from the first training row and its prediction.
pub fn infer_signature(feature_names: &[String], prediction_len: usize) -> ModelSignature {
    ModelSignature {
        inputs: feature_names
            .iter()
            .map(|n| ColSpec::double(Some(n.clone())))
            .collect(),
        outputs: (0..prediction_len.max(1)).map(|_| ColSpec::double(None)).collect(),
    }
}

/// Fit `model` on the train split inside the re-opened run, score it on the
/// test split and log metrics plus the model artifact. The run is closed on
/// every exit path; a failure leaves it marked as failed.
pub fn train_and_log_model<T: ExperimentTracker + ?Sized>(
    model: &mut dyn Regressor,
    model_name: &str,
    tracker: &T,
    run_id: &str,
    split: &TrainTestSplit,
) -> Result<TrainingOutcome, TrainingError> {
    let run = RunGuard::resume(tracker, run_id)?;
    tracker.set_tag(run_id, "model_name", model_name)?;

    model.fit(&split.x_train, &split.y_train)?;
    for (key, value) in model.params() {
        tracker.log_param(run_id, &key, &value)?;
    }

    let predictions = model.predict(&split.x_test)?;
    let outcome = TrainingOutcome {
        mse: mean_squared_error(&split.y_test, &predictions),
        r2: r2_score(&split.y_test, &predictions),
    };
    tracker.log_metric(run_id, "mse", outcome.mse)?;
    tracker.log_metric(run_id, "r2", outcome.r2)?;

    let example = split.x_train.select(Axis(0), &[0]);
    let example_prediction = model.predict(&example)?;
    let artifact = ModelArtifact {
        artifact_path: model_name.to_string(),
        flavor: model.name().to_string(),
        model: model.to_artifact()?,
        signature: infer_signature(&split.feature_names, example_prediction.len()),
        input_example: InputExample {
            columns: split.feature_names.clone(),
            data: vec![example.row(0).to_vec()],
        },
        created_at: Utc::now(),
    };
    tracker.log_model(run_id, &artifact)?;
    run.finish()?;

    info!(
        model = model_name,
        run_id,
        mse = outcome.mse,
        r2 = outcome.r2,
        "Model trained and logged"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DecisionTreeRegressor, Lasso, LinearRegression, TreeConfig};
    use crate::tracking::{LocalTracker, RunStatus};
    use ndarray::array;

    fn linear_data(n: usize) -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((n, 2), |(i, j)| (i * (j + 1)) as f64 % 17.0);
        let y = x.map_axis(Axis(1), |r| 3.0 * r[0] - 2.0 * r[1] + 1.0);
        (x, y)
    }

    #[test]
    fn test_split_sizes_and_determinism() {
        let (x, y) = linear_data(50);
        let a = train_test_split(&x, &y, 0.2, 7).unwrap();
        let b = train_test_split(&x, &y, 0.2, 7).unwrap();
        assert_eq!(a.x_test.nrows(), 10);
        assert_eq!(a.x_train.nrows(), 40);
        assert_eq!(a.y_test, b.y_test);
        assert_eq!(a.x_train.ncols(), 2);
    }

    #[test]
    fn test_split_rejects_bad_fraction() {
        let (x, y) = linear_data(10);
        assert!(matches!(
            train_test_split(&x, &y, 0.0, 1),
            Err(TrainingError::InvalidSplit(_))
        ));
        assert!(train_test_split(&x, &y, 1.0, 1).is_err());
        let one = array![[1.0]];
        assert!(train_test_split(&one, &array![1.0], 0.5, 1).is_err());
    }

    #[test]
    fn test_train_and_log_model_records_run() {
        let tracker = LocalTracker::temporary().unwrap();
        let run_id = initialize_tracking(&tracker, "claims").unwrap();

        let (x, y) = linear_data(60);
        let split = train_test_split(&x, &y, 0.25, 42).unwrap();
        let mut model = LinearRegression::new();
        let outcome = train_and_log_model(&mut model, "ols", &tracker, &run_id, &split).unwrap();

        assert!(outcome.mse < 1e-8);
        assert!(outcome.r2 > 0.999_999);

        let run = tracker.get_run(&run_id).unwrap().unwrap();
        assert_eq!(run.status, RunStatus::Finished);
        assert_eq!(run.tags["model_name"], "ols");
        assert!(run.metrics.contains_key("mse") && run.metrics.contains_key("r2"));

        let artifact = tracker.load_artifact(&run_id, "ols").unwrap().unwrap();
        assert_eq!(artifact.signature.inputs.len(), 2);
        assert_eq!(artifact.input_example.data[0], split.x_train.row(0).to_vec());
    }

    #[test]
    fn test_models_in_one_run_keep_separate_artifacts() {
        let tracker = LocalTracker::temporary().unwrap();
        let run_id = initialize_tracking(&tracker, "claims").unwrap();

        let (x, y) = linear_data(60);
        let split = train_test_split(&x, &y, 0.25, 42).unwrap();
        let mut ols = LinearRegression::new();
        let mut lasso = Lasso::new(0.1);
        train_and_log_model(&mut ols, "linear_regression", &tracker, &run_id, &split).unwrap();
        train_and_log_model(&mut lasso, "lasso", &tracker, &run_id, &split).unwrap();

        let first = tracker.load_artifact(&run_id, "linear_regression").unwrap().unwrap();
        let second = tracker.load_artifact(&run_id, "lasso").unwrap().unwrap();
        assert_eq!(first.flavor, "linear_regression");
        assert_eq!(second.flavor, "lasso");
        assert!(tracker.load_artifact(&run_id, "model").unwrap().is_none());
        assert_eq!(
            tracker.get_run(&run_id).unwrap().unwrap().status,
            RunStatus::Finished
        );
    }

    #[test]
    fn test_failed_fit_marks_run_failed() {
        let tracker = LocalTracker::temporary().unwrap();
        let run_id = initialize_tracking(&tracker, "claims").unwrap();

        let split = TrainTestSplit {
            x_train: Array2::zeros((0, 1)),
            x_test: Array2::zeros((1, 1)),
            y_train: Array1::zeros(0),
            y_test: Array1::zeros(1),
            feature_names: vec!["x".to_string()],
        };
        let mut model = DecisionTreeRegressor::new(TreeConfig::default());
        assert!(train_and_log_model(&mut model, "tree", &tracker, &run_id, &split).is_err());
        assert_eq!(
            tracker.get_run(&run_id).unwrap().unwrap().status,
            RunStatus::Failed
        );
    }
}

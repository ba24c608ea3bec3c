//! Training Workflow Integration Test
//!
//! Runs the tracked training path end to end against the local sled
//! backend: synthetic data, split, random forest fit, logged run and a
//! TreeSHAP explanation of the fitted model.

use claims_insight::data::calculate_profit;
use claims_insight::data::synthetic::{generate, SyntheticConfig};
use claims_insight::models::{ForestConfig, RandomForestRegressor, Regressor, TreeConfig};
use claims_insight::tracking::{ExperimentTracker, LocalTracker, RunStatus};
use claims_insight::training::{prepare_split, shap_summary_plot};
use claims_insight::{explain_model_with_shap, initialize_tracking, train_and_log_model};

const FEATURES: [&str; 3] = ["TotalPremium", "kilowatts", "SumInsured"];

fn small_forest() -> RandomForestRegressor {
    RandomForestRegressor::new(ForestConfig {
        n_estimators: 8,
        tree: TreeConfig {
            max_depth: Some(4),
            ..Default::default()
        },
        bootstrap: true,
        seed: 5,
    })
}

#[test]
fn forest_run_is_logged_and_explained() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("runs.sled");

    let mut data = generate(&SyntheticConfig {
        rows: 600,
        seed: 21,
        missing_rate: 0.05,
    })
    .unwrap();
    calculate_profit(&mut data).unwrap();

    let split = prepare_split(&data, "Profit", &FEATURES, 0.2, 42).unwrap();
    let kept = split.x_train.nrows() + split.x_test.nrows();
    assert!(kept < 600, "Rows with blanked features should be dropped");
    assert_eq!(split.feature_names, FEATURES);

    let run_id;
    {
        let tracker = LocalTracker::open(&store).unwrap();
        run_id = initialize_tracking(&tracker, "claims-forest").unwrap();

        let mut forest = small_forest();
        let outcome =
            train_and_log_model(&mut forest, "forest", &tracker, &run_id, &split).unwrap();
        assert!(outcome.mse.is_finite());
        assert!(outcome.r2 <= 1.0);

        let shap = explain_model_with_shap(&forest, &split.x_test).unwrap();
        assert_eq!(shap.values.dim(), (split.x_test.nrows(), FEATURES.len()));

        let predictions = forest.predict(&split.x_test).unwrap();
        for (rebuilt, predicted) in shap.reconstruct().iter().zip(predictions.iter()) {
            let tolerance = 1e-6 * predicted.abs().max(1.0);
            assert!(
                (rebuilt - predicted).abs() <= tolerance,
                "SHAP values do not add up: {rebuilt} vs {predicted}"
            );
        }

        let names: Vec<String> = FEATURES.iter().map(|f| f.to_string()).collect();
        let mut sink = claims_insight::charts::ChartSink::new(dir.path().join("shap")).unwrap();
        let plot = shap_summary_plot(&mut sink, &shap, &names).unwrap();
        assert!(plot.exists());
    }

    // Reopen to check the run survived on disk
    let tracker = LocalTracker::open(&store).unwrap();
    let run = tracker.get_run(&run_id).unwrap().expect("run persisted");
    assert_eq!(run.status, RunStatus::Finished);
    assert_eq!(run.tags["model_name"], "forest");
    assert_eq!(run.params["n_estimators"], "8");
    assert!(run.metrics.contains_key("mse"));
    assert!(run.metrics.contains_key("r2"));

    let experiment_id = tracker.get_or_create_experiment("claims-forest").unwrap();
    let runs = tracker.list_runs(&experiment_id).unwrap();
    assert_eq!(runs.len(), 1, "Training reuses the initialised run");

    let artifact = tracker
        .load_artifact(&run_id, "forest")
        .unwrap()
        .expect("model artifact stored");
    assert_eq!(artifact.flavor, "random_forest");
    assert_eq!(artifact.input_example.columns, FEATURES);
}

#[test]
fn unknown_target_column_is_rejected() {
    let data = generate(&SyntheticConfig {
        rows: 50,
        ..Default::default()
    })
    .unwrap();
    assert!(prepare_split(&data, "Profit", &FEATURES, 0.2, 1).is_err());
}

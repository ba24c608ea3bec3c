//! Config Validation Tests
//!
//! Typo detection on raw TOML, range checks on the parsed config and the
//! save/load roundtrip, exercised independently from the analysis pipeline.

use claims_insight::config::validation::{
    known_config_keys, suggest_correction, suspicious_values, validate_unknown_keys,
};
use claims_insight::config::{AnalysisConfig, ConfigError, TrackingBackend};

// ============================================================================
// Typo Detection
// ============================================================================

#[test]
fn typo_in_hypothesis_threshold_warns_with_suggestion() {
    let toml_str = r#"
[hypothesis]
treshold = 0.01
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 1, "Expected exactly 1 warning");
    assert!(warnings[0].field.contains("treshold"));
    assert_eq!(
        warnings[0].suggestion.as_deref(),
        Some("hypothesis.threshold"),
        "Should suggest the correct spelling"
    );
}

#[test]
fn unknown_section_is_reported_without_suggestion() {
    let warnings = validate_unknown_keys("[plotting_engine]\nwidth = 3\n");
    assert_eq!(warnings.len(), 2, "Section and its key are both unknown");
    assert!(warnings.iter().all(|w| w.suggestion.is_none()));
}

#[test]
fn valid_config_produces_zero_warnings() {
    let toml_str = r#"
[data]
path = "data/claims.txt"
delimiter = "|"

[features]
postal_digits = 2
subset_groups = 10

[hypothesis]
threshold = 0.05
lasso_alpha = 0.01

[training]
test_fraction = 0.25
seed = 7
max_depth = 6

[tracking]
backend = "mlflow"
uri = "http://mlflow.internal:5000"
experiment_name = "claims-pricing"
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert!(warnings.is_empty(), "Unexpected warnings: {warnings:?}");
}

#[test]
fn malformed_toml_yields_no_key_warnings() {
    assert!(validate_unknown_keys("[hypothesis\nthreshold = ").is_empty());
}

#[test]
fn suggestion_is_none_for_distant_keys() {
    let known = known_config_keys();
    assert!(suggest_correction("completely.unrelated.key", &known).is_none());
}

// ============================================================================
// Parsing and Range Checks
// ============================================================================

#[test]
fn partial_file_falls_back_to_defaults() {
    let (config, provenance) =
        AnalysisConfig::parse_with_provenance("[training]\nseed = 11\n").unwrap();
    assert_eq!(config.training.seed, 11);
    assert_eq!(config.training.test_fraction, 0.2);
    assert_eq!(config.hypothesis.threshold, 0.05);
    assert_eq!(config.tracking.backend, TrackingBackend::Local);
    assert!(provenance.is_user_set("training.seed"));
    assert!(!provenance.is_user_set("training.test_fraction"));
}

#[test]
fn out_of_range_values_fail_validation() {
    let mut config = AnalysisConfig::default();
    config.hypothesis.threshold = 1.5;
    config.training.test_fraction = 0.0;
    config.training.n_estimators = 0;

    match config.validate() {
        Err(ConfigError::Validation(errors)) => {
            assert_eq!(errors.len(), 3, "All violations are collected: {errors:?}");
            assert!(errors.iter().any(|e| e.contains("hypothesis.threshold")));
            assert!(errors.iter().any(|e| e.contains("training.test_fraction")));
            assert!(errors.iter().any(|e| e.contains("training.n_estimators")));
        }
        other => panic!("Expected validation failure, got {other:?}"),
    }
}

#[test]
fn nan_threshold_is_rejected() {
    let mut config = AnalysisConfig::default();
    config.hypothesis.threshold = f64::NAN;
    assert!(config.validate().is_err());
}

#[test]
fn defaults_raise_no_suspicious_value_warnings() {
    assert!(suspicious_values(&AnalysisConfig::default()).is_empty());
}

#[test]
fn loose_threshold_is_flagged_but_valid() {
    let mut config = AnalysisConfig::default();
    config.hypothesis.threshold = 0.2;
    assert!(config.validate().is_ok());

    let warnings = suspicious_values(&config);
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].field, "hypothesis.threshold");
}

// ============================================================================
// Roundtrip
// ============================================================================

#[test]
fn saved_config_loads_back_identically() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("claims_insight.toml");

    let mut config = AnalysisConfig::default();
    config.features.subset_groups = Some(25);
    config.training.max_depth = Some(4);
    config.tracking.backend = TrackingBackend::Mlflow;
    config.save_to_file(&path).unwrap();

    let loaded = AnalysisConfig::load_from_file(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = AnalysisConfig::load_from_file(&dir.path().join("absent.toml"));
    assert!(matches!(result, Err(ConfigError::Io(_, _))));
}

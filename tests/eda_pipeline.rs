//! EDA Pipeline Integration Test
//!
//! Writes a synthetic claims extract to disk, loads it back through the
//! delimited loader and runs the full EDA pass into a temporary chart
//! directory.
//!
//! Verifies that:
//! - The loader reports a missing file as `None`
//! - Every stage runs and produces SVG figures
//! - The processed dataset has no nulls left in numeric or categorical columns

use claims_insight::charts::ChartSink;
use claims_insight::config::{self, AnalysisConfig};
use claims_insight::data::synthetic::{generate, write_delimited, SyntheticConfig};
use claims_insight::{load_data, perform_eda, ColumnKind, EdaAnalyzer};

fn init_config() {
    if !config::is_initialized() {
        config::init(AnalysisConfig::default());
    }
}

#[test]
fn missing_file_loads_as_none() {
    let dir = tempfile::tempdir().unwrap();
    let loaded = load_data(dir.path().join("nope.txt"), b'|').unwrap();
    assert!(loaded.is_none());
}

#[test]
fn full_eda_pass_over_written_extract() {
    init_config();
    let dir = tempfile::tempdir().unwrap();
    let data_path = dir.path().join("claims.txt");
    let chart_dir = dir.path().join("charts");

    let source = generate(&SyntheticConfig {
        rows: 400,
        seed: 9,
        missing_rate: 0.05,
    })
    .unwrap();
    write_delimited(&source, &data_path, b'|').unwrap();

    let loaded = load_data(&data_path, b'|')
        .unwrap()
        .expect("extract was just written");
    assert_eq!(loaded.n_rows(), 400);
    assert_eq!(loaded.column_names(), source.column_names());

    let mut sink = ChartSink::new(&chart_dir).unwrap();
    let processed = perform_eda(&loaded, &mut sink).unwrap();

    assert!(!sink.written().is_empty(), "EDA should write charts");
    for path in sink.written() {
        assert!(path.exists(), "{} was reported but not written", path.display());
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("svg"));
    }

    assert_eq!(processed.n_rows(), 400);
    for column in processed.columns() {
        if matches!(
            column.data.kind(),
            ColumnKind::Numeric | ColumnKind::Categorical
        ) {
            assert_eq!(
                column.data.null_count(),
                0,
                "{} still has missing values after cleaning",
                column.name
            );
        }
    }
    assert_eq!(
        processed.column("TransactionMonth").unwrap().kind(),
        ColumnKind::Timestamp
    );
}

#[test]
fn summary_covers_numeric_columns() {
    let source = generate(&SyntheticConfig {
        rows: 100,
        ..Default::default()
    })
    .unwrap();
    let summary = EdaAnalyzer::new(&source).summarize_data();

    let names: Vec<&str> = summary.statistics.iter().map(|s| s.name.as_str()).collect();
    assert!(names.contains(&"TotalPremium"));
    assert!(names.contains(&"TotalClaims"));
    assert!(!names.contains(&"Province"));
    assert_eq!(summary.kinds.len(), source.n_columns());
}

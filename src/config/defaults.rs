//! System-wide default constants.
//!
//! Values shared by the config defaults and the CLI.

// ============================================================================
// Data
// ============================================================================

/// Default input file.
pub const DATA_PATH: &str = "data/MachineLearningRating_v3.txt";

/// Field separator of the claims extract.
pub const DELIMITER: &str = "|";

/// Rows produced by `simulate` when `--rows` is not given.
pub const SYNTHETIC_ROWS: usize = 5_000;

// ============================================================================
// EDA
// ============================================================================

/// Directory the EDA charts are written to.
pub const CHART_OUTPUT_DIR: &str = "eda_output";

// ============================================================================
// Tracking
// ============================================================================

/// MLflow tracking server used when the `mlflow` backend is selected.
pub const MLFLOW_TRACKING_URI: &str = "http://127.0.0.1:5000";

/// sled database directory of the local tracking backend.
pub const LOCAL_TRACKING_PATH: &str = "mlruns.sled";

/// HTTP client timeout for tracking server requests (seconds).
pub const TRACKING_HTTP_TIMEOUT_SECS: u64 = 30;

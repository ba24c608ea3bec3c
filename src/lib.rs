//! claims-insight: Insurance Claims Analytics
//!
//! Exploratory analysis, A/B hypothesis testing and tracked regression
//! training for motor insurance policy and claims data.
//!
//! ## Architecture
//!
//! - **Data**: columnar `Dataset`, delimited-file loading, derived features
//! - **Stats**: descriptive summaries and t / z / ANOVA / Kruskal-Wallis tests
//! - **EDA**: staged analyzer (raw → typed → clean) writing SVG charts
//! - **Models**: OLS, Lasso, CART tree and random forest regressors
//! - **Training**: train/test split, tracked runs, TreeSHAP explanations
//! - **Tracking**: local sled store or MLflow REST backend

pub mod charts;
pub mod config;
pub mod data;
pub mod eda;
pub mod models;
pub mod stats;
pub mod tracking;
pub mod training;

// Re-export configuration
pub use config::AnalysisConfig;

// Re-export commonly used types
pub use data::{load_data, ColumnData, ColumnKind, DataError, Dataset};
pub use eda::{perform_eda, EdaAnalyzer, EdaError};
pub use models::{ModelError, Regressor, TreeExplainable};
pub use stats::{ab_test, Decision, StatsError, TestResult};
pub use tracking::{ExperimentTracker, LocalTracker, MlflowTracker, TrackingError};
pub use training::{
    explain_model_with_shap, initialize_tracking, train_and_log_model, TrainTestSplit,
    TrainingError, TrainingOutcome,
};

//! Experiment Tracking
//!
//! `ExperimentTracker` abstracts the run lifecycle used by training:
//! experiments are selected or created by name, runs are opened and closed,
//! and tags, params, metrics and model artifacts are logged against a run id.
//!
//! Backends:
//! - `LocalTracker`: sled database on disk (or temporary, for tests)
//! - `MlflowTracker`: MLflow tracking server REST API (blocking HTTP)
//!
//! `RunGuard` scopes an open run: the run is ended on every exit path,
//! as `Finished` via `finish()` or `Failed` when dropped.

pub mod local;
pub mod mlflow;

pub use local::{LocalTracker, RunRecord};
pub use mlflow::MlflowTracker;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{TrackingBackend, TrackingConfig};

#[derive(Debug, Error)]
pub enum TrackingError {
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Tracking server returned {status}: {body}")]
    Server { status: u16, body: String },

    #[error("Unexpected response: {0}")]
    Response(String),

    #[error("Run not found: {0}")]
    RunNotFound(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Running,
    Finished,
    Failed,
    Killed,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunStatus::Running => "RUNNING",
            RunStatus::Finished => "FINISHED",
            RunStatus::Failed => "FAILED",
            RunStatus::Killed => "KILLED",
        };
        write!(f, "{s}")
    }
}

/// One named, typed column of a model signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub dtype: String,
}

impl ColSpec {
    pub fn double(name: Option<String>) -> Self {
        Self {
            name,
            dtype: "double".to_string(),
        }
    }
}

/// Input and output schema of a logged model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSignature {
    pub inputs: Vec<ColSpec>,
    pub outputs: Vec<ColSpec>,
}

/// Representative input rows in split orientation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputExample {
    pub columns: Vec<String>,
    pub data: Vec<Vec<f64>>,
}

/// Fitted model plus the metadata needed to reload and call it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub artifact_path: String,
    /// Model family, e.g. `random_forest`
    pub flavor: String,
    pub model: serde_json::Value,
    pub signature: ModelSignature,
    pub input_example: InputExample,
    pub created_at: DateTime<Utc>,
}

/// Run lifecycle and logging.
pub trait ExperimentTracker {
    /// Backend name for logs.
    fn backend(&self) -> &'static str;

    /// Id of the named experiment, creating it when absent.
    fn get_or_create_experiment(&self, name: &str) -> Result<String, TrackingError>;

    /// Open a new run and return its id.
    fn start_run(&self, experiment_id: &str) -> Result<String, TrackingError>;

    /// Mark an existing run as running again.
    fn resume_run(&self, run_id: &str) -> Result<(), TrackingError>;

    fn end_run(&self, run_id: &str, status: RunStatus) -> Result<(), TrackingError>;

    fn set_tag(&self, run_id: &str, key: &str, value: &str) -> Result<(), TrackingError>;

    fn log_param(&self, run_id: &str, key: &str, value: &str) -> Result<(), TrackingError>;

    fn log_metric(&self, run_id: &str, key: &str, value: f64) -> Result<(), TrackingError>;

    fn log_model(&self, run_id: &str, artifact: &ModelArtifact) -> Result<(), TrackingError>;
}

/// An open run, ended when the guard is finished or dropped.
pub struct RunGuard<'a, T: ExperimentTracker + ?Sized> {
    tracker: &'a T,
    run_id: String,
    open: bool,
}

impl<'a, T: ExperimentTracker + ?Sized> RunGuard<'a, T> {
    /// Create and open a new run in the experiment.
    pub fn start(tracker: &'a T, experiment_id: &str) -> Result<Self, TrackingError> {
        let run_id = tracker.start_run(experiment_id)?;
        Ok(Self {
            tracker,
            run_id,
            open: true,
        })
    }

    /// Re-open an existing run.
    pub fn resume(tracker: &'a T, run_id: &str) -> Result<Self, TrackingError> {
        tracker.resume_run(run_id)?;
        Ok(Self {
            tracker,
            run_id: run_id.to_string(),
            open: true,
        })
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn tracker(&self) -> &'a T {
        self.tracker
    }

    /// End the run as finished.
    pub fn finish(mut self) -> Result<(), TrackingError> {
        self.open = false;
        self.tracker.end_run(&self.run_id, RunStatus::Finished)
    }
}

impl<T: ExperimentTracker + ?Sized> Drop for RunGuard<'_, T> {
    fn drop(&mut self) {
        if self.open {
            if let Err(e) = self.tracker.end_run(&self.run_id, RunStatus::Failed) {
                warn!(run_id = %self.run_id, error = %e, "Failed to close run");
            }
        }
    }
}

/// Build the configured tracker backend.
pub fn from_config(config: &TrackingConfig) -> Result<Box<dyn ExperimentTracker>, TrackingError> {
    let tracker: Box<dyn ExperimentTracker> = match config.backend {
        TrackingBackend::Local => Box::new(LocalTracker::open(&config.local_path)?),
        TrackingBackend::Mlflow => Box::new(MlflowTracker::new(&config.uri)?),
    };
    info!(backend = tracker.backend(), "Experiment tracker ready");
    Ok(tracker)
}

pub(crate) fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

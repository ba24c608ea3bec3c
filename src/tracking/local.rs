//! Local experiment tracker backed by sled
//!
//! Key format:
//! - `experiments/{name}` → experiment id
//! - `runs/{run_id}` → `RunRecord` (JSON)
//! - `artifacts/{run_id}/{artifact_path}` → `ModelArtifact` (JSON)

use serde::{Deserialize, Serialize};
use sled::Db;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;
use uuid::Uuid;

use super::{now_millis, ExperimentTracker, ModelArtifact, RunStatus, TrackingError};

/// Stored state of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub experiment_id: String,
    pub status: RunStatus,
    pub start_time: i64,
    pub end_time: Option<i64>,
    pub tags: BTreeMap<String, String>,
    pub params: BTreeMap<String, String>,
    /// Latest value per metric key
    pub metrics: BTreeMap<String, f64>,
}

pub struct LocalTracker {
    db: Db,
}

impl LocalTracker {
    /// Open or create the tracking database.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, TrackingError> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// In-memory database, removed on drop.
    pub fn temporary() -> Result<Self, TrackingError> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db })
    }

    fn run_key(run_id: &str) -> String {
        format!("runs/{run_id}")
    }

    pub fn get_run(&self, run_id: &str) -> Result<Option<RunRecord>, TrackingError> {
        match self.db.get(Self::run_key(run_id))? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Runs of an experiment, oldest first.
    pub fn list_runs(&self, experiment_id: &str) -> Result<Vec<RunRecord>, TrackingError> {
        let mut runs = Vec::new();
        for entry in self.db.scan_prefix("runs/") {
            let (_, value) = entry?;
            let run: RunRecord = serde_json::from_slice(&value)?;
            if run.experiment_id == experiment_id {
                runs.push(run);
            }
        }
        runs.sort_by_key(|r| r.start_time);
        Ok(runs)
    }

    pub fn load_artifact(
        &self,
        run_id: &str,
        artifact_path: &str,
    ) -> Result<Option<ModelArtifact>, TrackingError> {
        match self.db.get(format!("artifacts/{run_id}/{artifact_path}"))? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn store_run(&self, run: &RunRecord) -> Result<(), TrackingError> {
        self.db
            .insert(Self::run_key(&run.run_id), serde_json::to_vec(run)?)?;
        Ok(())
    }

    /// Read-modify-write of one run record.
    fn update_run(
        &self,
        run_id: &str,
        apply: impl FnOnce(&mut RunRecord),
    ) -> Result<(), TrackingError> {
        let mut run = self
            .get_run(run_id)?
            .ok_or_else(|| TrackingError::RunNotFound(run_id.to_string()))?;
        apply(&mut run);
        self.store_run(&run)
    }

    pub fn flush(&self) -> Result<(), TrackingError> {
        self.db.flush()?;
        Ok(())
    }
}

impl ExperimentTracker for LocalTracker {
    fn backend(&self) -> &'static str {
        "local"
    }

    fn get_or_create_experiment(&self, name: &str) -> Result<String, TrackingError> {
        let key = format!("experiments/{name}");
        if let Some(id) = self.db.get(&key)? {
            return Ok(String::from_utf8_lossy(&id).into_owned());
        }
        let id = Uuid::new_v4().to_string();
        self.db.insert(key.as_bytes(), id.as_bytes())?;
        debug!(experiment = name, id = %id, "Created experiment");
        Ok(id)
    }

    fn start_run(&self, experiment_id: &str) -> Result<String, TrackingError> {
        let run = RunRecord {
            run_id: Uuid::new_v4().simple().to_string(),
            experiment_id: experiment_id.to_string(),
            status: RunStatus::Running,
            start_time: now_millis(),
            end_time: None,
            tags: BTreeMap::new(),
            params: BTreeMap::new(),
            metrics: BTreeMap::new(),
        };
        self.store_run(&run)?;
        debug!(run_id = %run.run_id, experiment_id, "Started run");
        Ok(run.run_id)
    }

    fn resume_run(&self, run_id: &str) -> Result<(), TrackingError> {
        self.update_run(run_id, |run| {
            run.status = RunStatus::Running;
            run.end_time = None;
        })
    }

    fn end_run(&self, run_id: &str, status: RunStatus) -> Result<(), TrackingError> {
        self.update_run(run_id, |run| {
            run.status = status;
            run.end_time = Some(now_millis());
        })?;
        debug!(run_id, %status, "Ended run");
        self.flush()
    }

    fn set_tag(&self, run_id: &str, key: &str, value: &str) -> Result<(), TrackingError> {
        self.update_run(run_id, |run| {
            run.tags.insert(key.to_string(), value.to_string());
        })
    }

    fn log_param(&self, run_id: &str, key: &str, value: &str) -> Result<(), TrackingError> {
        self.update_run(run_id, |run| {
            run.params.insert(key.to_string(), value.to_string());
        })
    }

    fn log_metric(&self, run_id: &str, key: &str, value: f64) -> Result<(), TrackingError> {
        self.update_run(run_id, |run| {
            run.metrics.insert(key.to_string(), value);
        })
    }

    fn log_model(&self, run_id: &str, artifact: &ModelArtifact) -> Result<(), TrackingError> {
        if self.get_run(run_id)?.is_none() {
            return Err(TrackingError::RunNotFound(run_id.to_string()));
        }
        let key = format!("artifacts/{run_id}/{}", artifact.artifact_path);
        self.db.insert(key.as_bytes(), serde_json::to_vec(artifact)?)?;
        debug!(key = %key, flavor = %artifact.flavor, "Stored model artifact");
        Ok(())
    }
}

//! MLflow tracking server client
//!
//! Talks to the REST API under `{uri}/api/2.0/mlflow/` with a blocking
//! `reqwest` client. Request bodies are built by free functions so their
//! shape can be checked without a server.

use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

use super::{now_millis, ExperimentTracker, ModelArtifact, RunStatus, TrackingError};
use crate::config::defaults::TRACKING_HTTP_TIMEOUT_SECS;

/// Error code MLflow returns for unknown experiments.
const RESOURCE_DOES_NOT_EXIST: &str = "RESOURCE_DOES_NOT_EXIST";

pub struct MlflowTracker {
    http: Client,
    base_url: String,
}

impl MlflowTracker {
    pub fn new(tracking_uri: &str) -> Result<Self, TrackingError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(TRACKING_HTTP_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            http,
            base_url: tracking_uri.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}/api/2.0/mlflow/{}", self.base_url, path)
    }

    fn post(&self, path: &str, body: &Value) -> Result<Value, TrackingError> {
        let url = self.endpoint(path);
        debug!(url = %url, "POST");
        let resp = self.http.post(&url).json(body).send()?;
        Self::read_json(resp)
    }

    fn read_json(resp: Response) -> Result<Value, TrackingError> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(TrackingError::Server {
                status: status.as_u16(),
                body,
            });
        }
        let text = resp.text()?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    fn find_experiment(&self, name: &str) -> Result<Option<String>, TrackingError> {
        let url = self.endpoint("experiments/get-by-name");
        let resp = self
            .http
            .get(&url)
            .query(&[("experiment_name", name)])
            .send()?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        match Self::read_json(resp) {
            Ok(body) => string_at(&body, &["experiment", "experiment_id"]).map(Some),
            Err(TrackingError::Server { body, .. }) if body.contains(RESOURCE_DOES_NOT_EXIST) => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

impl ExperimentTracker for MlflowTracker {
    fn backend(&self) -> &'static str {
        "mlflow"
    }

    fn get_or_create_experiment(&self, name: &str) -> Result<String, TrackingError> {
        if let Some(id) = self.find_experiment(name)? {
            return Ok(id);
        }
        let body = self.post("experiments/create", &json!({ "name": name }))?;
        let id = string_at(&body, &["experiment_id"])?;
        info!(experiment = name, id = %id, "Created MLflow experiment");
        Ok(id)
    }

    fn start_run(&self, experiment_id: &str) -> Result<String, TrackingError> {
        let body = self.post("runs/create", &create_run_body(experiment_id, now_millis()))?;
        string_at(&body, &["run", "info", "run_id"])
    }

    fn resume_run(&self, run_id: &str) -> Result<(), TrackingError> {
        self.post("runs/update", &update_run_body(run_id, RunStatus::Running, None))?;
        Ok(())
    }

    fn end_run(&self, run_id: &str, status: RunStatus) -> Result<(), TrackingError> {
        self.post(
            "runs/update",
            &update_run_body(run_id, status, Some(now_millis())),
        )?;
        Ok(())
    }

    fn set_tag(&self, run_id: &str, key: &str, value: &str) -> Result<(), TrackingError> {
        self.post("runs/set-tag", &key_value_body(run_id, key, value))?;
        Ok(())
    }

    fn log_param(&self, run_id: &str, key: &str, value: &str) -> Result<(), TrackingError> {
        self.post("runs/log-parameter", &key_value_body(run_id, key, value))?;
        Ok(())
    }

    fn log_metric(&self, run_id: &str, key: &str, value: f64) -> Result<(), TrackingError> {
        self.post(
            "runs/log-metric",
            &metric_body(run_id, key, value, now_millis()),
        )?;
        Ok(())
    }

    fn log_model(&self, run_id: &str, artifact: &ModelArtifact) -> Result<(), TrackingError> {
        self.post("runs/log-model", &log_model_body(run_id, artifact)?)?;
        Ok(())
    }
}

pub(crate) fn create_run_body(experiment_id: &str, start_time: i64) -> Value {
    json!({
        "experiment_id": experiment_id,
        "start_time": start_time,
    })
}

pub(crate) fn update_run_body(run_id: &str, status: RunStatus, end_time: Option<i64>) -> Value {
    let mut body = json!({
        "run_id": run_id,
        "status": status.to_string(),
    });
    if let Some(end) = end_time {
        body["end_time"] = json!(end);
    }
    body
}

pub(crate) fn key_value_body(run_id: &str, key: &str, value: &str) -> Value {
    json!({
        "run_id": run_id,
        "key": key,
        "value": value,
    })
}

pub(crate) fn metric_body(run_id: &str, key: &str, value: f64, timestamp: i64) -> Value {
    json!({
        "run_id": run_id,
        "key": key,
        "value": value,
        "timestamp": timestamp,
        "step": 0,
    })
}

/// `model_json` is the MLmodel document serialized to a string; signature
/// schemas are themselves JSON strings inside it.
pub(crate) fn log_model_body(run_id: &str, artifact: &ModelArtifact) -> Result<Value, TrackingError> {
    let mlmodel = json!({
        "artifact_path": artifact.artifact_path,
        "run_id": run_id,
        "utc_time_created": artifact.created_at.format("%Y-%m-%d %H:%M:%S%.6f").to_string(),
        "flavors": {
            "claims_insight": {
                "model_type": artifact.flavor,
                "model": artifact.model,
            }
        },
        "signature": {
            "inputs": serde_json::to_string(&artifact.signature.inputs)?,
            "outputs": serde_json::to_string(&artifact.signature.outputs)?,
        },
        "saved_input_example_info": {
            "type": "dataframe",
            "pandas_orient": "split",
            "columns": artifact.input_example.columns,
            "data": artifact.input_example.data,
        },
    });
    Ok(json!({
        "run_id": run_id,
        "model_json": serde_json::to_string(&mlmodel)?,
    }))
}

fn string_at(body: &Value, path: &[&str]) -> Result<String, TrackingError> {
    let mut node = body;
    for key in path {
        node = &node[*key];
    }
    node.as_str()
        .map(str::to_string)
        .ok_or_else(|| TrackingError::Response(format!("missing field {}", path.join("."))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::{ColSpec, InputExample, ModelSignature};

    #[test]
    fn test_endpoint_trims_slash() {
        let tracker = MlflowTracker::new("http://localhost:5000/").unwrap();
        assert_eq!(tracker.base_url(), "http://localhost:5000");
        assert_eq!(
            tracker.endpoint("runs/create"),
            "http://localhost:5000/api/2.0/mlflow/runs/create"
        );
    }

    #[test]
    fn test_update_body_end_time_optional() {
        let resumed = update_run_body("abc", RunStatus::Running, None);
        assert_eq!(resumed["status"], "RUNNING");
        assert!(resumed.get("end_time").is_none());

        let ended = update_run_body("abc", RunStatus::Finished, Some(42));
        assert_eq!(ended["status"], "FINISHED");
        assert_eq!(ended["end_time"], 42);
    }

    #[test]
    fn test_metric_body() {
        let body = metric_body("abc", "r2", 0.5, 7);
        assert_eq!(body["key"], "r2");
        assert_eq!(body["value"], 0.5);
        assert_eq!(body["step"], 0);
    }

    #[test]
    fn test_log_model_body_nests_json_strings() {
        let artifact = ModelArtifact {
            artifact_path: "model".to_string(),
            flavor: "linear_regression".to_string(),
            model: json!({"coefficients": [1.0]}),
            signature: ModelSignature {
                inputs: vec![ColSpec::double(Some("kilowatts".to_string()))],
                outputs: vec![ColSpec::double(None)],
            },
            input_example: InputExample {
                columns: vec!["kilowatts".to_string()],
                data: vec![vec![75.0]],
            },
            created_at: chrono::Utc::now(),
        };
        let body = log_model_body("abc", &artifact).unwrap();
        let mlmodel: Value = serde_json::from_str(body["model_json"].as_str().unwrap()).unwrap();
        assert_eq!(mlmodel["flavors"]["claims_insight"]["model_type"], "linear_regression");
        let inputs: Vec<ColSpec> =
            serde_json::from_str(mlmodel["signature"]["inputs"].as_str().unwrap()).unwrap();
        assert_eq!(inputs[0].name.as_deref(), Some("kilowatts"));
    }

    #[test]
    fn test_string_at_reports_missing_path() {
        let body = json!({"run": {"info": {"run_id": "r1"}}});
        assert_eq!(string_at(&body, &["run", "info", "run_id"]).unwrap(), "r1");
        assert!(matches!(
            string_at(&body, &["experiment_id"]),
            Err(TrackingError::Response(_))
        ));
    }
}

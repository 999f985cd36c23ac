use crate::adapters::file_tracker::new_run_id;
use crate::core::{RunInfo, RunStatus, Tracker};
use crate::utils::error::{Result, TrainError};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use url::Url;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const SOURCE_NAME: &str = "diabetes-train";

/// Client for the MLflow tracking server REST API (`/api/2.0/mlflow`).
/// Artifacts go through the server's artifact proxy, so the server must run
/// with artifact serving enabled.
pub struct MlflowTracker {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GetExperimentResponse {
    experiment: ExperimentInfo,
}

#[derive(Debug, Deserialize)]
struct ExperimentInfo {
    experiment_id: String,
}

#[derive(Debug, Deserialize)]
struct CreateExperimentResponse {
    experiment_id: String,
}

#[derive(Debug, Deserialize)]
struct CreateRunResponse {
    run: RunEnvelope,
}

#[derive(Debug, Deserialize)]
struct RunEnvelope {
    info: RemoteRunInfo,
}

#[derive(Debug, Deserialize)]
struct RemoteRunInfo {
    run_id: String,
    experiment_id: String,
    #[serde(default)]
    artifact_uri: String,
    start_time: Option<i64>,
}

#[derive(Debug, Serialize)]
struct RunTag<'a> {
    key: &'a str,
    value: &'a str,
}

impl MlflowTracker {
    pub fn new(tracking_uri: &str, token: Option<String>) -> Result<Self> {
        let mut base = tracking_uri.trim_end_matches('/').to_string();
        base.push('/');
        let base_url = Url::parse(&base).map_err(|e| TrainError::InvalidConfigValueError {
            field: "tracking_uri".to_string(),
            value: tracking_uri.to_string(),
            reason: format!("Invalid URL format: {}", e),
        })?;

        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| TrainError::ConfigError {
                message: format!("Cannot build tracking URL for '{}': {}", path, e),
            })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(TrainError::TrackingError {
            status: status.as_u16(),
            message,
        })
    }

    async fn post<B: Serialize + ?Sized, R: DeserializeOwned>(&self, path: &str, body: &B) -> Result<R> {
        let url = self.endpoint(path)?;
        tracing::debug!("POST {}", url);
        let response = self
            .authorize(self.client.post(url))
            .json(body)
            .send()
            .await?;
        let response = Self::check(response).await?;
        Ok(response.json().await?)
    }

    async fn create_experiment(&self, name: &str) -> Result<String> {
        let created: CreateExperimentResponse = self
            .post("api/2.0/mlflow/experiments/create", &json!({ "name": name }))
            .await?;
        tracing::info!("Created experiment '{}' ({})", name, created.experiment_id);
        Ok(created.experiment_id)
    }

    /// Path below the artifact proxy root for a run's artifacts.
    fn artifact_prefix(run: &RunInfo) -> String {
        Url::parse(&run.artifact_uri)
            .ok()
            .filter(|uri| uri.scheme() == "mlflow-artifacts")
            .map(|uri| uri.path().trim_matches('/').to_string())
            .filter(|prefix| !prefix.is_empty())
            .unwrap_or_else(|| format!("{}/{}/artifacts", run.experiment_id, run.run_id))
    }
}

#[async_trait]
impl Tracker for MlflowTracker {
    async fn set_experiment(&self, name: &str) -> Result<String> {
        let url = self.endpoint("api/2.0/mlflow/experiments/get-by-name")?;
        let response = self
            .authorize(self.client.get(url))
            .query(&[("experiment_name", name)])
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return self.create_experiment(name).await;
        }
        let found: GetExperimentResponse = Self::check(response).await?.json().await?;
        tracing::debug!(
            "Using existing experiment '{}' ({})",
            name,
            found.experiment.experiment_id
        );
        Ok(found.experiment.experiment_id)
    }

    async fn start_run(&self, experiment_id: &str) -> Result<RunInfo> {
        let start_time = chrono::Utc::now().timestamp_millis();
        let run_name = format!("run-{}", &new_run_id()[..8]);
        let tags = [RunTag {
            key: "mlflow.source.name",
            value: SOURCE_NAME,
        }];
        let created: CreateRunResponse = self
            .post(
                "api/2.0/mlflow/runs/create",
                &json!({
                    "experiment_id": experiment_id,
                    "start_time": start_time,
                    "run_name": run_name,
                    "tags": tags,
                }),
            )
            .await?;

        let info = created.run.info;
        Ok(RunInfo {
            run_id: info.run_id,
            experiment_id: info.experiment_id,
            artifact_uri: info.artifact_uri,
            start_time: info.start_time.unwrap_or(start_time),
        })
    }

    async fn log_param(&self, run: &RunInfo, key: &str, value: &str) -> Result<()> {
        let _: serde_json::Value = self
            .post(
                "api/2.0/mlflow/runs/log-parameter",
                &json!({ "run_id": run.run_id, "key": key, "value": value }),
            )
            .await?;
        Ok(())
    }

    async fn log_metric(&self, run: &RunInfo, key: &str, value: f64, step: i64) -> Result<()> {
        let _: serde_json::Value = self
            .post(
                "api/2.0/mlflow/runs/log-metric",
                &json!({
                    "run_id": run.run_id,
                    "key": key,
                    "value": value,
                    "timestamp": chrono::Utc::now().timestamp_millis(),
                    "step": step,
                }),
            )
            .await?;
        Ok(())
    }

    async fn log_artifact(&self, run: &RunInfo, path: &str, data: &[u8]) -> Result<()> {
        let url = self.endpoint(&format!(
            "api/2.0/mlflow-artifacts/artifacts/{}/{}",
            Self::artifact_prefix(run),
            path.trim_start_matches('/')
        ))?;
        tracing::debug!("PUT {} ({} bytes)", url, data.len());
        let response = self
            .authorize(self.client.put(url))
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(data.to_vec())
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn end_run(&self, run: &RunInfo, status: RunStatus) -> Result<()> {
        let _: serde_json::Value = self
            .post(
                "api/2.0/mlflow/runs/update",
                &json!({
                    "run_id": run.run_id,
                    "status": status,
                    "end_time": chrono::Utc::now().timestamp_millis(),
                }),
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn run(artifact_uri: &str) -> RunInfo {
        RunInfo {
            run_id: "abc123".to_string(),
            experiment_id: "7".to_string(),
            artifact_uri: artifact_uri.to_string(),
            start_time: 0,
        }
    }

    #[test]
    fn test_artifact_prefix_from_proxy_uri() {
        assert_eq!(
            MlflowTracker::artifact_prefix(&run("mlflow-artifacts:/7/abc123/artifacts")),
            "7/abc123/artifacts"
        );
        assert_eq!(
            MlflowTracker::artifact_prefix(&run("s3://bucket/7/abc123/artifacts")),
            "7/abc123/artifacts"
        );
    }

    #[tokio::test]
    async fn test_set_experiment_returns_existing_id() {
        let server = MockServer::start();
        let get_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/2.0/mlflow/experiments/get-by-name")
                .query_param("experiment_name", "train-diabetes-classification");
            then.status(200).json_body(serde_json::json!({
                "experiment": {"experiment_id": "42", "name": "train-diabetes-classification"}
            }));
        });

        let tracker = MlflowTracker::new(&server.base_url(), None).unwrap();
        let id = tracker
            .set_experiment("train-diabetes-classification")
            .await
            .unwrap();

        get_mock.assert();
        assert_eq!(id, "42");
    }

    #[tokio::test]
    async fn test_set_experiment_creates_when_missing() {
        let server = MockServer::start();
        let get_mock = server.mock(|when, then| {
            when.method(GET).path("/api/2.0/mlflow/experiments/get-by-name");
            then.status(404).json_body(serde_json::json!({
                "error_code": "RESOURCE_DOES_NOT_EXIST",
                "message": "Could not find experiment"
            }));
        });
        let create_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/2.0/mlflow/experiments/create")
                .json_body(serde_json::json!({"name": "new-exp"}));
            then.status(200).json_body(serde_json::json!({"experiment_id": "5"}));
        });

        let tracker = MlflowTracker::new(&server.base_url(), None).unwrap();
        let id = tracker.set_experiment("new-exp").await.unwrap();

        get_mock.assert();
        create_mock.assert();
        assert_eq!(id, "5");
    }

    #[tokio::test]
    async fn test_start_run_sends_bearer_token() {
        let server = MockServer::start();
        let create_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/2.0/mlflow/runs/create")
                .header("Authorization", "Bearer secret")
                .json_body_partial(r#"{"experiment_id": "3"}"#);
            then.status(200).json_body(serde_json::json!({
                "run": {"info": {
                    "run_id": "r1",
                    "experiment_id": "3",
                    "artifact_uri": "mlflow-artifacts:/3/r1/artifacts",
                    "start_time": 1700000000000i64
                }}
            }));
        });

        let tracker = MlflowTracker::new(&server.base_url(), Some("secret".to_string())).unwrap();
        let run = tracker.start_run("3").await.unwrap();

        create_mock.assert();
        assert_eq!(run.run_id, "r1");
        assert_eq!(run.start_time, 1_700_000_000_000);
    }

    #[tokio::test]
    async fn test_log_calls_hit_expected_endpoints() {
        let server = MockServer::start();
        let param_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/2.0/mlflow/runs/log-parameter")
                .json_body(serde_json::json!({"run_id": "abc123", "key": "reg_rate", "value": "0.01"}));
            then.status(200).json_body(serde_json::json!({}));
        });
        let metric_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/2.0/mlflow/runs/log-metric")
                .json_body_partial(r#"{"run_id": "abc123", "key": "auc", "value": 0.8, "step": 0}"#);
            then.status(200).json_body(serde_json::json!({}));
        });
        let artifact_mock = server.mock(|when, then| {
            when.method(PUT)
                .path("/api/2.0/mlflow-artifacts/artifacts/7/abc123/artifacts/model_abc123/model.json")
                .body("{}");
            then.status(200).json_body(serde_json::json!({}));
        });
        let update_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/2.0/mlflow/runs/update")
                .json_body_partial(r#"{"run_id": "abc123", "status": "FINISHED"}"#);
            then.status(200).json_body(serde_json::json!({}));
        });

        let tracker = MlflowTracker::new(&server.base_url(), None).unwrap();
        let run = run("mlflow-artifacts:/7/abc123/artifacts");
        tracker.log_param(&run, "reg_rate", "0.01").await.unwrap();
        tracker.log_metric(&run, "auc", 0.8, 0).await.unwrap();
        tracker
            .log_artifact(&run, "model_abc123/model.json", b"{}")
            .await
            .unwrap();
        tracker.end_run(&run, RunStatus::Finished).await.unwrap();

        param_mock.assert();
        metric_mock.assert();
        artifact_mock.assert();
        update_mock.assert();
    }

    #[tokio::test]
    async fn test_server_error_becomes_tracking_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/api/2.0/mlflow/runs/log-parameter");
            then.status(400).body("INVALID_PARAMETER_VALUE");
        });

        let tracker = MlflowTracker::new(&server.base_url(), None).unwrap();
        let err = tracker
            .log_param(&run(""), "reg_rate", "0.01")
            .await
            .unwrap_err();

        match err {
            TrainError::TrackingError { status, message } => {
                assert_eq!(status, 400);
                assert!(message.contains("INVALID_PARAMETER_VALUE"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}

use crate::config::cli::LocalStorage;
use crate::core::{RunInfo, RunStatus, Storage, Tracker};
use crate::utils::error::{Result, TrainError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ExperimentMeta {
    experiment_id: String,
    name: String,
    creation_time: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RunMeta {
    run_id: String,
    experiment_id: String,
    status: RunStatus,
    start_time: i64,
    end_time: Option<i64>,
    artifact_uri: String,
}

/// Tracking store on top of a [`Storage`], laid out like MLflow's `mlruns`:
///
/// ```text
/// <exp_id>/meta.json
/// <exp_id>/<run_id>/meta.json
/// <exp_id>/<run_id>/params/<key>        value
/// <exp_id>/<run_id>/metrics/<key>       "<timestamp> <value> <step>" per line
/// <exp_id>/<run_id>/artifacts/<path>
/// ```
pub struct FileTracker<S: Storage> {
    storage: S,
    artifact_root: String,
}

impl FileTracker<LocalStorage> {
    pub fn local(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let artifact_root = std::path::absolute(root)
            .unwrap_or_else(|_| root.to_path_buf())
            .display()
            .to_string();
        Self::new(LocalStorage::new(root), artifact_root)
    }
}

impl<S: Storage> FileTracker<S> {
    pub fn new(storage: S, artifact_root: impl Into<String>) -> Self {
        Self {
            storage,
            artifact_root: artifact_root.into(),
        }
    }

    fn run_dir(run: &RunInfo) -> String {
        format!("{}/{}", run.experiment_id, run.run_id)
    }

    async fn read_json<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T> {
        let bytes = self.storage.read_file(path).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn write_json<T: Serialize>(&self, path: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.storage.write_file(path, &bytes).await
    }

    async fn find_experiment(&self, name: &str) -> Result<(Option<String>, u64)> {
        let mut max_id = 0;
        for dir in self.storage.list_dirs("").await? {
            let Ok(meta) = self
                .read_json::<ExperimentMeta>(&format!("{}/meta.json", dir))
                .await
            else {
                continue;
            };
            if meta.name == name {
                return Ok((Some(meta.experiment_id), max_id));
            }
            if let Ok(id) = meta.experiment_id.parse::<u64>() {
                max_id = max_id.max(id);
            }
        }
        Ok((None, max_id))
    }
}

/// Keys and artifact paths become file names, so they must stay inside the run directory.
fn validate_relative(field: &str, value: &str) -> Result<()> {
    let escapes = value.is_empty()
        || value.starts_with('/')
        || value.contains('\\')
        || value.split('/').any(|part| part == ".." || part.is_empty());
    if escapes {
        return Err(TrainError::InvalidConfigValueError {
            field: field.to_string(),
            value: value.to_string(),
            reason: "Must be a non-empty relative path without '..' segments".to_string(),
        });
    }
    Ok(())
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub fn new_run_id() -> String {
    format!("{:032x}", rand::random::<u128>())
}

#[async_trait]
impl<S: Storage> Tracker for FileTracker<S> {
    async fn set_experiment(&self, name: &str) -> Result<String> {
        let (existing, max_id) = self.find_experiment(name).await?;
        if let Some(id) = existing {
            tracing::debug!("Using existing experiment '{}' ({})", name, id);
            return Ok(id);
        }

        let experiment_id = (max_id + 1).to_string();
        let meta = ExperimentMeta {
            experiment_id: experiment_id.clone(),
            name: name.to_string(),
            creation_time: now_ms(),
        };
        self.write_json(&format!("{}/meta.json", experiment_id), &meta)
            .await?;
        tracing::info!("Created experiment '{}' ({})", name, experiment_id);
        Ok(experiment_id)
    }

    async fn start_run(&self, experiment_id: &str) -> Result<RunInfo> {
        let run_id = new_run_id();
        let run = RunInfo {
            artifact_uri: format!(
                "{}/{}/{}/artifacts",
                self.artifact_root, experiment_id, run_id
            ),
            run_id,
            experiment_id: experiment_id.to_string(),
            start_time: now_ms(),
        };
        let meta = RunMeta {
            run_id: run.run_id.clone(),
            experiment_id: run.experiment_id.clone(),
            status: RunStatus::Running,
            start_time: run.start_time,
            end_time: None,
            artifact_uri: run.artifact_uri.clone(),
        };
        self.write_json(&format!("{}/meta.json", Self::run_dir(&run)), &meta)
            .await?;
        Ok(run)
    }

    async fn log_param(&self, run: &RunInfo, key: &str, value: &str) -> Result<()> {
        validate_relative("param", key)?;
        let path = format!("{}/params/{}", Self::run_dir(run), key);
        self.storage.write_file(&path, value.as_bytes()).await
    }

    async fn log_metric(&self, run: &RunInfo, key: &str, value: f64, step: i64) -> Result<()> {
        validate_relative("metric", key)?;
        let path = format!("{}/metrics/{}", Self::run_dir(run), key);
        let mut history = match self.storage.read_file(&path).await {
            Ok(bytes) => bytes,
            Err(TrainError::IoError(e)) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e),
        };
        history.extend_from_slice(format!("{} {} {}\n", now_ms(), value, step).as_bytes());
        self.storage.write_file(&path, &history).await
    }

    async fn log_artifact(&self, run: &RunInfo, path: &str, data: &[u8]) -> Result<()> {
        validate_relative("artifact_path", path)?;
        let full = format!("{}/artifacts/{}", Self::run_dir(run), path);
        self.storage.write_file(&full, data).await
    }

    async fn end_run(&self, run: &RunInfo, status: RunStatus) -> Result<()> {
        let path = format!("{}/meta.json", Self::run_dir(run));
        let mut meta: RunMeta = self.read_json(&path).await?;
        meta.status = status;
        meta.end_time = Some(now_ms());
        self.write_json(&path, &meta).await
    }
}

use crate::domain::model::{RunInfo, RunStatus};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    /// Names of the directories directly under `path`; empty if `path` is missing.
    fn list_dirs(&self, path: &str)
        -> impl std::future::Future<Output = Result<Vec<String>>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn training_data(&self) -> &str;
    fn reg_rate(&self) -> f64;
    fn test_size(&self) -> f64;
    fn random_state(&self) -> u64;
    fn max_iter(&self) -> usize;
    fn experiment_name(&self) -> &str;
    /// MLflow server; `None` selects the local file store.
    fn tracking_uri(&self) -> Option<&str>;
    fn tracking_token(&self) -> Option<&str>;
    fn mlruns_dir(&self) -> &str;
}

/// Experiment-tracking backend. One run is open at a time per engine.
#[async_trait]
pub trait Tracker: Send + Sync {
    /// Look up the experiment by name, creating it if missing. Returns its id.
    async fn set_experiment(&self, name: &str) -> Result<String>;
    async fn start_run(&self, experiment_id: &str) -> Result<RunInfo>;
    async fn log_param(&self, run: &RunInfo, key: &str, value: &str) -> Result<()>;
    async fn log_metric(&self, run: &RunInfo, key: &str, value: f64, step: i64) -> Result<()>;
    /// Store `data` at `path` relative to the run's artifact root.
    async fn log_artifact(&self, run: &RunInfo, path: &str, data: &[u8]) -> Result<()>;
    async fn end_run(&self, run: &RunInfo, status: RunStatus) -> Result<()>;
}

use super::{
    validate_provider, DEFAULT_EXPERIMENT_NAME, DEFAULT_MAX_ITER, DEFAULT_MLRUNS_DIR,
    DEFAULT_REG_RATE, DEFAULT_TEST_SIZE,
};
use crate::core::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Serialize, Deserialize, Parser)]
#[command(name = "diabetes-train")]
#[command(about = "Train a diabetes logistic regression classifier and log the run")]
pub struct CliConfig {
    /// Directory containing the training CSV files
    #[arg(long = "training_data")]
    pub training_data: String,

    /// Regularization rate (C = 1 / reg_rate)
    #[arg(long = "reg_rate", default_value_t = DEFAULT_REG_RATE)]
    pub reg_rate: f64,

    #[arg(long = "test_size", default_value_t = DEFAULT_TEST_SIZE)]
    pub test_size: f64,

    #[arg(long = "random_state", default_value_t = 0)]
    pub random_state: u64,

    #[arg(long = "max_iter", default_value_t = DEFAULT_MAX_ITER)]
    pub max_iter: usize,

    #[arg(long = "experiment_name", default_value = DEFAULT_EXPERIMENT_NAME)]
    pub experiment_name: String,

    /// MLflow tracking server; runs go to --mlruns_dir when unset
    #[arg(long = "tracking_uri", env = "MLFLOW_TRACKING_URI")]
    pub tracking_uri: Option<String>,

    #[arg(long = "tracking_token", env = "MLFLOW_TRACKING_TOKEN", hide_env_values = true)]
    #[serde(skip_serializing)]
    pub tracking_token: Option<String>,

    #[arg(long = "mlruns_dir", default_value = DEFAULT_MLRUNS_DIR)]
    pub mlruns_dir: String,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log CPU and memory usage per phase")]
    pub monitor: bool,

    #[arg(long = "json_logs", help = "Emit logs as JSON lines")]
    pub json_logs: bool,
}

impl fmt::Debug for CliConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CliConfig")
            .field("training_data", &self.training_data)
            .field("reg_rate", &self.reg_rate)
            .field("test_size", &self.test_size)
            .field("random_state", &self.random_state)
            .field("max_iter", &self.max_iter)
            .field("experiment_name", &self.experiment_name)
            .field("tracking_uri", &self.tracking_uri)
            .field(
                "tracking_token",
                &self.tracking_token.as_ref().map(|_| "<redacted>"),
            )
            .field("mlruns_dir", &self.mlruns_dir)
            .field("verbose", &self.verbose)
            .field("monitor", &self.monitor)
            .field("json_logs", &self.json_logs)
            .finish()
    }
}

impl ConfigProvider for CliConfig {
    fn training_data(&self) -> &str {
        &self.training_data
    }

    fn reg_rate(&self) -> f64 {
        self.reg_rate
    }

    fn test_size(&self) -> f64 {
        self.test_size
    }

    fn random_state(&self) -> u64 {
        self.random_state
    }

    fn max_iter(&self) -> usize {
        self.max_iter
    }

    fn experiment_name(&self) -> &str {
        &self.experiment_name
    }

    fn tracking_uri(&self) -> Option<&str> {
        self.tracking_uri.as_deref().filter(|uri| !uri.is_empty())
    }

    fn tracking_token(&self) -> Option<&str> {
        self.tracking_token.as_deref().filter(|token| !token.is_empty())
    }

    fn mlruns_dir(&self) -> &str {
        &self.mlruns_dir
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_provider(self)
    }
}

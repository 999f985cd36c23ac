use super::{
    validate_provider, DEFAULT_EXPERIMENT_NAME, DEFAULT_MAX_ITER, DEFAULT_MLRUNS_DIR,
    DEFAULT_REG_RATE, DEFAULT_TEST_SIZE,
};
use crate::core::ConfigProvider;
use crate::utils::error::{Result, TrainError};
use crate::utils::validation::{validate_required_field, Validate};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub data: DataConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub tracking: TrackingConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub training_data: Option<String>,
    pub test_size: Option<f64>,
    pub random_state: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelConfig {
    pub reg_rate: Option<f64>,
    pub max_iter: Option<usize>,
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct TrackingConfig {
    pub uri: Option<String>,
    pub token: Option<String>,
    pub experiment_name: Option<String>,
    pub mlruns_dir: Option<String>,
}

impl fmt::Debug for TrackingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackingConfig")
            .field("uri", &self.uri)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("experiment_name", &self.experiment_name)
            .field("mlruns_dir", &self.mlruns_dir)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub json_logs: Option<bool>,
}

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("valid env var pattern"))
}

impl TomlConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(TrainError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| TrainError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value. Unset variables become
    /// empty strings, so an unset `${MLFLOW_TRACKING_URI}` falls back to the
    /// local file store.
    fn substitute_env_vars(content: &str) -> String {
        env_var_pattern()
            .replace_all(content, |caps: &Captures| {
                std::env::var(&caps[1]).unwrap_or_default()
            })
            .into_owned()
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    pub fn json_logs(&self) -> bool {
        self.monitoring
            .as_ref()
            .and_then(|m| m.json_logs)
            .unwrap_or(false)
    }
}

impl ConfigProvider for TomlConfig {
    fn training_data(&self) -> &str {
        self.data.training_data.as_deref().unwrap_or_default()
    }

    fn reg_rate(&self) -> f64 {
        self.model.reg_rate.unwrap_or(DEFAULT_REG_RATE)
    }

    fn test_size(&self) -> f64 {
        self.data.test_size.unwrap_or(DEFAULT_TEST_SIZE)
    }

    fn random_state(&self) -> u64 {
        self.data.random_state.unwrap_or(0)
    }

    fn max_iter(&self) -> usize {
        self.model.max_iter.unwrap_or(DEFAULT_MAX_ITER)
    }

    fn experiment_name(&self) -> &str {
        self.tracking
            .experiment_name
            .as_deref()
            .unwrap_or(DEFAULT_EXPERIMENT_NAME)
    }

    fn tracking_uri(&self) -> Option<&str> {
        self.tracking.uri.as_deref().filter(|uri| !uri.is_empty())
    }

    fn tracking_token(&self) -> Option<&str> {
        self.tracking.token.as_deref().filter(|token| !token.is_empty())
    }

    fn mlruns_dir(&self) -> &str {
        self.tracking
            .mlruns_dir
            .as_deref()
            .unwrap_or(DEFAULT_MLRUNS_DIR)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        validate_required_field("data.training_data", &self.data.training_data)?;
        validate_provider(self)
    }
}

pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub mod args;

#[cfg(feature = "cli")]
pub use args::CliConfig;

use crate::core::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation;

pub const DEFAULT_EXPERIMENT_NAME: &str = "train-diabetes-classification";
pub const DEFAULT_REG_RATE: f64 = 0.01;
pub const DEFAULT_TEST_SIZE: f64 = 0.30;
pub const DEFAULT_MAX_ITER: usize = 100;
pub const DEFAULT_MLRUNS_DIR: &str = "./mlruns";

/// Checks shared by every config source.
pub fn validate_provider<C: ConfigProvider>(config: &C) -> Result<()> {
    validation::validate_path("training_data", config.training_data())?;
    validation::validate_positive_float("reg_rate", config.reg_rate())?;
    validation::validate_fraction("test_size", config.test_size())?;
    validation::validate_positive_number("max_iter", config.max_iter(), 1)?;
    validation::validate_non_empty_string("experiment_name", config.experiment_name())?;
    if let Some(uri) = config.tracking_uri() {
        validation::validate_url("tracking_uri", uri)?;
    } else {
        validation::validate_path("mlruns_dir", config.mlruns_dir())?;
    }
    Ok(())
}

pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod ml;
pub mod utils;

pub use adapters::{tracker_from_config, FileTracker, MlflowTracker};
pub use config::cli::LocalStorage;
#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::toml_config::TomlConfig;

pub use core::dataset::{load_csv_dir, split_data};
pub use core::engine::TrainingEngine;
pub use core::training::{evaluate, train_model};
pub use utils::error::{Result, TrainError};

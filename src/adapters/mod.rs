// Adapters layer: concrete tracking backends behind the `Tracker` port.

pub mod file_tracker;
pub mod mlflow;

use crate::core::{ConfigProvider, Tracker};
use crate::utils::error::Result;

pub use file_tracker::FileTracker;
pub use mlflow::MlflowTracker;

/// MLflow server when a tracking URI is configured, local file store otherwise.
pub fn tracker_from_config<C: ConfigProvider>(config: &C) -> Result<Box<dyn Tracker>> {
    match config.tracking_uri() {
        Some(uri) => {
            tracing::info!("Tracking runs on MLflow server {}", uri);
            let token = config.tracking_token().map(str::to_string);
            Ok(Box::new(MlflowTracker::new(uri, token)?))
        }
        None => {
            tracing::info!("Tracking runs in local store {}", config.mlruns_dir());
            Ok(Box::new(FileTracker::local(config.mlruns_dir())))
        }
    }
}

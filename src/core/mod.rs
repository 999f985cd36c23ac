pub mod dataset;
pub mod engine;
pub mod training;

pub use crate::domain::model::{Dataset, RunInfo, RunStatus, RunSummary, SplitData};
pub use crate::domain::ports::{ConfigProvider, Storage, Tracker};
pub use crate::utils::error::Result;

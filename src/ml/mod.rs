pub mod logistic;
pub mod metrics;

pub use logistic::{LogisticModel, LogisticRegression};
pub use metrics::ClassificationReport;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrainError {
    #[error("Cannot use non-existent path provided: {path}")]
    NonExistentPath { path: String },

    #[error("No CSV files found in provided data path: {path}")]
    NoCsvFiles { path: String },

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Tracking server returned {status}: {message}")]
    TrackingError { status: u16, message: String },

    #[error("Training error: {message}")]
    TrainingError { message: String },

    #[error("Metric error: {message}")]
    MetricError { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },
}

pub type Result<T> = std::result::Result<T, TrainError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Configuration,
    Training,
    Tracking,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl TrainError {
    pub fn training(message: impl Into<String>) -> Self {
        TrainError::TrainingError {
            message: message.into(),
        }
    }

    pub fn metric(message: impl Into<String>) -> Self {
        TrainError::MetricError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            TrainError::NonExistentPath { .. }
            | TrainError::NoCsvFiles { .. }
            | TrainError::CsvError(_) => ErrorCategory::Input,
            TrainError::ConfigError { .. }
            | TrainError::ConfigValidationError { .. }
            | TrainError::InvalidConfigValueError { .. }
            | TrainError::MissingConfigError { .. } => ErrorCategory::Configuration,
            TrainError::TrainingError { .. } | TrainError::MetricError { .. } => {
                ErrorCategory::Training
            }
            TrainError::ApiError(_) | TrainError::TrackingError { .. } => ErrorCategory::Tracking,
            TrainError::IoError(_) | TrainError::SerializationError(_) => ErrorCategory::System,
        }
    }

    /// Tracking failures are usually transient, so they rank below data and
    /// training failures; IO and serialization problems rank highest.
    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Tracking => ErrorSeverity::Medium,
            ErrorCategory::Input | ErrorCategory::Configuration | ErrorCategory::Training => {
                ErrorSeverity::High
            }
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            TrainError::NonExistentPath { .. } => {
                "Check the --training_data path and make sure the directory exists"
            }
            TrainError::NoCsvFiles { .. } => {
                "Place one or more .csv files directly inside the training data directory"
            }
            TrainError::CsvError(_) => {
                "Make sure every CSV has a header row with the expected diabetes columns"
            }
            TrainError::ApiError(_) | TrainError::TrackingError { .. } => {
                "Check that the tracking server is reachable and MLFLOW_TRACKING_URI is correct"
            }
            TrainError::TrainingError { .. } | TrainError::MetricError { .. } => {
                "Check that the data contains both classes and that --reg_rate is positive"
            }
            TrainError::ConfigError { .. }
            | TrainError::ConfigValidationError { .. }
            | TrainError::InvalidConfigValueError { .. }
            | TrainError::MissingConfigError { .. } => {
                "Review the command line flags or the TOML configuration file"
            }
            TrainError::IoError(_) | TrainError::SerializationError(_) => {
                "Check file permissions and available disk space"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Input => format!("Could not read training data: {}", self),
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::Training => format!("Model training failed: {}", self),
            ErrorCategory::Tracking => format!("Experiment tracking failed: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }

    /// Process exit code derived from severity.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const FEATURE_COUNT: usize = 8;

/// Feature columns in the order they enter the model.
pub const FEATURE_COLUMNS: [&str; FEATURE_COUNT] = [
    "Pregnancies",
    "PlasmaGlucose",
    "DiastolicBloodPressure",
    "TricepsThickness",
    "SerumInsulin",
    "BMI",
    "DiabetesPedigree",
    "Age",
];

pub const LABEL_COLUMN: &str = "Diabetic";

pub type FeatureRow = [f64; FEATURE_COUNT];

/// One patient row. Columns not listed here are ignored on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PatientRecord {
    pub pregnancies: f64,
    pub plasma_glucose: f64,
    pub diastolic_blood_pressure: f64,
    pub triceps_thickness: f64,
    pub serum_insulin: f64,
    #[serde(rename = "BMI")]
    pub bmi: f64,
    pub diabetes_pedigree: f64,
    pub age: f64,
    pub diabetic: u8,
}

impl PatientRecord {
    pub fn features(&self) -> FeatureRow {
        [
            self.pregnancies,
            self.plasma_glucose,
            self.diastolic_blood_pressure,
            self.triceps_thickness,
            self.serum_insulin,
            self.bmi,
            self.diabetes_pedigree,
            self.age,
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub records: Vec<PatientRecord>,
}

impl Dataset {
    pub fn new(records: Vec<PatientRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn features(&self) -> Vec<FeatureRow> {
        self.records.iter().map(PatientRecord::features).collect()
    }

    pub fn labels(&self) -> Vec<u8> {
        self.records.iter().map(|r| r.diabetic).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SplitData {
    pub x_train: Vec<FeatureRow>,
    pub x_test: Vec<FeatureRow>,
    pub y_train: Vec<u8>,
    pub y_test: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Running,
    Finished,
    Failed,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunStatus::Running => "RUNNING",
            RunStatus::Finished => "FINISHED",
            RunStatus::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// Handle of an open tracking run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunInfo {
    pub run_id: String,
    pub experiment_id: String,
    pub artifact_uri: String,
    pub start_time: i64,
}

/// What a finished run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub experiment_id: String,
    pub metrics: BTreeMap<String, f64>,
    pub model_artifact: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(diabetic: u8) -> PatientRecord {
        PatientRecord {
            pregnancies: 1.0,
            plasma_glucose: 2.0,
            diastolic_blood_pressure: 3.0,
            triceps_thickness: 4.0,
            serum_insulin: 5.0,
            bmi: 6.0,
            diabetes_pedigree: 7.0,
            age: 8.0,
            diabetic,
        }
    }

    #[test]
    fn test_features_follow_column_order() {
        assert_eq!(
            record(0).features(),
            [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]
        );
    }

    #[test]
    fn test_dataset_labels() {
        let dataset = Dataset::new(vec![record(0), record(1), record(1)]);
        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.labels(), vec![0, 1, 1]);
        assert_eq!(dataset.features().len(), 3);
    }

    #[test]
    fn test_run_status_serializes_like_mlflow() {
        assert_eq!(
            serde_json::to_string(&RunStatus::Finished).unwrap(),
            "\"FINISHED\""
        );
        assert_eq!(RunStatus::Failed.to_string(), "FAILED");
    }
}

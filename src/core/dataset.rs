use crate::domain::model::{Dataset, PatientRecord, SplitData, FEATURE_COLUMNS, LABEL_COLUMN};
use crate::utils::error::{Result, TrainError};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::{Path, PathBuf};

/// Read every `*.csv` directly under `path` and concatenate their rows.
///
/// Files are read in file-name order so a directory always yields the same
/// row order. Non-CSV files and subdirectories are skipped.
pub fn load_csv_dir(path: impl AsRef<Path>) -> Result<Dataset> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(TrainError::NonExistentPath {
            path: path.display().to_string(),
        });
    }

    let csv_files = list_csv_files(path)?;
    if csv_files.is_empty() {
        return Err(TrainError::NoCsvFiles {
            path: path.display().to_string(),
        });
    }

    let mut records = Vec::new();
    for file in &csv_files {
        let before = records.len();
        let mut reader = csv::Reader::from_path(file)?;
        check_columns(file, reader.headers()?)?;
        for row in reader.deserialize::<PatientRecord>() {
            records.push(row?);
        }
        tracing::debug!(
            "Read {} rows from {}",
            records.len() - before,
            file.display()
        );
    }

    tracing::info!(
        "Loaded {} rows from {} CSV file(s) in {}",
        records.len(),
        csv_files.len(),
        path.display()
    );
    Ok(Dataset::new(records))
}

fn check_columns(file: &Path, headers: &csv::StringRecord) -> Result<()> {
    let required = FEATURE_COLUMNS.iter().chain(std::iter::once(&LABEL_COLUMN));
    for column in required {
        if !headers.iter().any(|header| header == *column) {
            return Err(TrainError::training(format!(
                "{} is missing required column '{}'",
                file.display(),
                column
            )));
        }
    }
    Ok(())
}

/// `*.csv` files directly under `dir`, sorted by name. Hidden files such as
/// `._data.csv` sidecars are skipped.
pub fn list_csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if dir.is_file() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let hidden = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with('.'));
        let is_csv = !hidden
            && path.is_file()
            && path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext == "csv");
        if is_csv {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Shuffle rows with a seeded RNG and hold out `ceil(test_size * n)` of them.
pub fn split_data(dataset: &Dataset, test_size: f64, seed: u64) -> Result<SplitData> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(TrainError::training(format!(
            "test_size must be between 0 and 1, got {}",
            test_size
        )));
    }

    let n = dataset.len();
    let n_test = (test_size * n as f64).ceil() as usize;
    let n_train = n.saturating_sub(n_test);
    if n_test == 0 || n_train == 0 {
        return Err(TrainError::training(format!(
            "Cannot split {} rows with test_size {}: one side would be empty",
            n, test_size
        )));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let features = dataset.features();
    let labels = dataset.labels();
    let (test_idx, train_idx) = indices.split_at(n_test);

    let split = SplitData {
        x_train: train_idx.iter().map(|&i| features[i]).collect(),
        x_test: test_idx.iter().map(|&i| features[i]).collect(),
        y_train: train_idx.iter().map(|&i| labels[i]).collect(),
        y_test: test_idx.iter().map(|&i| labels[i]).collect(),
    };

    tracing::debug!(
        "Dataset split: {} training, {} test (seed {})",
        split.x_train.len(),
        split.x_test.len(),
        seed
    );
    Ok(split)
}

use crate::domain::model::SplitData;
use crate::ml::metrics::{self, ClassificationReport};
use crate::ml::{LogisticModel, LogisticRegression};
use crate::utils::error::Result;

/// Test-set scores logged as `accuracy` and `auc`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub accuracy: f64,
    pub auc: f64,
}

/// Fit `C = 1 / reg_rate` logistic regression on the training side of `split`.
pub fn train_model(reg_rate: f64, max_iter: usize, split: &SplitData) -> Result<LogisticModel> {
    let estimator = LogisticRegression::from_reg_rate(reg_rate)?.with_max_iter(max_iter);
    let model = estimator.fit(&split.x_train, &split.y_train)?;
    tracing::info!(
        "Trained logistic regression (C = {}) on {} rows in {} iteration(s)",
        estimator.c,
        split.x_train.len(),
        model.n_iter
    );
    Ok(model)
}

pub fn evaluate(model: &LogisticModel, split: &SplitData) -> Result<Evaluation> {
    let y_hat = model.predict(&split.x_test);
    let accuracy = metrics::accuracy(&split.y_test, &y_hat)?;
    let scores = model.predict_proba(&split.x_test);
    let auc = metrics::roc_auc(&split.y_test, &scores)?;
    Ok(Evaluation { accuracy, auc })
}

/// Fit-time metrics on the training rows.
pub fn training_report(model: &LogisticModel, split: &SplitData) -> Result<ClassificationReport> {
    ClassificationReport::compute(
        &split.y_train,
        &model.predict(&split.x_train),
        &model.predict_proba(&split.x_train),
    )
}

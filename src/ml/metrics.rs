use crate::utils::error::{Result, TrainError};
use serde::Serialize;
use std::cmp::Ordering;

const LOG_LOSS_EPS: f64 = 1e-15;

fn check_lengths(expected: usize, actual: usize) -> Result<()> {
    if expected == 0 {
        return Err(TrainError::metric("Cannot compute a metric on zero samples"));
    }
    if expected != actual {
        return Err(TrainError::metric(format!(
            "Found input variables with inconsistent numbers of samples: [{}, {}]",
            expected, actual
        )));
    }
    Ok(())
}

pub fn accuracy(y_true: &[u8], y_pred: &[u8]) -> Result<f64> {
    check_lengths(y_true.len(), y_pred.len())?;
    let correct = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
    Ok(correct as f64 / y_true.len() as f64)
}

/// Area under the ROC curve via the Mann-Whitney U statistic. Tied scores
/// share the average of their ranks.
pub fn roc_auc(y_true: &[u8], scores: &[f64]) -> Result<f64> {
    check_lengths(y_true.len(), scores.len())?;
    if scores.iter().any(|s| s.is_nan()) {
        return Err(TrainError::metric("Scores contain NaN"));
    }

    let n_pos = y_true.iter().filter(|&&label| label == 1).count();
    let n_neg = y_true.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return Err(TrainError::metric(
            "Only one class present in y_true. ROC AUC score is not defined in that case.",
        ));
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].partial_cmp(&scores[b]).unwrap_or(Ordering::Equal));

    let mut positive_rank_sum = 0.0;
    let mut start = 0;
    while start < order.len() {
        let mut end = start;
        while end + 1 < order.len() && scores[order[end + 1]] == scores[order[start]] {
            end += 1;
        }
        // Ranks are 1-based; the tie group covers ranks start+1..=end+1.
        let avg_rank = (start + end) as f64 / 2.0 + 1.0;
        let positives = order[start..=end]
            .iter()
            .filter(|&&i| y_true[i] == 1)
            .count();
        positive_rank_sum += avg_rank * positives as f64;
        start = end + 1;
    }

    let n_pos = n_pos as f64;
    let u = positive_rank_sum - n_pos * (n_pos + 1.0) / 2.0;
    Ok(u / (n_pos * n_neg as f64))
}

/// Zero when nothing was predicted positive.
pub fn precision(y_true: &[u8], y_pred: &[u8]) -> Result<f64> {
    check_lengths(y_true.len(), y_pred.len())?;
    let counts = Confusion::new(y_true, y_pred);
    Ok(ratio(counts.tp, counts.tp + counts.fp))
}

/// Zero when there are no positive labels.
pub fn recall(y_true: &[u8], y_pred: &[u8]) -> Result<f64> {
    check_lengths(y_true.len(), y_pred.len())?;
    let counts = Confusion::new(y_true, y_pred);
    Ok(ratio(counts.tp, counts.tp + counts.fn_))
}

pub fn f1(y_true: &[u8], y_pred: &[u8]) -> Result<f64> {
    check_lengths(y_true.len(), y_pred.len())?;
    let counts = Confusion::new(y_true, y_pred);
    Ok(ratio(2 * counts.tp, 2 * counts.tp + counts.fp + counts.fn_))
}

/// Mean binary cross-entropy of `P(y = 1)` estimates.
pub fn log_loss(y_true: &[u8], proba: &[f64]) -> Result<f64> {
    check_lengths(y_true.len(), proba.len())?;
    let total: f64 = y_true
        .iter()
        .zip(proba)
        .map(|(&label, &p)| {
            let p = p.clamp(LOG_LOSS_EPS, 1.0 - LOG_LOSS_EPS);
            if label == 1 {
                -p.ln()
            } else {
                -(1.0 - p).ln()
            }
        })
        .sum();
    Ok(total / y_true.len() as f64)
}

struct Confusion {
    tp: usize,
    fp: usize,
    fn_: usize,
}

impl Confusion {
    fn new(y_true: &[u8], y_pred: &[u8]) -> Self {
        let mut counts = Confusion { tp: 0, fp: 0, fn_: 0 };
        for (&t, &p) in y_true.iter().zip(y_pred) {
            match (t == 1, p == 1) {
                (true, true) => counts.tp += 1,
                (false, true) => counts.fp += 1,
                (true, false) => counts.fn_ += 1,
                (false, false) => {}
            }
        }
        counts
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Metrics over one labelled set, named after MLflow's sklearn autolog keys.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationReport {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub log_loss: f64,
    pub roc_auc: f64,
}

impl ClassificationReport {
    pub fn compute(y_true: &[u8], y_pred: &[u8], proba: &[f64]) -> Result<Self> {
        Ok(Self {
            accuracy: accuracy(y_true, y_pred)?,
            precision: precision(y_true, y_pred)?,
            recall: recall(y_true, y_pred)?,
            f1: f1(y_true, y_pred)?,
            log_loss: log_loss(y_true, proba)?,
            roc_auc: roc_auc(y_true, proba)?,
        })
    }

    /// `(prefix + name, value)` pairs; `training_score` mirrors accuracy.
    pub fn named(&self, prefix: &str) -> Vec<(String, f64)> {
        vec![
            (format!("{prefix}accuracy"), self.accuracy),
            (format!("{prefix}precision"), self.precision),
            (format!("{prefix}recall"), self.recall),
            (format!("{prefix}f1"), self.f1),
            (format!("{prefix}log_loss"), self.log_loss),
            (format!("{prefix}roc_auc"), self.roc_auc),
            (format!("{prefix}score"), self.accuracy),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_accuracy() {
        assert!(close(accuracy(&[0, 1, 1, 0], &[0, 1, 0, 0]).unwrap(), 0.75));
        assert!(accuracy(&[], &[]).is_err());
        assert!(accuracy(&[0, 1], &[0]).is_err());
    }

    #[test]
    fn test_roc_auc_perfect_and_inverted() {
        let y = [0, 0, 1, 1];
        assert!(close(roc_auc(&y, &[0.1, 0.2, 0.8, 0.9]).unwrap(), 1.0));
        assert!(close(roc_auc(&y, &[0.9, 0.8, 0.2, 0.1]).unwrap(), 0.0));
    }

    #[test]
    fn test_roc_auc_handles_ties() {
        assert!(close(roc_auc(&[0, 1], &[0.5, 0.5]).unwrap(), 0.5));
        // Matches sklearn: roc_auc_score([0, 0, 1, 1], [0.1, 0.4, 0.35, 0.8]) == 0.75
        assert!(close(
            roc_auc(&[0, 0, 1, 1], &[0.1, 0.4, 0.35, 0.8]).unwrap(),
            0.75
        ));
    }

    #[test]
    fn test_roc_auc_needs_both_classes() {
        let err = roc_auc(&[1, 1, 1], &[0.1, 0.2, 0.3]).unwrap_err();
        assert!(err.to_string().contains("Only one class present"));
    }

    #[test]
    fn test_precision_recall_f1() {
        let y_true = [1, 1, 0, 0, 1];
        let y_pred = [1, 0, 1, 0, 1];
        assert!(close(precision(&y_true, &y_pred).unwrap(), 2.0 / 3.0));
        assert!(close(recall(&y_true, &y_pred).unwrap(), 2.0 / 3.0));
        assert!(close(f1(&y_true, &y_pred).unwrap(), 2.0 / 3.0));
        assert_eq!(precision(&[1, 0], &[0, 0]).unwrap(), 0.0);
    }

    #[test]
    fn test_log_loss_clips_probabilities() {
        let loss = log_loss(&[1, 0], &[1.0, 0.0]).unwrap();
        assert!(loss >= 0.0 && loss < 1e-10);
        assert!(log_loss(&[1], &[0.0]).unwrap().is_finite());
        assert!(close(log_loss(&[1, 0], &[0.5, 0.5]).unwrap(), 2f64.ln()));
    }

    #[test]
    fn test_report_names_use_prefix() {
        let report = ClassificationReport::compute(&[0, 1], &[0, 1], &[0.2, 0.9]).unwrap();
        let names: Vec<String> = report.named("training_").into_iter().map(|(k, _)| k).collect();
        assert!(names.contains(&"training_accuracy".to_string()));
        assert!(names.contains(&"training_roc_auc".to_string()));
        assert!(names.contains(&"training_score".to_string()));
    }
}

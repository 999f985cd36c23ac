use crate::domain::model::FEATURE_COLUMNS;
use crate::utils::error::{Result, TrainError};
use ndarray::{Array1, Array2, Axis, Zip};
use serde::{Deserialize, Serialize};

const ARMIJO: f64 = 1e-4;
const MIN_STEP: f64 = 1e-12;

/// L2-regularised logistic regression.
///
/// Minimises the liblinear primal objective
/// `0.5 * ||w||^2 + C * sum(log(1 + exp(-y_i * w.x_i)))` with `y_i` in
/// `{-1, +1}`. With `fit_intercept` the bias is an extra constant-1 feature
/// and is penalised like the other weights. Newton steps with a Cholesky
/// solve and Armijo backtracking; the problem is strictly convex so the
/// result depends only on the inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// Inverse regularisation strength.
    pub c: f64,
    pub fit_intercept: bool,
    pub max_iter: usize,
    pub tol: f64,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self {
            c: 1.0,
            fit_intercept: true,
            max_iter: 100,
            tol: 1e-4,
        }
    }
}

impl LogisticRegression {
    /// `C = 1 / reg_rate`.
    pub fn from_reg_rate(reg_rate: f64) -> Result<Self> {
        if !reg_rate.is_finite() || reg_rate <= 0.0 {
            return Err(TrainError::training(format!(
                "reg_rate must be a positive finite number, got {}",
                reg_rate
            )));
        }
        Ok(Self {
            c: 1.0 / reg_rate,
            ..Self::default()
        })
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Estimator parameters in the form they are logged to the tracker.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("C", self.c.to_string()),
            ("penalty", "l2".to_string()),
            ("solver", "newton".to_string()),
            ("objective", "liblinear".to_string()),
            ("fit_intercept", self.fit_intercept.to_string()),
            ("max_iter", self.max_iter.to_string()),
            ("tol", self.tol.to_string()),
        ]
    }

    pub fn fit<R: AsRef<[f64]>>(&self, x: &[R], y: &[u8]) -> Result<LogisticModel> {
        if !self.c.is_finite() || self.c <= 0.0 {
            return Err(TrainError::training(format!(
                "C must be a positive finite number, got {}",
                self.c
            )));
        }
        if x.is_empty() {
            return Err(TrainError::training("Cannot fit on an empty training set"));
        }
        if x.len() != y.len() {
            return Err(TrainError::training(format!(
                "Found {} feature rows but {} labels",
                x.len(),
                y.len()
            )));
        }

        let n_features = x[0].as_ref().len();
        if let Some(pos) = x.iter().position(|row| row.as_ref().len() != n_features) {
            return Err(TrainError::training(format!(
                "Row {} has {} features, expected {}",
                pos,
                x[pos].as_ref().len(),
                n_features
            )));
        }
        if y.iter().all(|&label| label == y[0]) {
            return Err(TrainError::training(format!(
                "This solver needs samples of at least 2 classes in the data, but the data contains only one class: {}",
                y[0]
            )));
        }

        let design = Design::new(x, self.fit_intercept);
        let signs: Array1<f64> = y
            .iter()
            .map(|&label| if label > 0 { 1.0 } else { -1.0 })
            .collect();

        let mut w = Array1::zeros(design.dim());
        let mut margins = design.margins(&w);
        let mut loss = objective(&w, &margins, &signs, self.c);
        let mut grad_norm0 = None;
        let mut converged = false;
        let mut iterations = 0;

        for iter in 0..self.max_iter {
            iterations = iter + 1;
            let (grad, hessian) = gradient_and_hessian(&design, &w, &margins, &signs, self.c);
            let grad_norm = norm(&grad);
            let g0 = *grad_norm0.get_or_insert(grad_norm);
            if grad_norm <= self.tol * g0.max(f64::MIN_POSITIVE) {
                converged = true;
                break;
            }

            let direction = cholesky_solve(hessian, &-&grad).ok_or_else(|| {
                TrainError::training("Hessian is not positive definite; data may contain NaN")
            })?;
            let slope = grad.dot(&direction);

            let mut step = 1.0;
            loop {
                let candidate = &w + &(&direction * step);
                let candidate_margins = design.margins(&candidate);
                let candidate_loss = objective(&candidate, &candidate_margins, &signs, self.c);
                if candidate_loss <= loss + ARMIJO * step * slope || step < MIN_STEP {
                    w = candidate;
                    margins = candidate_margins;
                    loss = candidate_loss;
                    break;
                }
                step *= 0.5;
            }

            if !loss.is_finite() {
                return Err(TrainError::training("Objective diverged to a non-finite value"));
            }
        }

        if !converged {
            tracing::warn!(
                "Logistic regression did not converge in {} iterations; increase max_iter",
                self.max_iter
            );
        }
        tracing::debug!(
            "Logistic regression finished after {} iteration(s), objective {:.6}",
            iterations,
            loss
        );

        let intercept = if self.fit_intercept { w[n_features] } else { 0.0 };
        let coefficients = w.iter().take(n_features).copied().collect();

        Ok(LogisticModel {
            coefficients,
            intercept,
            feature_names: feature_names(n_features),
            n_iter: iterations,
            converged,
        })
    }
}

fn feature_names(n_features: usize) -> Vec<String> {
    if n_features == FEATURE_COLUMNS.len() {
        FEATURE_COLUMNS.iter().map(|s| s.to_string()).collect()
    } else {
        (0..n_features).map(|i| format!("x{}", i)).collect()
    }
}

/// Fitted binary classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    pub feature_names: Vec<String>,
    pub n_iter: usize,
    pub converged: bool,
}

impl LogisticModel {
    pub fn decision_function<R: AsRef<[f64]>>(&self, x: &[R]) -> Vec<f64> {
        x.iter()
            .map(|row| {
                let row = row.as_ref();
                self.coefficients
                    .iter()
                    .zip(row)
                    .map(|(w, x)| w * x)
                    .sum::<f64>()
                    + self.intercept
            })
            .collect()
    }

    /// Probability of the positive class for each row.
    pub fn predict_proba<R: AsRef<[f64]>>(&self, x: &[R]) -> Vec<f64> {
        self.decision_function(x).into_iter().map(sigmoid).collect()
    }

    pub fn predict<R: AsRef<[f64]>>(&self, x: &[R]) -> Vec<u8> {
        self.decision_function(x)
            .into_iter()
            .map(|z| u8::from(z > 0.0))
            .collect()
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }
}

struct Design {
    x: Array2<f64>,
}

impl Design {
    fn new<R: AsRef<[f64]>>(rows: &[R], fit_intercept: bool) -> Self {
        let n_features = rows.first().map(|r| r.as_ref().len()).unwrap_or(0);
        let dim = n_features + usize::from(fit_intercept);
        let mut x = Array2::zeros((rows.len(), dim));
        for (mut target, row) in x.rows_mut().into_iter().zip(rows) {
            for (cell, value) in target.iter_mut().zip(row.as_ref()) {
                *cell = *value;
            }
            if fit_intercept {
                target[n_features] = 1.0;
            }
        }
        Self { x }
    }

    fn dim(&self) -> usize {
        self.x.ncols()
    }

    fn margins(&self, w: &Array1<f64>) -> Array1<f64> {
        self.x.dot(w)
    }
}

fn objective(w: &Array1<f64>, margins: &Array1<f64>, signs: &Array1<f64>, c: f64) -> f64 {
    let penalty = 0.5 * w.dot(w);
    let data: f64 = margins
        .iter()
        .zip(signs)
        .map(|(z, y)| softplus(-y * z))
        .sum();
    penalty + c * data
}

/// Gradient and Hessian of the objective at `w`.
fn gradient_and_hessian(
    design: &Design,
    w: &Array1<f64>,
    margins: &Array1<f64>,
    signs: &Array1<f64>,
    c: f64,
) -> (Array1<f64>, Array2<f64>) {
    let p: Array1<f64> = Zip::from(margins)
        .and(signs)
        .map_collect(|z, y| sigmoid(y * z));
    let g_coef = Zip::from(&p)
        .and(signs)
        .map_collect(|p, y| c * (p - 1.0) * y);
    let h_coef = p.mapv(|p| c * p * (1.0 - p));

    let grad = w + &design.x.t().dot(&g_coef);
    let weighted = &design.x * &h_coef.insert_axis(Axis(1));
    let hessian = Array2::eye(design.dim()) + design.x.t().dot(&weighted);
    (grad, hessian)
}

/// Solve `A x = b` for symmetric positive definite `A` (consumed).
fn cholesky_solve(mut a: Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    // Lower factor overwrites the lower triangle of `a`.
    for j in 0..n {
        let mut diag = a[[j, j]];
        for k in 0..j {
            diag -= a[[j, k]] * a[[j, k]];
        }
        if diag <= 0.0 || !diag.is_finite() {
            return None;
        }
        let diag = diag.sqrt();
        a[[j, j]] = diag;
        for i in (j + 1)..n {
            let mut value = a[[i, j]];
            for k in 0..j {
                value -= a[[i, k]] * a[[j, k]];
            }
            a[[i, j]] = value / diag;
        }
    }

    let mut z = Array1::zeros(n);
    for i in 0..n {
        let mut value = b[i];
        for k in 0..i {
            value -= a[[i, k]] * z[k];
        }
        z[i] = value / a[[i, i]];
    }

    let mut x = Array1::zeros(n);
    for i in (0..n).rev() {
        let mut value = z[i];
        for k in (i + 1)..n {
            value -= a[[k, i]] * x[k];
        }
        x[i] = value / a[[i, i]];
    }
    Some(x)
}

pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// `log(1 + exp(t))` without overflow.
fn softplus(t: f64) -> f64 {
    if t > 0.0 {
        t + (-t).exp().ln_1p()
    } else {
        t.exp().ln_1p()
    }
}

fn norm(v: &Array1<f64>) -> f64 {
    v.dot(v).sqrt()
}

//! Multinomial logistic regression
//!
//! Minimizes `mean cross-entropy + penalty(W) / (C * n)` with an unpenalized intercept,
//! the same minimizer as `C * sum(loss) + penalty(W)`. The solver is accelerated proximal
//! gradient (FISTA) with a fixed step `1/L` and gradient-based momentum restart.

use crate::config::TrainerConfig;
use crate::error::{NliError, Result};
use crate::evaluation::accuracy;
use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// Half-width of the uniform interval used for the seeded weight initialization
const INIT_SCALE: f64 = 1e-3;
const POWER_ITERATIONS: usize = 200;
/// Safety factor on the estimated Lipschitz constant
const LIPSCHITZ_MARGIN: f64 = 1.1;

/// Norm used to penalize the weights
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Penalty {
    #[default]
    L2,
    L1,
    None,
}

impl Penalty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Penalty::L2 => "l2",
            Penalty::L1 => "l1",
            Penalty::None => "none",
        }
    }
}

impl fmt::Display for Penalty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Penalty {
    type Err = NliError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "l2" => Ok(Penalty::L2),
            "l1" => Ok(Penalty::L1),
            "none" => Ok(Penalty::None),
            other => Err(NliError::InvalidParameter {
                name: "penalty".to_string(),
                value: other.to_string(),
                reason: "expected one of l2, l1, none".to_string(),
            }),
        }
    }
}

/// Logistic regression hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// Inverse regularization strength (larger = weaker penalty)
    pub c: f64,
    pub penalty: Penalty,
    pub max_iter: usize,
    /// Convergence tolerance on the gradient mapping (infinity norm)
    pub tol: f64,
    /// Seed for the weight initialization
    pub random_state: u64,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl LogisticRegression {
    /// Create a new L2-penalized model with strength `c`
    pub fn new(c: f64) -> Self {
        let defaults = TrainerConfig::default();
        Self {
            c,
            penalty: Penalty::L2,
            max_iter: defaults.max_iter,
            tol: defaults.tol,
            random_state: defaults.random_state,
        }
    }

    /// Create a model from solver settings
    pub fn from_config(c: f64, penalty: Penalty, config: &TrainerConfig) -> Self {
        Self {
            c,
            penalty,
            max_iter: config.max_iter,
            tol: config.tol,
            random_state: config.random_state,
        }
    }

    /// Set regularization strength
    pub fn with_c(mut self, c: f64) -> Self {
        self.c = c;
        self
    }

    /// Set penalty type
    pub fn with_penalty(mut self, penalty: Penalty) -> Self {
        self.penalty = penalty;
        self
    }

    /// Set maximum iterations
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set convergence tolerance
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Set the initialization seed
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    fn validate(&self, x: &Array2<f64>, y: &[String]) -> Result<()> {
        if x.nrows() != y.len() {
            return Err(NliError::ShapeError {
                expected: format!("y length = {}", x.nrows()),
                actual: format!("y length = {}", y.len()),
            });
        }
        if y.is_empty() {
            return Err(NliError::TrainingError("Empty dataset".to_string()));
        }
        if !(self.c.is_finite() && self.c > 0.0) {
            return Err(NliError::InvalidParameter {
                name: "c".to_string(),
                value: self.c.to_string(),
                reason: "must be positive and finite".to_string(),
            });
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(NliError::DataError("features contain NaN or infinite values".to_string()));
        }
        Ok(())
    }

    /// Fit on a feature matrix and one label per row
    pub fn fit(&self, x: &Array2<f64>, y: &[String]) -> Result<LogisticModel> {
        self.validate(x, y)?;

        let classes: Vec<String> = y.iter().cloned().collect::<BTreeSet<_>>().into_iter().collect();
        if classes.len() < 2 {
            return Err(NliError::TrainingError(format!(
                "need at least two classes, found {}",
                classes.len()
            )));
        }

        let (n_samples, n_features) = x.dim();
        let n_classes = classes.len();
        let index: HashMap<&str, usize> = classes.iter().enumerate().map(|(i, c)| (c.as_str(), i)).collect();
        let mut targets = Array2::<f64>::zeros((n_samples, n_classes));
        for (row, label) in y.iter().enumerate() {
            targets[[row, index[label.as_str()]]] = 1.0;
        }

        let lambda = match self.penalty {
            Penalty::None => 0.0,
            Penalty::L2 | Penalty::L1 => 1.0 / (self.c * n_samples as f64),
        };
        let smooth_lambda = if self.penalty == Penalty::L2 { lambda } else { 0.0 };
        let lipschitz = 0.5 * gram_spectral_norm(x.view()) * LIPSCHITZ_MARGIN + smooth_lambda;
        let step = 1.0 / lipschitz;

        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);
        let mut w = Array2::from_shape_fn((n_features, n_classes), |_| rng.gen_range(-INIT_SCALE..INIT_SCALE));
        let mut b = Array1::<f64>::zeros(n_classes);
        let mut yw = w.clone();
        let mut yb = b.clone();
        let mut t = 1.0_f64;
        let mut converged = false;
        let mut n_iter = self.max_iter;

        for iter in 1..=self.max_iter {
            let (gw, gb) = gradient(x, &targets, &yw, &yb, smooth_lambda);

            let mut w_next = &yw - &(gw * step);
            let b_next = &yb - &(gb * step);
            if self.penalty == Penalty::L1 {
                let threshold = step * lambda;
                w_next.mapv_inplace(|v| soft_threshold(v, threshold));
            }

            let mapping_norm = (&yw - &w_next)
                .iter()
                .chain((&yb - &b_next).iter())
                .fold(0.0_f64, |acc, v| acc.max(v.abs()))
                / step;

            if mapping_norm < self.tol {
                w = w_next;
                b = b_next;
                converged = true;
                n_iter = iter;
                break;
            }

            // Restart momentum when the step points against the previous direction
            let alignment = ((&yw - &w_next) * (&w_next - &w)).sum() + ((&yb - &b_next) * (&b_next - &b)).sum();
            let (t_next, momentum) = if alignment > 0.0 {
                (1.0, 0.0)
            } else {
                let t_next = (1.0 + (1.0 + 4.0 * t * t).sqrt()) / 2.0;
                (t_next, (t - 1.0) / t_next)
            };

            yw = &w_next + &((&w_next - &w) * momentum);
            yb = &b_next + &((&b_next - &b) * momentum);
            w = w_next;
            b = b_next;
            t = t_next;
        }

        if converged {
            debug!(c = self.c, penalty = %self.penalty, n_iter, "Logistic regression converged");
        } else {
            warn!(
                c = self.c,
                penalty = %self.penalty,
                max_iter = self.max_iter,
                "Logistic regression did not converge, using last iterate"
            );
        }

        Ok(LogisticModel {
            classes,
            coefficients: w,
            intercept: b,
            c: self.c,
            penalty: self.penalty,
            n_iter,
            converged,
        })
    }
}

/// Fitted multinomial logistic regression; immutable after fit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticModel {
    /// Sorted class labels; column `k` of the coefficients scores `classes[k]`
    pub classes: Vec<String>,
    /// Weights, shape (n_features, n_classes)
    pub coefficients: Array2<f64>,
    pub intercept: Array1<f64>,
    pub c: f64,
    pub penalty: Penalty,
    /// Solver iterations used
    pub n_iter: usize,
    pub converged: bool,
}

impl LogisticModel {
    pub fn n_features(&self) -> usize {
        self.coefficients.nrows()
    }

    fn check_features(&self, x: &Array2<f64>) -> Result<()> {
        if x.ncols() != self.n_features() {
            return Err(NliError::ShapeError {
                expected: format!("{} features", self.n_features()),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(())
    }

    /// Per-class linear scores, shape (n_samples, n_classes)
    pub fn decision_function(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.check_features(x)?;
        Ok(x.dot(&self.coefficients) + &self.intercept)
    }

    /// Class probabilities, rows sum to one
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let mut scores = self.decision_function(x)?;
        softmax_rows(&mut scores);
        Ok(scores)
    }

    /// Most probable class per row; ties resolve to the lowest class index
    pub fn predict(&self, x: &Array2<f64>) -> Result<Vec<String>> {
        let scores = self.decision_function(x)?;
        Ok(scores
            .rows()
            .into_iter()
            .map(|row| {
                let best = row
                    .iter()
                    .enumerate()
                    .fold((0, f64::NEG_INFINITY), |(bi, bv), (i, &v)| if v > bv { (i, v) } else { (bi, bv) })
                    .0;
                self.classes[best].clone()
            })
            .collect())
    }

    /// Accuracy of the predictions on `x`
    pub fn score(&self, x: &Array2<f64>, y: &[String]) -> Result<f64> {
        let y_pred = self.predict(x)?;
        accuracy(y, &y_pred)
    }
}

fn soft_threshold(val: f64, threshold: f64) -> f64 {
    if val > threshold {
        val - threshold
    } else if val < -threshold {
        val + threshold
    } else {
        0.0
    }
}

fn softmax_rows(scores: &mut Array2<f64>) {
    for mut row in scores.rows_mut() {
        let max = row.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
        row.mapv_inplace(|v| (v - max).exp());
        let sum = row.sum();
        row /= sum;
    }
}

/// Gradient of the smooth part: mean cross-entropy plus the optional L2 term
fn gradient(
    x: &Array2<f64>,
    targets: &Array2<f64>,
    w: &Array2<f64>,
    b: &Array1<f64>,
    l2: f64,
) -> (Array2<f64>, Array1<f64>) {
    let n = x.nrows() as f64;
    let mut residual = x.dot(w) + b;
    softmax_rows(&mut residual);
    residual -= targets;

    let mut gw = x.t().dot(&residual) / n;
    if l2 > 0.0 {
        gw.scaled_add(l2, w);
    }
    let gb = residual.sum_axis(Axis(0)) / n;
    (gw, gb)
}

/// Largest eigenvalue of `[X 1]^T [X 1] / n` by power iteration
fn gram_spectral_norm(x: ArrayView2<f64>) -> f64 {
    let n = x.nrows() as f64;
    let mut v = Array1::<f64>::ones(x.ncols());
    let mut v_bias = 1.0;
    let mut estimate = 0.0;

    for _ in 0..POWER_ITERATIONS {
        let xv = x.dot(&v) + v_bias;
        let next = x.t().dot(&xv) / n;
        let next_bias = xv.sum() / n;

        let norm = (next.dot(&next) + next_bias * next_bias).sqrt();
        if norm == 0.0 {
            break;
        }
        let previous = estimate;
        estimate = norm / (v.dot(&v) + v_bias * v_bias).sqrt();
        v = next / norm;
        v_bias = next_bias / norm;

        if (estimate - previous).abs() <= 1e-9 * estimate {
            break;
        }
    }
    estimate.max(1e-12)
}

//! Linear classifier trained by stochastic gradient descent on the log loss.
//!
//! smartcore ships logistic regression with batch solvers only, so this
//! module provides the per-sample variant and plugs it into smartcore's
//! [`SupervisedEstimator`] / [`Predictor`] seams. That lets it go through
//! `cross_validate` exactly like the built-in estimators.
//!
//! Each epoch visits every sample once, in shuffled order:
//!
//! ```text
//! p   = w·x + b
//! w  *= max(0, 1 - eta * alpha)       (L2 penalty)
//! w  -= eta * dloss(p, y) * x
//! b  -= eta * dloss(p, y)
//! ```
//!
//! with `y` in {-1, +1}.

use log::{debug, trace};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use smartcore::api::{Predictor, SupervisedEstimator};
use smartcore::error::Failed;
use smartcore::linalg::basic::arrays::Array;
use smartcore::linalg::basic::matrix::DenseMatrix;

/// Gradients are clipped to this magnitude.
const MAX_DLOSS: f64 = 1e12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Penalty {
    None,
    L2,
}

/// Step size schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LearningRate {
    /// `eta = eta0`
    Constant,
    /// `eta = 1 / (alpha * (t0 + t - 1))`, `t0` picked by Bottou's heuristic.
    Optimal,
    /// `eta = eta0 / t^power_t`
    InvScaling,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SGDClassifierParameters {
    /// Regularization strength, also scales the `Optimal` schedule.
    pub alpha: f64,
    pub penalty: Penalty,
    pub learning_rate: LearningRate,
    pub eta0: f64,
    pub power_t: f64,
    /// Maximum number of epochs.
    pub max_iter: usize,
    /// Stop once the epoch loss stops improving by `tol * n_samples`.
    /// `None` always runs `max_iter` epochs.
    pub tol: Option<f64>,
    pub n_iter_no_change: usize,
    pub fit_intercept: bool,
    pub shuffle: bool,
    pub seed: Option<u64>,
}

impl Default for SGDClassifierParameters {
    fn default() -> Self {
        SGDClassifierParameters {
            alpha: 1e-4,
            penalty: Penalty::L2,
            learning_rate: LearningRate::Optimal,
            eta0: 0.01,
            power_t: 0.5,
            max_iter: 1000,
            tol: Some(1e-3),
            n_iter_no_change: 5,
            fit_intercept: true,
            shuffle: true,
            seed: Some(42),
        }
    }
}

impl SGDClassifierParameters {
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_penalty(mut self, penalty: Penalty) -> Self {
        self.penalty = penalty;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: LearningRate) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_eta0(mut self, eta0: f64) -> Self {
        self.eta0 = eta0;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_tol(mut self, tol: Option<f64>) -> Self {
        self.tol = tol;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    fn validate(&self) -> Result<(), Failed> {
        if self.max_iter == 0 {
            return Err(Failed::fit("max_iter must be at least 1"));
        }
        if self.alpha < 0.0 {
            return Err(Failed::fit("alpha must be non-negative"));
        }
        match self.learning_rate {
            LearningRate::Optimal if self.alpha <= 0.0 => Err(Failed::fit(
                "alpha must be positive with the optimal learning rate",
            )),
            LearningRate::Constant | LearningRate::InvScaling if self.eta0 <= 0.0 => {
                Err(Failed::fit("eta0 must be positive"))
            }
            _ => Ok(()),
        }
    }
}

/// Binary linear classifier fitted with per-sample log-loss updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SGDClassifier {
    coefficients: Vec<f64>,
    intercept: f64,
    /// Sorted labels; the second one is the positive class.
    classes: Vec<i32>,
    n_iter: usize,
}

/// Log loss of decision `p` for target `y` in {-1, +1}.
pub fn log_loss(p: f64, y: f64) -> f64 {
    let z = p * y;
    if z > 18.0 {
        (-z).exp()
    } else if z < -18.0 {
        -z
    } else {
        (-z).exp().ln_1p()
    }
}

/// Derivative of [`log_loss`] with respect to `p`.
pub fn log_dloss(p: f64, y: f64) -> f64 {
    let z = p * y;
    if z > 18.0 {
        (-z).exp() * -y
    } else if z < -18.0 {
        -y
    } else {
        -y / (z.exp() + 1.0)
    }
}

fn sigmoid(p: f64) -> f64 {
    if p >= 0.0 {
        1.0 / (1.0 + (-p).exp())
    } else {
        let e = p.exp();
        e / (1.0 + e)
    }
}

fn dot(w: &[f64], x: &[f64]) -> f64 {
    w.iter().zip(x).map(|(a, b)| a * b).sum()
}

fn row_major(x: &DenseMatrix<f64>) -> (usize, usize, Vec<f64>) {
    let (nrows, ncols) = x.shape();
    let mut values = Vec::with_capacity(nrows * ncols);
    for i in 0..nrows {
        for j in 0..ncols {
            values.push(*x.get((i, j)));
        }
    }
    (nrows, ncols, values)
}

/// Offset of the `Optimal` schedule so that the first step has the size of
/// a typical weight.
fn optimal_init(alpha: f64) -> f64 {
    let typw = (1.0 / alpha.sqrt()).sqrt();
    let initial_eta0 = typw / log_dloss(-typw, 1.0).max(1.0);
    1.0 / (initial_eta0 * alpha)
}

impl SGDClassifier {
    pub fn fit(
        x: &DenseMatrix<f64>,
        y: &Vec<i32>,
        parameters: SGDClassifierParameters,
    ) -> Result<SGDClassifier, Failed> {
        parameters.validate()?;

        let (n, d, rows) = row_major(x);
        if n == 0 {
            return Err(Failed::fit("cannot fit on an empty matrix"));
        }
        if y.len() != n {
            return Err(Failed::fit(&format!(
                "matrix has {} rows but {} labels were given",
                n,
                y.len()
            )));
        }

        let mut classes = y.clone();
        classes.sort_unstable();
        classes.dedup();
        if classes.len() != 2 {
            return Err(Failed::fit(&format!(
                "expected exactly two classes, found {}",
                classes.len()
            )));
        }
        let targets: Vec<f64> = y
            .iter()
            .map(|&label| if label == classes[1] { 1.0 } else { -1.0 })
            .collect();

        let mut rng = match parameters.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let t0 = match parameters.learning_rate {
            LearningRate::Optimal => optimal_init(parameters.alpha),
            _ => 0.0,
        };

        let mut w = vec![0.0f64; d];
        let mut b: f64 = 0.0;
        let mut order: Vec<usize> = (0..n).collect();
        let mut t: f64 = 1.0;
        let mut best_loss = f64::INFINITY;
        let mut no_improvement = 0;
        let mut n_iter = 0;

        for epoch in 0..parameters.max_iter {
            if parameters.shuffle {
                order.shuffle(&mut rng);
            }

            let mut sumloss: f64 = 0.0;
            for &i in &order {
                let row = &rows[i * d..(i + 1) * d];
                let p = dot(&w, row) + b;
                sumloss += log_loss(p, targets[i]);

                let eta = match parameters.learning_rate {
                    LearningRate::Constant => parameters.eta0,
                    LearningRate::Optimal => 1.0 / (parameters.alpha * (t0 + t - 1.0)),
                    LearningRate::InvScaling => parameters.eta0 / t.powf(parameters.power_t),
                };
                let dloss = log_dloss(p, targets[i]).clamp(-MAX_DLOSS, MAX_DLOSS);

                if parameters.penalty == Penalty::L2 {
                    let decay = (1.0 - eta * parameters.alpha).max(0.0);
                    w.iter_mut().for_each(|wj| *wj *= decay);
                }
                for (wj, xj) in w.iter_mut().zip(row) {
                    *wj -= eta * dloss * xj;
                }
                if parameters.fit_intercept {
                    b -= eta * dloss;
                }
                t += 1.0;
            }

            n_iter = epoch + 1;
            trace!("epoch {} avg loss {:.6}", n_iter, sumloss / n as f64);

            if !w.iter().all(|wj| wj.is_finite()) || !b.is_finite() {
                return Err(Failed::fit(
                    "weights diverged, try a smaller learning rate or scaled features",
                ));
            }

            if let Some(tol) = parameters.tol {
                if sumloss > best_loss - tol * n as f64 {
                    no_improvement += 1;
                } else {
                    no_improvement = 0;
                }
                if sumloss < best_loss {
                    best_loss = sumloss;
                }
                if no_improvement >= parameters.n_iter_no_change {
                    debug!("converged after {} epochs", n_iter);
                    break;
                }
            }
        }

        if n_iter == parameters.max_iter && parameters.tol.is_some() {
            debug!("max_iter {} reached before convergence", n_iter);
        }

        Ok(SGDClassifier {
            coefficients: w,
            intercept: b,
            classes,
            n_iter,
        })
    }

    /// Signed distance to the separating hyperplane, one value per row.
    pub fn decision_function(&self, x: &DenseMatrix<f64>) -> Result<Vec<f64>, Failed> {
        if self.classes.len() != 2 {
            return Err(Failed::predict("classifier is not fitted"));
        }
        let (n, d, rows) = row_major(x);
        if d != self.coefficients.len() {
            return Err(Failed::predict(&format!(
                "expected {} features, got {}",
                self.coefficients.len(),
                d
            )));
        }
        Ok((0..n)
            .map(|i| dot(&self.coefficients, &rows[i * d..(i + 1) * d]) + self.intercept)
            .collect())
    }

    /// Probability of the positive class for every row.
    pub fn predict_proba(&self, x: &DenseMatrix<f64>) -> Result<Vec<f64>, Failed> {
        Ok(self.decision_function(x)?.into_iter().map(sigmoid).collect())
    }

    pub fn predict(&self, x: &DenseMatrix<f64>) -> Result<Vec<i32>, Failed> {
        Ok(self
            .decision_function(x)?
            .into_iter()
            .map(|p| if p > 0.0 { self.classes[1] } else { self.classes[0] })
            .collect())
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn classes(&self) -> &[i32] {
        &self.classes
    }

    /// Epochs run by the last fit.
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }
}

impl SupervisedEstimator<DenseMatrix<f64>, Vec<i32>, SGDClassifierParameters> for SGDClassifier {
    fn new() -> Self {
        SGDClassifier {
            coefficients: Vec::new(),
            intercept: 0.0,
            classes: Vec::new(),
            n_iter: 0,
        }
    }

    fn fit(
        x: &DenseMatrix<f64>,
        y: &Vec<i32>,
        parameters: SGDClassifierParameters,
    ) -> Result<Self, Failed> {
        SGDClassifier::fit(x, y, parameters)
    }
}

impl Predictor<DenseMatrix<f64>, Vec<i32>> for SGDClassifier {
    fn predict(&self, x: &DenseMatrix<f64>) -> Result<Vec<i32>, Failed> {
        self.predict(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable() -> (DenseMatrix<f64>, Vec<i32>) {
        let x = DenseMatrix::from_2d_array(&[
            &[-3.0, 0.5],
            &[-2.5, -0.5],
            &[-2.0, 0.2],
            &[-1.5, -0.1],
            &[-2.2, 0.0],
            &[1.5, 0.1],
            &[2.0, -0.2],
            &[2.5, 0.5],
            &[3.0, -0.5],
            &[2.2, 0.0],
        ]);
        let y = vec![0, 0, 0, 0, 0, 1, 1, 1, 1, 1];
        (x, y)
    }

    #[test]
    fn separates_linearly_separable_data() {
        let (x, y) = separable();
        let model = SGDClassifier::fit(&x, &y, Default::default()).unwrap();

        assert_eq!(model.predict(&x).unwrap(), y);
        assert!(model.coefficients()[0] > 0.0);
        assert_eq!(model.classes(), &[0, 1]);
    }

    #[test]
    fn constant_schedule_also_converges() {
        let (x, y) = separable();
        let params = SGDClassifierParameters::default()
            .with_learning_rate(LearningRate::Constant)
            .with_eta0(0.1);
        let model = SGDClassifier::fit(&x, &y, params).unwrap();

        assert_eq!(model.predict(&x).unwrap(), y);
    }

    #[test]
    fn early_stopping_ends_before_max_iter() {
        let (x, y) = separable();
        let model = SGDClassifier::fit(&x, &y, Default::default()).unwrap();

        assert!(model.n_iter() >= 1);
        assert!(model.n_iter() < 1000);
    }

    #[test]
    fn without_tolerance_every_epoch_runs() {
        let (x, y) = separable();
        let params = SGDClassifierParameters::default()
            .with_tol(None)
            .with_max_iter(7);
        let model = SGDClassifier::fit(&x, &y, params).unwrap();

        assert_eq!(model.n_iter(), 7);
    }

    #[test]
    fn same_seed_gives_same_model() {
        let (x, y) = separable();
        let a = SGDClassifier::fit(&x, &y, Default::default()).unwrap();
        let b = SGDClassifier::fit(&x, &y, Default::default()).unwrap();

        assert_eq!(a.coefficients(), b.coefficients());
        assert_eq!(a.intercept(), b.intercept());
    }

    #[test]
    fn probabilities_follow_the_decision() {
        let (x, y) = separable();
        let model = SGDClassifier::fit(&x, &y, Default::default()).unwrap();

        let proba = model.predict_proba(&x).unwrap();
        let labels = model.predict(&x).unwrap();
        for (p, label) in proba.iter().zip(labels) {
            assert!((0.0..=1.0).contains(p));
            assert_eq!(*p > 0.5, label == 1);
        }
    }

    #[test]
    fn labels_other_than_zero_one_are_kept() {
        let (x, y) = separable();
        let y: Vec<i32> = y.iter().map(|&v| if v == 1 { 7 } else { -3 }).collect();
        let model = SGDClassifier::fit(&x, &y, Default::default()).unwrap();

        assert_eq!(model.predict(&x).unwrap(), y);
    }

    #[test]
    fn single_class_is_rejected() {
        let (x, _) = separable();
        let y = vec![1; 10];
        assert!(SGDClassifier::fit(&x, &y, Default::default()).is_err());
    }

    #[test]
    fn label_count_must_match_rows() {
        let (x, _) = separable();
        assert!(SGDClassifier::fit(&x, &vec![0, 1], Default::default()).is_err());
    }

    #[test]
    fn optimal_schedule_needs_positive_alpha() {
        let (x, y) = separable();
        let params = SGDClassifierParameters::default().with_alpha(0.0);
        assert!(SGDClassifier::fit(&x, &y, params).is_err());
    }

    #[test]
    fn unfitted_model_refuses_to_predict() {
        let (x, _) = separable();
        let model = <SGDClassifier as SupervisedEstimator<DenseMatrix<f64>, Vec<i32>, SGDClassifierParameters>>::new();
        assert!(model.predict(&x).is_err());
    }

    #[test]
    fn feature_count_mismatch_is_rejected() {
        let (x, y) = separable();
        let model = SGDClassifier::fit(&x, &y, Default::default()).unwrap();
        let wide = DenseMatrix::from_2d_array(&[&[1.0, 2.0, 3.0]]);
        assert!(model.predict(&wide).is_err());
    }

    #[test]
    fn loss_is_stable_at_extremes() {
        assert!((log_loss(0.0, 1.0) - std::f64::consts::LN_2).abs() < 1e-12);
        assert!(log_loss(100.0, 1.0) < 1e-40);
        assert_eq!(log_loss(-100.0, 1.0), 100.0);
        assert_eq!(log_dloss(-100.0, 1.0), -1.0);
        assert!((log_dloss(0.0, -1.0) - 0.5).abs() < 1e-12);
        assert!(sigmoid(-1000.0) >= 0.0);
        assert!(sigmoid(1000.0) <= 1.0);
    }
}

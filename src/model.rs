use std::fmt;

use log::info;
use serde::Serialize;
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::linear::logistic_regression::{LogisticRegression, LogisticRegressionParameters};

use crate::error::Result;
use crate::sgd::{SGDClassifier, SGDClassifierParameters};

/// smartcore's batch logistic regression over the crate's matrix and label
/// types.
pub type Logistic = LogisticRegression<f64, i32, DenseMatrix<f64>, Vec<i32>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Linear classifier trained with SGD on the log loss.
    Sgd,
    /// Logistic regression solved with L-BFGS.
    Logistic,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::Sgd => write!(f, "sgd"),
            ModelKind::Logistic => write!(f, "logistic"),
        }
    }
}

/// Hyperparameters for both classifiers. Logistic regression carries an L2
/// penalty of 1.0 by default so separable folds still converge.
#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub sgd: SGDClassifierParameters,
    pub logistic: LogisticRegressionParameters<f64>,
}

impl Default for ModelSettings {
    fn default() -> Self {
        ModelSettings {
            sgd: SGDClassifierParameters::default(),
            logistic: LogisticRegressionParameters::default().with_alpha(1.0),
        }
    }
}

pub enum FittedModel {
    Sgd(SGDClassifier),
    Logistic(Logistic),
}

impl FittedModel {
    pub fn kind(&self) -> ModelKind {
        match self {
            FittedModel::Sgd(_) => ModelKind::Sgd,
            FittedModel::Logistic(_) => ModelKind::Logistic,
        }
    }

    pub fn predict(&self, x: &DenseMatrix<f64>) -> Result<Vec<i32>> {
        let predictions = match self {
            FittedModel::Sgd(model) => model.predict(x)?,
            FittedModel::Logistic(model) => model.predict(x)?,
        };
        Ok(predictions)
    }

    /// Positive-class probabilities, where the model exposes them.
    pub fn probabilities(&self, x: &DenseMatrix<f64>) -> Result<Option<Vec<f64>>> {
        match self {
            FittedModel::Sgd(model) => Ok(Some(model.predict_proba(x)?)),
            FittedModel::Logistic(_) => Ok(None),
        }
    }
}

/// Hands the training arrays to the selected classifier and runs its
/// training routine.
pub fn fit_model(
    kind: ModelKind,
    settings: &ModelSettings,
    x: &DenseMatrix<f64>,
    y: &Vec<i32>,
) -> Result<FittedModel> {
    let model = match kind {
        ModelKind::Sgd => {
            let model = SGDClassifier::fit(x, y, settings.sgd.clone())?;
            info!("sgd fitted in {} epochs", model.n_iter());
            FittedModel::Sgd(model)
        }
        ModelKind::Logistic => {
            let model = Logistic::fit(x, y, settings.logistic.clone())?;
            info!("logistic regression fitted");
            FittedModel::Logistic(model)
        }
    };
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blobs() -> (DenseMatrix<f64>, Vec<i32>) {
        let x = DenseMatrix::from_2d_array(&[
            &[0.0, 0.2],
            &[0.3, 0.1],
            &[0.1, 0.4],
            &[0.5, 0.3],
            &[4.0, 4.2],
            &[4.3, 3.9],
            &[3.8, 4.4],
            &[4.6, 4.1],
        ]);
        (x, vec![0, 0, 0, 0, 1, 1, 1, 1])
    }

    #[test]
    fn both_models_fit_and_predict() {
        let (x, y) = blobs();
        let settings = ModelSettings::default();

        for kind in [ModelKind::Sgd, ModelKind::Logistic] {
            let model = fit_model(kind, &settings, &x, &y).unwrap();
            assert_eq!(model.kind(), kind);
            assert_eq!(model.predict(&x).unwrap(), y, "{kind}");
        }
    }

    #[test]
    fn only_sgd_reports_probabilities() {
        let (x, y) = blobs();
        let settings = ModelSettings::default();

        let sgd = fit_model(ModelKind::Sgd, &settings, &x, &y).unwrap();
        assert_eq!(sgd.probabilities(&x).unwrap().map(|p| p.len()), Some(8));

        let logistic = fit_model(ModelKind::Logistic, &settings, &x, &y).unwrap();
        assert!(logistic.probabilities(&x).unwrap().is_none());
    }

    #[test]
    fn kind_names() {
        assert_eq!(ModelKind::Sgd.to_string(), "sgd");
        assert_eq!(ModelKind::Logistic.to_string(), "logistic");
    }
}

use log::info;
use serde::Serialize;
use smartcore::api::SupervisedEstimator;
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::metrics::accuracy;
use smartcore::model_selection::{cross_validate, KFold};

use crate::error::{HeartAppError, Result};
use crate::model::{Logistic, ModelKind, ModelSettings};
use crate::sgd::SGDClassifier;

/// Binary confusion counts, positive class is label 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ConfusionMatrix {
    pub true_positives: usize,
    pub true_negatives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
}

impl ConfusionMatrix {
    pub fn from_labels(y_true: &[i32], y_pred: &[i32]) -> Self {
        let mut matrix = ConfusionMatrix::default();
        for (&truth, &pred) in y_true.iter().zip(y_pred) {
            match (truth == 1, pred == 1) {
                (true, true) => matrix.true_positives += 1,
                (false, false) => matrix.true_negatives += 1,
                (false, true) => matrix.false_positives += 1,
                (true, false) => matrix.false_negatives += 1,
            }
        }
        matrix
    }

    pub fn total(&self) -> usize {
        self.true_positives + self.true_negatives + self.false_positives + self.false_negatives
    }

    /// 0 when nothing was predicted positive.
    pub fn precision(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_positives)
    }

    /// 0 when there are no positive rows.
    pub fn recall(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_negatives)
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelScore {
    pub model: ModelKind,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub confusion: ConfusionMatrix,
}

#[derive(Debug, Clone, Serialize)]
pub struct CrossValidationSummary {
    pub model: ModelKind,
    pub folds: usize,
    pub mean_train_accuracy: f64,
    pub mean_test_accuracy: f64,
}

/// Fraction of predictions equal to the true label.
pub fn accuracy_score(y_true: &Vec<i32>, y_pred: &Vec<i32>) -> Result<f64> {
    if y_true.is_empty() {
        return Err(HeartAppError::EmptyDataset);
    }
    if y_true.len() != y_pred.len() {
        return Err(HeartAppError::InvalidSplit {
            reason: format!(
                "{} labels but {} predictions",
                y_true.len(),
                y_pred.len()
            ),
        });
    }
    Ok(accuracy(y_true, y_pred))
}

pub fn score_model(model: ModelKind, y_true: &Vec<i32>, y_pred: &Vec<i32>) -> Result<ModelScore> {
    let accuracy = accuracy_score(y_true, y_pred)?;
    let confusion = ConfusionMatrix::from_labels(y_true, y_pred);
    Ok(ModelScore {
        model,
        accuracy,
        precision: confusion.precision(),
        recall: confusion.recall(),
        confusion,
    })
}

/// k-fold cross validation of one classifier on the given rows.
pub fn cross_validate_model(
    kind: ModelKind,
    settings: &ModelSettings,
    x: &DenseMatrix<f64>,
    y: &Vec<i32>,
    folds: usize,
    seed: u64,
) -> Result<CrossValidationSummary> {
    if folds < 2 || folds > y.len() {
        return Err(HeartAppError::InvalidSplit {
            reason: format!("{} folds for {} rows", folds, y.len()),
        });
    }

    let cv = KFold::default()
        .with_n_splits(folds)
        .with_seed(Some(seed));

    let results = match kind {
        ModelKind::Sgd => cross_validate(
            SGDClassifier::new(),
            x,
            y,
            settings.sgd.clone(),
            &cv,
            &accuracy,
        )?,
        ModelKind::Logistic => cross_validate(
            Logistic::new(),
            x,
            y,
            settings.logistic.clone(),
            &cv,
            &accuracy,
        )?,
    };

    let summary = CrossValidationSummary {
        model: kind,
        folds,
        mean_train_accuracy: results.mean_train_score(),
        mean_test_accuracy: results.mean_test_score(),
    };
    info!(
        "{} cross validation ({} folds): train {:.4}, test {:.4}",
        kind, folds, summary.mean_train_accuracy, summary.mean_test_accuracy
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accuracy_is_fraction_of_matches() {
        let y_true = vec![1, 0, 1, 1, 0];
        let y_pred = vec![1, 0, 0, 1, 1];
        assert!((accuracy_score(&y_true, &y_pred).unwrap() - 0.6).abs() < 1e-12);
    }

    #[test]
    fn accuracy_rejects_mismatched_lengths() {
        assert!(accuracy_score(&vec![1, 0], &vec![1]).is_err());
        assert!(accuracy_score(&vec![], &vec![]).is_err());
    }

    #[test]
    fn confusion_counts_every_row_once() {
        let y_true = vec![1, 0, 1, 1, 0, 0];
        let y_pred = vec![1, 0, 0, 1, 1, 0];
        let matrix = ConfusionMatrix::from_labels(&y_true, &y_pred);

        assert_eq!(matrix.true_positives, 2);
        assert_eq!(matrix.true_negatives, 2);
        assert_eq!(matrix.false_positives, 1);
        assert_eq!(matrix.false_negatives, 1);
        assert_eq!(matrix.total(), 6);
        assert!((matrix.precision() - 2.0 / 3.0).abs() < 1e-12);
        assert!((matrix.recall() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn precision_without_positive_predictions_is_zero() {
        let matrix = ConfusionMatrix::from_labels(&[1, 0], &[0, 0]);
        assert_eq!(matrix.precision(), 0.0);
        assert_eq!(matrix.recall(), 0.0);
    }

    #[test]
    fn score_matches_accuracy() {
        let score = score_model(ModelKind::Sgd, &vec![1, 1, 0, 0], &vec![1, 0, 0, 0]).unwrap();
        assert_eq!(score.accuracy, 0.75);
        assert_eq!(score.confusion.false_negatives, 1);
        assert_eq!(score.recall, 0.5);
    }

    fn interleaved(n: usize) -> (DenseMatrix<f64>, Vec<i32>) {
        let rows: Vec<Vec<f64>> = (0..n)
            .map(|i| {
                let offset = if i % 2 == 0 { -2.0 } else { 2.0 };
                vec![offset + (i % 5) as f64 * 0.1, (i % 3) as f64 * 0.1]
            })
            .collect();
        let y = (0..n).map(|i| (i % 2) as i32).collect();
        (DenseMatrix::from_2d_vec(&rows), y)
    }

    #[test]
    fn cross_validation_scores_both_models() {
        let (x, y) = interleaved(30);
        let settings = ModelSettings::default();

        for kind in [ModelKind::Sgd, ModelKind::Logistic] {
            let summary = cross_validate_model(kind, &settings, &x, &y, 3, 42).unwrap();
            assert_eq!(summary.folds, 3);
            assert!((0.0..=1.0).contains(&summary.mean_test_accuracy));
            assert!(summary.mean_train_accuracy > 0.9, "{kind}");
        }
    }

    #[test]
    fn single_fold_is_rejected() {
        let (x, y) = interleaved(10);
        assert!(matches!(
            cross_validate_model(ModelKind::Sgd, &ModelSettings::default(), &x, &y, 1, 0),
            Err(HeartAppError::InvalidSplit { .. })
        ));
    }
}

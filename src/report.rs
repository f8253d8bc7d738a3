use std::path::Path;

use log::info;
use serde::Serialize;

use crate::error::Result;
use crate::evaluate::{CrossValidationSummary, ModelScore};

#[derive(Debug, Clone, Serialize)]
pub struct DatasetSummary {
    pub rows: usize,
    pub features: Vec<String>,
    pub train_rows: usize,
    pub test_rows: usize,
    /// Rows labelled with CHD.
    pub positives: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub dataset: DatasetSummary,
    pub scores: Vec<ModelScore>,
    pub cross_validation: Vec<CrossValidationSummary>,
    pub plots: Vec<String>,
    pub elapsed_ms: u64,
    /// Growth of resident memory over the run.
    pub memory_bytes: u64,
    /// Resident memory when the run finished.
    pub resident_bytes: u64,
}

impl RunReport {
    /// Console lines, one per fitted model.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "{} rows, {} features, {} train / {} test",
            self.dataset.rows,
            self.dataset.features.len(),
            self.dataset.train_rows,
            self.dataset.test_rows
        )];
        for score in &self.scores {
            lines.push(format!("{} accuracy: {:.4}", score.model, score.accuracy));
        }
        for cv in &self.cross_validation {
            lines.push(format!(
                "{} {}-fold accuracy: train {:.4}, test {:.4}",
                cv.model, cv.folds, cv.mean_train_accuracy, cv.mean_test_accuracy
            ));
        }
        lines
    }

    pub async fn write_json(&self, path: &Path) -> Result<()> {
        let body = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, body).await?;
        info!("report written to {}", path.display());
        Ok(())
    }
}

/// Test-set labels next to each model's predictions.
#[derive(Debug, Clone, Default)]
pub struct TestPredictions {
    pub labels: Vec<i32>,
    pub sgd: Option<Vec<i32>>,
    pub logistic: Option<Vec<i32>>,
    pub sgd_probability: Option<Vec<f64>>,
}

#[derive(Debug, Serialize)]
struct PredictionRow {
    test_row: usize,
    chd: i32,
    sgd: Option<i32>,
    logistic: Option<i32>,
    sgd_probability: Option<f64>,
}

impl TestPredictions {
    fn rows(&self) -> impl Iterator<Item = PredictionRow> + '_ {
        let pick = |values: &Option<Vec<i32>>, i: usize| {
            values.as_ref().and_then(|v| v.get(i).copied())
        };
        self.labels.iter().enumerate().map(move |(i, &chd)| PredictionRow {
            test_row: i,
            chd,
            sgd: pick(&self.sgd, i),
            logistic: pick(&self.logistic, i),
            sgd_probability: self
                .sgd_probability
                .as_ref()
                .and_then(|v| v.get(i).copied()),
        })
    }

    /// Writes one CSV row per test sample. Models that were not run leave
    /// their column empty.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        for row in self.rows() {
            writer.serialize(row)?;
        }
        writer.flush()?;
        info!("{} predictions written to {}", self.labels.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluate::{ConfusionMatrix, ModelScore};
    use crate::model::ModelKind;

    fn report() -> RunReport {
        RunReport {
            dataset: DatasetSummary {
                rows: 10,
                features: vec!["sbp".into(), "famhist_Present".into()],
                train_rows: 8,
                test_rows: 2,
                positives: 4,
            },
            scores: vec![ModelScore {
                model: ModelKind::Logistic,
                accuracy: 0.5,
                precision: 1.0,
                recall: 0.5,
                confusion: ConfusionMatrix {
                    true_positives: 1,
                    true_negatives: 0,
                    false_positives: 0,
                    false_negatives: 1,
                },
            }],
            cross_validation: Vec::new(),
            plots: Vec::new(),
            elapsed_ms: 3,
            memory_bytes: 0,
            resident_bytes: 0,
        }
    }

    #[test]
    fn summary_names_each_model() {
        let lines = report().summary_lines();
        assert_eq!(lines[0], "10 rows, 2 features, 8 train / 2 test");
        assert_eq!(lines[1], "logistic accuracy: 0.5000");
    }

    #[tokio::test]
    async fn json_report_is_readable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        report().write_json(&path).await.unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["dataset"]["rows"], 10);
        assert_eq!(value["scores"][0]["model"], "logistic");
        assert_eq!(value["scores"][0]["confusion"]["false_negatives"], 1);
    }

    #[test]
    fn predictions_leave_missing_models_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("predictions.csv");
        let predictions = TestPredictions {
            labels: vec![1, 0],
            sgd: Some(vec![1, 1]),
            logistic: None,
            sgd_probability: Some(vec![0.9, 0.75]),
        };
        predictions.write_csv(&path).unwrap();

        let body = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines[0], "test_row,chd,sgd,logistic,sgd_probability");
        assert_eq!(lines[1], "0,1,1,,0.9");
        assert_eq!(lines[2], "1,0,1,,0.75");
    }
}

use std::time::Instant;

use log::{debug, info};
use polars::frame::DataFrame;
use smartcore::linalg::basic::matrix::DenseMatrix;
use sysinfo::{ProcessExt, System, SystemExt};

use crate::cli::PipelineConfig;
use crate::encode::{min_max_scale, one_hot_encode};
use crate::error::Result;
use crate::evaluate::{cross_validate_model, score_model, ModelScore};
use crate::io::{load_dataset, write_parquet};
use crate::model::{fit_model, ModelKind};
use crate::plot::plot_all_features;
use crate::records::{
    HeartRecord, CATEGORICAL_COLUMN, FAMHIST_CATEGORIES, NUMERIC_COLUMNS, TARGET_COLUMN,
};
use crate::report::{DatasetSummary, RunReport, TestPredictions};
use crate::split::{
    feature_and_target, features_to_matrix, split_train_test, target_to_labels, TrainTestSplit,
};

/// Resident memory of this process in bytes, 0 when it cannot be read.
pub fn monitor_memory() -> u64 {
    let pid = match sysinfo::get_current_pid() {
        Ok(pid) => pid,
        Err(_) => return 0,
    };
    let mut system = System::new();
    system.refresh_process(pid);
    system.process(pid).map(|p| p.memory()).unwrap_or(0)
}

/// Encoded frame plus the matrix and labels derived from it.
pub struct PreparedDataset {
    pub frame: DataFrame,
    pub feature_names: Vec<String>,
    pub x: DenseMatrix<f64>,
    pub y: Vec<i32>,
}

/// Load, one-hot encode, optionally scale, and separate label from features.
pub async fn prepare_dataset(config: &PipelineConfig) -> Result<PreparedDataset> {
    let raw = load_dataset(&config.input).await?;

    let mut encoded = one_hot_encode(&raw, CATEGORICAL_COLUMN, &FAMHIST_CATEGORIES)?;
    if config.scale {
        encoded = min_max_scale(encoded, &NUMERIC_COLUMNS)?;
    }
    debug!("{}", encoded.head(Some(5)));

    if let Some(path) = &config.gold {
        write_parquet(path, &mut encoded).await?;
        info!("encoded dataset written to {}", path.display());
    }

    let feature_names = HeartRecord::feature_columns();
    let (features, target) = feature_and_target(&encoded, &feature_names, TARGET_COLUMN)?;
    let x = features_to_matrix(&features)?;
    let y = target_to_labels(&target, TARGET_COLUMN)?;

    Ok(PreparedDataset {
        frame: encoded,
        feature_names,
        x,
        y,
    })
}

/// Fits every configured classifier on the train rows and scores it on the
/// test rows.
pub fn fit_models(
    config: &PipelineConfig,
    split: &TrainTestSplit,
) -> Result<(Vec<ModelScore>, TestPredictions)> {
    let mut scores = Vec::new();
    let mut predictions = TestPredictions {
        labels: split.y_test.clone(),
        ..Default::default()
    };

    for &kind in &config.models {
        let model = fit_model(kind, &config.settings, &split.x_train, &split.y_train)?;
        let y_pred = model.predict(&split.x_test)?;
        let score = score_model(kind, &split.y_test, &y_pred)?;
        info!("{} test accuracy {:.4}", kind, score.accuracy);

        match kind {
            ModelKind::Sgd => {
                predictions.sgd_probability = model.probabilities(&split.x_test)?;
                predictions.sgd = Some(y_pred);
            }
            ModelKind::Logistic => predictions.logistic = Some(y_pred),
        }
        scores.push(score);
    }

    Ok((scores, predictions))
}

/// Runs the whole batch: prepare, split, plot, fit, evaluate, report.
pub async fn run(config: PipelineConfig) -> Result<RunReport> {
    let start_time = Instant::now();
    let start_memory = monitor_memory();

    let dataset = prepare_dataset(&config).await?;
    let split = split_train_test(&dataset.x, &dataset.y, config.test_size, config.seed)?;

    let plots = match &config.plot_dir {
        Some(dir) => plot_all_features(
            &dataset.frame,
            &dataset.feature_names,
            TARGET_COLUMN,
            dir,
        )?
        .iter()
        .map(|path| path.display().to_string())
        .collect(),
        None => Vec::new(),
    };

    let (scores, predictions) = fit_models(&config, &split)?;

    let mut cross_validation = Vec::new();
    if config.folds > 0 {
        for &kind in &config.models {
            cross_validation.push(cross_validate_model(
                kind,
                &config.settings,
                &split.x_train,
                &split.y_train,
                config.folds,
                config.seed,
            )?);
        }
    }

    if let Some(path) = &config.predictions {
        predictions.write_csv(path)?;
    }

    let end_memory = monitor_memory();
    debug!("resident memory {} bytes at end of run", end_memory);

    let report = RunReport {
        dataset: DatasetSummary {
            rows: dataset.y.len(),
            features: dataset.feature_names,
            train_rows: split.train_rows(),
            test_rows: split.test_rows(),
            positives: dataset.y.iter().filter(|&&label| label == 1).count(),
        },
        scores,
        cross_validation,
        plots,
        elapsed_ms: start_time.elapsed().as_millis() as u64,
        memory_bytes: end_memory.saturating_sub(start_memory),
        resident_bytes: end_memory,
    };

    if let Some(path) = &config.report {
        report.write_json(path).await?;
    }

    Ok(report)
}

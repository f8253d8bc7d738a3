use std::path::PathBuf;

use clap::{ArgEnum, Parser};
use log::LevelFilter;

use crate::error::{HeartAppError, Result};
use crate::model::{ModelKind, ModelSettings};

#[derive(Parser, Debug)]
#[clap(author, version, about = "Fits logistic-loss classifiers on the South African heart disease data", long_about = None)]
pub struct HeartAppArgs {
    #[clap(short, long, parse(from_os_str), help = "Input CSV or parquet file")]
    pub input: PathBuf,
    #[clap(short, long, parse(from_occurrences), help = "Verbose level")]
    pub verbose: usize,
    #[clap(short, long, default_value_t = 0.2, help = "Fraction of rows held out for testing")]
    pub test_size: f32,
    #[clap(long, default_value_t = 42, help = "Seed for the split, SGD shuffling and cross validation")]
    pub seed: u64,
    #[clap(short, long, arg_enum, default_value_t = ModelChoice::Both, help = "Classifiers to fit")]
    pub model: ModelChoice,
    #[clap(long, parse(from_flag), help = "Min-max scale the numeric features")]
    pub scale: bool,
    #[clap(long, default_value_t = 0, help = "Cross validation folds on the training rows, 0 disables")]
    pub folds: usize,
    #[clap(long, default_value_t = 1e-4, help = "L2 strength of the SGD classifier")]
    pub alpha: f64,
    #[clap(long, default_value_t = 1.0, help = "L2 strength of the logistic regression")]
    pub logistic_alpha: f64,
    #[clap(long, default_value_t = 1000, help = "Maximum SGD epochs")]
    pub max_iter: usize,
    #[clap(long, parse(from_os_str), help = "Directory for feature-vs-label scatter plots")]
    pub plot_dir: Option<PathBuf>,
    #[clap(long, parse(from_os_str), help = "Write the run report as JSON")]
    pub report: Option<PathBuf>,
    #[clap(long, parse(from_os_str), help = "Write test-set predictions as CSV")]
    pub predictions: Option<PathBuf>,
    #[clap(long, parse(from_os_str), help = "Write the encoded dataset as parquet")]
    pub gold: Option<PathBuf>,
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, ArgEnum)]
pub enum ModelChoice {
    Sgd,
    Logistic,
    Both,
}

impl ModelChoice {
    pub fn kinds(self) -> Vec<ModelKind> {
        match self {
            ModelChoice::Sgd => vec![ModelKind::Sgd],
            ModelChoice::Logistic => vec![ModelKind::Logistic],
            ModelChoice::Both => vec![ModelKind::Sgd, ModelKind::Logistic],
        }
    }
}

/// Validated settings for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub input: PathBuf,
    pub test_size: f32,
    pub seed: u64,
    pub models: Vec<ModelKind>,
    pub scale: bool,
    pub folds: usize,
    pub settings: ModelSettings,
    pub plot_dir: Option<PathBuf>,
    pub report: Option<PathBuf>,
    pub predictions: Option<PathBuf>,
    pub gold: Option<PathBuf>,
}

impl PipelineConfig {
    /// Defaults for everything but the input path.
    pub fn new(input: PathBuf) -> Self {
        PipelineConfig {
            input,
            test_size: 0.2,
            seed: 42,
            models: ModelChoice::Both.kinds(),
            scale: false,
            folds: 0,
            settings: ModelSettings::default(),
            plot_dir: None,
            report: None,
            predictions: None,
            gold: None,
        }
    }
}

impl HeartAppArgs {
    pub fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    pub fn into_config(self) -> Result<PipelineConfig> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(HeartAppError::InvalidSplit {
                reason: format!("test size {} outside (0, 1)", self.test_size),
            });
        }
        if self.folds == 1 {
            return Err(HeartAppError::InvalidSplit {
                reason: "cross validation needs at least 2 folds".to_string(),
            });
        }

        let mut settings = ModelSettings::default();
        settings.sgd = settings
            .sgd
            .with_alpha(self.alpha)
            .with_max_iter(self.max_iter)
            .with_seed(Some(self.seed));
        settings.logistic = settings.logistic.with_alpha(self.logistic_alpha);

        Ok(PipelineConfig {
            input: self.input,
            test_size: self.test_size,
            seed: self.seed,
            models: self.model.kinds(),
            scale: self.scale,
            folds: self.folds,
            settings,
            plot_dir: self.plot_dir,
            report: self.report,
            predictions: self.predictions,
            gold: self.gold,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fit_both_models() {
        let args = HeartAppArgs::parse_from(["saheart-logreg", "--input", "SAheart.csv"]);
        assert_eq!(args.log_level(), LevelFilter::Info);

        let config = args.into_config().unwrap();
        assert_eq!(config.models, vec![ModelKind::Sgd, ModelKind::Logistic]);
        assert_eq!(config.test_size, 0.2);
        assert_eq!(config.seed, 42);
        assert_eq!(config.folds, 0);
        assert_eq!(config.settings.sgd.seed, Some(42));
        assert!(config.plot_dir.is_none());
    }

    #[test]
    fn flags_reach_the_config() {
        let args = HeartAppArgs::parse_from([
            "saheart-logreg",
            "-i",
            "heart.parquet",
            "-vv",
            "--model",
            "sgd",
            "--scale",
            "--folds",
            "5",
            "--alpha",
            "0.01",
            "--seed",
            "7",
            "--plot-dir",
            "plots",
        ]);
        assert_eq!(args.log_level(), LevelFilter::Trace);

        let config = args.into_config().unwrap();
        assert_eq!(config.models, vec![ModelKind::Sgd]);
        assert!(config.scale);
        assert_eq!(config.folds, 5);
        assert_eq!(config.settings.sgd.alpha, 0.01);
        assert_eq!(config.settings.sgd.seed, Some(7));
        assert_eq!(config.plot_dir, Some(PathBuf::from("plots")));
    }

    #[test]
    fn out_of_range_test_size_is_rejected() {
        let args = HeartAppArgs::parse_from(["saheart-logreg", "-i", "a.csv", "--test-size", "1.5"]);
        assert!(matches!(
            args.into_config(),
            Err(HeartAppError::InvalidSplit { .. })
        ));
    }

    #[test]
    fn single_fold_is_rejected() {
        let args = HeartAppArgs::parse_from(["saheart-logreg", "-i", "a.csv", "--folds", "1"]);
        assert!(args.into_config().is_err());
    }
}

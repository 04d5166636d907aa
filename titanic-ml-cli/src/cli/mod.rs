//! CLI command definitions and handlers

mod dataset;
mod evaluate;
mod features;
mod metrics;

use anyhow::{Context, Result};
use clap::builder::PossibleValuesParser;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::io::{self, StdoutLock};
use std::path::{Path, PathBuf};
use tracing::info;

use titanic_ml::io::save_json;
use titanic_ml::pipeline::ModelConfig;
use titanic_ml::selection::ImbalanceStrategy;
use titanic_ml::BinaryMetrics;

use crate::config::ExperimentConfig;

/// Evaluate binary classifiers on tabular data
#[derive(Parser, Debug)]
#[command(name = "titanic-ml")]
#[command(
    version,
    about = "Accuracy metrics and cross-validated evaluation of binary classifiers",
    after_help = "\
Examples:
  titanic-ml metrics --data predictions.csv --observed Survived --predicted Predicted
  titanic-ml --synthetic 891 cv --model random_forest
  titanic-ml --config titanic-ml.toml thresholds --optimize f1
  titanic-ml --data train.csv --drop PassengerId,Name,Ticket,Cabin \\
    --one-hot Sex,Embarked --impute Age imbalance"
)]
pub struct Cli {
    /// Experiment config (TOML)
    #[arg(long, short = 'c', global = true, env = "TITANIC_ML_CONFIG")]
    pub config: Option<PathBuf>,

    /// Input CSV (overrides data.path from the config)
    #[arg(long, global = true)]
    pub data: Option<PathBuf>,

    /// Generate N Titanic-like passengers instead of reading a CSV
    #[arg(long, global = true)]
    pub synthetic: Option<usize>,

    /// Label column
    #[arg(long, global = true)]
    pub label: Option<String>,

    /// Columns to drop before training
    #[arg(long, global = true, value_delimiter = ',')]
    pub drop: Vec<String>,

    /// Categorical columns to one-hot encode
    #[arg(long, global = true, value_delimiter = ',')]
    pub one_hot: Vec<String>,

    /// Numeric columns whose missing values are filled with the median
    #[arg(long, global = true, value_delimiter = ',')]
    pub impute: Vec<String>,

    /// Seed for folds, resampling and model initialisation
    #[arg(long, global = true)]
    pub seed: Option<u64>,

    /// Output format
    #[arg(
        long,
        short = 'f',
        global = true,
        default_value = "text",
        value_parser = ["text", "json"]
    )]
    pub format: String,

    /// Also write the report as JSON to this file
    #[arg(long, short = 'o', global = true)]
    pub output: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(
        long,
        global = true,
        default_value = "warn",
        value_parser = ["error", "warn", "info", "debug", "trace"]
    )]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

/// Model and cross-validation overrides shared by the evaluation commands.
#[derive(Args, Debug, Clone, Default)]
pub struct EvalArgs {
    /// Model: logistic, random_forest, mlp, bagging_mlp
    #[arg(long, short = 'm')]
    pub model: Option<String>,

    /// Number of stratified folds
    #[arg(long, short = 'k')]
    pub folds: Option<usize>,

    /// Probability cutoff for a positive prediction
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Imbalance strategy: none, under_sample, over_sample, smote, class_weight
    #[arg(long)]
    pub strategy: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Accuracy metrics for observed and predicted label columns of a CSV
    Metrics {
        /// Column with the observed 0/1 labels
        #[arg(long, default_value = "Survived")]
        observed: String,

        /// Column with predicted labels (or probabilities with --threshold)
        #[arg(long, default_value = "Predicted")]
        predicted: String,

        /// Treat the predicted column as probabilities cut at this value
        #[arg(long)]
        threshold: Option<f64>,

        /// Column identifying repeated trials; adds a per-trial summary
        #[arg(long)]
        group: Option<String>,
    },

    /// Stratified k-fold cross-validation
    Cv {
        #[command(flatten)]
        eval: EvalArgs,

        /// Write per-fold metrics to this CSV
        #[arg(long)]
        fold_csv: Option<PathBuf>,
    },

    /// Metrics across probability cutoffs on out-of-fold predictions
    Thresholds {
        #[command(flatten)]
        eval: EvalArgs,

        /// Number of evenly spaced cutoffs in [0, 1]
        #[arg(long, default_value = "21")]
        steps: usize,

        /// Metric to maximise when picking a cutoff
        #[arg(
            long,
            default_value = "f1",
            value_parser = PossibleValuesParser::new(BinaryMetrics::FIELD_NAMES)
        )]
        optimize: String,
    },

    /// ROC curve and AUC of out-of-fold predictions
    Roc {
        #[command(flatten)]
        eval: EvalArgs,
    },

    /// Train and test metrics as the training set grows
    LearningCurve {
        #[command(flatten)]
        eval: EvalArgs,

        /// Fractions of each training fold to train on
        #[arg(long, value_delimiter = ',', default_value = "0.1,0.25,0.5,0.75,1.0")]
        fractions: Vec<f64>,
    },

    /// Rank features by correlation and run greedy forward selection
    SelectFeatures {
        #[command(flatten)]
        eval: EvalArgs,

        /// Stop after selecting this many features
        #[arg(long, default_value = "5")]
        max_features: usize,
    },

    /// Compare imbalance strategies with the same model
    Imbalance {
        #[command(flatten)]
        eval: EvalArgs,

        /// Strategies to compare (default: all)
        #[arg(long, value_delimiter = ',')]
        strategies: Vec<String>,
    },
}

/// Where and how a report is written.
#[derive(Debug, Clone)]
pub(crate) struct OutputOptions {
    pub json: bool,
    pub path: Option<PathBuf>,
}

impl OutputOptions {
    /// Save the report if requested, then print it as JSON or via `render`.
    pub fn emit<T, F>(&self, report: &T, render: F) -> Result<()>
    where
        T: Serialize,
        F: FnOnce(&mut StdoutLock<'static>) -> io::Result<()>,
    {
        if let Some(path) = &self.path {
            save_json(report, path).with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), "report written");
        }
        if self.json {
            println!("{}", serde_json::to_string_pretty(report)?);
        } else {
            render(&mut io::stdout().lock())?;
        }
        Ok(())
    }
}

/// Config file (or defaults) with command-line overrides applied.
pub(crate) fn resolve_experiment(cli: &Cli, eval: &EvalArgs) -> Result<ExperimentConfig> {
    let mut config = match &cli.config {
        Some(path) => ExperimentConfig::load(path)?,
        None => ExperimentConfig::default(),
    };

    if let Some(path) = &cli.data {
        config.data.path = Some(path.clone());
    }
    if let Some(label) = &cli.label {
        config.data.label = label.clone();
    }
    config.data.drop.extend(cli.drop.iter().cloned());
    config.data.one_hot.extend(cli.one_hot.iter().cloned());
    config.data.impute_median.extend(cli.impute.iter().cloned());

    if let Some(name) = &eval.model {
        config.model = ModelConfig::from_name(name)?;
    }
    if let Some(k) = eval.folds {
        config.cv.n_splits = k;
    }
    if let Some(t) = eval.threshold {
        config.cv.threshold = t;
    }
    if let Some(name) = &eval.strategy {
        config.cv.strategy = ImbalanceStrategy::from_name(name)?;
    }
    if cli.seed.is_some() {
        config.cv.seed = cli.seed;
    }
    Ok(config)
}

pub fn run(cli: Cli) -> Result<()> {
    let out = OutputOptions {
        json: cli.format == "json",
        path: cli.output.clone(),
    };

    match &cli.command {
        Commands::Metrics {
            observed,
            predicted,
            threshold,
            group,
        } => {
            let path: &Path = cli
                .data
                .as_deref()
                .context("metrics needs --data <csv> with observed and predicted columns")?;
            metrics::run(&out, path, observed, predicted, *threshold, group.as_deref())
        }
        Commands::Cv { eval, fold_csv } => {
            let config = resolve_experiment(&cli, eval)?;
            let data = dataset::load(&config.data, cli.synthetic, cli.seed)?;
            evaluate::cv(&out, &config, &data, fold_csv.as_deref())
        }
        Commands::Thresholds { eval, steps, optimize } => {
            let config = resolve_experiment(&cli, eval)?;
            let data = dataset::load(&config.data, cli.synthetic, cli.seed)?;
            evaluate::thresholds(&out, &config, &data, *steps, optimize)
        }
        Commands::Roc { eval } => {
            let config = resolve_experiment(&cli, eval)?;
            let data = dataset::load(&config.data, cli.synthetic, cli.seed)?;
            evaluate::roc(&out, &config, &data)
        }
        Commands::LearningCurve { eval, fractions } => {
            let config = resolve_experiment(&cli, eval)?;
            let data = dataset::load(&config.data, cli.synthetic, cli.seed)?;
            evaluate::learning_curve(&out, &config, &data, fractions)
        }
        Commands::SelectFeatures { eval, max_features } => {
            let config = resolve_experiment(&cli, eval)?;
            let data = dataset::load(&config.data, cli.synthetic, cli.seed)?;
            features::select(&out, &config, &data, *max_features)
        }
        Commands::Imbalance { eval, strategies } => {
            let config = resolve_experiment(&cli, eval)?;
            let data = dataset::load(&config.data, cli.synthetic, cli.seed)?;
            let strategies = if strategies.is_empty() {
                ImbalanceStrategy::all()
            } else {
                strategies
                    .iter()
                    .map(|s| ImbalanceStrategy::from_name(s))
                    .collect::<Result<Vec<_>, _>>()?
            };
            evaluate::imbalance(&out, &config, &data, &strategies)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use titanic_ml::io::load_json;
    use titanic_ml::selection::CvReport;

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "titanic-ml",
            "cv",
            "--synthetic",
            "100",
            "--model",
            "rf",
            "-k",
            "3",
            "--drop",
            "a,b",
            "-f",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.synthetic, Some(100));
        assert_eq!(cli.drop, vec!["a", "b"]);
        assert_eq!(cli.format, "json");
        let Commands::Cv { eval, .. } = &cli.command else {
            panic!("expected cv");
        };
        assert_eq!(eval.model.as_deref(), Some("rf"));
        assert_eq!(eval.folds, Some(3));
    }

    #[test]
    fn test_rejects_unknown_metric() {
        assert!(Cli::try_parse_from(["titanic-ml", "thresholds", "--optimize", "f2"]).is_err());
        let cli = Cli::try_parse_from(["titanic-ml", "thresholds", "--optimize", "specificity"]);
        assert!(cli.is_ok());
    }

    #[test]
    fn test_overrides_apply_on_top_of_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exp.toml");
        let text = "[data]\ndrop = [\"Name\"]\n\n[cv]\nn_splits = 10\nthreshold = 0.4\n";
        fs::write(&path, text).unwrap();

        let cli = Cli::try_parse_from([
            "titanic-ml",
            "--config",
            path.to_str().unwrap(),
            "--drop",
            "Ticket",
            "--seed",
            "7",
            "cv",
            "--strategy",
            "class_weight",
            "--model",
            "mlp",
        ])
        .unwrap();
        let Commands::Cv { eval, .. } = &cli.command else {
            panic!("expected cv");
        };
        let cfg = resolve_experiment(&cli, eval).unwrap();
        assert_eq!(cfg.data.drop, vec!["Name", "Ticket"]);
        assert_eq!(cfg.cv.n_splits, 10);
        assert_eq!(cfg.cv.threshold, 0.4);
        assert_eq!(cfg.cv.seed, Some(7));
        assert_eq!(cfg.cv.strategy, ImbalanceStrategy::ClassWeight);
        assert_eq!(cfg.model.name(), "mlp");
    }

    #[test]
    fn test_unknown_model_is_an_error() {
        let cli = Cli::try_parse_from(["titanic-ml", "cv", "--model", "svm"]).unwrap();
        let Commands::Cv { eval, .. } = &cli.command else {
            panic!("expected cv");
        };
        assert!(resolve_experiment(&cli, eval).is_err());
    }

    #[test]
    fn test_cv_writes_report_and_fold_csv() {
        let dir = tempfile::tempdir().unwrap();
        let report_path = dir.path().join("cv.json");
        let folds_path = dir.path().join("folds.csv");
        let cli = Cli::try_parse_from([
            "titanic-ml",
            "--synthetic",
            "150",
            "-o",
            report_path.to_str().unwrap(),
            "cv",
            "--model",
            "logistic",
            "--folds",
            "3",
            "--fold-csv",
            folds_path.to_str().unwrap(),
        ])
        .unwrap();
        run(cli).unwrap();

        let report: CvReport = load_json(&report_path).unwrap();
        assert_eq!(report.model, "logistic");
        assert_eq!(report.folds.len(), 3);
        let csv = fs::read_to_string(&folds_path).unwrap();
        assert_eq!(csv.lines().count(), 4);
    }

    #[test]
    fn test_saved_roc_report_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roc.json");
        let cli = Cli::try_parse_from([
            "titanic-ml",
            "--synthetic",
            "90",
            "-f",
            "json",
            "-o",
            path.to_str().unwrap(),
            "roc",
            "--folds",
            "3",
        ])
        .unwrap();
        run(cli).unwrap();

        let report: evaluate::RocReport = load_json(&path).unwrap();
        assert_eq!(report.model, "logistic");
        // the leading +inf cutoff was written as null
        assert!(report.curve.thresholds[0].is_nan());
        assert_eq!(report.curve.fpr[0], 0.0);
        assert!((0.0..=1.0).contains(&report.auc));
    }

    #[test]
    fn test_missing_data_source() {
        let cli = Cli::try_parse_from(["titanic-ml", "roc"]).unwrap();
        let err = run(cli).unwrap_err();
        assert!(err.to_string().contains("--data"));
    }
}

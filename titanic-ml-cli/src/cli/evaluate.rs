use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use titanic_ml::io::write_metrics_csv;
use titanic_ml::metrics::{nullable, thresholds_linspace, RocCurve, ThresholdPoint};
use titanic_ml::selection::{
    cross_validate, imbalance_sweep, learning_curve as run_learning_curve, threshold_analysis,
    CvReport, ImbalanceStrategy, LearningCurvePoint, ThresholdAnalysis,
};
use titanic_ml::BinaryMetrics;

use super::dataset::LoadedData;
use super::OutputOptions;
use crate::config::ExperimentConfig;
use crate::output::{self, fmt_value};

fn describe<W: std::io::Write>(
    w: &mut W,
    config: &ExperimentConfig,
    data: &LoadedData,
) -> std::io::Result<()> {
    output::key_value(w, "data", &data.source)?;
    output::key_value(w, "model", config.model.name())?;
    output::key_value(w, "strategy", config.cv.strategy.name())?;
    output::key_value(w, "folds", &config.cv.n_splits.to_string())
}

fn headline(m: &BinaryMetrics) -> Vec<String> {
    [m.accuracy, m.precision, m.recall, m.f1, m.specificity]
        .into_iter()
        .map(fmt_value)
        .collect()
}

pub(crate) fn cv(
    out: &OutputOptions,
    config: &ExperimentConfig,
    data: &LoadedData,
    fold_csv: Option<&Path>,
) -> Result<()> {
    let report = cross_validate(&config.model, &data.x, &data.y, &config.cv)?;

    if let Some(path) = fold_csv {
        let trials: Vec<BinaryMetrics> = report.folds.iter().map(|f| f.metrics).collect();
        write_metrics_csv(path, &trials)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    out.emit(&report, |w| {
        output::heading(w, "Cross-validation")?;
        describe(w, config, data)?;
        output::key_value(w, "threshold", &fmt_value(report.threshold))?;
        output::key_value(
            w,
            "ROC AUC",
            &format!("{} ± {}", fmt_value(report.mean_auc), fmt_value(report.std_auc)),
        )?;

        let labels: Vec<String> = report.folds.iter().map(|f| format!("fold {}", f.fold)).collect();
        let columns: Vec<(&str, &BinaryMetrics)> = labels
            .iter()
            .zip(&report.folds)
            .map(|(l, f)| (l.as_str(), &f.metrics))
            .collect();
        output::heading(w, "Per fold")?;
        output::metrics_table(w, &columns)?;
        output::heading(w, "Summary")?;
        output::summary_table(w, &report.summary)
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ThresholdReport {
    pub model: String,
    pub optimize: String,
    pub best: Option<ThresholdPoint>,
    pub analysis: ThresholdAnalysis,
}

pub(crate) fn thresholds(
    out: &OutputOptions,
    config: &ExperimentConfig,
    data: &LoadedData,
    steps: usize,
    optimize: &str,
) -> Result<()> {
    let cv = cross_validate(&config.model, &data.x, &data.y, &config.cv)?;
    let analysis = threshold_analysis(&cv, &data.y, &thresholds_linspace(steps))?;
    let report = ThresholdReport {
        model: cv.model,
        optimize: optimize.to_string(),
        best: analysis.best_by(optimize).copied(),
        analysis,
    };

    out.emit(&report, |w| {
        output::heading(w, "Threshold analysis (out-of-fold)")?;
        describe(w, config, data)?;
        output::key_value(w, "ROC AUC", &fmt_value(report.analysis.auc))?;

        let rows: Vec<Vec<String>> = report
            .analysis
            .points
            .iter()
            .map(|p| {
                let mut row = vec![format!("{:.3}", p.threshold)];
                row.extend(headline(&p.metrics));
                row
            })
            .collect();
        let best_row = report
            .best
            .and_then(|b| report.analysis.points.iter().position(|p| p.threshold == b.threshold));
        output::table(
            w,
            &["threshold", "accuracy", "precision", "recall", "f1", "specificity"],
            &rows,
            best_row,
        )?;
        match &report.best {
            Some(best) => output::success(
                w,
                &format!(
                    "  best {} = {} at threshold {:.3}",
                    report.optimize,
                    fmt_value(best.metrics.get(&report.optimize).unwrap_or(f64::NAN)),
                    best.threshold
                ),
            ),
            None => output::key_value(w, "best", "undefined at every threshold"),
        }
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct RocReport {
    pub model: String,
    #[serde(deserialize_with = "nullable::float")]
    pub auc: f64,
    #[serde(deserialize_with = "nullable::float")]
    pub mean_fold_auc: f64,
    #[serde(deserialize_with = "nullable::float")]
    pub std_fold_auc: f64,
    pub curve: RocCurve,
}

pub(crate) fn roc(out: &OutputOptions, config: &ExperimentConfig, data: &LoadedData) -> Result<()> {
    let cv = cross_validate(&config.model, &data.x, &data.y, &config.cv)?;
    let analysis = threshold_analysis(&cv, &data.y, &[])?;
    let report = RocReport {
        model: cv.model,
        auc: analysis.auc,
        mean_fold_auc: cv.mean_auc,
        std_fold_auc: cv.std_auc,
        curve: analysis.roc,
    };

    out.emit(&report, |w| {
        output::heading(w, "ROC curve (out-of-fold)")?;
        describe(w, config, data)?;
        output::key_value(w, "pooled AUC", &fmt_value(report.auc))?;
        output::key_value(
            w,
            "fold AUC",
            &format!("{} ± {}", fmt_value(report.mean_fold_auc), fmt_value(report.std_fold_auc)),
        )?;
        let c = &report.curve;
        let rows: Vec<Vec<String>> = (0..c.len())
            .map(|i| vec![fmt_value(c.thresholds[i]), fmt_value(c.fpr[i]), fmt_value(c.tpr[i])])
            .collect();
        output::table(w, &["threshold", "fpr", "tpr"], &rows, None)
    })
}

pub(crate) fn learning_curve(
    out: &OutputOptions,
    config: &ExperimentConfig,
    data: &LoadedData,
    fractions: &[f64],
) -> Result<()> {
    let points: Vec<LearningCurvePoint> =
        run_learning_curve(&config.model, &data.x, &data.y, fractions, &config.cv)?;

    out.emit(&points, |w| {
        output::heading(w, "Learning curve")?;
        describe(w, config, data)?;
        let rows: Vec<Vec<String>> = points
            .iter()
            .map(|p| {
                vec![
                    format!("{:.2}", p.train_fraction),
                    format!("{:.1}", p.train_size),
                    fmt_value(p.train.mean.accuracy),
                    format!(
                        "{} ± {}",
                        fmt_value(p.test.mean.accuracy),
                        fmt_value(p.test.std.accuracy)
                    ),
                    fmt_value(p.test.mean.f1),
                    fmt_value(p.test_auc),
                ]
            })
            .collect();
        output::table(
            w,
            &["fraction", "train rows", "train acc", "test acc", "test f1", "test auc"],
            &rows,
            None,
        )
    })
}

pub(crate) fn imbalance(
    out: &OutputOptions,
    config: &ExperimentConfig,
    data: &LoadedData,
    strategies: &[ImbalanceStrategy],
) -> Result<()> {
    let reports: Vec<CvReport> =
        imbalance_sweep(&config.model, &data.x, &data.y, &config.cv, strategies)?;

    out.emit(&reports, |w| {
        output::heading(w, "Imbalance strategies")?;
        output::key_value(w, "data", &data.source)?;
        output::key_value(w, "model", config.model.name())?;
        let positives = data.y.data().iter().filter(|&&v| v == 1.0).count();
        output::key_value(
            w,
            "positive rate",
            &fmt_value(positives as f64 / data.y.numel() as f64),
        )?;

        let rows: Vec<Vec<String>> = reports
            .iter()
            .map(|r| {
                let mut row = vec![r.strategy.name().to_string()];
                row.extend(headline(&r.summary.mean));
                row.push(fmt_value(r.mean_auc));
                row
            })
            .collect();
        let best_f1 = reports
            .iter()
            .enumerate()
            .filter(|(_, r)| !r.summary.mean.f1.is_nan())
            .max_by(|(_, a), (_, b)| a.summary.mean.f1.total_cmp(&b.summary.mean.f1))
            .map(|(i, _)| i);
        output::table(
            w,
            &["strategy", "accuracy", "precision", "recall", "f1", "specificity", "auc"],
            &rows,
            best_f1,
        )
    })
}

use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

use titanic_ml::io::{ColumnData, Table};
use titanic_ml::metrics::predict_at_threshold;
use titanic_ml::{BinaryMetrics, ConfusionCounts, MetricsSummary};

use super::OutputOptions;
use crate::output;

#[derive(Debug, Clone, Serialize)]
pub(crate) struct TrialMetrics {
    pub trial: String,
    pub counts: ConfusionCounts,
    pub metrics: BinaryMetrics,
}

/// Metrics pooled over every row, plus one entry per trial when grouped.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct MetricsReport {
    pub counts: ConfusionCounts,
    pub metrics: BinaryMetrics,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub trials: Vec<TrialMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<MetricsSummary>,
}

fn group_keys(table: &Table, column: &str) -> Result<Vec<String>> {
    Ok(match &table.column(column)?.data {
        ColumnData::Categorical(v) => v.clone(),
        ColumnData::Numeric(v) => v.iter().map(|x| x.to_string()).collect(),
    })
}

pub(crate) fn compute(
    table: &Table,
    observed: &str,
    predicted: &str,
    threshold: Option<f64>,
    group: Option<&str>,
) -> Result<MetricsReport> {
    let obs = table.numeric(observed)?;
    let pred = match threshold {
        Some(t) if !(0.0..=1.0).contains(&t) => bail!("threshold must lie in [0, 1], got {}", t),
        Some(t) => predict_at_threshold(table.numeric(predicted)?, t),
        None => table.numeric(predicted)?.to_vec(),
    };

    let counts = ConfusionCounts::from_labels(obs, &pred)?;
    let mut report = MetricsReport {
        counts,
        metrics: counts.metrics(),
        trials: Vec::new(),
        summary: None,
    };

    if let Some(column) = group {
        let keys = group_keys(table, column)?;
        let mut order: Vec<String> = Vec::new();
        let mut rows: HashMap<&str, (Vec<f64>, Vec<f64>)> = HashMap::new();
        for ((key, &o), &p) in keys.iter().zip(obs).zip(&pred) {
            let entry = rows.entry(key.as_str()).or_insert_with(|| {
                order.push(key.clone());
                (Vec::new(), Vec::new())
            });
            entry.0.push(o);
            entry.1.push(p);
        }

        for trial in order {
            let (o, p) = &rows[trial.as_str()];
            let counts =
                ConfusionCounts::from_labels(o, p).with_context(|| format!("trial {}", trial))?;
            report.trials.push(TrialMetrics {
                trial,
                counts,
                metrics: counts.metrics(),
            });
        }
        let trials: Vec<BinaryMetrics> = report.trials.iter().map(|t| t.metrics).collect();
        report.summary = MetricsSummary::from_trials(&trials);
    }
    Ok(report)
}

pub(crate) fn run(
    out: &OutputOptions,
    path: &Path,
    observed: &str,
    predicted: &str,
    threshold: Option<f64>,
    group: Option<&str>,
) -> Result<()> {
    let table =
        Table::from_path(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let report = compute(&table, observed, predicted, threshold, group)?;

    out.emit(&report, |w| {
        let c = &report.counts;
        output::heading(w, &format!("Accuracy metrics: {} vs {}", predicted, observed))?;
        output::key_value(w, "rows", &c.total().to_string())?;
        output::key_value(
            w,
            "TP / FP / TN / FN",
            &format!(
                "{} / {} / {} / {}",
                c.true_positives, c.false_positives, c.true_negatives, c.false_negatives
            ),
        )?;
        output::metrics_table(w, &[("all rows", &report.metrics)])?;
        if let Some(summary) = &report.summary {
            output::heading(w, &format!("Across {} trials", summary.n_trials))?;
            output::summary_table(w, summary)?;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PREDICTIONS: &str = "\
trial,Survived,Predicted,Probability
a,1,1,0.9
a,0,0,0.2
a,1,0,0.4
b,1,1,0.7
b,0,1,0.6
b,0,0,0.1
";

    fn table() -> Table {
        Table::from_reader(PREDICTIONS.as_bytes()).unwrap()
    }

    #[test]
    fn test_pooled_metrics() {
        let report = compute(&table(), "Survived", "Predicted", None, None).unwrap();
        assert_eq!(report.counts.true_positives, 2);
        assert_eq!(report.counts.false_positives, 1);
        assert_eq!(report.counts.false_negatives, 1);
        assert_eq!(report.metrics.accuracy, 4.0 / 6.0);
        assert!(report.trials.is_empty());
    }

    #[test]
    fn test_probabilities_with_threshold() {
        let report = compute(&table(), "Survived", "Probability", Some(0.4), None).unwrap();
        // 0.4 is at the cutoff and counts as positive
        assert_eq!(report.counts.true_positives, 3);
        assert_eq!(report.counts.false_positives, 1);
        assert!(compute(&table(), "Survived", "Probability", Some(1.5), None).is_err());
    }

    #[test]
    fn test_grouped_trials_keep_file_order() {
        let report = compute(&table(), "Survived", "Predicted", None, Some("trial")).unwrap();
        let names: Vec<&str> = report.trials.iter().map(|t| t.trial.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(report.trials[0].metrics.precision, 1.0);
        assert_eq!(report.trials[1].metrics.precision, 0.5);
        let summary = report.summary.unwrap();
        assert_eq!(summary.n_trials, 2);
        assert_eq!(summary.mean.precision, 0.75);
    }

    #[test]
    fn test_non_binary_labels_rejected() {
        assert!(compute(&table(), "Survived", "Probability", None, None).is_err());
    }
}

use anyhow::Result;
use serde::Serialize;

use titanic_ml::selection::{forward_selection, univariate_ranking, FeatureScore, ForwardSelection};

use super::dataset::LoadedData;
use super::OutputOptions;
use crate::config::ExperimentConfig;
use crate::output::{self, fmt_value};

#[derive(Debug, Clone, Serialize)]
pub(crate) struct FeatureReport {
    pub model: String,
    pub ranking: Vec<FeatureScore>,
    pub selection: ForwardSelection,
}

pub(crate) fn select(
    out: &OutputOptions,
    config: &ExperimentConfig,
    data: &LoadedData,
    max_features: usize,
) -> Result<()> {
    let ranking = univariate_ranking(&data.x, &data.y, &data.feature_names)?;
    let selection = forward_selection(
        &config.model,
        &data.x,
        &data.y,
        &data.feature_names,
        &config.cv,
        max_features,
    )?;
    let report = FeatureReport {
        model: config.model.name().to_string(),
        ranking,
        selection,
    };

    out.emit(&report, |w| {
        output::heading(w, "Correlation with the label")?;
        output::key_value(w, "data", &data.source)?;
        let rows: Vec<Vec<String>> = report
            .ranking
            .iter()
            .enumerate()
            .map(|(rank, f)| vec![(rank + 1).to_string(), f.name.clone(), fmt_value(f.score)])
            .collect();
        output::table(w, &["rank", "feature", "pearson r"], &rows, None)?;

        output::heading(w, &format!("Forward selection ({})", report.model))?;
        let rows: Vec<Vec<String>> = report
            .selection
            .steps
            .iter()
            .enumerate()
            .map(|(step, s)| vec![(step + 1).to_string(), s.name.clone(), fmt_value(s.mean_auc)])
            .collect();
        output::table(w, &["step", "added", "mean auc"], &rows, None)?;
        output::success(
            w,
            &format!(
                "  selected {} (auc {})",
                report.selection.selected_names().join(", "),
                fmt_value(report.selection.best_auc())
            ),
        )
    })
}

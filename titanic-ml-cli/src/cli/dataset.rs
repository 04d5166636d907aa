use anyhow::{anyhow, Context, Result};
use tracing::info;

use titanic_ml::datasets::make_titanic_like;
use titanic_ml::io::Table;
use titanic_ml::Tensor;

use crate::config::DataConfig;

/// Feature matrix and labels ready for evaluation.
#[derive(Debug, Clone)]
pub(crate) struct LoadedData {
    pub x: Tensor<f64>,
    pub y: Tensor<f64>,
    pub feature_names: Vec<String>,
    pub source: String,
}

/// `synthetic` takes precedence over the configured CSV. CSV columns are
/// dropped, then imputed, then one-hot encoded.
pub(crate) fn load(
    config: &DataConfig,
    synthetic: Option<usize>,
    seed: Option<u64>,
) -> Result<LoadedData> {
    if let Some(n) = synthetic {
        let data = make_titanic_like(n, seed)?;
        info!(passengers = n, "generated Titanic-like data");
        return Ok(LoadedData {
            x: data.features,
            y: data.survived,
            feature_names: data.feature_names,
            source: format!("synthetic ({} passengers)", n),
        });
    }

    let path = config.path.as_ref().ok_or_else(|| {
        anyhow!("No data: pass --data <csv>, --synthetic <n> or set data.path in the config")
    })?;
    let mut table =
        Table::from_path(path).with_context(|| format!("Failed to read {}", path.display()))?;

    let drop: Vec<&str> = config.drop.iter().map(String::as_str).collect();
    table.drop_columns(&drop)?;
    for column in &config.impute_median {
        let median = table.impute_median(column)?;
        info!(column = %column, median, "filled missing values");
    }
    for column in &config.one_hot {
        table.one_hot(column)?;
    }

    let (x, y, feature_names) = table
        .to_features_and_label(&config.label)
        .with_context(|| format!("{} is not ready for training", path.display()))?;
    info!(rows = table.n_rows(), features = feature_names.len(), "data loaded");
    Ok(LoadedData {
        x,
        y,
        feature_names,
        source: path.display().to_string(),
    })
}

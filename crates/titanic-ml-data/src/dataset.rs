use titanic_ml_core::{MlError, MlResult, Tensor};

/// A set of rows that can be gathered into batches.
pub trait Dataset {
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn batch(&self, indices: &[usize]) -> MlResult<Batch>;
}

/// Gathered rows: features `[b, p]`, labels `[b]`, optional per-row weights.
#[derive(Debug, Clone)]
pub struct Batch {
    pub x: Tensor<f64>,
    pub y: Tensor<f64>,
    pub weights: Option<Vec<f64>>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.y.numel()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    /// Weight of row `i` (1.0 when unweighted).
    pub fn weight(&self, i: usize) -> f64 {
        self.weights.as_ref().map_or(1.0, |w| w[i])
    }
}

/// A dataset wrapping feature and label tensors.
#[derive(Debug, Clone)]
pub struct TensorDataset {
    pub features: Tensor<f64>,
    pub labels: Tensor<f64>,
    pub weights: Option<Vec<f64>>,
}

impl TensorDataset {
    pub fn new(features: Tensor<f64>, labels: Tensor<f64>) -> MlResult<Self> {
        let n = features.nrows()?;
        if n != labels.numel() {
            return Err(MlError::LengthMismatch {
                observed: labels.numel(),
                predicted: n,
            });
        }
        Ok(TensorDataset {
            features,
            labels,
            weights: None,
        })
    }

    /// Attach per-row sample weights.
    pub fn with_weights(mut self, weights: Vec<f64>) -> MlResult<Self> {
        if weights.len() != self.labels.numel() {
            return Err(MlError::LengthMismatch {
                observed: self.labels.numel(),
                predicted: weights.len(),
            });
        }
        self.weights = Some(weights);
        Ok(self)
    }
}

impl Dataset for TensorDataset {
    fn len(&self) -> usize {
        self.labels.numel()
    }

    fn batch(&self, indices: &[usize]) -> MlResult<Batch> {
        Ok(Batch {
            x: self.features.select_rows(indices)?,
            y: self.labels.select_rows(indices)?,
            weights: self
                .weights
                .as_ref()
                .map(|w| indices.iter().map(|&i| w[i]).collect()),
        })
    }
}

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use titanic_ml_core::{MlError, MlResult, Tensor};
use titanic_ml_data::{DataLoader, TensorDataset};
use tracing::debug;

use crate::layers::{Activation, Dense};
use crate::optimizer::Adam;

/// Multi-layer perceptron for binary classification.
///
/// ReLU hidden layers, a single sigmoid output unit, binary cross-entropy
/// loss minimised with mini-batch Adam. `alpha` is the L2 penalty on the
/// weights (biases are not penalised). Training is fully determined by `seed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlpClassifier {
    pub hidden_layers: Vec<usize>,
    pub learning_rate: f64,
    pub epochs: usize,
    pub batch_size: usize,
    pub alpha: f64,
    pub seed: u64,
    layers: Vec<Dense>,
    loss_curve: Vec<f64>,
}

impl Default for MlpClassifier {
    fn default() -> Self {
        Self::new(vec![16, 8])
    }
}

impl MlpClassifier {
    pub fn new(hidden_layers: Vec<usize>) -> Self {
        MlpClassifier {
            hidden_layers,
            learning_rate: 1e-3,
            epochs: 200,
            batch_size: 32,
            alpha: 1e-4,
            seed: 42,
            layers: Vec::new(),
            loss_curve: Vec::new(),
        }
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn fit(&mut self, x: &Tensor<f64>, y: &Tensor<f64>) -> MlResult<()> {
        self.train(TensorDataset::new(x.clone(), y.clone())?)
    }

    pub fn fit_weighted(
        &mut self,
        x: &Tensor<f64>,
        y: &Tensor<f64>,
        sample_weights: &[f64],
    ) -> MlResult<()> {
        let dataset =
            TensorDataset::new(x.clone(), y.clone())?.with_weights(sample_weights.to_vec())?;
        self.train(dataset)
    }

    fn train(&mut self, dataset: TensorDataset) -> MlResult<()> {
        let (n, p) = dataset.features.shape().as_matrix()?;
        if n == 0 {
            return Err(MlError::EmptyInput);
        }
        if self.hidden_layers.iter().any(|&h| h == 0) {
            return Err(MlError::invalid_parameter(
                "hidden_layers",
                "every layer needs at least one unit",
            ));
        }
        if !(self.learning_rate > 0.0) {
            return Err(MlError::invalid_parameter("learning_rate", "must be positive"));
        }
        for (i, &v) in dataset.labels.data().iter().enumerate() {
            if v != 0.0 && v != 1.0 {
                return Err(MlError::NonBinaryLabel { index: i, value: v });
            }
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut widths = vec![p];
        widths.extend(&self.hidden_layers);
        widths.push(1);
        let last = widths.len() - 2;
        let mut layers: Vec<Dense> = widths
            .windows(2)
            .enumerate()
            .map(|(l, w)| {
                let activation = if l == last { Activation::Sigmoid } else { Activation::Relu };
                Dense::new(w[0], w[1], activation, rng.gen())
            })
            .collect();

        let group_sizes: Vec<usize> = layers
            .iter()
            .flat_map(|l| [l.weight.numel(), l.bias.len()])
            .collect();
        let mut adam = Adam::new(&group_sizes, self.learning_rate);
        let mut loader = DataLoader::new(&dataset, self.batch_size, true, rng.gen());
        let mut loss_curve = Vec::with_capacity(self.epochs);

        for epoch in 0..self.epochs {
            loader.reset();
            let mut epoch_loss = 0.0;
            for batch in loader.by_ref() {
                let batch = batch?;
                let rows = batch.len();
                let batch_weight: f64 = (0..rows).map(|i| batch.weight(i)).sum();
                if batch_weight <= 0.0 {
                    continue;
                }

                // activations[0] is the input, activations[l + 1] the output of layer l
                let mut activations = vec![batch.x.data().to_vec()];
                for layer in &layers {
                    let next = layer.forward(&activations[activations.len() - 1], rows)?;
                    activations.push(next);
                }
                let proba = &activations[layers.len()];

                // sigmoid + cross-entropy: d loss / d z = w_i (p - y) / Σw
                let mut grad: Vec<f64> = (0..rows)
                    .map(|i| batch.weight(i) * (proba[i] - batch.y.data()[i]) / batch_weight)
                    .collect();
                epoch_loss += (0..rows)
                    .map(|i| batch.weight(i) * bce(proba[i], batch.y.data()[i]))
                    .sum::<f64>();

                adam.step();
                for l in (0..layers.len()).rev() {
                    let (mut grads, grad_input) =
                        layers[l].backward(&activations[l], &grad, rows, l > 0);
                    if self.alpha > 0.0 {
                        for (g, &w) in grads.weight.iter_mut().zip(layers[l].weight.data()) {
                            *g += self.alpha * w / n as f64;
                        }
                    }
                    adam.update(2 * l, layers[l].weight.data_mut(), &grads.weight);
                    adam.update(2 * l + 1, &mut layers[l].bias, &grads.bias);

                    if let Some(mut g) = grad_input {
                        layers[l - 1].activation_backward(&mut g, &activations[l]);
                        grad = g;
                    }
                }
            }
            let total_weight: f64 = match &dataset.weights {
                Some(w) => w.iter().sum(),
                None => n as f64,
            };
            loss_curve.push(epoch_loss / total_weight);
            if epoch + 1 == self.epochs {
                debug!(epochs = self.epochs, final_loss = epoch_loss / total_weight, "mlp trained");
            }
        }

        self.layers = layers;
        self.loss_curve = loss_curve;
        Ok(())
    }

    /// Probability of the positive class for every row.
    pub fn predict_proba(&self, x: &Tensor<f64>) -> MlResult<Tensor<f64>> {
        let first = self.layers.first().ok_or(MlError::NotFitted)?;
        let (n, p) = x.shape().as_matrix()?;
        if p != first.in_features() {
            return Err(MlError::ShapeMismatch {
                expected: vec![n, first.in_features()],
                got: x.shape_vec(),
            });
        }
        let mut current = x.data().to_vec();
        for layer in &self.layers {
            current = layer.forward(&current, n)?;
        }
        Ok(Tensor::from_vec(current))
    }

    pub fn predict(&self, x: &Tensor<f64>) -> MlResult<Tensor<f64>> {
        let proba = self.predict_proba(x)?;
        Ok(proba.apply(|p| if p >= 0.5 { 1.0 } else { 0.0 }))
    }

    /// Mean training loss per epoch.
    pub fn loss_curve(&self) -> &[f64] {
        &self.loss_curve
    }

    pub fn is_fitted(&self) -> bool {
        !self.layers.is_empty()
    }
}

fn bce(p: f64, y: f64) -> f64 {
    let p = p.clamp(1e-12, 1.0 - 1e-12);
    -(y * p.ln() + (1.0 - y) * (1.0 - p).ln())
}

use serde::{Deserialize, Serialize};
use titanic_ml_core::{MlError, MlResult, Tensor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activation {
    Relu,
    Sigmoid,
}

impl Activation {
    fn apply(self, z: f64) -> f64 {
        match self {
            Activation::Relu => z.max(0.0),
            Activation::Sigmoid => 1.0 / (1.0 + (-z).exp()),
        }
    }

    /// Derivative expressed through the activation output `a`.
    fn derivative(self, a: f64) -> f64 {
        match self {
            Activation::Relu => {
                if a > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Activation::Sigmoid => a * (1.0 - a),
        }
    }
}

/// Fully connected layer: `a = act(x W + b)`, with `W` stored row-major as
/// `[in_features, out_features]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dense {
    pub weight: Tensor<f64>,
    pub bias: Vec<f64>,
    pub activation: Activation,
}

/// Parameter gradients of one `Dense` layer for a batch.
#[derive(Debug, Clone)]
pub struct DenseGrads {
    pub weight: Vec<f64>,
    pub bias: Vec<f64>,
}

impl Dense {
    /// He-initialised weights (normal, variance `2 / in_features`), zero bias.
    pub fn new(in_features: usize, out_features: usize, activation: Activation, seed: u64) -> Self {
        let scale = (2.0 / in_features.max(1) as f64).sqrt();
        let weight = Tensor::randn(vec![in_features, out_features], seed).apply(|w| w * scale);
        Dense {
            weight,
            bias: vec![0.0; out_features],
            activation,
        }
    }

    pub fn in_features(&self) -> usize {
        self.weight.shape().dims()[0]
    }

    pub fn out_features(&self) -> usize {
        self.bias.len()
    }

    /// Forward pass over a row-major `[rows, in_features]` buffer.
    pub fn forward(&self, input: &[f64], rows: usize) -> MlResult<Vec<f64>> {
        let (fan_in, fan_out) = (self.in_features(), self.out_features());
        if input.len() != rows * fan_in {
            return Err(MlError::ShapeMismatch {
                expected: vec![rows, fan_in],
                got: vec![input.len() / fan_in.max(1), fan_in],
            });
        }
        let w = self.weight.data();
        let mut out = Vec::with_capacity(rows * fan_out);
        for r in 0..rows {
            let x = &input[r * fan_in..(r + 1) * fan_in];
            for o in 0..fan_out {
                let z = x
                    .iter()
                    .enumerate()
                    .fold(self.bias[o], |acc, (i, &xi)| acc + xi * w[i * fan_out + o]);
                out.push(self.activation.apply(z));
            }
        }
        Ok(out)
    }

    /// Turn `d loss / d a` into `d loss / d z` in place, using the cached
    /// activations `output`.
    pub fn activation_backward(&self, grad_output: &mut [f64], output: &[f64]) {
        for (g, &a) in grad_output.iter_mut().zip(output) {
            *g *= self.activation.derivative(a);
        }
    }

    /// Given `d loss / d z` for the batch, return parameter gradients and,
    /// when `need_input_grad`, `d loss / d input`.
    pub fn backward(
        &self,
        input: &[f64],
        grad_z: &[f64],
        rows: usize,
        need_input_grad: bool,
    ) -> (DenseGrads, Option<Vec<f64>>) {
        let (fan_in, fan_out) = (self.in_features(), self.out_features());
        let w = self.weight.data();
        let mut grads = DenseGrads {
            weight: vec![0.0; fan_in * fan_out],
            bias: vec![0.0; fan_out],
        };
        let mut grad_input = need_input_grad.then(|| vec![0.0; rows * fan_in]);

        for r in 0..rows {
            let x = &input[r * fan_in..(r + 1) * fan_in];
            let dz = &grad_z[r * fan_out..(r + 1) * fan_out];
            for (o, &d) in dz.iter().enumerate() {
                grads.bias[o] += d;
            }
            for (i, &xi) in x.iter().enumerate() {
                let row = &mut grads.weight[i * fan_out..(i + 1) * fan_out];
                for (g, &d) in row.iter_mut().zip(dz) {
                    *g += xi * d;
                }
            }
            if let Some(gi) = grad_input.as_mut() {
                for i in 0..fan_in {
                    gi[r * fan_in + i] = dz
                        .iter()
                        .enumerate()
                        .map(|(o, &d)| d * w[i * fan_out + o])
                        .sum();
                }
            }
        }
        (grads, grad_input)
    }
}

use serde::{Deserialize, Serialize};
use titanic_ml_core::{Float, MlError, MlResult, Tensor};
use tracing::debug;

/// Logistic regression: binary classification via batch gradient descent
/// on the (optionally sample-weighted) cross-entropy.
///
/// `c` is the inverse L2 regularisation strength; `None` disables the penalty.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "T: Float")]
pub struct LogisticRegression<T: Float> {
    pub weights: Option<Tensor<T>>,
    pub bias: Option<T>,
    pub learning_rate: T,
    pub max_iter: usize,
    pub tol: T,
    pub c: Option<T>,
}

impl<T: Float> Default for LogisticRegression<T> {
    fn default() -> Self {
        Self::new(T::from_f64(0.1), 1000)
    }
}

impl<T: Float> LogisticRegression<T> {
    pub fn new(learning_rate: T, max_iter: usize) -> Self {
        LogisticRegression {
            weights: None,
            bias: None,
            learning_rate,
            max_iter,
            tol: T::from_f64(1e-6),
            c: None,
        }
    }

    pub fn with_c(mut self, c: T) -> Self {
        self.c = Some(c);
        self
    }

    fn sigmoid_val(x: T) -> T {
        T::ONE / (T::ONE + (-x).exp())
    }

    pub fn fit(&mut self, x: &Tensor<T>, y: &Tensor<T>) -> MlResult<()> {
        let ones = vec![T::ONE; y.numel()];
        self.fit_weighted(x, y, &ones)
    }

    /// Fit with one weight per row (class weighting passes balanced weights).
    pub fn fit_weighted(
        &mut self,
        x: &Tensor<T>,
        y: &Tensor<T>,
        sample_weights: &[T],
    ) -> MlResult<()> {
        let (n, p) = x.shape().as_matrix()?;
        if n == 0 {
            return Err(MlError::EmptyInput);
        }
        if y.numel() != n || sample_weights.len() != n {
            return Err(MlError::LengthMismatch {
                observed: n,
                predicted: if y.numel() != n { y.numel() } else { sample_weights.len() },
            });
        }
        if let Some(c) = self.c {
            if c <= T::ZERO {
                return Err(MlError::invalid_parameter("c", "must be positive"));
            }
        }

        let total_weight: T = sample_weights.iter().copied().sum();
        let mut w = vec![T::ZERO; p];
        let mut b = T::ZERO;
        let mut iterations = 0;

        for _ in 0..self.max_iter {
            iterations += 1;
            let mut dw = vec![T::ZERO; p];
            let mut db = T::ZERO;

            for i in 0..n {
                let row = x.row_slice(i)?;
                let z = row.iter().zip(&w).fold(b, |acc, (&xj, &wj)| acc + wj * xj);
                let error = (Self::sigmoid_val(z) - y.data()[i]) * sample_weights[i];
                for (g, &xj) in dw.iter_mut().zip(row) {
                    *g += error * xj;
                }
                db += error;
            }

            let mut max_grad = T::ZERO;
            for j in 0..p {
                let mut grad = dw[j] / total_weight;
                if let Some(c) = self.c {
                    grad += w[j] / (c * total_weight);
                }
                w[j] -= self.learning_rate * grad;
                max_grad = max_grad.max(grad.abs());
            }
            let grad_b = db / total_weight;
            b -= self.learning_rate * grad_b;
            max_grad = max_grad.max(grad_b.abs());

            if max_grad < self.tol {
                break;
            }
        }
        debug!(iterations, features = p, "logistic regression fitted");

        self.weights = Some(Tensor::from_vec(w));
        self.bias = Some(b);
        Ok(())
    }

    /// Probability of the positive class for every row.
    pub fn predict_proba(&self, x: &Tensor<T>) -> MlResult<Tensor<T>> {
        let w = self.weights.as_ref().ok_or(MlError::NotFitted)?;
        let (n, p) = x.shape().as_matrix()?;
        if p != w.numel() {
            return Err(MlError::ShapeMismatch {
                expected: vec![n, w.numel()],
                got: x.shape_vec(),
            });
        }
        let b = self.bias.unwrap_or(T::ZERO);

        let mut proba = Vec::with_capacity(n);
        for i in 0..n {
            let z = x
                .row_slice(i)?
                .iter()
                .zip(w.data())
                .fold(b, |acc, (&xj, &wj)| acc + wj * xj);
            proba.push(Self::sigmoid_val(z));
        }
        Ok(Tensor::from_vec(proba))
    }

    /// Predict class labels (threshold = 0.5).
    pub fn predict(&self, x: &Tensor<T>) -> MlResult<Tensor<T>> {
        let proba = self.predict_proba(x)?;
        Ok(proba.apply(|p| if p >= T::HALF { T::ONE } else { T::ZERO }))
    }

    /// Fitted feature coefficients.
    pub fn coefficients(&self) -> MlResult<&[T]> {
        self.weights.as_ref().map(|w| w.data()).ok_or(MlError::NotFitted)
    }

    pub fn intercept(&self) -> MlResult<T> {
        self.bias.ok_or(MlError::NotFitted)
    }
}

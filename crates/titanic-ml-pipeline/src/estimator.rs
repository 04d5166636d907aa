use titanic_ml_core::{MlError, MlResult, Tensor};
use titanic_ml_linear::LogisticRegression;
use titanic_ml_nn::MlpClassifier;
use titanic_ml_preprocessing::StandardScaler;
use titanic_ml_tree::RandomForestClassifier;

/// Unsupervised feature transformers (scalers, etc.).
pub trait Transformer: Send + Sync {
    fn fit(&mut self, x: &Tensor<f64>) -> MlResult<()>;
    fn transform(&self, x: &Tensor<f64>) -> MlResult<Tensor<f64>>;
    fn fit_transform(&mut self, x: &Tensor<f64>) -> MlResult<Tensor<f64>> {
        self.fit(x)?;
        self.transform(x)
    }
    fn box_clone(&self) -> Box<dyn Transformer>;
}

/// Supervised binary classifiers producing positive-class probabilities.
pub trait Classifier: Send + Sync {
    fn fit_weighted(
        &mut self,
        x: &Tensor<f64>,
        y: &Tensor<f64>,
        sample_weights: &[f64],
    ) -> MlResult<()>;

    fn fit(&mut self, x: &Tensor<f64>, y: &Tensor<f64>) -> MlResult<()> {
        let ones = vec![1.0; y.numel()];
        self.fit_weighted(x, y, &ones)
    }

    fn predict_proba(&self, x: &Tensor<f64>) -> MlResult<Tensor<f64>>;

    /// Label 1 where the probability is at least `threshold`.
    fn predict(&self, x: &Tensor<f64>, threshold: f64) -> MlResult<Tensor<f64>> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(MlError::invalid_parameter(
                "threshold",
                format!("must lie in [0, 1], got {}", threshold),
            ));
        }
        let proba = self.predict_proba(x)?;
        Ok(proba.apply(|p| if p >= threshold { 1.0 } else { 0.0 }))
    }

    fn name(&self) -> &'static str;

    /// Replace the seed that drives training. Deterministic models ignore it.
    fn reseed(&mut self, _seed: u64) {}

    /// A copy carrying the same hyper-parameters (and fitted state, if any).
    fn box_clone(&self) -> Box<dyn Classifier>;
}

impl Clone for Box<dyn Classifier> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

impl Clone for Box<dyn Transformer> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

impl Transformer for StandardScaler<f64> {
    fn fit(&mut self, x: &Tensor<f64>) -> MlResult<()> {
        StandardScaler::fit(self, x)
    }

    fn transform(&self, x: &Tensor<f64>) -> MlResult<Tensor<f64>> {
        StandardScaler::transform(self, x)
    }

    fn box_clone(&self) -> Box<dyn Transformer> {
        Box::new(self.clone())
    }
}

impl Classifier for LogisticRegression<f64> {
    fn fit_weighted(
        &mut self,
        x: &Tensor<f64>,
        y: &Tensor<f64>,
        sample_weights: &[f64],
    ) -> MlResult<()> {
        LogisticRegression::fit_weighted(self, x, y, sample_weights)
    }

    fn predict_proba(&self, x: &Tensor<f64>) -> MlResult<Tensor<f64>> {
        LogisticRegression::predict_proba(self, x)
    }

    fn name(&self) -> &'static str {
        "logistic"
    }

    fn box_clone(&self) -> Box<dyn Classifier> {
        Box::new(self.clone())
    }
}

impl Classifier for RandomForestClassifier<f64> {
    fn fit_weighted(
        &mut self,
        x: &Tensor<f64>,
        y: &Tensor<f64>,
        sample_weights: &[f64],
    ) -> MlResult<()> {
        RandomForestClassifier::fit_weighted(self, x, y, sample_weights)
    }

    fn predict_proba(&self, x: &Tensor<f64>) -> MlResult<Tensor<f64>> {
        RandomForestClassifier::predict_proba(self, x)
    }

    fn name(&self) -> &'static str {
        "random_forest"
    }

    fn reseed(&mut self, seed: u64) {
        self.seed = Some(seed);
    }

    fn box_clone(&self) -> Box<dyn Classifier> {
        Box::new(self.clone())
    }
}

impl Classifier for MlpClassifier {
    fn fit_weighted(
        &mut self,
        x: &Tensor<f64>,
        y: &Tensor<f64>,
        sample_weights: &[f64],
    ) -> MlResult<()> {
        MlpClassifier::fit_weighted(self, x, y, sample_weights)
    }

    fn predict_proba(&self, x: &Tensor<f64>) -> MlResult<Tensor<f64>> {
        MlpClassifier::predict_proba(self, x)
    }

    fn name(&self) -> &'static str {
        "mlp"
    }

    fn reseed(&mut self, seed: u64) {
        self.seed = seed;
    }

    fn box_clone(&self) -> Box<dyn Classifier> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> (Tensor<f64>, Tensor<f64>) {
        let x = Tensor::from_vec2d(&[vec![0.0], vec![1.0], vec![9.0], vec![10.0]]).unwrap();
        let y = Tensor::from_slice(&[0.0, 0.0, 1.0, 1.0]);
        (x, y)
    }

    #[test]
    fn test_predict_applies_threshold() {
        let (x, y) = data();
        let mut model: Box<dyn Classifier> = Box::new(LogisticRegression::new(0.1, 500));
        model.fit(&x, &y).unwrap();
        assert_eq!(model.predict(&x, 0.5).unwrap().data(), y.data());
        // a zero threshold labels everything positive
        assert_eq!(model.predict(&x, 0.0).unwrap().data(), &[1.0; 4]);
        assert!(model.predict(&x, 1.5).is_err());
    }

    #[test]
    fn test_box_clone_keeps_fitted_state() {
        let (x, y) = data();
        let mut model: Box<dyn Classifier> = Box::new(RandomForestClassifier::new(3, 2, 1.0));
        model.fit(&x, &y).unwrap();
        let copy = model.clone();
        assert_eq!(copy.name(), "random_forest");
        assert_eq!(copy.predict_proba(&x).unwrap(), model.predict_proba(&x).unwrap());
    }

    #[test]
    fn test_reseed_changes_forest() {
        let rows: Vec<Vec<f64>> = (0..30).map(|i| vec![(i % 7) as f64, (i % 5) as f64]).collect();
        let x = Tensor::from_vec2d(&rows).unwrap();
        let y = Tensor::from_vec((0..30).map(|i| ((i % 7 + i % 5) % 2) as f64).collect());
        let base = RandomForestClassifier::<f64>::new(5, 3, 0.5);

        let mut a: Box<dyn Classifier> = Box::new(base.clone());
        let mut b: Box<dyn Classifier> = Box::new(base);
        a.reseed(1);
        b.reseed(999);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_ne!(a.predict_proba(&x).unwrap(), b.predict_proba(&x).unwrap());
    }
}

use titanic_ml_core::{MlError, MlResult, Tensor};

use crate::estimator::{Classifier, Transformer};

/// Transformers followed by a final classifier.
///
/// Transformers are fitted on the rows passed to `fit` only and then reused
/// unchanged for prediction, so evaluation rows never leak into scaling.
#[derive(Clone, Default)]
pub struct Pipeline {
    transformers: Vec<Box<dyn Transformer>>,
    classifier: Option<Box<dyn Classifier>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Pipeline {
            transformers: Vec::new(),
            classifier: None,
        }
    }

    /// Add a transformer step.
    pub fn add_transformer(mut self, transformer: Box<dyn Transformer>) -> Self {
        self.transformers.push(transformer);
        self
    }

    /// Set the final classifier.
    pub fn set_classifier(mut self, classifier: Box<dyn Classifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn n_transformers(&self) -> usize {
        self.transformers.len()
    }

    fn apply_transformers(&self, x: &Tensor<f64>) -> MlResult<Tensor<f64>> {
        let mut current = x.clone();
        for t in &self.transformers {
            current = t.transform(&current)?;
        }
        Ok(current)
    }
}

impl Classifier for Pipeline {
    fn fit_weighted(
        &mut self,
        x: &Tensor<f64>,
        y: &Tensor<f64>,
        sample_weights: &[f64],
    ) -> MlResult<()> {
        let classifier = self
            .classifier
            .as_mut()
            .ok_or_else(|| MlError::InvalidOperation("pipeline has no classifier".into()))?;

        let mut current = x.clone();
        for t in &mut self.transformers {
            current = t.fit_transform(&current)?;
        }
        classifier.fit_weighted(&current, y, sample_weights)
    }

    fn predict_proba(&self, x: &Tensor<f64>) -> MlResult<Tensor<f64>> {
        let classifier = self
            .classifier
            .as_ref()
            .ok_or_else(|| MlError::InvalidOperation("pipeline has no classifier".into()))?;
        classifier.predict_proba(&self.apply_transformers(x)?)
    }

    fn name(&self) -> &'static str {
        self.classifier.as_ref().map_or("pipeline", |c| c.name())
    }

    fn reseed(&mut self, seed: u64) {
        if let Some(classifier) = self.classifier.as_mut() {
            classifier.reseed(seed);
        }
    }

    fn box_clone(&self) -> Box<dyn Classifier> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use titanic_ml_linear::LogisticRegression;
    use titanic_ml_preprocessing::StandardScaler;

    #[test]
    fn test_pipeline_scales_then_classifies() {
        // large raw magnitudes: only learnable quickly after scaling
        let x = Tensor::from_vec2d(&[
            vec![1000.0], vec![1100.0], vec![1200.0],
            vec![5000.0], vec![5100.0], vec![5200.0],
        ]).unwrap();
        let y = Tensor::from_slice(&[0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);

        let mut pipe = Pipeline::new()
            .add_transformer(Box::new(StandardScaler::<f64>::new()))
            .set_classifier(Box::new(LogisticRegression::new(0.5, 200)));
        pipe.fit(&x, &y).unwrap();
        assert_eq!(pipe.n_transformers(), 1);
        assert_eq!(pipe.name(), "logistic");
        assert_eq!(pipe.predict(&x, 0.5).unwrap().data(), y.data());
    }

    #[test]
    fn test_pipeline_without_classifier() {
        let x = Tensor::from_vec2d(&[vec![1.0]]).unwrap();
        let y = Tensor::from_slice(&[1.0]);
        let mut pipe = Pipeline::new();
        assert!(pipe.fit(&x, &y).is_err());
        assert!(pipe.predict_proba(&x).is_err());
    }
}

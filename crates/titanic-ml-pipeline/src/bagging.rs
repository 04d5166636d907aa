use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use titanic_ml_core::{MlError, MlResult, Tensor};
use tracing::debug;

use crate::estimator::Classifier;

/// Bootstrap aggregation over copies of a base classifier.
///
/// Each estimator is an unfitted clone of `base`, reseeded with its own seed
/// and trained on a bootstrap sample of `max_samples` × n rows; probabilities
/// are averaged.
#[derive(Clone)]
pub struct BaggingClassifier {
    base: Box<dyn Classifier>,
    pub n_estimators: usize,
    pub max_samples: f64,
    pub seed: Option<u64>,
    estimators: Vec<Box<dyn Classifier>>,
}

impl BaggingClassifier {
    pub fn new(base: Box<dyn Classifier>, n_estimators: usize) -> Self {
        BaggingClassifier {
            base,
            n_estimators,
            max_samples: 1.0,
            seed: Some(42),
            estimators: Vec::new(),
        }
    }

    pub fn with_max_samples(mut self, max_samples: f64) -> Self {
        self.max_samples = max_samples;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn n_fitted(&self) -> usize {
        self.estimators.len()
    }
}

impl Classifier for BaggingClassifier {
    fn fit_weighted(
        &mut self,
        x: &Tensor<f64>,
        y: &Tensor<f64>,
        sample_weights: &[f64],
    ) -> MlResult<()> {
        let n = x.nrows()?;
        if n == 0 {
            return Err(MlError::EmptyInput);
        }
        if y.numel() != n || sample_weights.len() != n {
            return Err(MlError::LengthMismatch {
                observed: n,
                predicted: if y.numel() != n { y.numel() } else { sample_weights.len() },
            });
        }
        if self.n_estimators == 0 {
            return Err(MlError::invalid_parameter("n_estimators", "must be at least 1"));
        }
        if !(self.max_samples > 0.0 && self.max_samples <= 1.0) {
            return Err(MlError::invalid_parameter(
                "max_samples",
                format!("must lie in (0, 1], got {}", self.max_samples),
            ));
        }
        let draws = ((n as f64 * self.max_samples).round() as usize).max(1);

        let mut rng = match self.seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        let samples: Vec<(u64, Vec<usize>)> = (0..self.n_estimators)
            .map(|_| {
                let rows: Vec<usize> = (0..draws).map(|_| rng.gen_range(0..n)).collect();
                let seed: u64 = rng.gen();
                (seed, rows)
            })
            .collect();

        let base = &self.base;
        let estimators = samples
            .par_iter()
            .map(|(seed, rows)| {
                let mut model = base.box_clone();
                model.reseed(*seed);
                let w: Vec<f64> = rows.iter().map(|&i| sample_weights[i]).collect();
                model.fit_weighted(&x.select_rows(rows)?, &y.select_rows(rows)?, &w)?;
                Ok(model)
            })
            .collect::<MlResult<Vec<_>>>()?;

        debug!(estimators = estimators.len(), draws, base = self.base.name(), "bagging fitted");
        self.estimators = estimators;
        Ok(())
    }

    fn predict_proba(&self, x: &Tensor<f64>) -> MlResult<Tensor<f64>> {
        if self.estimators.is_empty() {
            return Err(MlError::NotFitted);
        }
        let n = x.nrows()?;
        let per_model = self
            .estimators
            .par_iter()
            .map(|m| m.predict_proba(x))
            .collect::<MlResult<Vec<_>>>()?;

        let k = per_model.len() as f64;
        let proba = (0..n)
            .map(|i| per_model.iter().map(|p| p.data()[i]).sum::<f64>() / k)
            .collect();
        Ok(Tensor::from_vec(proba))
    }

    fn name(&self) -> &'static str {
        "bagging"
    }

    fn reseed(&mut self, seed: u64) {
        self.seed = Some(seed);
    }

    fn box_clone(&self) -> Box<dyn Classifier> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use titanic_ml_linear::LogisticRegression;
    use titanic_ml_tree::RandomForestClassifier;

    fn data() -> (Tensor<f64>, Tensor<f64>) {
        let rows: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64 / 2.0]).collect();
        let labels = (0..20).map(|i| if i >= 10 { 1.0 } else { 0.0 }).collect();
        (Tensor::from_vec2d(&rows).unwrap(), Tensor::from_vec(labels))
    }

    #[test]
    fn test_bagging_averages_estimators() {
        let (x, y) = data();
        let mut bag = BaggingClassifier::new(Box::new(LogisticRegression::new(0.5, 300)), 5);
        bag.fit(&x, &y).unwrap();
        assert_eq!(bag.n_fitted(), 5);
        let proba = bag.predict_proba(&x).unwrap();
        assert!(proba.data()[0] < 0.5);
        assert!(proba.data()[19] > 0.5);
    }

    #[test]
    fn test_bagging_is_seeded() {
        let (x, y) = data();
        let base: Box<dyn Classifier> = Box::new(LogisticRegression::new(0.5, 100));
        let mut a = BaggingClassifier::new(base.clone(), 4).with_max_samples(0.8);
        let mut b = BaggingClassifier::new(base, 4).with_max_samples(0.8);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict_proba(&x).unwrap(), b.predict_proba(&x).unwrap());
    }

    #[test]
    fn test_bagged_estimators_get_distinct_seeds() {
        let (x, y) = data();
        let base = RandomForestClassifier::<f64>::new(3, 2, 1.0);
        let mut bag = BaggingClassifier::new(Box::new(base.clone()), 2).with_seed(Some(5));
        bag.fit(&x, &y).unwrap();

        // replay the bagging draws: bootstrap rows, then the estimator seed
        let mut rng = StdRng::seed_from_u64(5);
        for model in &bag.estimators {
            let rows: Vec<usize> = (0..20).map(|_| rng.gen_range(0..20)).collect();
            let mut forest = base.clone();
            forest.seed = Some(rng.gen());
            let (xb, yb) = (x.select_rows(&rows).unwrap(), y.select_rows(&rows).unwrap());
            Classifier::fit(&mut forest, &xb, &yb).unwrap();
            assert_eq!(model.predict_proba(&x).unwrap(), forest.predict_proba(&x).unwrap());
            assert_ne!(forest.seed, base.seed);
        }
    }

    #[test]
    fn test_bagging_errors() {
        let (x, y) = data();
        let bag = BaggingClassifier::new(Box::new(LogisticRegression::new(0.5, 10)), 3);
        assert_eq!(bag.predict_proba(&x).unwrap_err(), MlError::NotFitted);
        let mut bad = BaggingClassifier::new(Box::new(LogisticRegression::new(0.5, 10)), 3)
            .with_max_samples(0.0);
        assert!(bad.fit(&x, &y).is_err());
    }
}

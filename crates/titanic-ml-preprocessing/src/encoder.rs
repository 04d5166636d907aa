use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use titanic_ml_core::{Float, MlError, MlResult, Tensor};

/// One-hot encode string categories (e.g. port of embarkation, cabin deck).
///
/// Categories are sorted; an unseen or missing value encodes as all zeros.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OneHotEncoder {
    pub categories: Vec<String>,
}

impl OneHotEncoder {
    pub fn new() -> Self {
        OneHotEncoder {
            categories: Vec::new(),
        }
    }

    /// Learn the category set. Empty strings are treated as missing.
    pub fn fit(&mut self, values: &[String]) {
        let unique: BTreeSet<&String> = values.iter().filter(|v| !v.is_empty()).collect();
        self.categories = unique.into_iter().cloned().collect();
    }

    /// Encode values into a `[n, n_categories]` indicator matrix.
    pub fn transform<T: Float>(&self, values: &[String]) -> MlResult<Tensor<T>> {
        if self.categories.is_empty() {
            return Err(MlError::NotFitted);
        }
        let k = self.categories.len();
        let mut data = vec![T::ZERO; values.len() * k];
        for (i, v) in values.iter().enumerate() {
            if let Ok(pos) = self.categories.binary_search(v) {
                data[i * k + pos] = T::ONE;
            }
        }
        Tensor::new(data, vec![values.len(), k])
    }

    pub fn fit_transform<T: Float>(&mut self, values: &[String]) -> MlResult<Tensor<T>> {
        self.fit(values);
        self.transform(values)
    }

    /// Output column names as `<prefix>_<category>`.
    pub fn feature_names(&self, prefix: &str) -> Vec<String> {
        self.categories
            .iter()
            .map(|c| format!("{}_{}", prefix, c))
            .collect()
    }

    pub fn n_categories(&self) -> usize {
        self.categories.len()
    }
}

/// One-hot encode integer codes into a binary matrix.
pub fn one_hot_encode<T: Float>(codes: &Tensor<T>, n_classes: usize) -> MlResult<Tensor<T>> {
    let n = codes.numel();
    let mut data = vec![T::ZERO; n * n_classes];
    for (i, &v) in codes.data().iter().enumerate() {
        let cls = v.to_f64().round();
        if cls < 0.0 || cls as usize >= n_classes {
            return Err(MlError::IndexOutOfBounds {
                index: cls.max(0.0) as usize,
                axis: 1,
                size: n_classes,
            });
        }
        data[i * n_classes + cls as usize] = T::ONE;
    }
    Tensor::new(data, vec![n, n_classes])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ports() -> Vec<String> {
        ["S", "C", "S", "Q", ""].iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_one_hot_encoder() {
        let mut enc = OneHotEncoder::new();
        let m: Tensor<f64> = enc.fit_transform(&ports()).unwrap();
        assert_eq!(enc.categories, vec!["C", "Q", "S"]);
        assert_eq!(m.shape_vec(), vec![5, 3]);
        assert_eq!(m.row(0).unwrap().data(), &[0.0, 0.0, 1.0]);
        assert_eq!(m.row(1).unwrap().data(), &[1.0, 0.0, 0.0]);
        // missing value → no indicator set
        assert_eq!(m.row(4).unwrap().data(), &[0.0, 0.0, 0.0]);
        assert_eq!(enc.feature_names("Embarked"), vec!["Embarked_C", "Embarked_Q", "Embarked_S"]);
    }

    #[test]
    fn test_unfitted_encoder() {
        assert!(OneHotEncoder::new().transform::<f64>(&ports()).is_err());
    }

    #[test]
    fn test_one_hot_codes() {
        let labels: Tensor<f64> = Tensor::from_slice(&[0.0, 1.0, 2.0, 1.0]);
        let oh = one_hot_encode(&labels, 3).unwrap();
        assert_eq!(oh.shape_vec(), vec![4, 3]);
        assert_eq!(oh.get(&[0, 0]).unwrap(), 1.0);
        assert_eq!(oh.get(&[2, 2]).unwrap(), 1.0);
        assert_eq!(oh.get(&[3, 1]).unwrap(), 1.0);
        assert!(one_hot_encode(&labels, 2).is_err());
    }
}

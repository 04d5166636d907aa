use serde::{Deserialize, Serialize};
use titanic_ml_core::{Float, MlError, MlResult, Tensor};

/// Standardize features by removing the mean and scaling to unit variance.
///
/// Fit on training rows only, then apply the same statistics to test rows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(bound = "T: Float")]
pub struct StandardScaler<T: Float> {
    pub mean: Option<Tensor<T>>,
    pub std: Option<Tensor<T>>,
}

impl<T: Float> StandardScaler<T> {
    pub fn new() -> Self {
        StandardScaler {
            mean: None,
            std: None,
        }
    }

    /// Compute column mean and std from training data (2D: [samples, features]).
    pub fn fit(&mut self, x: &Tensor<T>) -> MlResult<()> {
        self.mean = Some(x.mean_axis0()?);
        self.std = Some(x.std_axis0()?);
        Ok(())
    }

    /// Transform data using the fitted statistics.
    ///
    /// Constant columns (zero std) are centred but not scaled.
    pub fn transform(&self, x: &Tensor<T>) -> MlResult<Tensor<T>> {
        let mean = self.mean.as_ref().ok_or(MlError::NotFitted)?;
        let std = self.std.as_ref().ok_or(MlError::NotFitted)?;
        let (rows, cols) = x.shape().as_matrix()?;
        if cols != mean.numel() {
            return Err(MlError::ShapeMismatch {
                expected: vec![rows, mean.numel()],
                got: x.shape_vec(),
            });
        }

        let mut out = x.clone();
        for (k, v) in out.data_mut().iter_mut().enumerate() {
            let j = k % cols;
            let s = std.data()[j];
            let s = if s.abs() < T::EPSILON { T::ONE } else { s };
            *v = (*v - mean.data()[j]) / s;
        }
        Ok(out)
    }

    /// Fit and transform in one step.
    pub fn fit_transform(&mut self, x: &Tensor<T>) -> MlResult<Tensor<T>> {
        self.fit(x)?;
        self.transform(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_standard_scaler() {
        let x: Tensor<f64> = Tensor::from_vec2d(&[
            vec![1.0, 2.0],
            vec![3.0, 4.0],
            vec![5.0, 6.0],
        ]).unwrap();

        let mut scaler = StandardScaler::new();
        let transformed = scaler.fit_transform(&x).unwrap();

        let mean = transformed.mean_axis0().unwrap();
        assert_abs_diff_eq!(mean.data()[0], 0.0, epsilon = 1e-10);
        assert_abs_diff_eq!(mean.data()[1], 0.0, epsilon = 1e-10);
        let std = transformed.std_axis0().unwrap();
        assert_abs_diff_eq!(std.data()[0], 1.0, epsilon = 1e-10);
    }

    #[test]
    fn test_constant_column_is_centred() {
        let x: Tensor<f64> = Tensor::from_vec2d(&[vec![7.0, 1.0], vec![7.0, 3.0]]).unwrap();
        let t = StandardScaler::new().fit_transform(&x).unwrap();
        assert_eq!(t.get(&[0, 0]).unwrap(), 0.0);
        assert_eq!(t.get(&[1, 0]).unwrap(), 0.0);
    }

    #[test]
    fn test_unfitted_and_wrong_width() {
        let x: Tensor<f64> = Tensor::from_vec2d(&[vec![1.0, 2.0]]).unwrap();
        assert_eq!(StandardScaler::new().transform(&x).unwrap_err(), MlError::NotFitted);

        let mut scaler = StandardScaler::new();
        scaler.fit(&x).unwrap();
        let wide: Tensor<f64> = Tensor::from_vec2d(&[vec![1.0, 2.0, 3.0]]).unwrap();
        assert!(scaler.transform(&wide).is_err());
    }
}

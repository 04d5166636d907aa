use crate::dtype::Float;
use crate::error::{MlError, MlResult};
use crate::shape::Shape;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Dense row-major tensor holding feature matrices (`[rows, cols]`) and label
/// or probability vectors (`[n]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "T: Float")]
pub struct Tensor<T: Float> {
    data: Vec<T>,
    shape: Shape,
}

// ─── Construction ───────────────────────────────────────────────────────────

impl<T: Float> Tensor<T> {
    /// Create a tensor from raw data and shape.
    pub fn new(data: Vec<T>, shape: Vec<usize>) -> MlResult<Self> {
        let s = Shape::new(shape);
        if data.len() != s.numel() {
            return Err(MlError::ShapeMismatch {
                expected: s.to_vec(),
                got: vec![data.len()],
            });
        }
        Ok(Tensor { data, shape: s })
    }

    /// Create a tensor filled with zeros.
    pub fn zeros(shape: Vec<usize>) -> Self {
        Self::full(shape, T::ZERO)
    }

    /// Create a tensor filled with a constant value.
    pub fn full(shape: Vec<usize>, value: T) -> Self {
        let s = Shape::new(shape);
        Tensor {
            data: vec![value; s.numel()],
            shape: s,
        }
    }

    /// Create a 1-D tensor from a slice.
    pub fn from_slice(data: &[T]) -> Self {
        Tensor {
            data: data.to_vec(),
            shape: Shape::vector(data.len()),
        }
    }

    /// Create a 1-D tensor taking ownership of the values.
    pub fn from_vec(data: Vec<T>) -> Self {
        let n = data.len();
        Tensor {
            data,
            shape: Shape::vector(n),
        }
    }

    /// Create a 2-D tensor from a nested slice.
    pub fn from_vec2d(data: &[Vec<T>]) -> MlResult<Self> {
        if data.is_empty() {
            return Ok(Tensor::zeros(vec![0, 0]));
        }
        let rows = data.len();
        let cols = data[0].len();
        if data.iter().any(|row| row.len() != cols) {
            return Err(MlError::InvalidOperation(
                "All rows must have the same number of columns".to_string(),
            ));
        }
        let flat: Vec<T> = data.iter().flat_map(|r| r.iter().copied()).collect();
        Tensor::new(flat, vec![rows, cols])
    }

    /// Standard-normal samples (Box-Muller) from a seeded generator.
    pub fn randn(shape: Vec<usize>, seed: u64) -> Self {
        let s = Shape::new(shape);
        let mut rng = StdRng::seed_from_u64(seed);
        let n = s.numel();
        let mut data = Vec::with_capacity(n + 1);
        while data.len() < n {
            let u1: f64 = rng.gen::<f64>().max(1e-10);
            let u2: f64 = rng.gen::<f64>();
            let r = (-2.0 * u1.ln()).sqrt();
            let theta = 2.0 * std::f64::consts::PI * u2;
            data.push(T::from_f64(r * theta.cos()));
            data.push(T::from_f64(r * theta.sin()));
        }
        data.truncate(n);
        Tensor { data, shape: s }
    }

    // ─── Accessors ──────────────────────────────────────────────────────────

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn shape_vec(&self) -> Vec<usize> {
        self.shape.to_vec()
    }

    pub fn ndim(&self) -> usize {
        self.shape.ndim()
    }

    pub fn numel(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<T> {
        self.data
    }

    /// Number of rows of a 2-D tensor (or length of a 1-D one).
    pub fn nrows(&self) -> MlResult<usize> {
        self.shape.dim(0)
    }

    /// Number of columns of a 2-D tensor.
    pub fn ncols(&self) -> MlResult<usize> {
        self.shape.dim(1)
    }

    fn offset(&self, indices: &[usize]) -> MlResult<usize> {
        if indices.len() != self.ndim() {
            return Err(MlError::InvalidOperation(format!(
                "Expected {} indices, got {}",
                self.ndim(),
                indices.len()
            )));
        }
        let strides = self.shape.strides();
        let mut offset = 0;
        for (axis, &idx) in indices.iter().enumerate() {
            let size = self.shape.dim(axis)?;
            if idx >= size {
                return Err(MlError::IndexOutOfBounds {
                    index: idx,
                    axis,
                    size,
                });
            }
            offset += idx * strides[axis];
        }
        Ok(offset)
    }

    /// Multi-dimensional indexing.
    pub fn get(&self, indices: &[usize]) -> MlResult<T> {
        Ok(self.data[self.offset(indices)?])
    }

    /// Set a single element.
    pub fn set(&mut self, indices: &[usize], value: T) -> MlResult<()> {
        let offset = self.offset(indices)?;
        self.data[offset] = value;
        Ok(())
    }

    /// Borrow row `i` of a 2-D tensor as a slice.
    pub fn row_slice(&self, i: usize) -> MlResult<&[T]> {
        let (rows, cols) = self.shape.as_matrix()?;
        if i >= rows {
            return Err(MlError::IndexOutOfBounds {
                index: i,
                axis: 0,
                size: rows,
            });
        }
        Ok(&self.data[i * cols..(i + 1) * cols])
    }

    /// Extract a row from a 2-D tensor.
    pub fn row(&self, i: usize) -> MlResult<Tensor<T>> {
        Ok(Tensor::from_slice(self.row_slice(i)?))
    }

    /// Extract a column from a 2-D tensor.
    pub fn col(&self, j: usize) -> MlResult<Tensor<T>> {
        let (rows, cols) = self.shape.as_matrix()?;
        if j >= cols {
            return Err(MlError::IndexOutOfBounds {
                index: j,
                axis: 1,
                size: cols,
            });
        }
        let data: Vec<T> = (0..rows).map(|i| self.data[i * cols + j]).collect();
        Ok(Tensor::from_vec(data))
    }

    // ─── Selection ──────────────────────────────────────────────────────────

    /// Gather rows (2-D) or elements (1-D) in the order given by `indices`.
    /// Indices may repeat, which is how bootstrap samples are built.
    pub fn select_rows(&self, indices: &[usize]) -> MlResult<Tensor<T>> {
        match self.ndim() {
            1 => {
                let n = self.data.len();
                let mut data = Vec::with_capacity(indices.len());
                for &i in indices {
                    if i >= n {
                        return Err(MlError::IndexOutOfBounds {
                            index: i,
                            axis: 0,
                            size: n,
                        });
                    }
                    data.push(self.data[i]);
                }
                Ok(Tensor::from_vec(data))
            }
            2 => {
                let cols = self.shape.dim(1)?;
                let mut data = Vec::with_capacity(indices.len() * cols);
                for &i in indices {
                    data.extend_from_slice(self.row_slice(i)?);
                }
                Tensor::new(data, vec![indices.len(), cols])
            }
            ndim => Err(MlError::InvalidOperation(format!(
                "select_rows() is not defined for {}-D tensors",
                ndim
            ))),
        }
    }

    /// Keep only the listed columns of a 2-D tensor, in the given order.
    pub fn select_cols(&self, columns: &[usize]) -> MlResult<Tensor<T>> {
        let (rows, cols) = self.shape.as_matrix()?;
        if let Some(&bad) = columns.iter().find(|&&c| c >= cols) {
            return Err(MlError::IndexOutOfBounds {
                index: bad,
                axis: 1,
                size: cols,
            });
        }
        let mut data = Vec::with_capacity(rows * columns.len());
        for i in 0..rows {
            let row = &self.data[i * cols..(i + 1) * cols];
            data.extend(columns.iter().map(|&c| row[c]));
        }
        Tensor::new(data, vec![rows, columns.len()])
    }

    /// Stack tensors with equal trailing dimensions along axis 0.
    pub fn vstack(tensors: &[&Tensor<T>]) -> MlResult<Tensor<T>> {
        let first = tensors.first().ok_or(MlError::EmptyInput)?;
        let tail = first.shape.dims().get(1..).unwrap_or(&[]).to_vec();
        let mut data = Vec::new();
        let mut rows = 0;
        for t in tensors {
            let t_tail = t.shape.dims().get(1..).unwrap_or(&[]).to_vec();
            if t.ndim() != first.ndim() || t_tail != tail {
                return Err(MlError::ShapeMismatch {
                    expected: first.shape_vec(),
                    got: t.shape_vec(),
                });
            }
            rows += t.shape.dim(0)?;
            data.extend_from_slice(&t.data);
        }
        let mut shape = vec![rows];
        shape.extend(tail);
        Tensor::new(data, shape)
    }

    // ─── Element-wise ───────────────────────────────────────────────────────

    pub fn apply<F: Fn(T) -> T>(&self, f: F) -> Tensor<T> {
        Tensor {
            data: self.data.iter().map(|&x| f(x)).collect(),
            shape: self.shape.clone(),
        }
    }

    // ─── Reductions ─────────────────────────────────────────────────────────

    pub fn sum_all(&self) -> T {
        self.data.iter().copied().sum()
    }

    pub fn mean_all(&self) -> T {
        self.sum_all() / T::from_usize(self.data.len())
    }

    /// Column means of a 2-D tensor.
    pub fn mean_axis0(&self) -> MlResult<Tensor<T>> {
        let (rows, cols) = self.shape.as_matrix()?;
        if rows == 0 {
            return Err(MlError::EmptyInput);
        }
        let mut sums = vec![T::ZERO; cols];
        for i in 0..rows {
            for (s, &v) in sums.iter_mut().zip(&self.data[i * cols..(i + 1) * cols]) {
                *s += v;
            }
        }
        let n = T::from_usize(rows);
        Ok(Tensor::from_vec(sums.into_iter().map(|s| s / n).collect()))
    }

    /// Column population standard deviations of a 2-D tensor.
    pub fn std_axis0(&self) -> MlResult<Tensor<T>> {
        let (rows, cols) = self.shape.as_matrix()?;
        let mean = self.mean_axis0()?;
        let mut acc = vec![T::ZERO; cols];
        for i in 0..rows {
            for j in 0..cols {
                let d = self.data[i * cols + j] - mean.data[j];
                acc[j] += d * d;
            }
        }
        let n = T::from_usize(rows);
        Ok(Tensor::from_vec(acc.into_iter().map(|v| (v / n).sqrt()).collect()))
    }
}

impl<T: Float> fmt::Display for Tensor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tensor{} [", self.shape)?;
        for (i, v) in self.data.iter().take(8).enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{:.4}", v)?;
        }
        if self.data.len() > 8 {
            write!(f, ", ...")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn sample() -> Tensor<f64> {
        Tensor::from_vec2d(&[vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]]).unwrap()
    }

    #[test]
    fn test_new_rejects_bad_shape() {
        let err = Tensor::<f64>::new(vec![1.0, 2.0, 3.0], vec![2, 2]).unwrap_err();
        assert!(matches!(err, MlError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_get_and_col() {
        let t = sample();
        assert_eq!(t.get(&[2, 1]).unwrap(), 6.0);
        assert_eq!(t.col(0).unwrap().data(), &[1.0, 3.0, 5.0]);
        assert!(t.get(&[3, 0]).is_err());
    }

    #[test]
    fn test_select_rows_allows_repeats() {
        let t = sample();
        let s = t.select_rows(&[2, 0, 2]).unwrap();
        assert_eq!(s.shape_vec(), vec![3, 2]);
        assert_eq!(s.data(), &[5.0, 6.0, 1.0, 2.0, 5.0, 6.0]);

        let y = Tensor::from_slice(&[0.0, 1.0, 1.0]);
        assert_eq!(y.select_rows(&[1, 0]).unwrap().data(), &[1.0, 0.0]);
    }

    #[test]
    fn test_select_cols() {
        let t = sample();
        let s = t.select_cols(&[1]).unwrap();
        assert_eq!(s.shape_vec(), vec![3, 1]);
        assert_eq!(s.data(), &[2.0, 4.0, 6.0]);
        assert!(t.select_cols(&[2]).is_err());
    }

    #[test]
    fn test_vstack() {
        let a = sample();
        let b = Tensor::from_vec2d(&[vec![7.0, 8.0]]).unwrap();
        let s = Tensor::vstack(&[&a, &b]).unwrap();
        assert_eq!(s.shape_vec(), vec![4, 2]);
        assert_eq!(s.get(&[3, 1]).unwrap(), 8.0);

        let bad = Tensor::from_vec2d(&[vec![1.0, 2.0, 3.0]]).unwrap();
        assert!(Tensor::vstack(&[&a, &bad]).is_err());
    }

    #[test]
    fn test_column_stats() {
        let t = sample();
        let mean = t.mean_axis0().unwrap();
        assert_abs_diff_eq!(mean.data()[0], 3.0, epsilon = 1e-12);
        let std = t.std_axis0().unwrap();
        assert_abs_diff_eq!(std.data()[1], (8.0f64 / 3.0).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_randn_is_deterministic() {
        let a: Tensor<f64> = Tensor::randn(vec![3, 3], 7);
        let b: Tensor<f64> = Tensor::randn(vec![3, 3], 7);
        assert_eq!(a, b);
        assert_eq!(a.numel(), 9);
    }
}

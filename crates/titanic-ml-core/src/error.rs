use thiserror::Error;

/// Error type shared by every titanic-ml crate.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MlError {
    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error("Index out of bounds: index {index} for axis {axis} with size {size}")]
    IndexOutOfBounds {
        index: usize,
        axis: usize,
        size: usize,
    },

    #[error("Invalid axis: {axis} for tensor with {ndim} dimensions")]
    InvalidAxis { axis: usize, ndim: usize },

    #[error("Length mismatch: observed has {observed} labels, predicted has {predicted}")]
    LengthMismatch { observed: usize, predicted: usize },

    #[error("Label {value} at position {index} is not binary (expected 0 or 1)")]
    NonBinaryLabel { index: usize, value: f64 },

    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Model not fitted")]
    NotFitted,

    #[error("Empty input")]
    EmptyInput,
}

impl MlError {
    pub fn invalid_parameter(name: &'static str, reason: impl Into<String>) -> Self {
        MlError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

pub type MlResult<T> = Result<T, MlError>;

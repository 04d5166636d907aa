use thiserror::Error;
use titanic_ml_core::MlError;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Ml(#[from] MlError),

    #[error("Column `{0}` not found")]
    MissingColumn(String),

    #[error("Column `{column}` row {row}: `{value}` is not a number")]
    NotNumeric {
        column: String,
        row: usize,
        value: String,
    },

    #[error("Column `{column}` is categorical; one-hot encode it first")]
    Categorical { column: String },

    #[error("Column `{column}` has {count} missing values; impute or drop it first")]
    MissingValues { column: String, count: usize },
}

pub type IoResult<T> = Result<T, IoError>;

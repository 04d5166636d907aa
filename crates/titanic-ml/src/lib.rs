//! # titanic-ml
//!
//! Tools for evaluating binary classifiers on small tabular data such as the
//! Titanic passenger list.
//!
//! ## Modules
//!
//! - **core**: `Tensor`, the `Float` trait and the shared `MlError`
//! - **metrics**: confusion counts, the eighteen accuracy metrics, per-trial
//!   summaries, ROC/AUC, log loss
//! - **preprocessing**: standard scaling, one-hot encoding, stratified splits
//!   and k-fold, resampling, class weights
//! - **data**: `Dataset` trait and a seeded mini-batch `DataLoader`
//! - **linear**: weighted, L2-regularised logistic regression
//! - **tree**: CART decision tree and random forest classifiers
//! - **nn**: multi-layer perceptron trained with Adam
//! - **pipeline**: `Classifier`/`Transformer` traits, pipelines, bagging, `ModelConfig`
//! - **selection**: cross-validation, threshold analysis, learning curves, feature selection
//! - **io**: CSV tables, metric tables, JSON reports
//! - **datasets**: synthetic imbalanced and Titanic-like data
//!
//! ```
//! use titanic_ml::metrics::binary_metrics;
//!
//! let observed = [1.0, 0.0, 1.0, 0.0];
//! let predicted = [1.0, 0.0, 0.0, 0.0];
//! let m = binary_metrics(&observed, &predicted).unwrap();
//! assert_eq!(m.accuracy, 0.75);
//! assert_eq!(m.precision, 1.0);
//! ```

/// Core tensor type and errors.
pub use titanic_ml_core as core;

/// Accuracy metrics.
pub use titanic_ml_metrics as metrics;

/// Data preprocessing.
pub use titanic_ml_preprocessing as preprocessing;

/// Data loading utilities.
pub use titanic_ml_data as data;

/// Linear models.
pub use titanic_ml_linear as linear;

/// Tree-based models.
pub use titanic_ml_tree as tree;

/// Neural networks.
pub use titanic_ml_nn as nn;

/// Pipeline API.
pub use titanic_ml_pipeline as pipeline;

/// Model evaluation and selection.
pub use titanic_ml_selection as selection;

/// I/O utilities.
pub use titanic_ml_io as io;

/// Synthetic datasets.
pub use titanic_ml_datasets as datasets;

pub use titanic_ml_core::{MlError, MlResult, Tensor};
pub use titanic_ml_metrics::{binary_metrics, BinaryMetrics, ConfusionCounts, MetricsSummary};

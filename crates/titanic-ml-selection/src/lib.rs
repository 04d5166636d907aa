//! Model evaluation: stratified cross-validation with optional resampling of
//! the training folds, threshold and learning-curve analysis, and feature
//! selection.

pub mod imbalance;
pub mod cross_validation;
pub mod threshold;
pub mod learning_curve;
pub mod feature_selection;

pub use imbalance::*;
pub use cross_validation::*;
pub use threshold::*;
pub use learning_curve::*;
pub use feature_selection::*;

pub mod estimator;
pub mod pipeline;
pub mod bagging;
pub mod model;

pub use estimator::*;
pub use pipeline::*;
pub use bagging::*;
pub use model::*;

pub mod binary;
pub mod summary;
pub mod roc;
pub mod probabilistic;
pub mod nullable;

pub use binary::*;
pub use summary::*;
pub use roc::*;
pub use probabilistic::*;

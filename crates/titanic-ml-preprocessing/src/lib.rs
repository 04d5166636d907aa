pub mod scaler;
pub mod encoder;
pub mod split;
pub mod kfold;
pub mod resample;

pub use scaler::*;
pub use encoder::*;
pub use split::*;
pub use kfold::*;
pub use resample::*;

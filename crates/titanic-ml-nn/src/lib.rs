pub mod layers;
pub mod optimizer;
pub mod mlp;

pub use layers::*;
pub use optimizer::*;
pub use mlp::*;

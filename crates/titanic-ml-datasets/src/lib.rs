pub mod synthetic;
pub mod titanic;

pub use synthetic::*;
pub use titanic::*;

pub mod error;
pub mod table;
pub mod csv_io;
pub mod json_io;

pub use error::*;
pub use table::*;
pub use csv_io::*;
pub use json_io::*;

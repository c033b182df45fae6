pub mod config;
pub mod result;
pub mod table;
pub mod tag;

pub use table::{RunTable, TableError};
pub use tag::TagPattern;

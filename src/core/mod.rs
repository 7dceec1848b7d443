// Core data structures for survey tables
pub mod column;
pub mod error;

// Re-exports for convenience
pub use column::{Column, ColumnType};
pub use error::{Error, Result};

//! Common types shared across the data loader crates.

pub mod error;
pub mod types;

pub use error::{LoaderError, LoaderResult};
pub use types::{ColumnSpec, DataType, FormatKey, Record, Value, MAX_COLUMN_WIDTH};

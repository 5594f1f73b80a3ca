//! Table store sink trait abstraction.
//!
//! This crate defines the `TableSink` trait that the CSV loader writes
//! through. `dynamodb-sink` implements it against Amazon DynamoDB, and
//! [`MemorySink`] implements it in-process for tests.
//!
//! Rows are plain column-name to cell-value maps. Interpreting the cell
//! text (strings, numbers, key types) is left to the sink implementation.

mod memory;
mod traits;
mod types;

pub use memory::MemorySink;
pub use traits::TableSink;
pub use types::{BatchOutcome, KeyAttribute, KeyKind, PartialWrite, Row, TableInfo};

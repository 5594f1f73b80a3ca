//! DynamoDB table sink.
//!
//! Implements `TableSink` on top of `DescribeTable` and `BatchWriteItem`.
//! A logical batch from the loader is split into service-sized requests,
//! and items DynamoDB returns as unprocessed are resubmitted with backoff.

mod connect;
mod convert;
mod sink_impl;
mod write;

pub use connect::{DynamoDbOpts, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_BASE_DELAY};
pub use convert::{row_to_item, ValueMode};
pub use sink_impl::DynamoDbSink;
pub use write::MAX_BATCH_WRITE_ITEMS;

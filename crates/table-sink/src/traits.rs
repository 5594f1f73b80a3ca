//! TableSink trait definition.
//!
//! The loader only needs two things from a table store: a way to resolve the
//! destination before any data moves, and a batch-write call.

use crate::types::{BatchOutcome, Row, TableInfo};
use anyhow::Result;

/// Trait for writing batches of rows into a table store.
///
/// # Usage Pattern
///
/// The loader is generic over the sink, so calls are statically dispatched:
///
/// ```ignore
/// pub async fn load<S: TableSink + 'static>(config: &LoadConfig, sink: Arc<S>) -> Result<LoadReport, LoadError> {
///     let table = sink.describe_table(&config.table).await?;
///     sink.write_batch(&table, &batch).await?;
/// }
/// ```
///
/// `write_batch` takes the [`TableInfo`] returned by `describe_table`, so a
/// batch cannot be submitted against a table that was never resolved.
#[async_trait::async_trait]
pub trait TableSink: Send + Sync {
    /// Resolve the destination table.
    ///
    /// Fails when the table does not exist or cannot be described with the
    /// current credentials.
    async fn describe_table(&self, name: &str) -> Result<TableInfo>;

    /// Submit one batch of rows as a single logical batch-write.
    ///
    /// Returns how many rows were applied and how many the store gave up on.
    /// Request-level failures (validation, access denied, exhausted SDK
    /// retries) are returned as errors.
    async fn write_batch(&self, table: &TableInfo, rows: &[Row]) -> Result<BatchOutcome>;
}

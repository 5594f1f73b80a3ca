//! csv-table-loader library
//!
//! Loads one CSV object from S3 (or a local file) into one DynamoDB table,
//! streaming the object and writing fixed-size batches.
//!
//! # Crates
//!
//! - `csv_loader_file` - streaming local and S3 readers
//! - `csv_loader` - row stream, batching, and the `load` operation
//! - `table_sink` - the sink trait and an in-memory sink
//! - `dynamodb_sink` - the DynamoDB sink
//!
//! # CLI Usage
//!
//! ```bash
//! # Load an S3 object
//! csv-table-loader --source s3://uploads/customers.csv --table customers
//!
//! # Same, configured the way the Lambda function is
//! SOURCE_BUCKET=uploads SOURCE_KEY=customers.csv TABLE_NAME=customers csv-table-loader
//! ```

pub mod config;

use anyhow::Context;
use std::sync::Arc;

pub use config::LoadOpts;
pub use csv_loader::{load, LoadError, LoadReport};
pub use dynamodb_sink::DynamoDbSink;

/// Connect the DynamoDB sink described by `opts`.
pub async fn connect_sink(opts: &LoadOpts) -> Arc<DynamoDbSink> {
    Arc::new(DynamoDbSink::connect(opts.dynamodb_opts()).await)
}

/// Run one load with the given options.
pub async fn run(opts: &LoadOpts) -> anyhow::Result<LoadReport> {
    let config = opts.load_config()?;
    let sink = connect_sink(opts).await;

    let report = load(&config, sink)
        .await
        .with_context(|| format!("Failed to load {} into '{}'", config.source, config.table))?;

    Ok(report)
}

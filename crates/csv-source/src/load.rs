//! CSV load implementation
//!
//! This module streams one CSV object into one table in fixed-size batches.

use crate::batch::{Batcher, DEFAULT_BATCH_SIZE};
use crate::error::LoadError;
use crate::rows::{CsvOptions, RowReader};
use csv_loader_file::{FileSource, S3Client, DEFAULT_BUFFER_SIZE};
use serde::Serialize;
use std::sync::Arc;
use table_sink::{PartialWrite, Row, TableInfo, TableSink};
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

/// What to do when a batch-write fails or leaves rows unapplied
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Abort the load on the first failed batch
    #[default]
    FailFast,
    /// Log the failed batch, count its rows, and keep going
    BestEffort,
}

/// Configuration for a CSV load
#[derive(Debug, Clone)]
pub struct Config {
    /// Object to read
    pub source: FileSource,

    /// Destination table name
    pub table: String,

    /// Number of rows to submit in each batch-write
    pub batch_size: usize,

    /// CSV dialect
    pub csv: CsvOptions,

    /// Batch failure handling
    pub failure_policy: FailurePolicy,

    /// Read buffer size for the source stream
    pub buffer_size: usize,

    /// Parse and batch without writing
    pub dry_run: bool,
}

impl Config {
    pub fn new(source: FileSource, table: impl Into<String>) -> Self {
        Self {
            source,
            table: table.into(),
            batch_size: DEFAULT_BATCH_SIZE,
            csv: CsvOptions::default(),
            failure_policy: FailurePolicy::default(),
            buffer_size: DEFAULT_BUFFER_SIZE,
            dry_run: false,
        }
    }

    fn validate(&self) -> Result<(), LoadError> {
        if self.table.is_empty() {
            return Err(LoadError::Config(
                "destination table name must not be empty".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(LoadError::Config(
                "batch size must be at least 1".to_string(),
            ));
        }
        if self.buffer_size == 0 {
            return Err(LoadError::Config(
                "buffer size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Summary of a finished load
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub source: String,
    pub table: String,
    pub rows_read: usize,
    pub batches_submitted: usize,
    pub rows_written: usize,
    pub failed_batches: usize,
    pub failed_rows: usize,
    pub dry_run: bool,
}

impl LoadReport {
    /// True when every row read was written (or, in a dry run, batched).
    pub fn is_complete(&self) -> bool {
        self.failed_rows == 0
    }
}

/// Load one CSV object into one table
///
/// The destination table is resolved first, then the source is opened as a
/// stream. Rows are parsed on a blocking worker; every full batch is written
/// (and the write awaited) before the next row is read, so at most one batch
/// is held in memory.
///
/// # Arguments
/// * `config` - Configuration for the load
/// * `sink` - Table store to write to
///
/// # Returns
/// A [`LoadReport`] on completion. Configuration, table-resolve, source-open
/// and parse failures are always returned as errors; batch failures follow
/// `config.failure_policy`.
pub async fn load<S>(config: &Config, sink: Arc<S>) -> Result<LoadReport, LoadError>
where
    S: TableSink + 'static,
{
    load_from(config, sink, None).await
}

/// Like [`load`], reading S3 sources through an existing client.
pub async fn load_with_s3<S>(
    config: &Config,
    sink: Arc<S>,
    s3: &S3Client,
) -> Result<LoadReport, LoadError>
where
    S: TableSink + 'static,
{
    load_from(config, sink, Some(s3)).await
}

async fn load_from<S>(
    config: &Config,
    sink: Arc<S>,
    s3: Option<&S3Client>,
) -> Result<LoadReport, LoadError>
where
    S: TableSink + 'static,
{
    config.validate()?;

    let source_name = config.source.display_name();
    info!("Starting CSV load into table '{}'", config.table);
    info!("Source: {source_name}");
    info!(
        "Batch size: {}, failure policy: {:?}",
        config.batch_size, config.failure_policy
    );

    if config.dry_run {
        warn!("Running in dry-run mode - no data will be written");
    }

    let table = sink
        .describe_table(&config.table)
        .await
        .map_err(|source| LoadError::TableResolve {
            table: config.table.clone(),
            source,
        })?;
    debug!("Resolved table: {table:?}");

    let reader = config
        .source
        .open_with(s3, config.buffer_size)
        .await
        .map_err(|source| LoadError::SourceOpen {
            source_name: source_name.clone(),
            source,
        })?;

    let handle = Handle::current();
    let worker_config = config.clone();
    let report = tokio::task::spawn_blocking(move || {
        run_blocking(&handle, &worker_config, sink.as_ref(), &table, reader)
    })
    .await
    .map_err(|e| LoadError::Worker(e.to_string()))??;

    info!(
        "Processed {} rows from {source_name} into '{}' ({} batches, {} written, {} failed)",
        report.rows_read,
        report.table,
        report.batches_submitted,
        report.rows_written,
        report.failed_rows
    );

    Ok(report)
}

/// Parse and write on the current (blocking) thread.
fn run_blocking<S: TableSink + ?Sized>(
    handle: &Handle,
    config: &Config,
    sink: &S,
    table: &TableInfo,
    reader: Box<dyn std::io::Read + Send>,
) -> Result<LoadReport, LoadError> {
    let rows = RowReader::from_reader(reader, &config.csv)?;
    let mut batcher = Batcher::new(config.batch_size)?;
    let mut report = LoadReport {
        source: config.source.display_name(),
        table: table.name.clone(),
        dry_run: config.dry_run,
        ..Default::default()
    };

    for row in rows {
        let row = row?;
        report.rows_read += 1;

        if let Some(batch) = batcher.push(row) {
            submit(handle, config, sink, table, batch, &mut report)?;
        }
    }

    // Process remaining rows
    if let Some(batch) = batcher.finish() {
        submit(handle, config, sink, table, batch, &mut report)?;
    }

    Ok(report)
}

fn submit<S: TableSink + ?Sized>(
    handle: &Handle,
    config: &Config,
    sink: &S,
    table: &TableInfo,
    batch: Vec<Row>,
    report: &mut LoadReport,
) -> Result<(), LoadError> {
    let index = report.batches_submitted;
    report.batches_submitted += 1;

    if config.dry_run {
        debug!("Dry run: Would write batch {index} of {} rows", batch.len());
        report.rows_written += batch.len();
        return Ok(());
    }

    let failure = match handle.block_on(sink.write_batch(table, &batch)) {
        Ok(outcome) => {
            report.rows_written += outcome.written;
            debug!(
                "Wrote batch {index}: {} rows written, {} rejected",
                outcome.written, outcome.rejected
            );
            if outcome.is_complete() {
                return Ok(());
            }
            (
                outcome.rejected,
                anyhow::anyhow!("{} rows were left unprocessed", outcome.rejected),
            )
        }
        Err(e) => {
            let written = PartialWrite::written_before(&e).min(batch.len());
            report.rows_written += written;
            (batch.len() - written, e)
        }
    };

    let (failed_rows, source) = failure;
    match config.failure_policy {
        FailurePolicy::FailFast => Err(LoadError::BatchSubmit {
            batch: index,
            rows: batch.len(),
            source,
        }),
        FailurePolicy::BestEffort => {
            warn!(
                "Batch {index} ({} rows) failed, {failed_rows} rows not written: {source:#}",
                batch.len()
            );
            report.failed_batches += 1;
            report.failed_rows += failed_rows;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::new(FileSource::parse("data.csv").unwrap(), "users");
        assert_eq!(config.batch_size, 100);
        assert!(config.csv.has_headers);
        assert_eq!(config.csv.delimiter, b',');
        assert_eq!(config.failure_policy, FailurePolicy::FailFast);
        assert!(!config.dry_run);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::new(FileSource::parse("data.csv").unwrap(), "");
        assert!(matches!(config.validate(), Err(LoadError::Config(_))));

        config.table = "users".to_string();
        assert!(config.validate().is_ok());

        config.batch_size = 0;
        assert!(matches!(config.validate(), Err(LoadError::Config(_))));
    }

    #[test]
    fn test_report_completeness() {
        let mut report = LoadReport {
            rows_read: 10,
            rows_written: 10,
            ..Default::default()
        };
        assert!(report.is_complete());

        report.failed_rows = 3;
        assert!(!report.is_complete());
    }

    #[test]
    fn test_failure_policy_serializes_kebab_case() {
        let json = serde_json::to_string(&FailurePolicy::BestEffort).unwrap();
        assert_eq!(json, "\"best-effort\"");
    }
}

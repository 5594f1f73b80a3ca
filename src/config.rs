//! Load options shared by the CLI and the Lambda handler.
//!
//! Every option can also be supplied through the environment, which is how
//! the Lambda function receives its configuration.

pub mod duration;

use anyhow::Context;
use clap::Parser;
use csv_loader::{Config, CsvOptions, FailurePolicy, FileSource, DEFAULT_BATCH_SIZE};
use dynamodb_sink::{DynamoDbOpts, ValueMode, DEFAULT_MAX_ATTEMPTS};
use std::time::Duration;

#[derive(Parser, Clone, Debug)]
pub struct LoadOpts {
    /// Source object: an S3 URI (s3://bucket/key) or a local file path
    #[arg(long, env = "SOURCE_URI", value_name = "URI")]
    pub source: Option<String>,

    /// Source S3 bucket name
    #[arg(long, env = "SOURCE_BUCKET")]
    pub source_bucket: Option<String>,

    /// Source S3 object key
    #[arg(long, env = "SOURCE_KEY")]
    pub source_key: Option<String>,

    /// Destination DynamoDB table
    #[arg(long, env = "TABLE_NAME")]
    pub table: String,

    /// Number of rows per batch-write
    #[arg(long, env = "BATCH_SIZE", default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// CSV delimiter (single ASCII character)
    #[arg(long, env = "CSV_DELIMITER", default_value = ",")]
    pub delimiter: char,

    /// The first record is data, not column names
    #[arg(long, env = "CSV_NO_HEADERS")]
    pub no_headers: bool,

    /// Column names to use with --no-headers (comma separated)
    #[arg(long, env = "CSV_COLUMN_NAMES", value_delimiter = ',')]
    pub column_names: Option<Vec<String>>,

    /// What to do when a batch cannot be written
    #[arg(long, env = "FAILURE_POLICY", value_enum, default_value = "fail-fast")]
    pub failure_policy: FailurePolicy,

    /// How cell text is stored in DynamoDB
    #[arg(long, env = "VALUE_MODE", value_enum, default_value = "text")]
    pub value_mode: ValueMode,

    /// BatchWriteItem submissions per request while items come back unprocessed
    #[arg(long, env = "DYNAMODB_MAX_ATTEMPTS", default_value_t = DEFAULT_MAX_ATTEMPTS)]
    pub max_attempts: u32,

    /// Delay before resubmitting unprocessed items, doubled per attempt
    /// Format: "50ms", "2s", "1m", or a plain number of milliseconds
    #[arg(long, env = "DYNAMODB_RETRY_BASE_DELAY", default_value = "50ms", value_parser = duration::parse_duration)]
    pub retry_base_delay: Duration,

    /// Parse and batch the source without writing to the table
    #[arg(long, env = "DRY_RUN")]
    pub dry_run: bool,
}

impl LoadOpts {
    /// Resolve the source from either `--source` or the bucket/key pair.
    pub fn file_source(&self) -> anyhow::Result<FileSource> {
        match (&self.source, &self.source_bucket, &self.source_key) {
            (Some(uri), None, None) => FileSource::parse(uri),
            (None, Some(bucket), Some(key)) => FileSource::s3(bucket.as_str(), key.as_str()),
            (Some(_), _, _) => {
                anyhow::bail!("--source cannot be combined with --source-bucket/--source-key")
            }
            _ => anyhow::bail!(
                "Specify --source, or both --source-bucket and --source-key (SOURCE_BUCKET, SOURCE_KEY)"
            ),
        }
    }

    /// Build the loader configuration.
    pub fn load_config(&self) -> anyhow::Result<Config> {
        let source = self.file_source().context("Invalid source")?;

        if !self.delimiter.is_ascii() {
            anyhow::bail!(
                "Delimiter must be a single ASCII character, got '{}'",
                self.delimiter
            );
        }
        if self.column_names.is_some() && !self.no_headers {
            anyhow::bail!("--column-names requires --no-headers");
        }

        Ok(Config {
            batch_size: self.batch_size,
            csv: CsvOptions {
                delimiter: self.delimiter as u8,
                has_headers: !self.no_headers,
                column_names: self.column_names.clone(),
            },
            failure_policy: self.failure_policy,
            dry_run: self.dry_run,
            ..Config::new(source, self.table.clone())
        })
    }

    pub fn dynamodb_opts(&self) -> DynamoDbOpts {
        DynamoDbOpts {
            value_mode: self.value_mode,
            max_attempts: self.max_attempts,
            retry_base_delay: self.retry_base_delay,
        }
    }
}

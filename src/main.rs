//! Command-line interface for csv-table-loader
//!
//! # Usage Examples
//!
//! ```bash
//! # Load an S3 object into a table
//! csv-table-loader --source s3://uploads/2024/customers.csv --table customers
//!
//! # Bucket and key given separately (or via SOURCE_BUCKET / SOURCE_KEY)
//! csv-table-loader --source-bucket uploads --source-key 2024/customers.csv --table customers
//!
//! # Local file, semicolon separated, typed attributes, keep going on failed batches
//! csv-table-loader --source ./customers.csv --table customers \
//!   --delimiter ';' --value-mode inferred --failure-policy best-effort
//!
//! # Parse and count batches only
//! csv-table-loader --source ./customers.csv --table customers --dry-run --json
//! ```

use clap::Parser;
use csv_table_loader::{run, LoadOpts};

#[derive(Parser)]
#[command(name = "csv-table-loader")]
#[command(about = "Load a CSV object from S3 or disk into a DynamoDB table")]
#[command(long_about = None)]
struct Cli {
    #[command(flatten)]
    opts: LoadOpts,

    /// Print the load report as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let report = run(&cli.opts).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "Loaded {} of {} rows from {} into '{}' in {} batches",
            report.rows_written,
            report.rows_read,
            report.source,
            report.table,
            report.batches_submitted
        );
        if !report.is_complete() {
            println!(
                "{} rows in {} batches were not written",
                report.failed_rows, report.failed_batches
            );
        }
    }

    Ok(())
}

//! CSV object loading
//!
//! This crate streams a CSV object from a [`FileSource`] (local file or S3),
//! parses it into header-keyed rows, and writes the rows to a [`TableSink`]
//! in fixed-size batches.
//!
//! ```ignore
//! use csv_loader::{load, Config, FileSource};
//!
//! let config = Config::new(FileSource::s3("uploads", "customers.csv")?, "customers");
//! let report = load(&config, sink).await?;
//! ```

mod batch;
mod error;
mod load;
mod rows;

pub use batch::{Batcher, DEFAULT_BATCH_SIZE};
pub use error::LoadError;
pub use load::{load, load_with_s3, Config, FailurePolicy, LoadReport};
pub use rows::{CsvOptions, RowReader};

// Re-export source and sink types for convenience
pub use csv_loader_file::{FileSource, S3Client, DEFAULT_BUFFER_SIZE};
pub use table_sink::{BatchOutcome, MemorySink, PartialWrite, Row, TableInfo, TableSink};

//! Object source abstraction for reading from the local filesystem or S3
//!
//! Every source opens as a blocking `std::io::Read` that streams the object
//! instead of buffering it whole, so the CSV parser can run over it on a
//! blocking worker thread.
//!
//! # Source Types
//!
//! - **S3**: a single object, `s3://bucket/key`
//! - **Local**: a single file on disk (anything that is not an S3 URI)
//!
//! # Example
//!
//! ```ignore
//! use csv_loader_file::{FileSource, DEFAULT_BUFFER_SIZE};
//!
//! let source = FileSource::s3("uploads", "2024/customers.csv")?;
//! let reader = source.open(DEFAULT_BUFFER_SIZE).await?;
//! // Hand the reader to a blocking task...
//! ```

mod local;
mod s3;

use anyhow::{Context, Result};
use std::fmt;
use std::path::PathBuf;

pub use local::LocalFileReader;
pub use s3::{S3Client, S3FileReader};

/// Default buffer size for reading operations (1MB)
pub const DEFAULT_BUFFER_SIZE: usize = 1024 * 1024;

/// A single object to load
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSource {
    /// Local filesystem path
    Local(PathBuf),
    /// S3 object
    S3 { bucket: String, key: String },
}

impl FileSource {
    /// Parse a string into a FileSource, auto-detecting the source type
    ///
    /// - `s3://bucket/key` -> S3
    /// - Everything else -> Local
    pub fn parse(uri: &str) -> Result<Self> {
        if uri.starts_with("s3://") {
            let (bucket, key) = parse_s3_uri(uri)?;
            Ok(FileSource::S3 { bucket, key })
        } else if uri.is_empty() {
            anyhow::bail!("Source path must not be empty");
        } else {
            Ok(FileSource::Local(PathBuf::from(uri)))
        }
    }

    /// Build an S3 source from a bucket name and object key
    pub fn s3(bucket: impl Into<String>, key: impl Into<String>) -> Result<Self> {
        let bucket = bucket.into();
        let key = key.into();
        if bucket.is_empty() {
            anyhow::bail!("S3 bucket name must not be empty");
        }
        if key.is_empty() {
            anyhow::bail!("S3 object key must not be empty");
        }
        Ok(FileSource::S3 { bucket, key })
    }

    /// Open this source and return a streaming reader
    pub async fn open(&self, buffer_size: usize) -> Result<Box<dyn std::io::Read + Send>> {
        self.open_with(None, buffer_size).await
    }

    /// Open this source, reading S3 objects through `s3` when one is given
    ///
    /// Without a client, S3 sources build one from the ambient AWS config.
    pub async fn open_with(
        &self,
        s3: Option<&S3Client>,
        buffer_size: usize,
    ) -> Result<Box<dyn std::io::Read + Send>> {
        match (self, s3) {
            (FileSource::Local(path), _) => LocalFileReader::open(path.clone(), buffer_size).await,
            (FileSource::S3 { bucket, key }, Some(client)) => {
                client.open(bucket, key, buffer_size).await
            }
            (FileSource::S3 { bucket, key }, None) => {
                S3FileReader::open(bucket.clone(), key.clone(), buffer_size).await
            }
        }
    }

    /// Get a display name for logging
    pub fn display_name(&self) -> String {
        match self {
            FileSource::Local(path) => path.display().to_string(),
            FileSource::S3 { bucket, key } => format!("s3://{bucket}/{key}"),
        }
    }
}

impl fmt::Display for FileSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name())
    }
}

/// Parse S3 URI in the format: s3://bucket/key/to/file
pub fn parse_s3_uri(uri: &str) -> Result<(String, String)> {
    let uri = uri
        .strip_prefix("s3://")
        .context("S3 URI must start with 's3://'")?;

    let parts: Vec<&str> = uri.splitn(2, '/').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        anyhow::bail!("S3 URI must be in format 's3://bucket/key/to/file'");
    }

    Ok((parts[0].to_string(), parts[1].to_string()))
}

//! Local filesystem file reader implementation

use anyhow::{Context, Result};
use std::io::BufReader;
use std::path::PathBuf;

/// Reads a local file with configurable buffering
pub struct LocalFileReader;

impl LocalFileReader {
    /// Open a local file and return a buffered, blocking reader
    ///
    /// The file is read incrementally as the caller consumes it.
    ///
    /// # Example
    /// ```ignore
    /// let reader = LocalFileReader::open(
    ///     PathBuf::from("data.csv"),
    ///     1024 * 1024, // 1MB buffer
    /// ).await?;
    /// ```
    pub async fn open(path: PathBuf, buffer_size: usize) -> Result<Box<dyn std::io::Read + Send>> {
        let file = tokio::fs::File::open(&path)
            .await
            .with_context(|| format!("Failed to open file: {}", path.display()))?;
        let file = file.into_std().await;

        tracing::debug!("Opened local file: {}", path.display());

        Ok(Box::new(BufReader::with_capacity(buffer_size, file)))
    }
}

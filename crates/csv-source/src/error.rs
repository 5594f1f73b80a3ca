//! Error types for CSV loading.

use thiserror::Error;

/// Errors that can end a load.
#[derive(Error, Debug)]
pub enum LoadError {
    /// Invalid load configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// The source object could not be opened
    #[error("Failed to open source {source_name}")]
    SourceOpen {
        source_name: String,
        #[source]
        source: anyhow::Error,
    },

    /// The destination table could not be resolved
    #[error("Failed to resolve destination table '{table}'")]
    TableResolve {
        table: String,
        #[source]
        source: anyhow::Error,
    },

    /// A record could not be decoded or does not fit the header
    #[error("CSV error at line {line}: {message}")]
    Parse { line: u64, message: String },

    /// A batch-write failed or left rows unapplied
    #[error("Batch {batch} ({rows} rows) was not fully written")]
    BatchSubmit {
        batch: usize,
        rows: usize,
        #[source]
        source: anyhow::Error,
    },

    /// The blocking worker panicked or was cancelled
    #[error("Load worker failed: {0}")]
    Worker(String),
}

impl LoadError {
    pub(crate) fn from_csv(err: csv::Error) -> Self {
        let line = err.position().map(|p| p.line()).unwrap_or_default();
        let message = match err.kind() {
            csv::ErrorKind::Utf8 { err, .. } => format!("invalid UTF-8 in field {}", err.field() + 1),
            _ => err.to_string(),
        };
        LoadError::Parse { line, message }
    }
}

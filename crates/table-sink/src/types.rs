//! Row and table descriptions shared by the loader and sinks.

use serde::Serialize;
use std::collections::HashMap;

/// One parsed CSV record: column name to cell text.
pub type Row = HashMap<String, String>;

/// Scalar type of a key attribute as declared by the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum KeyKind {
    String,
    Number,
    Binary,
}

/// A partition or sort key attribute of the destination table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyAttribute {
    pub name: String,
    pub kind: KeyKind,
}

/// A resolved destination table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableInfo {
    pub name: String,
    pub keys: Vec<KeyAttribute>,
}

impl TableInfo {
    /// Table description with no known key schema.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            keys: Vec::new(),
        }
    }

    pub fn with_key(mut self, name: impl Into<String>, kind: KeyKind) -> Self {
        self.keys.push(KeyAttribute {
            name: name.into(),
            kind,
        });
        self
    }

    /// Look up the declared kind of a key attribute.
    pub fn key_kind(&self, attribute: &str) -> Option<KeyKind> {
        self.keys
            .iter()
            .find(|k| k.name == attribute)
            .map(|k| k.kind)
    }
}

/// Result of one batch submission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    /// Rows the store applied
    pub written: usize,
    /// Rows the store left unapplied after the sink stopped retrying
    pub rejected: usize,
}

impl BatchOutcome {
    pub fn is_complete(&self) -> bool {
        self.rejected == 0
    }
}

/// A batch write that failed after the store had already applied some rows.
///
/// Sinks that split a batch into several requests return this (wrapped in
/// `anyhow::Error`) so the caller can still count the rows that landed.
#[derive(Debug, thiserror::Error)]
#[error("batch write failed after {written} rows were written")]
pub struct PartialWrite {
    pub written: usize,
    #[source]
    pub source: anyhow::Error,
}

impl PartialWrite {
    /// Rows applied before the failure, if `error` is a partial write.
    pub fn written_before(error: &anyhow::Error) -> usize {
        error
            .downcast_ref::<PartialWrite>()
            .map_or(0, |partial| partial.written)
    }
}

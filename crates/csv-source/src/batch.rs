//! Fixed-size row accumulation.

use crate::error::LoadError;
use table_sink::Row;

/// Number of rows submitted per batch-write unless configured otherwise
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Accumulates rows and hands them out in batches of `capacity`.
#[derive(Debug)]
pub struct Batcher {
    capacity: usize,
    rows: Vec<Row>,
}

impl Batcher {
    pub fn new(capacity: usize) -> Result<Self, LoadError> {
        if capacity == 0 {
            return Err(LoadError::Config(
                "batch size must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            capacity,
            rows: Vec::with_capacity(capacity),
        })
    }

    /// Add a row. Returns the full batch once `capacity` rows have accumulated.
    pub fn push(&mut self, row: Row) -> Option<Vec<Row>> {
        self.rows.push(row);
        if self.rows.len() >= self.capacity {
            Some(std::mem::replace(
                &mut self.rows,
                Vec::with_capacity(self.capacity),
            ))
        } else {
            None
        }
    }

    /// Take the remaining partial batch, if any rows are left.
    pub fn finish(self) -> Option<Vec<Row>> {
        if self.rows.is_empty() {
            None
        } else {
            Some(self.rows)
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

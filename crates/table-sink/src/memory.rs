//! In-process sink that records every submitted batch.

use crate::traits::TableSink;
use crate::types::{BatchOutcome, PartialWrite, Row, TableInfo};
use anyhow::Result;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// A [`TableSink`] backed by memory.
///
/// Knows a single table. Batches are recorded in submission order, and
/// failures can be injected per batch index (0-based, counting every call
/// to `write_batch`).
pub struct MemorySink {
    table: TableInfo,
    batches: Mutex<Vec<Vec<Row>>>,
    calls: Mutex<usize>,
    failing: HashSet<usize>,
    rejecting: HashMap<usize, usize>,
    interrupted: HashMap<usize, usize>,
}

impl MemorySink {
    pub fn new(table: TableInfo) -> Self {
        Self {
            table,
            batches: Mutex::new(Vec::new()),
            calls: Mutex::new(0),
            failing: HashSet::new(),
            rejecting: HashMap::new(),
            interrupted: HashMap::new(),
        }
    }

    /// Make the `index`-th `write_batch` call return an error.
    pub fn fail_batch(mut self, index: usize) -> Self {
        self.failing.insert(index);
        self
    }

    /// Make the `index`-th `write_batch` call leave its last `rows` rows unapplied.
    pub fn reject_rows(mut self, index: usize, rows: usize) -> Self {
        self.rejecting.insert(index, rows);
        self
    }

    /// Make the `index`-th `write_batch` call apply its first `rows` rows and
    /// then fail with a [`PartialWrite`].
    pub fn fail_batch_after(mut self, index: usize, rows: usize) -> Self {
        self.interrupted.insert(index, rows);
        self
    }

    /// Batches that were applied, in order. Rejected rows are not included.
    pub fn batches(&self) -> Vec<Vec<Row>> {
        self.batches.lock().map(|b| b.clone()).unwrap_or_default()
    }

    /// Sizes of the applied batches.
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches().iter().map(Vec::len).collect()
    }

    /// All applied rows, flattened in order.
    pub fn rows(&self) -> Vec<Row> {
        self.batches().into_iter().flatten().collect()
    }

    /// Number of `write_batch` calls, including failed ones.
    pub fn calls(&self) -> usize {
        self.calls.lock().map(|c| *c).unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl TableSink for MemorySink {
    async fn describe_table(&self, name: &str) -> Result<TableInfo> {
        if name != self.table.name {
            anyhow::bail!("Table not found: {name}");
        }
        Ok(self.table.clone())
    }

    async fn write_batch(&self, table: &TableInfo, rows: &[Row]) -> Result<BatchOutcome> {
        if table.name != self.table.name {
            anyhow::bail!("Table not found: {}", table.name);
        }

        let index = {
            let mut calls = self
                .calls
                .lock()
                .map_err(|_| anyhow::anyhow!("memory sink lock poisoned"))?;
            let index = *calls;
            *calls += 1;
            index
        };

        if self.failing.contains(&index) {
            anyhow::bail!("Injected failure for batch {index}");
        }

        if let Some(&written) = self.interrupted.get(&index) {
            let written = written.min(rows.len());
            self.batches
                .lock()
                .map_err(|_| anyhow::anyhow!("memory sink lock poisoned"))?
                .push(rows[..written].to_vec());
            return Err(PartialWrite {
                written,
                source: anyhow::anyhow!("Injected failure for batch {index}"),
            }
            .into());
        }

        let rejected = self
            .rejecting
            .get(&index)
            .copied()
            .unwrap_or(0)
            .min(rows.len());
        let applied = &rows[..rows.len() - rejected];

        self.batches
            .lock()
            .map_err(|_| anyhow::anyhow!("memory sink lock poisoned"))?
            .push(applied.to_vec());

        Ok(BatchOutcome {
            written: applied.len(),
            rejected,
        })
    }
}

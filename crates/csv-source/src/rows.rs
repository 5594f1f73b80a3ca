//! Lazy, header-keyed row stream over a CSV reader.

use crate::error::LoadError;
use std::io::Read;
use table_sink::Row;

/// CSV dialect and header handling
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvOptions {
    /// CSV delimiter character (default: ',')
    pub delimiter: u8,

    /// Whether the first record holds the column names (default: true)
    pub has_headers: bool,

    /// Column names to use when `has_headers` is false
    /// If provided, must match the number of columns in the CSV
    pub column_names: Option<Vec<String>>,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            has_headers: true,
            column_names: None,
        }
    }
}

/// Iterator of rows parsed from a CSV stream.
///
/// Records are read one at a time as the iterator is advanced; the reader is
/// consumed, so the sequence cannot be restarted. Iteration stops after the
/// first error.
pub struct RowReader<R: Read> {
    reader: csv::Reader<R>,
    headers: Vec<String>,
    record: csv::StringRecord,
    pending: Option<csv::StringRecord>,
    done: bool,
}

impl<R: Read> RowReader<R> {
    /// Start reading rows. The header record (or the first data record, when
    /// column names must be generated) is read here.
    pub fn from_reader(reader: R, options: &CsvOptions) -> Result<Self, LoadError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(options.has_headers)
            .delimiter(options.delimiter)
            .flexible(true)
            .from_reader(reader);

        let mut pending = None;
        let headers = if options.has_headers {
            reader
                .headers()
                .map_err(LoadError::from_csv)?
                .iter()
                .map(|h| h.to_string())
                .collect::<Vec<String>>()
        } else if let Some(ref column_names) = options.column_names {
            column_names.clone()
        } else {
            // Peek at the first record to learn the column count
            let mut first = csv::StringRecord::new();
            if reader.read_record(&mut first).map_err(LoadError::from_csv)? {
                let headers = (0..first.len()).map(|i| format!("column_{i}")).collect();
                pending = Some(first);
                headers
            } else {
                Vec::new()
            }
        };

        tracing::debug!("CSV headers/columns: {headers:?}");

        Ok(Self {
            reader,
            headers,
            record: csv::StringRecord::new(),
            pending,
            done: false,
        })
    }

    /// Column names rows are keyed by
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    fn to_row(&self, record: &csv::StringRecord) -> Result<Row, LoadError> {
        if record.len() != self.headers.len() {
            return Err(LoadError::Parse {
                line: record.position().map(|p| p.line()).unwrap_or_default(),
                message: format!(
                    "expected {} columns ({}), but found {} columns",
                    self.headers.len(),
                    self.headers.join(", "),
                    record.len()
                ),
            });
        }

        Ok(self
            .headers
            .iter()
            .cloned()
            .zip(record.iter().map(str::to_string))
            .collect())
    }
}

impl<R: Read> Iterator for RowReader<R> {
    type Item = Result<Row, LoadError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        if let Some(first) = self.pending.take() {
            let row = self.to_row(&first);
            self.done = row.is_err();
            return Some(row);
        }

        let mut record = std::mem::take(&mut self.record);
        let result = match self.reader.read_record(&mut record) {
            Ok(true) => Some(self.to_row(&record)),
            Ok(false) => None,
            Err(e) => Some(Err(LoadError::from_csv(e))),
        };
        self.record = record;

        self.done = !matches!(result, Some(Ok(_)));
        result
    }
}

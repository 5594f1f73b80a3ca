use crate::connect::DynamoDbOpts;
use crate::convert::row_to_item;
use anyhow::Context;
use aws_sdk_dynamodb::types::{PutRequest, WriteRequest};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::time::Duration;
use table_sink::{BatchOutcome, KeyKind, PartialWrite, Row, TableInfo};
use tokio::time::sleep;

/// Maximum number of put requests DynamoDB accepts in one BatchWriteItem call
pub const MAX_BATCH_WRITE_ITEMS: usize = 25;
/// Upper bound for the delay between resubmissions
const MAX_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Put requests for one BatchWriteItem call
#[derive(Debug, Default)]
pub(crate) struct RequestChunk {
    pub requests: Vec<WriteRequest>,
    /// Rows replaced by a later row with the same key in this chunk
    pub superseded: usize,
}

/// Convert rows into put requests, split into service-sized chunks.
pub(crate) fn build_requests(
    rows: &[Row],
    table: &TableInfo,
    opts: &DynamoDbOpts,
) -> anyhow::Result<Vec<RequestChunk>> {
    rows.chunks(MAX_BATCH_WRITE_ITEMS)
        .map(|chunk| build_chunk(chunk, table, opts))
        .collect()
}

/// DynamoDB rejects a whole BatchWriteItem call that puts the same key twice,
/// so within a chunk the last row for a key replaces the earlier ones.
fn build_chunk(
    rows: &[Row],
    table: &TableInfo,
    opts: &DynamoDbOpts,
) -> anyhow::Result<RequestChunk> {
    let mut chunk = RequestChunk::default();
    let mut positions: HashMap<Vec<String>, usize> = HashMap::new();

    for row in rows {
        let item = row_to_item(row, table, opts.value_mode)?;
        let put = PutRequest::builder()
            .set_item(Some(item))
            .build()
            .context("Failed to build put request")?;
        let request = WriteRequest::builder().put_request(put).build();

        if table.keys.is_empty() {
            chunk.requests.push(request);
            continue;
        }

        match positions.entry(key_of(row, table)) {
            Entry::Occupied(existing) => {
                chunk.requests[*existing.get()] = request;
                chunk.superseded += 1;
            }
            Entry::Vacant(slot) => {
                slot.insert(chunk.requests.len());
                chunk.requests.push(request);
            }
        }
    }

    Ok(chunk)
}

fn key_of(row: &Row, table: &TableInfo) -> Vec<String> {
    table
        .keys
        .iter()
        .map(|key| {
            let value = row.get(&key.name).map(String::as_str).unwrap_or_default();
            match key.kind {
                KeyKind::Number => value.trim().to_string(),
                KeyKind::String | KeyKind::Binary => value.to_string(),
            }
        })
        .collect()
}

/// Delay before resubmission number `attempt` (1-based).
pub(crate) fn retry_delay(base: Duration, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
    base.saturating_mul(factor).min(MAX_RETRY_DELAY)
}

/// Write rows with BatchWriteItem, resubmitting unprocessed items.
///
/// A request error after earlier requests succeeded is returned as a
/// [`PartialWrite`] carrying the number of rows already applied.
pub(crate) async fn write_rows(
    client: &aws_sdk_dynamodb::Client,
    opts: &DynamoDbOpts,
    table: &TableInfo,
    rows: &[Row],
) -> anyhow::Result<BatchOutcome> {
    let chunks = build_requests(rows, table, opts)
        .with_context(|| format!("Failed to convert rows for table '{}'", table.name))?;

    let mut outcome = BatchOutcome::default();
    for chunk in chunks {
        if chunk.superseded > 0 {
            tracing::debug!(
                "{} rows replaced by later rows with the same key for table '{}'",
                chunk.superseded,
                table.name
            );
        }

        if let Err(source) =
            write_chunk(client, opts, &table.name, chunk.requests, &mut outcome).await
        {
            if outcome.written == 0 {
                return Err(source);
            }
            return Err(PartialWrite {
                written: outcome.written,
                source,
            }
            .into());
        }
        outcome.written += chunk.superseded;
    }

    Ok(outcome)
}

async fn write_chunk(
    client: &aws_sdk_dynamodb::Client,
    opts: &DynamoDbOpts,
    table_name: &str,
    requests: Vec<WriteRequest>,
    outcome: &mut BatchOutcome,
) -> anyhow::Result<()> {
    let mut pending = requests;
    let mut attempt = 1;

    loop {
        let sent = pending.len();
        tracing::trace!("BatchWriteItem to '{table_name}' with {sent} items (attempt {attempt})");

        let response = client
            .batch_write_item()
            .request_items(table_name, pending)
            .send()
            .await
            .with_context(|| format!("BatchWriteItem to table '{table_name}' failed"))?;

        let unprocessed = response
            .unprocessed_items
            .and_then(|mut items| items.remove(table_name))
            .unwrap_or_default();
        outcome.written += sent.saturating_sub(unprocessed.len());

        if unprocessed.is_empty() {
            return Ok(());
        }

        if attempt >= opts.max_attempts {
            tracing::warn!(
                "Giving up on {} unprocessed items for table '{table_name}' after {attempt} attempts",
                unprocessed.len()
            );
            outcome.rejected += unprocessed.len();
            return Ok(());
        }

        let delay = retry_delay(opts.retry_base_delay, attempt);
        tracing::debug!(
            "{} items unprocessed for table '{table_name}', retrying in {delay:?}",
            unprocessed.len()
        );
        sleep(delay).await;

        pending = unprocessed;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::ValueMode;
    use aws_sdk_dynamodb::operation::batch_write_item::{BatchWriteItemError, BatchWriteItemOutput};
    use aws_sdk_dynamodb::types::error::ResourceNotFoundException;
    use aws_sdk_dynamodb::Client;
    use aws_smithy_mocks::{mock, mock_client, RuleMode};

    fn rows(count: usize) -> Vec<Row> {
        (0..count)
            .map(|i| Row::from([("id".to_string(), i.to_string())]))
            .collect()
    }

    fn sizes(chunks: &[RequestChunk]) -> Vec<usize> {
        chunks.iter().map(|c| c.requests.len()).collect()
    }

    fn fast_retries(max_attempts: u32) -> DynamoDbOpts {
        DynamoDbOpts {
            max_attempts,
            retry_base_delay: Duration::ZERO,
            ..Default::default()
        }
    }

    /// Response leaving `count` items of table "items" unprocessed
    fn unprocessed(count: usize) -> BatchWriteItemOutput {
        let table = TableInfo::new("items");
        let requests = build_requests(&rows(count), &table, &DynamoDbOpts::default())
            .unwrap()
            .remove(0)
            .requests;
        BatchWriteItemOutput::builder()
            .unprocessed_items("items", requests)
            .build()
    }

    fn table_missing() -> BatchWriteItemError {
        BatchWriteItemError::ResourceNotFoundException(
            ResourceNotFoundException::builder()
                .message("Requested resource not found")
                .build(),
        )
    }

    #[test]
    fn test_requests_split_into_service_limit() {
        let table = TableInfo::new("items");
        let opts = DynamoDbOpts::default();

        let chunks = build_requests(&rows(100), &table, &opts).unwrap();
        assert_eq!(sizes(&chunks), vec![25, 25, 25, 25]);

        let chunks = build_requests(&rows(51), &table, &opts).unwrap();
        assert_eq!(sizes(&chunks), vec![25, 25, 1]);

        assert!(build_requests(&[], &table, &opts).unwrap().is_empty());
    }

    #[test]
    fn test_requests_are_puts_in_order() {
        let table = TableInfo::new("items");
        let opts = DynamoDbOpts {
            value_mode: ValueMode::Inferred,
            ..Default::default()
        };

        let chunks = build_requests(&rows(3), &table, &opts).unwrap();
        let ids: Vec<_> = chunks[0]
            .requests
            .iter()
            .map(|request| {
                let put = request.put_request.as_ref().unwrap();
                put.item["id"].as_n().unwrap().clone()
            })
            .collect();
        assert_eq!(ids, vec!["0", "1", "2"]);
    }

    #[test]
    fn test_missing_key_fails_whole_batch() {
        let table = TableInfo::new("items").with_key("sku", KeyKind::String);
        let result = build_requests(&rows(3), &table, &DynamoDbOpts::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_duplicate_key_in_request_keeps_last_row() {
        let table = TableInfo::new("items").with_key("id", KeyKind::String);
        let rows: Vec<Row> = [("1", "first"), ("2", "other"), ("1", "second")]
            .iter()
            .map(|(id, name)| {
                Row::from([
                    ("id".to_string(), id.to_string()),
                    ("name".to_string(), name.to_string()),
                ])
            })
            .collect();

        let chunks = build_requests(&rows, &table, &DynamoDbOpts::default()).unwrap();

        assert_eq!(sizes(&chunks), vec![2]);
        assert_eq!(chunks[0].superseded, 1);
        let put = chunks[0].requests[0].put_request.as_ref().unwrap();
        assert_eq!(put.item["name"].as_s().unwrap(), "second");
    }

    #[test]
    fn test_retry_delay_backoff() {
        let base = Duration::from_millis(50);
        assert_eq!(retry_delay(base, 1), Duration::from_millis(50));
        assert_eq!(retry_delay(base, 2), Duration::from_millis(100));
        assert_eq!(retry_delay(base, 3), Duration::from_millis(200));
        assert_eq!(retry_delay(base, 20), MAX_RETRY_DELAY);
        assert_eq!(retry_delay(base, u32::MAX), MAX_RETRY_DELAY);
    }

    #[tokio::test]
    async fn test_unprocessed_items_are_resubmitted() {
        let throttled = mock!(Client::batch_write_item).then_output(|| unprocessed(4));
        let accepted =
            mock!(Client::batch_write_item).then_output(|| BatchWriteItemOutput::builder().build());
        let client = mock_client!(aws_sdk_dynamodb, RuleMode::Sequential, [&throttled, &accepted]);

        let outcome = write_rows(&client, &fast_retries(5), &TableInfo::new("items"), &rows(10))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            BatchOutcome {
                written: 10,
                rejected: 0
            }
        );
        assert_eq!(throttled.num_calls(), 1);
        assert_eq!(accepted.num_calls(), 1);
    }

    #[tokio::test]
    async fn test_unprocessed_items_rejected_after_max_attempts() {
        let first = mock!(Client::batch_write_item).then_output(|| unprocessed(4));
        let second = mock!(Client::batch_write_item).then_output(|| unprocessed(4));
        let third = mock!(Client::batch_write_item).then_output(|| unprocessed(1));
        let client = mock_client!(aws_sdk_dynamodb, RuleMode::Sequential, [&first, &second, &third]);

        let outcome = write_rows(&client, &fast_retries(3), &TableInfo::new("items"), &rows(10))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            BatchOutcome {
                written: 9,
                rejected: 1
            }
        );
        assert!(!outcome.is_complete());
        assert_eq!(third.num_calls(), 1);
    }

    #[tokio::test]
    async fn test_request_error_after_written_chunks_is_partial() {
        let first = mock!(Client::batch_write_item)
            .then_output(|| BatchWriteItemOutput::builder().build());
        let second = mock!(Client::batch_write_item)
            .then_output(|| BatchWriteItemOutput::builder().build());
        let failed = mock!(Client::batch_write_item).then_error(table_missing);
        let client = mock_client!(aws_sdk_dynamodb, RuleMode::Sequential, [&first, &second, &failed]);

        let error = write_rows(&client, &fast_retries(5), &TableInfo::new("items"), &rows(60))
            .await
            .unwrap_err();

        assert_eq!(PartialWrite::written_before(&error), 50);
        assert_eq!(failed.num_calls(), 1);
    }

    #[tokio::test]
    async fn test_request_error_on_first_chunk() {
        let failed = mock!(Client::batch_write_item).then_error(table_missing);
        let client = mock_client!(aws_sdk_dynamodb, [&failed]);

        let error = write_rows(&client, &fast_retries(5), &TableInfo::new("items"), &rows(10))
            .await
            .unwrap_err();

        assert!(error.downcast_ref::<PartialWrite>().is_none());
        assert!(format!("{error:#}").contains("BatchWriteItem to table 'items' failed"));
    }

    #[tokio::test]
    async fn test_superseded_rows_count_as_written() {
        let accepted =
            mock!(Client::batch_write_item).then_output(|| BatchWriteItemOutput::builder().build());
        let client = mock_client!(aws_sdk_dynamodb, [&accepted]);
        let table = TableInfo::new("items").with_key("id", KeyKind::Number);
        let mut batch = rows(3);
        batch.push(Row::from([("id".to_string(), "1".to_string())]));

        let outcome = write_rows(&client, &DynamoDbOpts::default(), &table, &batch)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            BatchOutcome {
                written: 4,
                rejected: 0
            }
        );
    }
}

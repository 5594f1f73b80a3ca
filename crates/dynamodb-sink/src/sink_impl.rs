//! Implementation of TableSink for DynamoDB.

use anyhow::{Context, Result};
use aws_sdk_dynamodb::types::ScalarAttributeType;
use table_sink::{BatchOutcome, KeyKind, Row, TableInfo, TableSink};

use crate::connect::{dynamodb_client, DynamoDbOpts};
use crate::write::write_rows;

/// Wrapper around a DynamoDB client that implements TableSink.
pub struct DynamoDbSink {
    client: aws_sdk_dynamodb::Client,
    opts: DynamoDbOpts,
}

impl DynamoDbSink {
    /// Create a sink from an existing client.
    pub fn new(client: aws_sdk_dynamodb::Client, opts: DynamoDbOpts) -> Self {
        Self { client, opts }
    }

    /// Create a sink with a client built from the ambient AWS configuration.
    pub async fn connect(opts: DynamoDbOpts) -> Self {
        Self::new(dynamodb_client().await, opts)
    }

    /// Get a reference to the underlying client.
    pub fn inner(&self) -> &aws_sdk_dynamodb::Client {
        &self.client
    }

    pub fn opts(&self) -> &DynamoDbOpts {
        &self.opts
    }
}

#[async_trait::async_trait]
impl TableSink for DynamoDbSink {
    async fn describe_table(&self, name: &str) -> Result<TableInfo> {
        let response = self
            .client
            .describe_table()
            .table_name(name)
            .send()
            .await
            .with_context(|| format!("Failed to describe DynamoDB table '{name}'"))?;

        let description = response
            .table
            .with_context(|| format!("DescribeTable returned no description for '{name}'"))?;

        let definitions = description.attribute_definitions.unwrap_or_default();
        let mut table = TableInfo::new(description.table_name.unwrap_or_else(|| name.to_string()));

        for element in description.key_schema.unwrap_or_default() {
            let attribute = element.attribute_name();
            let scalar = definitions
                .iter()
                .find(|d| d.attribute_name() == attribute)
                .map(|d| d.attribute_type().clone())
                .with_context(|| {
                    format!("Key attribute '{attribute}' of '{name}' has no attribute definition")
                })?;
            table = table.with_key(attribute, key_kind(&scalar)?);
        }

        tracing::info!(
            "Resolved DynamoDB table '{}' with key attributes {:?}",
            table.name,
            table.keys.iter().map(|k| k.name.as_str()).collect::<Vec<_>>()
        );

        Ok(table)
    }

    async fn write_batch(&self, table: &TableInfo, rows: &[Row]) -> Result<BatchOutcome> {
        write_rows(&self.client, &self.opts, table, rows).await
    }
}

fn key_kind(scalar: &ScalarAttributeType) -> Result<KeyKind> {
    match scalar {
        ScalarAttributeType::S => Ok(KeyKind::String),
        ScalarAttributeType::N => Ok(KeyKind::Number),
        ScalarAttributeType::B => Ok(KeyKind::Binary),
        other => anyhow::bail!("Unsupported key attribute type: {}", other.as_str()),
    }
}

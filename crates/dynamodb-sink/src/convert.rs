//! Row to DynamoDB item conversion.

use anyhow::Result;
use aws_sdk_dynamodb::primitives::Blob;
use aws_sdk_dynamodb::types::AttributeValue;
use serde::Serialize;
use std::collections::HashMap;
use table_sink::{KeyKind, Row, TableInfo};

/// How non-key cell text becomes attribute values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ValueMode {
    /// Every cell is stored as a string
    #[default]
    Text,
    /// Numbers, booleans and empty cells are stored with their natural type
    Inferred,
}

/// Convert a row into a DynamoDB item.
///
/// Key attributes always use the type the table declares for them; a row
/// without a value for every key attribute is rejected.
pub fn row_to_item(
    row: &Row,
    table: &TableInfo,
    mode: ValueMode,
) -> Result<HashMap<String, AttributeValue>> {
    for key in &table.keys {
        match row.get(&key.name) {
            Some(value) if !value.is_empty() => {}
            _ => anyhow::bail!(
                "Row is missing a value for key attribute '{}' of table '{}'",
                key.name,
                table.name
            ),
        }
    }

    let item = row
        .iter()
        .map(|(name, value)| -> Result<(String, AttributeValue)> {
            let attribute = match table.key_kind(name) {
                Some(kind) => key_value(value, kind, name)?,
                None => cell_value(value, mode),
            };
            Ok((name.clone(), attribute))
        })
        .collect::<Result<HashMap<_, _>>>()?;

    Ok(item)
}

fn key_value(value: &str, kind: KeyKind, name: &str) -> Result<AttributeValue> {
    Ok(match kind {
        KeyKind::String => AttributeValue::S(value.to_string()),
        KeyKind::Number => {
            if !is_number(value) {
                anyhow::bail!("Key attribute '{name}' expects a number, got '{value}'");
            }
            AttributeValue::N(value.trim().to_string())
        }
        KeyKind::Binary => AttributeValue::B(Blob::new(value.as_bytes())),
    })
}

fn cell_value(value: &str, mode: ValueMode) -> AttributeValue {
    match mode {
        ValueMode::Text => AttributeValue::S(value.to_string()),
        ValueMode::Inferred => infer_value(value),
    }
}

fn infer_value(value: &str) -> AttributeValue {
    if value.is_empty() {
        return AttributeValue::Null(true);
    }

    if is_number(value) {
        return AttributeValue::N(value.trim().to_string());
    }

    match value.to_lowercase().as_str() {
        "true" => AttributeValue::Bool(true),
        "false" => AttributeValue::Bool(false),
        _ => AttributeValue::S(value.to_string()),
    }
}

/// Integers and finite floats. `NaN` and `inf` parse as f64 but are not
/// valid DynamoDB numbers.
fn is_number(value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() {
        return false;
    }
    if value.parse::<i64>().is_ok() {
        return true;
    }
    value.parse::<f64>().map(f64::is_finite).unwrap_or(false)
        && value.chars().any(|c| c.is_ascii_digit())
}

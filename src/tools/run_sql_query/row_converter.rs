//! Row to scalar conversion for query results
//!
//! The `Any` driver reports one of a handful of value kinds per column;
//! each maps onto a [`ScalarValue`].

use crate::types::ScalarValue;
use chrono::NaiveDateTime;
use sqlx::any::AnyRow;
use sqlx::{Column, Row, TypeInfo};

const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Column names of a result set, taken from its first row
///
/// The `Any` driver only exposes column metadata on rows, so an empty result
/// set yields no column names.
pub fn column_names(rows: &[AnyRow]) -> Vec<String> {
    rows.first()
        .map(|row| row.columns().iter().map(|c| c.name().to_string()).collect())
        .unwrap_or_default()
}

/// Convert one row to its ordered scalar values
///
/// # Errors
/// Returns a message naming the column when a value cannot be decoded
pub fn row_to_scalars(row: &AnyRow) -> Result<Vec<ScalarValue>, String> {
    row.columns()
        .iter()
        .map(|column| {
            let ordinal = column.ordinal();
            let type_name = column.type_info().name();
            decode(row, ordinal, type_name).map_err(|e| {
                format!(
                    "Failed to read column '{}' as {}: {}. Consider casting it to VARCHAR in the query.",
                    column.name(),
                    type_name,
                    e
                )
            })
        })
        .collect()
}

fn decode(row: &AnyRow, ordinal: usize, type_name: &str) -> Result<ScalarValue, sqlx::Error> {
    let value = match type_name {
        "NULL" => ScalarValue::Null,
        "BOOLEAN" => row
            .try_get::<Option<bool>, _>(ordinal)?
            .map_or(ScalarValue::Null, ScalarValue::Bool),
        "SMALLINT" => row
            .try_get::<Option<i16>, _>(ordinal)?
            .map_or(ScalarValue::Null, |v| ScalarValue::Int(v.into())),
        "INTEGER" => row
            .try_get::<Option<i32>, _>(ordinal)?
            .map_or(ScalarValue::Null, |v| ScalarValue::Int(v.into())),
        "BIGINT" => row
            .try_get::<Option<i64>, _>(ordinal)?
            .map_or(ScalarValue::Null, ScalarValue::Int),
        "REAL" => row
            .try_get::<Option<f32>, _>(ordinal)?
            .map_or(ScalarValue::Null, |v| ScalarValue::Float(v.into())),
        "DOUBLE" => row
            .try_get::<Option<f64>, _>(ordinal)?
            .map_or(ScalarValue::Null, ScalarValue::Float),
        "BLOB" => row
            .try_get::<Option<Vec<u8>>, _>(ordinal)?
            .map_or(ScalarValue::Null, |bytes| {
                ScalarValue::Text(String::from_utf8_lossy(&bytes).into_owned())
            }),
        _ => row
            .try_get::<Option<String>, _>(ordinal)?
            .map_or(ScalarValue::Null, text_scalar),
    };
    Ok(value)
}

/// Text cell, promoted to a timestamp when it is a full date-time literal
fn text_scalar(text: String) -> ScalarValue {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&text, fmt).ok())
        .map_or(ScalarValue::Text(text), ScalarValue::Timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_promotion() {
        assert!(matches!(text_scalar("2024-03-01 10:30:00".into()), ScalarValue::Timestamp(_)));
        assert!(matches!(text_scalar("2024-03-01T10:30:00.250".into()), ScalarValue::Timestamp(_)));
        assert_eq!(text_scalar("2024-03-01".into()), ScalarValue::Text("2024-03-01".into()));
        assert_eq!(text_scalar("hello".into()), ScalarValue::Text("hello".into()));
    }
}

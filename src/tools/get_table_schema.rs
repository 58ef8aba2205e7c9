//! Schema catalog lookups: get_table_schema, get_tables_schema, data_dictionary_tool
//!
//! These never touch the database or the authorizer; they only read the
//! catalog loaded at startup.

use crate::catalog::SchemaCatalog;
use crate::error::GatewayError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetTableSchemaArgs {
    /// Catalog table name, e.g. `api_analytics_orders`
    pub table: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetTablesSchemaArgs {
    /// Catalog table names to describe
    pub tables: Vec<String>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct DataDictionaryArgs {
    /// Table to describe; omit to list every catalog table
    #[serde(default)]
    pub table_name: Option<String>,
}

/// Ordered column list of one table
///
/// # Errors
/// `UnknownTable` when the catalog has no such table.
pub fn get_table_schema(catalog: &SchemaCatalog, args: &GetTableSchemaArgs) -> Result<Value, GatewayError> {
    let schema = catalog.require(args.table.trim())?;
    to_json(schema)
}

/// Mapping of each known requested table to its columns; unknown names are left out
pub fn get_tables_schema(catalog: &SchemaCatalog, args: &GetTablesSchemaArgs) -> Result<Value, GatewayError> {
    let found = catalog.subset(&args.tables);
    if found.len() < args.tables.len() {
        log::debug!(
            "get_tables_schema: {} of {} requested table(s) not in catalog",
            args.tables.len() - found.len(),
            args.tables.len()
        );
    }
    to_json(found)
}

/// One table's columns, or every table name when no table is given
pub fn data_dictionary(catalog: &SchemaCatalog, args: &DataDictionaryArgs) -> Result<Value, GatewayError> {
    match args.table_name.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        Some(table) => get_table_schema(
            catalog,
            &GetTableSchemaArgs {
                table: table.to_string(),
            },
        ),
        None => Ok(json!(catalog.table_names())),
    }
}

fn to_json(value: impl Serialize) -> Result<Value, GatewayError> {
    serde_json::to_value(value).map_err(|e| GatewayError::Execution(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ColumnDescriptor;

    fn catalog() -> SchemaCatalog {
        let col = |name: &str, ty: &str| ColumnDescriptor {
            name: name.into(),
            column_type: ty.into(),
            description: format!("{} column", name),
        };
        SchemaCatalog::from_tables([
            ("orders".to_string(), vec![col("id", "bigint"), col("status", "varchar")]),
            ("products".to_string(), vec![col("sku", "varchar")]),
        ])
    }

    #[test]
    fn test_single_table_wire_format() {
        let value = get_table_schema(&catalog(), &GetTableSchemaArgs { table: "orders".into() }).unwrap();
        assert_eq!(
            value,
            json!([
                {"column_name": "id", "column_type": "bigint", "column_description": "id column"},
                {"column_name": "status", "column_type": "varchar", "column_description": "status column"}
            ])
        );
    }

    #[test]
    fn test_serialization_failure_is_reported() {
        use std::collections::BTreeMap;
        // non-string map keys cannot become JSON object keys
        let bad: BTreeMap<Vec<u8>, u8> = [(vec![1u8], 1u8)].into();
        let err = to_json(bad).unwrap_err();
        assert!(matches!(err, GatewayError::Execution(_)));
        assert!(err.to_payload()["error"].is_string());
    }

    #[test]
    fn test_unknown_table_is_error_payload() {
        let err = get_table_schema(&catalog(), &GetTableSchemaArgs { table: "nope".into() }).unwrap_err();
        assert_eq!(err.to_payload(), json!({"error": "Table nope not found in schema catalog"}));
    }

    #[test]
    fn test_multi_table_omits_unknown() {
        let value = get_tables_schema(
            &catalog(),
            &GetTablesSchemaArgs {
                tables: vec!["products".into(), "ghost".into()],
            },
        )
        .unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 1);
        assert!(obj.contains_key("products"));

        let empty = get_tables_schema(&catalog(), &GetTablesSchemaArgs { tables: vec![] }).unwrap();
        assert_eq!(empty, json!({}));
    }

    #[test]
    fn test_data_dictionary_both_modes() {
        let names = data_dictionary(&catalog(), &DataDictionaryArgs::default()).unwrap();
        assert_eq!(names, json!(["orders", "products"]));

        let cols = data_dictionary(
            &catalog(),
            &DataDictionaryArgs {
                table_name: Some("PRODUCTS".into()),
            },
        )
        .unwrap();
        assert_eq!(cols[0]["column_name"], "sku");

        assert!(
            data_dictionary(
                &catalog(),
                &DataDictionaryArgs {
                    table_name: Some("ghost".into())
                }
            )
            .is_err()
        );
    }
}

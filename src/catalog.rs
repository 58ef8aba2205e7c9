//! Schema catalog loaded from a dbt models YAML file
//!
//! Only the parts of the dbt document the gateway serves are read:
//!
//! ```yaml
//! models:
//!   - name: api_analytics_orders
//!     description: One row per order
//!     columns:
//!       - name: order_id
//!         data_type: bigint
//!         description: Primary key
//! ```

use crate::error::GatewayError;
use crate::types::{ColumnDescriptor, TableSchema};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

#[derive(Debug, Deserialize)]
struct ModelsFile {
    #[serde(default)]
    models: Vec<Model>,
}

#[derive(Debug, Deserialize)]
struct Model {
    name: String,
    #[serde(default)]
    columns: Vec<ModelColumn>,
}

#[derive(Debug, Deserialize)]
struct ModelColumn {
    name: String,
    #[serde(default)]
    data_type: Option<String>,
    #[serde(default, rename = "type")]
    type_alias: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

impl From<ModelColumn> for ColumnDescriptor {
    fn from(col: ModelColumn) -> Self {
        Self {
            name: col.name,
            column_type: col
                .data_type
                .or(col.type_alias)
                .unwrap_or_else(|| "unknown".to_string()),
            description: col.description.unwrap_or_default().trim().to_string(),
        }
    }
}

/// Read-only table name to column list mapping
#[derive(Debug, Clone, Default)]
pub struct SchemaCatalog {
    tables: BTreeMap<String, TableSchema>,
}

impl SchemaCatalog {
    /// Parse a dbt models document
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        let file: ModelsFile = serde_yaml::from_str(text)?;
        let tables = file
            .models
            .into_iter()
            .map(|m| (m.name, m.columns.into_iter().map(ColumnDescriptor::from).collect()))
            .collect();
        Ok(Self { tables })
    }

    /// Load the catalog file at startup
    ///
    /// # Errors
    /// Fails when the file is unreadable or not a valid models document.
    pub fn load(path: &Path) -> Result<Self, GatewayError> {
        let text = std::fs::read_to_string(path)?;
        let catalog = Self::from_yaml(&text).map_err(|e| GatewayError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        log::info!("Loaded schema catalog from {}: {} table(s)", path.display(), catalog.len());
        Ok(catalog)
    }

    pub fn from_tables(tables: impl IntoIterator<Item = (String, TableSchema)>) -> Self {
        Self {
            tables: tables.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Sorted table names as written in the catalog
    pub fn table_names(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }

    /// Uppercased table names, the form the authorizer compares against
    pub fn table_set(&self) -> BTreeSet<String> {
        self.tables.keys().map(|k| k.to_uppercase()).collect()
    }

    /// Exact lookup, then case-insensitive
    pub fn get(&self, table: &str) -> Option<&TableSchema> {
        self.tables.get(table).or_else(|| {
            self.tables
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(table))
                .map(|(_, schema)| schema)
        })
    }

    /// Schema for a table, or an `UnknownTable` error
    pub fn require(&self, table: &str) -> Result<&TableSchema, GatewayError> {
        self.get(table)
            .ok_or_else(|| GatewayError::UnknownTable(table.to_string()))
    }

    /// Schemas for the known subset of `tables`, keyed by the requested name
    pub fn subset<S: AsRef<str>>(&self, tables: &[S]) -> BTreeMap<String, TableSchema> {
        tables
            .iter()
            .filter_map(|t| {
                let t = t.as_ref();
                self.get(t).map(|schema| (t.to_string(), schema.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODELS: &str = r#"
version: 2
models:
  - name: api_analytics_orders
    description: One row per order
    columns:
      - name: order_id
        data_type: bigint
        description: |
          Primary key
      - name: status
        type: varchar
      - name: note
  - name: api_analytics_products
    columns: []
"#;

    #[test]
    fn test_parses_models_and_type_fallbacks() {
        let catalog = SchemaCatalog::from_yaml(MODELS).unwrap();
        assert_eq!(catalog.len(), 2);

        let orders = catalog.get("api_analytics_orders").unwrap();
        assert_eq!(orders.len(), 3);
        assert_eq!(orders[0].name, "order_id");
        assert_eq!(orders[0].column_type, "bigint");
        assert_eq!(orders[0].description, "Primary key");
        assert_eq!(orders[1].column_type, "varchar");
        assert_eq!(orders[2].column_type, "unknown");
        assert_eq!(orders[2].description, "");
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let catalog = SchemaCatalog::from_yaml(MODELS).unwrap();
        assert!(catalog.get("API_ANALYTICS_ORDERS").is_some());
        assert!(matches!(
            catalog.require("missing"),
            Err(GatewayError::UnknownTable(t)) if t == "missing"
        ));
    }

    #[test]
    fn test_subset_omits_unknown_tables() {
        let catalog = SchemaCatalog::from_yaml(MODELS).unwrap();
        let found = catalog.subset(&["api_analytics_orders", "nope"]);
        assert_eq!(found.keys().collect::<Vec<_>>(), ["api_analytics_orders"]);
        assert!(catalog.subset::<&str>(&[]).is_empty());
    }

    #[test]
    fn test_names_and_upper_set() {
        let catalog = SchemaCatalog::from_yaml(MODELS).unwrap();
        assert_eq!(catalog.table_names(), ["api_analytics_orders", "api_analytics_products"]);
        assert!(catalog.table_set().contains("API_ANALYTICS_PRODUCTS"));
    }

    #[test]
    fn test_load_failures() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            SchemaCatalog::load(&dir.path().join("missing.yml")),
            Err(GatewayError::Io(_))
        ));

        let bad = dir.path().join("bad.yml");
        std::fs::write(&bad, "models: [ {name: ").unwrap();
        assert!(matches!(SchemaCatalog::load(&bad), Err(GatewayError::Parse { .. })));
    }
}

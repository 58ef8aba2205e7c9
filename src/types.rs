//! Type definitions for gateway operations

use chrono::NaiveDateTime;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize, Serializer};

/// Column metadata from the schema catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ColumnDescriptor {
    /// Column name
    #[serde(rename = "column_name")]
    pub name: String,

    /// Declared data type (e.g., "varchar", "bigint")
    #[serde(rename = "column_type")]
    pub column_type: String,

    /// Meaning and purpose of the column values
    #[serde(rename = "column_description")]
    pub description: String,
}

/// Ordered column list of one table
pub type TableSchema = Vec<ColumnDescriptor>;

/// One table referenced by a statement, identifiers uppercased
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TargetReference {
    pub database: Option<String>,
    pub schema: Option<String>,
    pub table: String,
}

impl TargetReference {
    /// Build from 1-3 dotted components, read right-to-left
    ///
    /// Components beyond the third from the right are ignored.
    pub fn from_parts(parts: &[String]) -> Option<Self> {
        let mut rev = parts.iter().rev();
        let table = rev.next()?.to_uppercase();
        let schema = rev.next().map(|s| s.to_uppercase());
        let database = rev.next().map(|s| s.to_uppercase());
        Some(Self {
            database,
            schema,
            table,
        })
    }
}

impl std::fmt::Display for TargetReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(db) = &self.database {
            write!(f, "{}.", db)?;
        }
        if let Some(schema) = &self.schema {
            write!(f, "{}.", schema)?;
        }
        write!(f, "{}", self.table)
    }
}

/// A single result cell
///
/// Serializes as the bare JSON scalar; timestamps render as ISO-8601 strings.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    Timestamp(NaiveDateTime),
}

impl Serialize for ScalarValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::Int(v) => serializer.serialize_i64(*v),
            Self::Float(v) => serializer.serialize_f64(*v),
            Self::Text(s) => serializer.serialize_str(s),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Timestamp(ts) => {
                serializer.collect_str(&ts.format("%Y-%m-%dT%H:%M:%S%.f"))
            }
        }
    }
}

/// Outcome of executing an authorized statement
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryResult {
    Rows {
        columns: Vec<String>,
        rows: Vec<Vec<ScalarValue>>,
    },
    Error {
        error: String,
    },
}

impl QueryResult {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

/// Daily cost entry returned by the billing analyzer
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BillingEntry {
    pub cost: f64,
    pub usage_hours: f64,
}

/// Database type for SQL dialect-specific handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatabaseType {
    Postgres,
    Redshift,
    MySQL,
    SQLite,
}

impl DatabaseType {
    /// Detect database type from connection URL
    ///
    /// Postgres URLs pointing at a Redshift endpoint (`*.redshift.amazonaws.com`
    /// or the default Redshift port 5439) are reported as Redshift.
    ///
    /// # Examples
    /// ```
    /// # use redshift_sql_gateway::types::DatabaseType;
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let db = DatabaseType::from_url("postgres://localhost/mydb")?;
    /// assert_eq!(db, DatabaseType::Postgres);
    /// let db = DatabaseType::from_url("postgres://analytics.abc.us-east-1.redshift.amazonaws.com:5439/dev")?;
    /// assert_eq!(db, DatabaseType::Redshift);
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_url(url: &str) -> Result<Self, crate::error::GatewayError> {
        if url.starts_with("redshift://") {
            Ok(Self::Redshift)
        } else if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            let parsed = url::Url::parse(url)?;
            let is_redshift = parsed
                .host_str()
                .is_some_and(|h| h.ends_with(".redshift.amazonaws.com"))
                || parsed.port() == Some(5439);
            Ok(if is_redshift {
                Self::Redshift
            } else {
                Self::Postgres
            })
        } else if url.starts_with("mysql://") || url.starts_with("mariadb://") {
            Ok(Self::MySQL)
        } else if url.starts_with("sqlite:") || url.starts_with("file:") {
            Ok(Self::SQLite)
        } else {
            Err(crate::error::GatewayError::Config(format!(
                "Cannot determine database type from URL scheme: {}",
                url.split("://").next().unwrap_or(url)
            )))
        }
    }
}

impl std::fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Postgres => write!(f, "PostgreSQL"),
            Self::Redshift => write!(f, "Amazon Redshift"),
            Self::MySQL => write!(f, "MySQL"),
            Self::SQLite => write!(f, "SQLite"),
        }
    }
}

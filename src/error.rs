//! Error types for gateway operations

use serde_json::{Value, json};
use thiserror::Error;

/// Why the authorizer refused a statement
///
/// Display strings are the caller-visible messages and keep the wording
/// existing clients already match on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DenialReason {
    /// Blank or whitespace-only input
    #[error("No SQL provided")]
    EmptyQuery,

    /// Non-SELECT statement containing a mutating keyword
    #[error("Query contains blacklisted keyword: {0}")]
    BlacklistedKeyword(String),

    /// Explicit database qualifier that differs from the allowlist
    #[error("Database {0} access denied")]
    DatabaseDenied(String),

    /// Schema qualifier missing or different from the allowlist
    #[error("Schema {} access denied in database", .0.as_deref().unwrap_or("<unqualified>"))]
    SchemaDenied(Option<String>),

    /// Table outside the permitted set
    #[error("Table {table} access denied in schema {schema}")]
    TableDenied { table: String, schema: String },

    /// Statement kind rejected by the default-deny classifier
    #[error("Statement type {0} is not allowed")]
    StatementNotAllowed(String),
}

/// Gateway operation errors
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Statement refused by the authorizer
    #[error(transparent)]
    Denied(#[from] DenialReason),

    /// Table name not present in the schema catalog
    #[error("Table {0} not found in schema catalog")]
    UnknownTable(String),

    /// Database driver failure, message passed through verbatim
    #[error("{0}")]
    Execution(String),

    /// Date argument not in YYYY-MM-DD form
    #[error("Invalid date '{0}': expected YYYY-MM-DD")]
    InvalidDate(String),

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// Allowlist or catalog file could not be parsed
    #[error("Failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GatewayError {
    /// Structured payload returned to callers instead of a transport fault
    pub fn to_payload(&self) -> Value {
        json!({ "error": self.to_string() })
    }
}

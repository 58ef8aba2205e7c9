//! Gateway tools exposed over MCP

pub mod timeout;

// run_sql_query - authorization and execution pipeline
pub mod run_sql_query;
pub use run_sql_query::{QueryExecutor, QueryGateway, RunSqlQueryArgs};

// Catalog lookups
pub mod get_table_schema;
pub use get_table_schema::*;

// Advisory side paths
pub mod sql_query_optimizer;
pub use sql_query_optimizer::*;

pub mod billing_analyzer;
pub use billing_analyzer::*;

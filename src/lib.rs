//! Policy-enforcing SQL gateway for Amazon Redshift, served over MCP
//!
//! Incoming SQL is checked against an allowlist of database, schema and
//! tables before it reaches the warehouse. Schema lookups, tuning advice and
//! billing data are served alongside as read-only side paths.

pub mod error;
pub mod types;

pub mod authorizer;
pub mod billing;
pub mod catalog;
pub mod config;
pub mod connection;
pub mod dsn;
pub mod extractor;
pub mod optimizer;
pub mod policy;
pub mod prompt;
pub mod server;
pub mod sql_parser;

pub mod tools;

// Re-export secrecy types for consumers
pub use secrecy::{ExposeSecret, SecretString};

// Re-exports
pub use authorizer::{
    AuthorizationDecision, Authorizer, AuthorizerOptions, KeywordClassifier, StatementClassifier,
    StatementKind, authorize,
};
pub use catalog::SchemaCatalog;
pub use config::{PoolSettings, ServerConfig, Transport};
pub use connection::{DatabaseConnection, setup_database_pool, warmup_pool};
pub use dsn::{DSNInfo, build_connection_url, parse_dsn};
pub use error::{DenialReason, GatewayError};
pub use extractor::extract;
pub use optimizer::suggest;
pub use policy::{AllowlistPolicy, PolicyStore};
pub use server::GatewayServer;
pub use sql_parser::{extract_first_keyword, strip_comments};
pub use tools::{QueryExecutor, QueryGateway};
pub use types::{
    BillingEntry, ColumnDescriptor, DatabaseType, QueryResult, ScalarValue, TableSchema,
    TargetReference,
};

use anyhow::Context;
use std::sync::Arc;

/// Load the catalog and allowlist, connect to the database and assemble the service
///
/// Any failure here is fatal: a gateway without its policy or catalog must
/// not start.
pub async fn build_server(config: &ServerConfig) -> anyhow::Result<GatewayServer> {
    let catalog = SchemaCatalog::load(&config.schema_file)
        .with_context(|| format!("Failed to load schema catalog {}", config.schema_file.display()))?;
    let policies = PolicyStore::open(&config.permitted_tables_file).with_context(|| {
        format!(
            "Failed to load permitted tables {}",
            config.permitted_tables_file.display()
        )
    })?;

    let db_type = DatabaseType::from_url(&config.db_url)
        .or_else(|_| DatabaseType::from_url(&format!("postgres://{}", config.db_url)))
        .context("Failed to determine database type from DB_URL")?;
    let dsn = build_connection_url(
        &config.db_url,
        config.db_user.as_deref(),
        config.db_password.as_ref(),
    )
    .context("Invalid DB_URL")?;
    let connection = setup_database_pool(&dsn, db_type, &config.pool).await?;

    let catalog = Arc::new(catalog);
    let catalog_tables = Arc::new(catalog.table_set());
    let policies = Arc::new(policies);

    let authorizer = Authorizer::new(AuthorizerOptions {
        check_all_references: config.check_all_references,
        default_deny: config.default_deny,
        safe_prefixes: config.safe_prefixes.clone(),
        dialect: connection.db_type,
    });
    log::info!("Authorizer configured: {:?}", authorizer.options());

    let gateway = QueryGateway::new(
        authorizer,
        Arc::clone(&policies),
        Arc::clone(&catalog_tables),
        QueryExecutor::new(connection.pool, config.query_timeout),
    );

    Ok(GatewayServer::new(Arc::new(gateway), catalog, catalog_tables, policies))
}

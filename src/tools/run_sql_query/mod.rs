//! run_sql_query - authorize a statement, then execute it
//!
//! Every call takes a fresh allowlist snapshot, runs the authorizer against
//! it, and only hands allowed statements to the executor. Denials never
//! reach the database.

mod executor;
mod row_converter;

pub use executor::QueryExecutor;

use crate::authorizer::{AuthorizationDecision, Authorizer};
use crate::policy::PolicyStore;
use crate::types::QueryResult;
use schemars::JsonSchema;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Arguments of the run_sql_query tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct RunSqlQueryArgs {
    /// SQL statement to execute, e.g. `SELECT id FROM public.orders LIMIT 10`
    pub query: String,
}

/// Authorization plus execution pipeline
pub struct QueryGateway {
    authorizer: Authorizer,
    policies: Arc<PolicyStore>,
    catalog_tables: Arc<BTreeSet<String>>,
    executor: QueryExecutor,
}

impl QueryGateway {
    pub fn new(
        authorizer: Authorizer,
        policies: Arc<PolicyStore>,
        catalog_tables: Arc<BTreeSet<String>>,
        executor: QueryExecutor,
    ) -> Self {
        Self {
            authorizer,
            policies,
            catalog_tables,
            executor,
        }
    }

    /// Authorize and, when allowed, execute `query`
    ///
    /// The statement runs with its original casing.
    pub async fn run(&self, query: &str) -> QueryResult {
        let policy = self.policies.refresh();

        match self.authorizer.authorize(query, &policy, &self.catalog_tables) {
            AuthorizationDecision::Denied(reason) => {
                log::info!("Denied query: {}", reason);
                QueryResult::Error {
                    error: reason.to_string(),
                }
            }
            AuthorizationDecision::Allowed => {
                let result = self.executor.execute(query.trim()).await;
                if let QueryResult::Error { error } = &result {
                    log::warn!("Query execution failed: {}", error);
                }
                result
            }
        }
    }
}

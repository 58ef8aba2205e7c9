//! sql_query_optimizer - advisory tuning hints for a statement

use crate::optimizer::suggest;
use schemars::JsonSchema;
use serde::Deserialize;
use std::collections::BTreeSet;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SqlQueryOptimizerArgs {
    /// SQL statement to review; it is not executed
    pub query: String,
}

pub fn sql_query_optimizer(args: &SqlQueryOptimizerArgs, catalog_tables: &BTreeSet<String>) -> Vec<String> {
    suggest(&args.query, catalog_tables)
}

//! Statement execution against the shared pool

use super::row_converter::{column_names, row_to_scalars};
use crate::tools::timeout::execute_with_timeout;
use crate::types::QueryResult;
use sqlx::AnyPool;
use std::sync::Arc;
use std::time::Duration;

/// Runs authorized statements on a pooled connection
#[derive(Clone)]
pub struct QueryExecutor {
    pool: Arc<AnyPool>,
    timeout: Option<Duration>,
}

impl QueryExecutor {
    pub fn new(pool: Arc<AnyPool>, timeout: Option<Duration>) -> Self {
        Self { pool, timeout }
    }

    pub fn pool(&self) -> &Arc<AnyPool> {
        &self.pool
    }

    /// Execute `sql` once and materialize every row
    ///
    /// The connection is checked out for the duration of this call and goes
    /// back to the pool on every exit path. Failures come back as
    /// [`QueryResult::Error`] with the driver's message. A statement that
    /// returns no rows reports no columns either.
    pub async fn execute(&self, sql: &str) -> QueryResult {
        let pool = Arc::clone(&self.pool);
        let fetch = async move {
            let mut conn = pool.acquire().await?;
            sqlx::query(sql).fetch_all(&mut *conn).await
        };

        let description = format!("Executing SQL: {}", sql.chars().take(50).collect::<String>());
        let rows = match execute_with_timeout(self.timeout, fetch, &description).await {
            Ok(rows) => rows,
            Err(e) => {
                return QueryResult::Error {
                    error: e.to_string(),
                };
            }
        };

        let columns = column_names(&rows);
        match rows.iter().map(row_to_scalars).collect::<Result<Vec<_>, _>>() {
            Ok(rows) => {
                log::debug!("Query returned {} row(s)", rows.len());
                QueryResult::Rows { columns, rows }
            }
            Err(error) => QueryResult::Error { error },
        }
    }
}

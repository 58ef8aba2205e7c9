//! Optional statement timeout for database operations

use crate::error::GatewayError;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

/// Run a database operation, bounded by `limit` when one is configured
///
/// Runs exactly once: a failed statement is never retried. With no limit
/// the operation is awaited as-is and cancellation is left to the driver.
///
/// # Example
///
/// ```rust
/// # use redshift_sql_gateway::tools::timeout::execute_with_timeout;
/// # use std::time::Duration;
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let rows = execute_with_timeout(
///     Some(Duration::from_secs(5)),
///     async { Ok::<Vec<i32>, sqlx::Error>(vec![1, 2]) },
///     "Fetching numbers",
/// )
/// .await
/// .unwrap();
/// assert_eq!(rows, [1, 2]);
/// # }
/// ```
pub async fn execute_with_timeout<T, Fut>(
    limit: Option<Duration>,
    operation: Fut,
    operation_description: &str,
) -> Result<T, GatewayError>
where
    Fut: Future<Output = Result<T, sqlx::Error>>,
{
    let outcome = match limit {
        Some(duration) => match timeout(duration, operation).await {
            Ok(result) => result,
            Err(_elapsed) => {
                log::warn!("{} timed out after {:?}", operation_description, duration);
                return Err(GatewayError::Execution(format!(
                    "Query timed out after {} seconds",
                    duration.as_secs()
                )));
            }
        },
        None => operation.await,
    };

    outcome.map_err(|e| {
        log::debug!("{} failed: {}", operation_description, e);
        GatewayError::Execution(driver_message(&e))
    })
}

/// Driver error text without the sqlx wrapper prefix
fn driver_message(err: &sqlx::Error) -> String {
    match err {
        sqlx::Error::Database(db_err) => db_err.message().to_string(),
        other => other.to_string(),
    }
}

//! Database connection setup and pooling utilities
//!
//! Builds the shared [`AnyPool`] from [`PoolSettings`] and warms it up so an
//! unreachable database is reported at startup instead of on the first call.

use crate::config::PoolSettings;
use crate::dsn::DSNInfo;
use crate::types::DatabaseType;
use anyhow::{Context, Result};
use secrecy::ExposeSecret;
use sqlx::AnyPool;
use sqlx::pool::PoolOptions;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Warm up connection pool by pre-establishing min_connections
///
/// Concurrently acquires min_connections to force pool establishment.
///
/// # Errors
/// Returns error if all warmup connections fail
pub async fn warmup_pool(pool: &AnyPool, min_connections: u32) -> Result<()> {
    let start = Instant::now();
    let target = min_connections.max(1);

    let mut handles = Vec::new();
    for i in 0..target {
        let pool_clone = pool.clone();
        let handle = tokio::spawn(async move {
            sqlx::query("SELECT 1")
                .fetch_one(&pool_clone)
                .await
                .map_err(|e| anyhow::anyhow!("Warmup connection {} failed: {}", i + 1, e))
        });
        handles.push(handle);
    }

    let mut success_count = 0;
    let mut last_error = None;
    for (i, handle) in handles.into_iter().enumerate() {
        match handle.await {
            Ok(Ok(_)) => success_count += 1,
            Ok(Err(e)) => {
                log::warn!("Connection {} warmup failed: {}", i + 1, e);
                last_error = Some(e);
            }
            Err(e) => log::warn!("Connection {} warmup task panicked: {}", i + 1, e),
        }
    }

    let elapsed = start.elapsed();

    if success_count > 0 {
        log::info!(
            "Connection pool warmed up: {}/{} connections ready ({:?})",
            success_count,
            target,
            elapsed
        );

        if elapsed > Duration::from_secs(2) {
            log::warn!(
                "Pool warmup was slow ({:?}), queries may see high latency",
                elapsed
            );
        }

        Ok(())
    } else {
        let reason = last_error.map(|e| e.to_string()).unwrap_or_default();
        Err(anyhow::anyhow!(
            "Pool warmup failed: 0/{} connections established. {}",
            target,
            reason
        ))
    }
}

/// Database pool setup result
pub struct DatabaseConnection {
    /// Configured connection pool
    pub pool: Arc<AnyPool>,
    /// Dialect used for SQL tokenizing
    pub db_type: DatabaseType,
    /// Connection string with the password masked
    pub safe_url: String,
}

/// Connect to the database and warm the pool
///
/// `db_type` is detected from the URL as configured, before credentials are
/// injected, so a `redshift://` scheme still selects the Redshift dialect.
///
/// # Errors
/// Returns error if the connection or warmup fails
pub async fn setup_database_pool(
    dsn: &DSNInfo,
    db_type: DatabaseType,
    settings: &PoolSettings,
) -> Result<DatabaseConnection> {
    // Registers the compiled-in drivers; must run before any AnyPool is built
    sqlx::any::install_default_drivers();

    let safe_url = dsn.to_safe_dsn();
    log::info!("Connecting to {} at {}", db_type, safe_url);

    let connection_string = dsn.to_connection_string();
    let pool = PoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(settings.acquire_timeout)
        .idle_timeout(Some(settings.idle_timeout))
        .max_lifetime(Some(settings.max_lifetime))
        .test_before_acquire(true)
        .connect(connection_string.expose_secret())
        .await
        .with_context(|| format!("Failed to connect to database at {}", safe_url))?;

    warmup_pool(&pool, settings.min_connections).await?;

    log::info!("Database connected ({})", db_type);

    Ok(DatabaseConnection {
        pool: Arc::new(pool),
        db_type,
        safe_url,
    })
}

//! Server configuration read from the environment

use anyhow::{Context, Result, bail};
use secrecy::SecretString;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// How the MCP server is exposed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Stdio,
    StreamableHttp,
}

impl std::str::FromStr for Transport {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stdio" => Ok(Self::Stdio),
            "streamable-http" | "http" => Ok(Self::StreamableHttp),
            other => bail!("Invalid MCP_TRANSPORT '{}': must be 'stdio' or 'streamable-http'", other),
        }
    }
}

/// Connection pool sizing and timeouts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            max_lifetime: Duration::from_secs(1800),
        }
    }
}

/// Everything the gateway needs at startup
#[derive(Debug)]
pub struct ServerConfig {
    pub db_url: String,
    pub db_user: Option<String>,
    pub db_password: Option<SecretString>,
    pub transport: Transport,
    pub bind_addr: SocketAddr,
    pub schema_file: PathBuf,
    pub permitted_tables_file: PathBuf,
    pub check_all_references: bool,
    pub default_deny: bool,
    pub safe_prefixes: Vec<String>,
    pub pool: PoolSettings,
    /// Per-statement timeout; `None` leaves cancellation to the driver
    pub query_timeout: Option<Duration>,
}

impl ServerConfig {
    /// Read configuration from process environment variables
    ///
    /// # Errors
    /// Returns error if a variable is set to an unparseable value
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let db_url = get("DB_URL").unwrap_or_else(|| {
            log::info!("DB_URL not set, defaulting to sqlite::memory:");
            "sqlite::memory:".to_string()
        });

        let transport = match get("MCP_TRANSPORT") {
            Some(v) => v.parse()?,
            None => Transport::StreamableHttp,
        };

        let bind_addr = get("MCP_BIND_ADDR")
            .unwrap_or_else(|| "127.0.0.1:8000".to_string())
            .parse()
            .context("MCP_BIND_ADDR must be a socket address like 127.0.0.1:8000")?;

        let safe_prefixes = get("SAFE_STATEMENT_PREFIXES")
            .unwrap_or_else(|| "SHOW,EXPLAIN,DESCRIBE".to_string())
            .split(',')
            .map(|p| p.trim().to_uppercase())
            .filter(|p| !p.is_empty())
            .collect();

        let defaults = PoolSettings::default();
        let pool = PoolSettings {
            max_connections: parse_or(&get, "DB_MAX_CONNECTIONS", defaults.max_connections)?,
            min_connections: parse_or(&get, "DB_MIN_CONNECTIONS", defaults.min_connections)?,
            acquire_timeout: Duration::from_secs(parse_or(
                &get,
                "DB_ACQUIRE_TIMEOUT_SECS",
                defaults.acquire_timeout.as_secs(),
            )?),
            ..defaults
        };
        if pool.min_connections > pool.max_connections {
            bail!(
                "DB_MIN_CONNECTIONS ({}) cannot exceed DB_MAX_CONNECTIONS ({})",
                pool.min_connections,
                pool.max_connections
            );
        }

        let query_timeout = get("DB_QUERY_TIMEOUT_SECS")
            .map(|v| v.parse::<u64>().context("DB_QUERY_TIMEOUT_SECS must be a whole number of seconds"))
            .transpose()?
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        Ok(Self {
            db_url,
            db_user: get("DB_USER"),
            db_password: lookup("DB_PASSWORD")
                .filter(|v| !v.is_empty())
                .map(SecretString::from),
            transport,
            bind_addr,
            schema_file: get("SCHEMA_FILE")
                .unwrap_or_else(|| "_api__analytics__models.yml".to_string())
                .into(),
            permitted_tables_file: get("PERMITTED_TABLES_FILE")
                .unwrap_or_else(|| "sql_permitted_tables.json".to_string())
                .into(),
            check_all_references: parse_bool(&get, "CHECK_ALL_REFERENCES")?,
            default_deny: parse_bool(&get, "DEFAULT_DENY")?,
            safe_prefixes,
            pool,
            query_timeout,
        })
    }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(v) => v.parse().with_context(|| format!("{} must be a number, got '{}'", key, v)),
        None => Ok(default),
    }
}

fn parse_bool(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<bool> {
    match get(key).map(|v| v.to_ascii_lowercase()) {
        None => Ok(false),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => bail!("{} must be a boolean, got '{}'", key, v),
        },
    }
}

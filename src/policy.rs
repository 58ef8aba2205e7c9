//! Allowlist policy loading and hot reload
//!
//! The allowlist lives in a small JSON file:
//!
//! ```json
//! { "database": "dev", "schema": "public", "tables": ["orders", "customers"] }
//! ```
//!
//! [`PolicyStore`] hands out immutable snapshots and swaps in a freshly
//! parsed policy whenever the file's modification time changes, so an
//! in-flight request always sees one consistent version.

use crate::error::GatewayError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::SystemTime;

/// Database/schema/table allowlist, identifiers uppercased
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllowlistPolicy {
    pub database: Option<String>,
    pub schema: String,
    pub tables: BTreeSet<String>,
}

#[derive(Deserialize)]
struct RawPolicy {
    #[serde(default)]
    database: Option<String>,
    schema: String,
    #[serde(default)]
    tables: Vec<String>,
}

impl AllowlistPolicy {
    pub fn new<'a>(
        database: Option<&str>,
        schema: &str,
        tables: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        Self {
            database: database.filter(|d| !d.trim().is_empty()).map(|d| d.trim().to_uppercase()),
            schema: schema.trim().to_uppercase(),
            tables: tables.into_iter().map(|t| t.trim().to_uppercase()).collect(),
        }
    }

    /// Parse the JSON allowlist document
    ///
    /// A missing or blank `schema` is rejected.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        let raw: RawPolicy = serde_json::from_str(text)?;
        if raw.schema.trim().is_empty() {
            return Err(serde::de::Error::custom("schema must not be blank"));
        }
        Ok(Self::new(
            raw.database.as_deref(),
            &raw.schema,
            raw.tables.iter().map(String::as_str),
        ))
    }

    /// Read and parse an allowlist file
    pub fn load(path: &Path) -> Result<Self, GatewayError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text).map_err(|e| GatewayError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Case-insensitive membership in the explicit table list
    pub fn permits_table(&self, table: &str) -> bool {
        self.tables.contains(&table.to_uppercase())
    }
}

struct Loaded {
    policy: Arc<AllowlistPolicy>,
    modified: Option<SystemTime>,
}

/// Shared, reloadable allowlist
pub struct PolicyStore {
    path: PathBuf,
    current: RwLock<Loaded>,
}

impl std::fmt::Debug for PolicyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyStore").field("path", &self.path).finish_non_exhaustive()
    }
}

impl PolicyStore {
    /// Load the allowlist at startup
    ///
    /// # Errors
    /// Fails when the file is missing or malformed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, GatewayError> {
        let path = path.into();
        let modified = modified_time(&path);
        let policy = AllowlistPolicy::load(&path)?;
        log::info!(
            "Loaded allowlist from {}: schema {}, {} table(s)",
            path.display(),
            policy.schema,
            policy.tables.len()
        );
        Ok(Self {
            path,
            current: RwLock::new(Loaded {
                policy: Arc::new(policy),
                modified,
            }),
        })
    }

    /// Store with a fixed policy and no backing file
    pub fn fixed(policy: AllowlistPolicy) -> Self {
        Self {
            path: PathBuf::new(),
            current: RwLock::new(Loaded {
                policy: Arc::new(policy),
                modified: None,
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current snapshot without touching the filesystem
    pub fn snapshot(&self) -> Arc<AllowlistPolicy> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard.policy),
            Err(poisoned) => Arc::clone(&poisoned.into_inner().policy),
        }
    }

    /// Reload the file if its modification time moved, then return the snapshot
    ///
    /// A reload failure keeps the previous snapshot in place.
    pub fn refresh(&self) -> Arc<AllowlistPolicy> {
        if self.path.as_os_str().is_empty() {
            return self.snapshot();
        }

        let modified = modified_time(&self.path);
        let stale = match self.current.read() {
            Ok(guard) => guard.modified != modified,
            Err(_) => true,
        };
        if !stale {
            return self.snapshot();
        }

        match AllowlistPolicy::load(&self.path) {
            Ok(policy) => {
                let policy = Arc::new(policy);
                let mut guard = match self.current.write() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                log::info!("Reloaded allowlist from {}", self.path.display());
                guard.policy = Arc::clone(&policy);
                guard.modified = modified;
                policy
            }
            Err(e) => {
                log::warn!(
                    "Failed to reload allowlist from {}, keeping previous policy: {}",
                    self.path.display(),
                    e
                );
                self.snapshot()
            }
        }
    }
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

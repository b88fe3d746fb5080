//! Connection pool for the catalog database.
//!
//! A pool can be pinned to one schema: every connection it opens runs
//! `SET search_path` first, so the catalog's unqualified table names resolve
//! inside that schema. Integration tests use this to give each test its own
//! set of tables.

use std::time::{Duration, Instant};

use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Executor;
use tracing::info;

use storefinder_core::defaults::{
    DB_ACQUIRE_TIMEOUT_SECS, DB_IDLE_TIMEOUT_SECS, DB_MAX_CONNECTIONS,
};
use storefinder_core::{Error, Result};

use crate::config::CatalogConfig;

/// Pool configuration options.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    /// Schema searched before `public`, if any.
    pub schema: Option<String>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DB_MAX_CONNECTIONS,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(DB_ACQUIRE_TIMEOUT_SECS),
            idle_timeout: Duration::from_secs(DB_IDLE_TIMEOUT_SECS),
            schema: None,
        }
    }
}

impl From<&CatalogConfig> for PoolConfig {
    fn from(config: &CatalogConfig) -> Self {
        Self::default().max_connections(config.db_max_connections)
    }
}

impl PoolConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_connections(mut self, n: u32) -> Self {
        self.max_connections = n;
        self
    }

    pub fn min_connections(mut self, n: u32) -> Self {
        self.min_connections = n;
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Pin every connection to `schema` (then `public`).
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }
}

/// `SET search_path` statement for a schema name restricted to
/// `[A-Za-z_][A-Za-z0-9_]*`.
fn search_path_statement(schema: &str) -> Result<String> {
    let mut chars = schema.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(Error::Config(format!("invalid schema name {:?}", schema)));
    }
    Ok(format!("SET search_path TO {}, public", schema))
}

/// Open a catalog connection pool.
pub async fn connect_pool(database_url: &str, config: &PoolConfig) -> Result<PgPool> {
    let start = Instant::now();
    let schema = config.schema.as_deref().unwrap_or("public");

    info!(
        subsystem = "db",
        component = "pool",
        op = "connect",
        max_connections = config.max_connections,
        schema,
        "Opening catalog connection pool"
    );

    let mut options = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout);

    if let Some(name) = &config.schema {
        let statement = search_path_statement(name)?;
        options = options.after_connect(move |conn, _meta| {
            let statement = statement.clone();
            Box::pin(async move {
                conn.execute(statement.as_str()).await?;
                Ok(())
            })
        });
    }

    let pool = options
        .connect(database_url)
        .await
        .map_err(Error::Database)?;

    info!(
        subsystem = "db",
        component = "pool",
        op = "connect",
        schema,
        pool_size = pool.size(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Catalog connection pool established"
    );
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_follows_catalog_config() {
        let catalog = CatalogConfig {
            db_max_connections: 3,
            ..CatalogConfig::default()
        };
        let config = PoolConfig::from(&catalog);
        assert_eq!(config.max_connections, 3);
        assert_eq!(config.schema, None);
        assert_eq!(
            PoolConfig::from(&CatalogConfig::default()).max_connections,
            DB_MAX_CONNECTIONS
        );
    }

    #[test]
    fn test_schema_pins_search_path() {
        let config = PoolConfig::new().max_connections(2).schema("test_abc123");
        assert_eq!(config.schema.as_deref(), Some("test_abc123"));
        assert_eq!(
            search_path_statement("test_abc123").unwrap(),
            "SET search_path TO test_abc123, public"
        );
    }

    #[test]
    fn test_unsafe_schema_names_rejected() {
        for name in ["", "1abc", "a;DROP TABLE store", "a b", "a\"b", "a-b"] {
            assert!(
                matches!(search_path_statement(name), Err(Error::Config(_))),
                "{name:?} accepted"
            );
        }
    }
}

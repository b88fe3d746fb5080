//! Catalog configuration loaded from the environment.
//!
//! | Variable             | Default                          |
//! |----------------------|----------------------------------|
//! | `DATABASE_URL`       | `postgres://localhost/storefinder` |
//! | `PHOTO_STORAGE_PATH` | `./public/uploads`               |
//! | `PHOTO_MAX_WIDTH`    | `800`                            |
//! | `PHOTO_MAX_BYTES`    | `10485760`                       |
//! | `DB_MAX_CONNECTIONS` | `10`                             |

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use storefinder_core::defaults::{
    DATABASE_URL, DB_MAX_CONNECTIONS, ENV_DATABASE_URL, ENV_DB_MAX_CONNECTIONS, ENV_PHOTO_MAX_BYTES,
    ENV_PHOTO_MAX_WIDTH, ENV_PHOTO_STORAGE_PATH, PHOTO_MAX_BYTES, PHOTO_MAX_WIDTH,
    PHOTO_STORAGE_PATH,
};
use storefinder_core::{Error, Result};

/// Runtime configuration for the catalog and its photo storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub database_url: String,
    pub photo_storage_path: PathBuf,
    pub photo_max_width: u32,
    pub photo_max_bytes: usize,
    pub db_max_connections: u32,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            database_url: DATABASE_URL.to_string(),
            photo_storage_path: PathBuf::from(PHOTO_STORAGE_PATH),
            photo_max_width: PHOTO_MAX_WIDTH,
            photo_max_bytes: PHOTO_MAX_BYTES,
            db_max_connections: DB_MAX_CONNECTIONS,
        }
    }
}

impl CatalogConfig {
    /// Load configuration from the process environment, reading `.env` first
    /// when present.
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(
                subsystem = "config",
                path = %path.display(),
                "Loaded environment file"
            );
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let value = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Self {
            database_url: value(ENV_DATABASE_URL).unwrap_or(defaults.database_url),
            photo_storage_path: value(ENV_PHOTO_STORAGE_PATH)
                .map(PathBuf::from)
                .unwrap_or(defaults.photo_storage_path),
            photo_max_width: parse_or(
                ENV_PHOTO_MAX_WIDTH,
                value(ENV_PHOTO_MAX_WIDTH),
                defaults.photo_max_width,
            )?,
            photo_max_bytes: parse_or(
                ENV_PHOTO_MAX_BYTES,
                value(ENV_PHOTO_MAX_BYTES),
                defaults.photo_max_bytes,
            )?,
            db_max_connections: parse_or(
                ENV_DB_MAX_CONNECTIONS,
                value(ENV_DB_MAX_CONNECTIONS),
                defaults.db_max_connections,
            )?,
        }
        .validated()
    }

    fn validated(self) -> Result<Self> {
        if self.photo_max_width == 0 {
            return Err(Error::Config(format!(
                "{} must be positive",
                ENV_PHOTO_MAX_WIDTH
            )));
        }
        if self.photo_max_bytes == 0 {
            return Err(Error::Config(format!(
                "{} must be positive",
                ENV_PHOTO_MAX_BYTES
            )));
        }
        if self.db_max_connections == 0 {
            return Err(Error::Config(format!(
                "{} must be positive",
                ENV_DB_MAX_CONNECTIONS
            )));
        }
        Ok(self)
    }
}

fn parse_or<T: FromStr>(key: &str, raw: Option<String>, default: T) -> Result<T> {
    match raw {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| Error::Config(format!("{} must be a number, got {:?}", key, raw))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = CatalogConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, CatalogConfig::default());
        assert_eq!(config.photo_max_width, 800);
        assert_eq!(config.photo_storage_path, PathBuf::from("./public/uploads"));
    }

    #[test]
    fn test_overrides() {
        let config = CatalogConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db/stores"),
            ("PHOTO_STORAGE_PATH", "/srv/uploads"),
            ("PHOTO_MAX_WIDTH", " 640 "),
            ("DB_MAX_CONNECTIONS", "4"),
        ]))
        .unwrap();

        assert_eq!(config.database_url, "postgres://db/stores");
        assert_eq!(config.photo_storage_path, PathBuf::from("/srv/uploads"));
        assert_eq!(config.photo_max_width, 640);
        assert_eq!(config.db_max_connections, 4);
    }

    #[test]
    fn test_blank_values_use_defaults() {
        let config = CatalogConfig::from_lookup(lookup(&[("PHOTO_MAX_WIDTH", "  ")])).unwrap();
        assert_eq!(config.photo_max_width, 800);
    }

    #[test]
    fn test_invalid_number_is_config_error() {
        let err = CatalogConfig::from_lookup(lookup(&[("PHOTO_MAX_BYTES", "ten megs")]))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("PHOTO_MAX_BYTES"));
    }

    #[test]
    fn test_zero_width_rejected() {
        let err = CatalogConfig::from_lookup(lookup(&[("PHOTO_MAX_WIDTH", "0")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}

//! Environment-driven configuration
//!
//! Every setting has a default so the server starts with no environment at
//! all: file store under `./data`, API under `/api` on 127.0.0.1:8000.

use crate::db::StoreBackend;
use crate::error::{AppError, Result};
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_API_PREFIX: &str = "/api";
pub const DEFAULT_DATABASE_PATH: &str = "stock_events.db";
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_POOL_SIZE: u32 = 8;

const DEFAULT_CORS_ORIGINS: [&str; 2] = ["http://localhost:3000", "http://localhost:8080"];

/// Which backend serves each entity type and where it keeps its data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Stocks and their prices
    pub stock_backend: StoreBackend,
    pub event_backend: StoreBackend,
    pub database_path: PathBuf,
    pub pool_size: u32,
    pub data_dir: PathBuf,
}

impl StoreConfig {
    /// Both entity types in JSON files under `data_dir`
    pub fn file(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            stock_backend: StoreBackend::File,
            event_backend: StoreBackend::File,
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            pool_size: DEFAULT_POOL_SIZE,
            data_dir: data_dir.into(),
        }
    }

    /// Both entity types in the SQLite database at `database_path`
    pub fn sqlite(database_path: impl Into<PathBuf>) -> Self {
        Self {
            stock_backend: StoreBackend::Sqlite,
            event_backend: StoreBackend::Sqlite,
            database_path: database_path.into(),
            pool_size: DEFAULT_POOL_SIZE,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
        }
    }

    /// Events in SQLite reference stocks through a foreign key, so the
    /// stocks must live in the same database.
    pub fn validate(&self) -> Result<()> {
        if self.event_backend == StoreBackend::Sqlite && self.stock_backend != StoreBackend::Sqlite
        {
            return Err(AppError::Config(
                "EVENT_STORE=sqlite requires STOCK_STORE=sqlite".to_string(),
            ));
        }
        if self.pool_size == 0 {
            return Err(AppError::Config("DB_POOL_SIZE must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Normalised to a leading `/` and no trailing `/`; empty mounts at root
    pub api_prefix: String,
    /// `*` allows any origin
    pub cors_origins: Vec<String>,
    pub store: StoreConfig,
    pub seed_sample_data: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            cors_origins: DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect(),
            store: StoreConfig::file(DEFAULT_DATA_DIR),
            seed_sample_data: false,
        }
    }
}

impl AppConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = AppConfig::default();

        let use_database = match get("USE_DATABASE") {
            Some(v) => parse_bool("USE_DATABASE", &v)?,
            None => false,
        };
        let default_backend = if use_database {
            StoreBackend::Sqlite
        } else {
            StoreBackend::File
        };

        let store = StoreConfig {
            stock_backend: parse_or("STOCK_STORE", get("STOCK_STORE"), default_backend)?,
            event_backend: parse_or("EVENT_STORE", get("EVENT_STORE"), default_backend)?,
            database_path: get("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.store.database_path),
            pool_size: parse_or("DB_POOL_SIZE", get("DB_POOL_SIZE"), DEFAULT_POOL_SIZE)?,
            data_dir: get("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.store.data_dir),
        };
        store.validate()?;

        Ok(Self {
            host: get("HOST").unwrap_or(defaults.host),
            port: parse_or("PORT", get("PORT"), DEFAULT_PORT)?,
            api_prefix: get("API_PREFIX")
                .map(|p| normalize_prefix(&p))
                .unwrap_or(defaults.api_prefix),
            cors_origins: match get("CORS_ORIGINS") {
                Some(v) => parse_origins(&v)?,
                None => defaults.cors_origins,
            },
            store,
            seed_sample_data: match get("SEED_SAMPLE_DATA") {
                Some(v) => parse_bool("SEED_SAMPLE_DATA", &v)?,
                None => false,
            },
        })
    }

    /// Get bind address
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T>(key: &str, value: Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(v) => v
            .parse()
            .map_err(|e| AppError::Config(format!("invalid {} {:?}: {}", key, v, e))),
        None => Ok(default),
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "t" | "yes" | "on" => Ok(true),
        "false" | "0" | "f" | "no" | "off" => Ok(false),
        _ => Err(AppError::Config(format!(
            "invalid {} {:?}: expected true or false",
            key, value
        ))),
    }
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

/// Comma-separated list or a JSON array of origins
fn parse_origins(value: &str) -> Result<Vec<String>> {
    let origins: Vec<String> = if value.starts_with('[') {
        serde_json::from_str(value)
            .map_err(|e| AppError::Config(format!("invalid CORS_ORIGINS: {}", e)))?
    } else {
        value.split(',').map(|s| s.to_string()).collect()
    };

    Ok(origins
        .into_iter()
        .map(|s| s.trim().trim_end_matches('/').to_string())
        .filter(|s| !s.is_empty())
        .collect())
}

/// Configuration management for the API server
///
/// This module loads configuration from environment variables (with `.env`
/// support for development) and provides a type-safe configuration struct.
///
/// # Environment Variables
///
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 3000)
/// - `CORS_ORIGINS`: Comma-separated allowed origins, `*` for any (default: *)
/// - `STORE_BACKEND`: `postgres` or `memory` (default: postgres)
/// - `DATABASE_URL`: PostgreSQL connection string (required for `postgres`)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `DATABASE_MIN_CONNECTIONS`: Idle connections kept warm (default: 2)
/// - `DATABASE_CONNECT_TIMEOUT`: Acquire timeout in seconds (default: 30)
/// - `RUN_MIGRATIONS`: Apply embedded migrations at startup (default: true)
/// - `LOG_FORMAT`: `text` or `json` (default: text)
/// - `RUST_LOG`: Log filter (default: todo_api=debug,tower_http=debug)
///
/// # Example
///
/// ```no_run
/// use todo_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use todo_shared::db::pool::DatabaseConfig;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Which store backs the handlers
    pub store: StoreConfig,

    /// Log output configuration
    pub log: LogConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Allowed CORS origins; `["*"]` allows any origin
    pub cors_origins: Vec<String>,
}

/// Store selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StoreConfig {
    /// PostgreSQL through a connection pool
    Postgres(PostgresConfig),

    /// Process-local tables, lost on restart
    Memory,
}

/// PostgreSQL settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,

    /// Minimum number of idle connections
    pub min_connections: u32,

    /// Seconds to wait for a pooled connection
    pub connect_timeout_seconds: u64,

    /// Seconds `/healthcheck` waits for the database before reporting it down
    pub ping_timeout_seconds: u64,

    /// Apply embedded migrations before serving
    pub run_migrations: bool,
}

impl PostgresConfig {
    /// Pool settings for `todo_shared::db::pool`
    pub fn pool_config(&self) -> DatabaseConfig {
        DatabaseConfig {
            url: self.url.clone(),
            max_connections: self.max_connections,
            min_connections: self.min_connections,
            connect_timeout_seconds: self.connect_timeout_seconds,
            ..Default::default()
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines
    Text,

    /// One JSON object per event
    Json,
}

/// Log configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub format: LogFormat,
}

fn parse_or<T: FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> anyhow::Result<T>
where
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{} has an invalid value '{}': {}", key, raw, e)),
        None => Ok(default),
    }
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `DATABASE_URL` is missing while the postgres backend is selected
    /// - Environment variables have invalid values
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds configuration from an arbitrary variable source
    ///
    /// # Errors
    ///
    /// Same as [`Config::from_env`]
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let host = get("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_or(&get, "API_PORT", 3000u16)?;

        let cors_origins: Vec<String> = get("CORS_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let backend = get("STORE_BACKEND").unwrap_or_else(|| "postgres".to_string());
        let store = match backend.trim().to_ascii_lowercase().as_str() {
            "memory" => StoreConfig::Memory,
            "postgres" | "postgresql" => {
                let url = get("DATABASE_URL").ok_or_else(|| {
                    anyhow::anyhow!("DATABASE_URL environment variable is required")
                })?;

                StoreConfig::Postgres(PostgresConfig {
                    url,
                    max_connections: parse_or(&get, "DATABASE_MAX_CONNECTIONS", 10u32)?,
                    min_connections: parse_or(&get, "DATABASE_MIN_CONNECTIONS", 2u32)?,
                    connect_timeout_seconds: parse_or(&get, "DATABASE_CONNECT_TIMEOUT", 30u64)?,
                    ping_timeout_seconds: parse_or(&get, "DATABASE_PING_TIMEOUT", 3u64)?,
                    run_migrations: parse_or(&get, "RUN_MIGRATIONS", true)?,
                })
            }
            other => anyhow::bail!("STORE_BACKEND must be 'postgres' or 'memory', got '{}'", other),
        };

        let format = match get("LOG_FORMAT").as_deref().map(str::trim) {
            None | Some("") | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => anyhow::bail!("LOG_FORMAT must be 'text' or 'json', got '{}'", other),
        };

        Ok(Self {
            api: ApiConfig {
                host,
                port,
                cors_origins,
            },
            store,
            log: LogConfig { format },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// True when any origin may call the API
    pub fn allows_any_origin(&self) -> bool {
        self.api.cors_origins.iter().any(|origin| origin == "*")
    }
}

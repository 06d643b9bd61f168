//! Configuration infrastructure
//!
//! Configuration is layered with the `config` crate:
//! 1. Built-in defaults (the `defaults` module below)
//! 2. Optional TOML file (`config/nomera.toml` or `$NOMERA_CONFIG`)
//! 3. `NOMERA__SECTION__KEY` environment variables
//! 4. `DATABASE_URL`, which always wins for the store connection string

#![allow(clippy::derivable_impls)]

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::application::StopCondition;
use crate::infrastructure::parsing::ParsingConfig;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {source}")]
    Load {
        #[from]
        source: config::ConfigError,
    },

    #[error("Configuration validation failed: {message}")]
    Validation { message: String },
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub source: SourceConfig,
    pub ingest: IngestConfig,
    pub logging: LoggingConfig,
}

/// Store connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// PostgreSQL connection string, required
    pub url: String,

    /// Pool size; the loop itself only ever uses one connection at a time
    pub max_connections: u32,

    /// Seconds to wait for a connection before failing startup
    pub connect_timeout_seconds: u64,

    /// Run the idempotent `CREATE TABLE IF NOT EXISTS` bootstrap at startup
    pub ensure_schema: bool,
}

/// Listing site settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Endpoint base, with trailing slash
    pub base_url: String,

    /// Listing script relative to `base_url`
    pub listing_path: String,

    /// Fixed ordering query: oldest listings first
    pub order_query: String,

    /// Query parameter that selects a page. When unset every poll re-issues
    /// the identical query.
    pub page_param: Option<String>,

    pub user_agent: String,

    /// Request timeout in seconds
    pub timeout_seconds: u64,

    /// Upper bound on request rate
    pub max_requests_per_second: u32,

    /// Selectors and row-level error policy
    pub parsing: ParsingConfig,
}

/// Ingestion loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Delay between polls in milliseconds
    pub poll_interval_ms: u64,

    /// Stop after this many polls even if the site still returns rows
    pub max_iterations: Option<u32>,

    pub stop_condition: StopCondition,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Enable JSON formatted logs
    pub json_format: bool,

    /// Enable console output
    pub console_output: bool,

    /// Enable file output
    pub file_output: bool,

    /// Log file name inside the log directory
    pub file_name: String,

    /// Module-specific log level filters (e.g., "sqlx": "warn", "reqwest": "info")
    pub module_filters: HashMap<String, String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            source: SourceConfig::default(),
            ingest: IngestConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: defaults::DB_MAX_CONNECTIONS,
            connect_timeout_seconds: defaults::DB_CONNECT_TIMEOUT_SECONDS,
            ensure_schema: defaults::DB_ENSURE_SCHEMA,
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: auto_nomera::BASE_URL.to_string(),
            listing_path: auto_nomera::LISTING_PATH.to_string(),
            order_query: auto_nomera::ORDER_QUERY.to_string(),
            page_param: None,
            user_agent: defaults::USER_AGENT.to_string(),
            timeout_seconds: defaults::REQUEST_TIMEOUT_SECONDS,
            max_requests_per_second: defaults::MAX_REQUESTS_PER_SECOND,
            parsing: ParsingConfig::default(),
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: defaults::POLL_INTERVAL_MS,
            max_iterations: None,
            stop_condition: StopCondition::EmptyBatch,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: defaults::LOG_JSON_FORMAT,
            console_output: defaults::LOG_CONSOLE_OUTPUT,
            file_output: defaults::LOG_FILE_OUTPUT,
            file_name: defaults::LOG_FILE_NAME.to_string(),
            module_filters: HashMap::new(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `$NOMERA_CONFIG` (or the default file),
    /// the environment and `DATABASE_URL`
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(defaults::CONFIG_PATH_ENV)
            .unwrap_or_else(|_| defaults::CONFIG_FILE.to_string());
        Self::load_with(&path, std::env::var(defaults::DATABASE_URL_ENV).ok())
    }

    /// Load configuration from an explicit file path and optional
    /// connection-string override
    pub fn load_with(path: &str, database_url: Option<String>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?)
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix(defaults::ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            );

        if let Some(url) = database_url.filter(|u| !u.trim().is_empty()) {
            builder = builder.set_override("database.url", url)?;
        }

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the process cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let db_url = self.database.url.trim();
        if db_url.is_empty() {
            return Err(ConfigError::Validation {
                message: format!(
                    "database url is required (set {} or database.url)",
                    defaults::DATABASE_URL_ENV
                ),
            });
        }

        let parsed = url::Url::parse(db_url).map_err(|e| ConfigError::Validation {
            message: format!("database url is malformed: {e}"),
        })?;
        if !matches!(parsed.scheme(), "postgres" | "postgresql") {
            return Err(ConfigError::Validation {
                message: format!(
                    "database url must use the postgres scheme, got {:?}",
                    parsed.scheme()
                ),
            });
        }

        url::Url::parse(&self.source.base_url).map_err(|e| ConfigError::Validation {
            message: format!("source.base_url is malformed: {e}"),
        })?;

        if self.source.timeout_seconds == 0 {
            return Err(ConfigError::Validation {
                message: "source.timeout_seconds must be greater than 0".to_string(),
            });
        }

        if self.source.max_requests_per_second == 0 {
            return Err(ConfigError::Validation {
                message: "source.max_requests_per_second must be greater than 0".to_string(),
            });
        }

        if self.ingest.max_iterations == Some(0) {
            return Err(ConfigError::Validation {
                message: "ingest.max_iterations must be greater than 0 when set".to_string(),
            });
        }

        Ok(())
    }
}

/// autonomera777.net listing endpoint
pub mod auto_nomera {
    /// AJAX endpoint base
    pub const BASE_URL: &str = "https://autonomera777.net/ajax/";

    /// Script returning the listing table as an HTML fragment
    pub const LISTING_PATH: &str = "get_numbers.php";

    /// Oldest listings first
    pub const ORDER_QUERY: &str = "order=a.`created`&dir=ASC";
}

/// Default configuration values
pub mod defaults {
    pub const ENV_PREFIX: &str = "NOMERA";
    pub const CONFIG_PATH_ENV: &str = "NOMERA_CONFIG";
    pub const CONFIG_FILE: &str = "config/nomera.toml";
    pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

    pub const DB_MAX_CONNECTIONS: u32 = 2;
    pub const DB_CONNECT_TIMEOUT_SECONDS: u64 = 10;
    pub const DB_ENSURE_SCHEMA: bool = false;

    pub const USER_AGENT: &str = "nomera-ingest/0.1";
    pub const REQUEST_TIMEOUT_SECONDS: u64 = 60;
    pub const MAX_REQUESTS_PER_SECOND: u32 = 2;

    /// Fixed pause between polls
    pub const POLL_INTERVAL_MS: u64 = 1000;

    pub const RECENT_DAYS_BACK: u32 = 365;
    /// Look-back windows are clamped to a century
    pub const RECENT_MAX_DAYS_BACK: u32 = 36_500;
    pub const RECENT_MIN_PRICE: f32 = 1_000.0;
    pub const RECENT_MAX_PRICE: f32 = 10_000_000.0;

    pub const LOG_LEVEL: &str = "info";
    pub const LOG_JSON_FORMAT: bool = false;
    pub const LOG_CONSOLE_OUTPUT: bool = true;
    pub const LOG_FILE_OUTPUT: bool = false;
    pub const LOG_FILE_NAME: &str = "nomera-ingest.log";
}

/// URL building helpers
pub mod utils {
    use super::SourceConfig;
    use crate::domain::PageCursor;

    /// Listing URL for a poll. The page parameter is only added when the
    /// source is configured with one.
    pub fn listing_url(source: &SourceConfig, cursor: &PageCursor) -> String {
        let base = if source.base_url.ends_with('/') {
            source.base_url.clone()
        } else {
            format!("{}/", source.base_url)
        };
        let mut url = format!("{base}{}?{}", source.listing_path, source.order_query);
        if let Some(param) = source.page_param.as_deref().filter(|p| !p.is_empty()) {
            url.push_str(&format!("&{param}={}", cursor.page()));
        }
        url
    }
}

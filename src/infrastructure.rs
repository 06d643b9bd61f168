//! Infrastructure layer for database connections, parsing, and external integrations
//!
//! This module provides the PostgreSQL store, the listing-site HTTP client
//! and HTML parsing, configuration loading and logging.

pub mod auto_nomera_provider;
pub mod car_number_repository;
pub mod config;
pub mod database_connection;
pub mod http_client;
pub mod logging;
pub mod parsing;

// Re-export commonly used items
pub use auto_nomera_provider::AutoNomeraProvider;
pub use car_number_repository::PostgresCarNumberRepository;
pub use config::{AppConfig, ConfigError, auto_nomera};
pub use database_connection::{ConnectionError, DatabaseConnection};
pub use http_client::{HttpClient, HttpClientConfig};
pub use logging::{get_log_directory, init_logging, init_logging_with_config, log_system_info};
pub use parsing::{CarNumberListParser, ParsingConfig, ParsingError, ParsingResult};

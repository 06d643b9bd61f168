// Database connection and pool management
// This module handles PostgreSQL connections using sqlx

use std::time::Duration;

use sqlx::{PgPool, postgres::PgPoolOptions};
use thiserror::Error;
use tracing::info;

use crate::infrastructure::config::DatabaseConfig;

#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("Failed to connect to database: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("Failed to prepare database schema: {0}")]
    Schema(#[source] sqlx::Error),
}

const CREATE_CAR_NUMBERS_SQL: &str = r"
    CREATE TABLE IF NOT EXISTS car_numbers (
        number      VARCHAR(16) PRIMARY KEY,
        price       REAL        NOT NULL,
        posted_at   DATE        NOT NULL,
        created_at  TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at  TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
    )
";

const CREATE_POSTED_AT_INDEX_SQL: &str =
    "CREATE INDEX IF NOT EXISTS idx_car_numbers_posted_at ON car_numbers (posted_at)";

pub struct DatabaseConnection {
    pool: PgPool,
}

impl DatabaseConnection {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, ConnectionError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .connect(&config.url)
            .await
            .map_err(ConnectionError::Connect)?;

        info!("Connected to database (max {} connections)", config.max_connections.max(1));
        Ok(Self { pool })
    }

    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the listings table if it does not exist yet
    pub async fn ensure_schema(&self) -> Result<(), ConnectionError> {
        sqlx::query(CREATE_CAR_NUMBERS_SQL)
            .execute(&self.pool)
            .await
            .map_err(ConnectionError::Schema)?;
        sqlx::query(CREATE_POSTED_AT_INDEX_SQL)
            .execute(&self.pool)
            .await
            .map_err(ConnectionError::Schema)?;

        info!("Database schema ready");
        Ok(())
    }

    /// Release every pooled connection
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database connections closed");
    }
}

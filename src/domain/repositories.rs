//! Repository interfaces for car number listings
//!
//! Contains trait definitions for data access. The PostgreSQL
//! implementation lives in `infrastructure::car_number_repository`.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::car_number::{CarNumber, ValidationError};
use crate::infrastructure::config::defaults;

/// Storage failures
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("stored row for {number:?} failed validation: {source}")]
    InvalidRow {
        number: String,
        #[source]
        source: ValidationError,
    },
}

/// Result of an upsert: the row as stored, and whether it was new
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertOutcome {
    pub record: CarNumber,
    pub inserted: bool,
}

/// Filter for listings recently posted within a sane price band
#[derive(Debug, Clone, PartialEq)]
pub struct RecentListingsQuery {
    pub days_back: u32,
    /// Exclusive lower bound
    pub min_price: f32,
    /// Exclusive upper bound
    pub max_price: f32,
    pub limit: Option<u32>,
}

impl Default for RecentListingsQuery {
    fn default() -> Self {
        Self {
            days_back: defaults::RECENT_DAYS_BACK,
            min_price: defaults::RECENT_MIN_PRICE,
            max_price: defaults::RECENT_MAX_PRICE,
            limit: None,
        }
    }
}

#[async_trait]
pub trait CarNumberRepository: Send + Sync {
    /// Insert the listing, or overwrite price and posted date when the
    /// number is already stored. Returns the stored values.
    async fn upsert(&self, car_number: &CarNumber) -> Result<UpsertOutcome, PersistenceError>;

    async fn find_by_number(&self, number: &str) -> Result<Option<CarNumber>, PersistenceError>;

    /// Listings posted in the last `days_back` days, newest first
    async fn find_recent(
        &self,
        query: &RecentListingsQuery,
    ) -> Result<Vec<CarNumber>, PersistenceError>;

    async fn count(&self) -> Result<i64, PersistenceError>;
}

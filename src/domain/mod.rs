//! Domain module - Core business logic and entities
//!
//! This module contains the listing entity, its validation rules and the
//! ports (provider, repository) the ingestion loop is written against.

pub mod car_number;
pub mod pagination;
pub mod repositories;
pub mod services;

// Re-export commonly used items
pub use car_number::{CarNumber, ValidationError};
pub use pagination::PageCursor;
pub use repositories::{CarNumberRepository, PersistenceError, RecentListingsQuery, UpsertOutcome};
pub use services::{FetchError, ListingBatch, NumberProvider, SkipReason, SkippedRow};

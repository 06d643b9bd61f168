//! Domain services
//!
//! Ports for the listing source. The application layer depends only on
//! [`NumberProvider`]; concrete sites live in the infrastructure layer.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::car_number::{CarNumber, ValidationError};
use crate::domain::pagination::PageCursor;
use crate::infrastructure::parsing::ParsingError;

/// Why a single listing row produced no record
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SkipReason {
    #[error("row has no number title")]
    MissingNumber,

    #[error("malformed price text {0:?}")]
    MalformedPrice(String),

    #[error("malformed date text {0:?}")]
    MalformedDate(String),

    #[error("record failed validation: {0}")]
    InvalidRecord(#[from] ValidationError),
}

/// A row that was seen on the page but skipped
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRow {
    /// 0-based position of the row on the page
    pub index: usize,
    pub reason: SkipReason,
}

/// Everything extracted from one listing page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingBatch {
    pub records: Vec<CarNumber>,
    pub skipped: Vec<SkippedRow>,
}

impl ListingBatch {
    #[must_use]
    pub const fn new(records: Vec<CarNumber>, skipped: Vec<SkippedRow>) -> Self {
        Self { records, skipped }
    }

    /// Number of listing rows found on the page, parsed or not
    #[must_use]
    pub fn rows_seen(&self) -> usize {
        self.records.len() + self.skipped.len()
    }

    /// True when nothing on the page parsed, even if rows were skipped
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Whole-page extraction failures
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP request failed with status {status}: {url}")]
    Status { status: u16, url: String },

    #[error("failed to read response body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to parse listing page: {0}")]
    Parse(#[from] ParsingError),

    #[error("listing client error: {0}")]
    Client(String),
}

/// Source of car number listings
#[async_trait]
pub trait NumberProvider: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &str;

    /// Fetch and parse one listing page
    async fn fetch_numbers(&self, cursor: &PageCursor) -> Result<ListingBatch, FetchError>;
}

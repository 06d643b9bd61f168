//! Parsing configuration for HTML extraction
//!
//! Centralized configuration for CSS selectors and row-level error policy.

use serde::{Deserialize, Serialize};

/// What to do with a listing row whose date text cannot be parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedDatePolicy {
    /// Skip the row, like a malformed price
    #[default]
    Skip,
    /// Fail the whole page
    Abort,
}

/// Main parsing configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParsingConfig {
    pub selectors: ListingSelectors,
    pub malformed_date_policy: MalformedDatePolicy,
}

/// CSS selectors for the listing table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingSelectors {
    /// One match per listing row
    pub row: String,

    /// Row attribute holding the plate number
    pub number_attribute: String,

    /// Posted date text, relative to the row
    pub posted_at: String,

    /// Price text, relative to the row
    pub price: String,
}

impl Default for ListingSelectors {
    fn default() -> Self {
        Self {
            row: "a.table__tr--td".to_string(),
            number_attribute: "title".to_string(),
            posted_at: ".table-date span".to_string(),
            price: ".table-price".to_string(),
        }
    }
}

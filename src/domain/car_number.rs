//! Car registration number listing
//!
//! The only entity in the system: a plate string, its asking price and the
//! day the listing was posted. Instances are validated on construction and
//! never mutated afterwards.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Shortest plate string the listing site publishes (e.g. `А001АА77`)
pub const NUMBER_MIN_LEN: usize = 8;

/// Longest plate string the listing site publishes (e.g. `А001АА777`)
pub const NUMBER_MAX_LEN: usize = 9;

/// Validation failures for [`CarNumber`]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("number is required")]
    EmptyNumber,

    #[error("number must be {min}-{max} characters long, got {len}")]
    NumberLength { len: usize, min: usize, max: usize },

    #[error("price must be non-negative, got {0}")]
    NegativePrice(f32),

    #[error("price must be a finite number")]
    NonFinitePrice,

    #[error("price is required")]
    MissingPrice,

    #[error("posted date is required")]
    MissingPostedAt,
}

/// A single registration-number listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarNumber {
    number: String,
    price: f32,
    #[serde(rename = "postedAt")]
    posted_at: NaiveDate,
}

impl CarNumber {
    /// Build a validated listing
    ///
    /// # Errors
    /// Returns [`ValidationError`] when the number is empty or outside
    /// `NUMBER_MIN_LEN..=NUMBER_MAX_LEN` characters, or the price is negative
    /// or not finite.
    pub fn new(
        number: impl Into<String>,
        price: f32,
        posted_at: NaiveDate,
    ) -> Result<Self, ValidationError> {
        let number = number.into();

        if number.is_empty() {
            return Err(ValidationError::EmptyNumber);
        }

        // Plates are Cyrillic, so count characters rather than bytes
        let len = number.chars().count();
        if !(NUMBER_MIN_LEN..=NUMBER_MAX_LEN).contains(&len) {
            return Err(ValidationError::NumberLength {
                len,
                min: NUMBER_MIN_LEN,
                max: NUMBER_MAX_LEN,
            });
        }

        if !price.is_finite() {
            return Err(ValidationError::NonFinitePrice);
        }
        if price < 0.0 {
            return Err(ValidationError::NegativePrice(price));
        }

        Ok(Self {
            number,
            price,
            posted_at,
        })
    }

    /// Rebuild a listing from possibly incomplete parts (e.g. a storage row
    /// with nullable columns). Every field is required.
    pub fn from_parts(
        number: Option<String>,
        price: Option<f32>,
        posted_at: Option<NaiveDate>,
    ) -> Result<Self, ValidationError> {
        let number = number.ok_or(ValidationError::EmptyNumber)?;
        let price = price.ok_or(ValidationError::MissingPrice)?;
        let posted_at = posted_at.ok_or(ValidationError::MissingPostedAt)?;
        Self::new(number, price, posted_at)
    }

    #[must_use]
    pub fn number(&self) -> &str {
        &self.number
    }

    #[must_use]
    pub const fn price(&self) -> f32 {
        self.price
    }

    #[must_use]
    pub const fn posted_at(&self) -> NaiveDate {
        self.posted_at
    }
}

impl std::fmt::Display for CarNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({} RUB, posted {})",
            self.number,
            self.price,
            self.posted_at.format("%d.%m.%Y")
        )
    }
}

//! HTML parsing infrastructure for listing pages
//!
//! Trait-based parsing with per-row outcomes, so that a single malformed
//! listing never costs the rest of the page.

pub mod car_number_list_parser;
pub mod config;
pub mod context;
pub mod error;
pub mod normalize;

// Re-export public types
pub use car_number_list_parser::{CarNumberListParser, RowOutcome};
pub use config::{ListingSelectors, MalformedDatePolicy, ParsingConfig};
pub use context::ParseContext;
pub use error::{ParsingError, ParsingResult};

use scraper::Html;

/// Parser trait with context support
pub trait ContextualParser {
    type Output;
    type Context;

    /// Parse HTML with contextual information
    fn parse_with_context(&self, html: &Html, context: &Self::Context) -> ParsingResult<Self::Output>;
}

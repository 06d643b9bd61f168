//! Listing table parser
//!
//! Turns the listing site's HTML table into per-row outcomes. A malformed
//! row is skipped and logged; only the malformed-date `Abort` policy or a
//! bad selector fails the whole page.

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use super::config::{MalformedDatePolicy, ParsingConfig};
use super::normalize::{parse_posted_date, parse_price};
use super::{ContextualParser, ParseContext, ParsingError, ParsingResult};
use crate::domain::{CarNumber, ListingBatch, SkipReason, SkippedRow};

/// Result of parsing a single listing row
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Parsed(CarNumber),
    Skipped(SkippedRow),
}

/// Parser for the car number listing table
pub struct CarNumberListParser {
    row_selector: Selector,
    posted_at_selector: Selector,
    price_selector: Selector,
    number_attribute: String,
    date_policy: MalformedDatePolicy,
}

impl CarNumberListParser {
    /// Create a parser with the listing site's default selectors
    pub fn new() -> ParsingResult<Self> {
        Self::with_config(&ParsingConfig::default())
    }

    pub fn with_config(config: &ParsingConfig) -> ParsingResult<Self> {
        let selectors = &config.selectors;
        Ok(Self {
            row_selector: Self::compile_selector(&selectors.row)?,
            posted_at_selector: Self::compile_selector(&selectors.posted_at)?,
            price_selector: Self::compile_selector(&selectors.price)?,
            number_attribute: selectors.number_attribute.clone(),
            date_policy: config.malformed_date_policy,
        })
    }

    fn compile_selector(selector: &str) -> ParsingResult<Selector> {
        Selector::parse(selector)
            .map_err(|e| ParsingError::invalid_selector(selector, &e.to_string()))
    }

    /// Parse a raw response body
    pub fn parse_document(&self, body: &str, context: &ParseContext) -> ParsingResult<ListingBatch> {
        let html = Html::parse_document(body);
        self.parse_with_context(&html, context)
    }

    /// Outcome for every row on the page, in page order
    pub fn parse_rows(&self, html: &Html, context: &ParseContext) -> ParsingResult<Vec<RowOutcome>> {
        html.select(&self.row_selector)
            .enumerate()
            .map(|(index, row)| self.parse_row(index, &row, context))
            .collect()
    }

    fn parse_row(
        &self,
        index: usize,
        row: &ElementRef,
        context: &ParseContext,
    ) -> ParsingResult<RowOutcome> {
        let skip = |reason: SkipReason| -> ParsingResult<RowOutcome> {
            Ok(RowOutcome::Skipped(SkippedRow { index, reason }))
        };

        let Some(number) = row
            .value()
            .attr(&self.number_attribute)
            .map(str::trim)
            .filter(|n| !n.is_empty())
        else {
            return skip(SkipReason::MissingNumber);
        };

        let date_text = Self::text_of(row, &self.posted_at_selector);
        let Some(posted_at) = parse_posted_date(&date_text) else {
            return match self.date_policy {
                MalformedDatePolicy::Skip => skip(SkipReason::MalformedDate(date_text)),
                MalformedDatePolicy::Abort => Err(ParsingError::MalformedDate {
                    index,
                    text: date_text,
                    url: context.source_url.clone(),
                }),
            };
        };

        let price_text = Self::text_of(row, &self.price_selector);
        let Some(price) = parse_price(&price_text) else {
            return skip(SkipReason::MalformedPrice(price_text));
        };

        match CarNumber::new(number, price, posted_at) {
            Ok(car_number) => Ok(RowOutcome::Parsed(car_number)),
            Err(e) => skip(SkipReason::InvalidRecord(e)),
        }
    }

    /// Concatenated text of every match inside the row
    fn text_of(row: &ElementRef, selector: &Selector) -> String {
        row.select(selector)
            .flat_map(|e| e.text())
            .collect::<String>()
            .trim()
            .to_string()
    }
}

impl ContextualParser for CarNumberListParser {
    type Output = ListingBatch;
    type Context = ParseContext;

    fn parse_with_context(&self, html: &Html, context: &Self::Context) -> ParsingResult<Self::Output> {
        let mut batch = ListingBatch::default();

        for outcome in self.parse_rows(html, context)? {
            match outcome {
                RowOutcome::Parsed(car_number) => batch.records.push(car_number),
                RowOutcome::Skipped(row) => {
                    warn!(
                        "Skipping row {} on {} ({}): {}",
                        row.index, context.cursor, context.source_url, row.reason
                    );
                    batch.skipped.push(row);
                }
            }
        }

        debug!(
            "Parsed {} listings, skipped {} rows on {}",
            batch.records.len(),
            batch.skipped.len(),
            context.cursor
        );

        Ok(batch)
    }
}

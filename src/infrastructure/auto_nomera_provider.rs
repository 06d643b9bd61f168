//! autonomera777.net listing provider
//!
//! Fetches the listing fragment for a cursor and hands it to the table
//! parser. Implements the domain `NumberProvider` port.

use async_trait::async_trait;
use tracing::info;

use crate::domain::{FetchError, ListingBatch, NumberProvider, PageCursor};
use crate::infrastructure::config::{SourceConfig, utils};
use crate::infrastructure::http_client::{HttpClient, HttpClientConfig};
use crate::infrastructure::parsing::{CarNumberListParser, ParseContext};

pub struct AutoNomeraProvider {
    client: HttpClient,
    parser: CarNumberListParser,
    source: SourceConfig,
}

impl AutoNomeraProvider {
    pub fn new(source: SourceConfig) -> Result<Self, FetchError> {
        let client = HttpClient::new(&HttpClientConfig::from_source_config(&source))?;
        let parser = CarNumberListParser::with_config(&source.parsing)?;
        Ok(Self {
            client,
            parser,
            source,
        })
    }

    /// URL polled for the given cursor
    pub fn listing_url(&self, cursor: &PageCursor) -> String {
        utils::listing_url(&self.source, cursor)
    }
}

#[async_trait]
impl NumberProvider for AutoNomeraProvider {
    fn name(&self) -> &str {
        "autonomera777"
    }

    async fn fetch_numbers(&self, cursor: &PageCursor) -> Result<ListingBatch, FetchError> {
        let url = self.listing_url(cursor);
        let body = self.client.get_text(&url).await?;

        let context = ParseContext::new(*cursor, url);
        let batch = self.parser.parse_document(&body, &context)?;

        info!(
            "{}: {} listings, {} skipped rows on {}",
            self.name(),
            batch.records.len(),
            batch.skipped.len(),
            cursor
        );
        Ok(batch)
    }
}

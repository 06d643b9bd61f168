//! Parsing context for listing extraction

use crate::domain::PageCursor;

/// Context information for parsing operations
#[derive(Debug, Clone)]
pub struct ParseContext {
    /// Poll position the page was fetched for
    pub cursor: PageCursor,

    /// URL the page came from, for log messages
    pub source_url: String,
}

impl ParseContext {
    pub fn new(cursor: PageCursor, source_url: impl Into<String>) -> Self {
        Self {
            cursor,
            source_url: source_url.into(),
        }
    }
}

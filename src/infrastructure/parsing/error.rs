//! Parsing error types for listing pages
//!
//! Row-level problems are reported as skip reasons, not errors. Only
//! page-level failures end up here.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParsingError {
    #[error("Invalid CSS selector: {selector} - {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Malformed posted date {text:?} in row {index} of {url}")]
    MalformedDate {
        index: usize,
        text: String,
        url: String,
    },
}

impl ParsingError {
    /// Create an invalid selector error
    pub fn invalid_selector(selector: &str, reason: &str) -> Self {
        Self::InvalidSelector {
            selector: selector.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type ParsingResult<T> = Result<T, ParsingError>;

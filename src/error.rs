//! Error taxonomy for scrape operations.
//!
//! Partial absence (a selector matching zero elements, an element with no
//! text or attributes) is never an error; it is representable output. The
//! variants here cover genuine operation failures only.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Missing or malformed request fields. Surfaced as HTTP 400 and never
    /// retried.
    #[error("{0}")]
    Validation(String),

    /// Navigation did not reach the configured readiness criterion in time.
    #[error("navigation to {url} timed out after {timeout_ms}ms")]
    NavigationTimeout { url: String, timeout_ms: u64 },

    /// The browser process could not be launched or a page could not be
    /// opened.
    #[error("failed to launch browser session: {0}")]
    Launch(String),

    /// The table-root selector matched nothing on the page.
    #[error("no table found matching selector {selector:?}")]
    TableNotFound { selector: String },

    /// Any other fault from the browser engine or the page.
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl ScrapeError {
    /// Whether the retry orchestrator may re-attempt after this error.
    ///
    /// Everything except request validation is retryable; table extraction
    /// and screenshot capture share the same retry contract as element
    /// extraction.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ScrapeError::Validation(_))
    }
}

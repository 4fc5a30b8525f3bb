//! Error type for the web scraper.
//!
//! Every transport level failure (DNS, connect, timeout, bad status, body
//! decoding) is folded into [`ScraperError`] so service clients only have to
//! deal with one error type from the HTTP layer.

use thiserror::Error;

/// Result type alias for scraper operations.
pub type ScraperResult<T> = Result<T, ScraperError>;

/// Error raised by [`WebScraper`](super::WebScraper) operations.
#[derive(Error, Debug)]
pub enum ScraperError {
    // ========================================================================
    // Transport Errors
    // ========================================================================

    /// The server answered with a non-success status.
    #[error("Http status {status} for {url}")]
    Http { status: u16, url: String },

    /// Request timed out.
    #[error("Request to '{url}' timed out after {timeout_secs} seconds")]
    Timeout { url: String, timeout_secs: u64 },

    /// Could not connect to the server.
    #[error("Socket error: {message}")]
    Connection { url: String, message: String },

    /// Any other request failure.
    #[error("{message}")]
    Request {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Reading the response failed.
    #[error("IO error: {0}")]
    Io(String),

    /// The URL could not be built.
    #[error("Invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    /// The HTTP client could not be created.
    #[error("Failed to create HTTP client: {0}")]
    ClientBuild(String),

    // ========================================================================
    // Page Navigation Errors
    // ========================================================================

    /// An operation needed a loaded page.
    #[error("No page has been loaded yet")]
    NoPage,

    /// Form lookup failed.
    #[error("Form not found: {0}")]
    FormNotFound(String),

    /// Control lookup in a form failed.
    #[error("Control not found: {0}")]
    ControlNotFound(String),

    /// A select or radio group was given a value it does not offer.
    #[error("Value '{value}' is not an option of control {control}")]
    InvalidOption { control: String, value: String },

    /// Link lookup failed.
    #[error("Link not found: {0}")]
    LinkNotFound(String),
}

impl ScraperError {
    /// Create a generic request error
    pub fn request(message: impl Into<String>) -> Self {
        Self::Request {
            message: message.into(),
            source: None,
        }
    }

    /// Translate a reqwest failure for `url`
    pub fn from_reqwest(err: reqwest::Error, url: &str, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            ScraperError::Timeout {
                url: url.to_string(),
                timeout_secs,
            }
        } else if err.is_connect() {
            ScraperError::Connection {
                url: url.to_string(),
                message: err.to_string(),
            }
        } else if let Some(status) = err.status() {
            ScraperError::Http {
                status: status.as_u16(),
                url: url.to_string(),
            }
        } else if err.is_body() || err.is_decode() {
            ScraperError::Io(err.to_string())
        } else {
            ScraperError::Request {
                message: format!("Unknown url error ({})", err),
                source: Some(Box::new(err)),
            }
        }
    }

    /// Whether the failure happened on the wire rather than while navigating
    /// a loaded page
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ScraperError::Http { .. }
                | ScraperError::Timeout { .. }
                | ScraperError::Connection { .. }
                | ScraperError::Request { .. }
                | ScraperError::Io(_)
        )
    }

    /// Check if the error is recoverable by retrying
    pub fn is_recoverable(&self) -> bool {
        match self {
            ScraperError::Timeout { .. } | ScraperError::Connection { .. } => true,
            ScraperError::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

//! Error types for SWAMP access.

use thiserror::Error;

use crate::browser::ScraperError;
use crate::xml::XmlError;

/// Result type alias for SWAMP operations.
pub type SwampResult<T> = Result<T, SwampError>;

/// Error type for both the SOAP and the web interface.
#[derive(Error, Debug)]
pub enum SwampError {
    // ========================================================================
    // SOAP Errors
    // ========================================================================

    /// The server answered with a SOAP fault.
    #[error("SWAMP fault {code}: {message}")]
    Fault { code: String, message: String },

    /// The server answered with an error status and no fault.
    #[error("SWAMP returned HTTP status {status}")]
    Http { status: u16 },

    /// The response was not a SOAP envelope we understand.
    #[error("Unexpected SWAMP response: {0}")]
    UnexpectedResponse(String),

    #[error("Failed to parse SWAMP response: {0}")]
    Xml(#[from] XmlError),

    // ========================================================================
    // Web Interface Errors
    // ========================================================================

    /// The web interface did not show the expected result.
    #[error("{0}")]
    WebSwamp(String),

    /// Transport or navigation failure.
    #[error(transparent)]
    Scraper(#[from] ScraperError),
}

impl SwampError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::UnexpectedResponse(message.into())
    }

    pub fn web(message: impl Into<String>) -> Self {
        Self::WebSwamp(message.into())
    }

    /// Check if the error is a fault raised by the SWAMP service itself
    pub fn is_fault(&self) -> bool {
        matches!(self, Self::Fault { .. })
    }

    /// Check if the error is recoverable by retrying
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Http { status } => *status >= 500,
            Self::Scraper(err) => err.is_recoverable(),
            _ => false,
        }
    }
}

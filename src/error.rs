//! Error types for suseapi.
//!
//! Every client has its own error enum; this module gathers them into a
//! single [`Error`] for callers that talk to several services.

use thiserror::Error;

use crate::browser::ScraperError;
use crate::bugzilla::BugzillaError;
use crate::maintained::MaintainedError;
use crate::presence::PresenceError;
use crate::srinfo::SrInfoError;
use crate::swamp::SwampError;
use crate::userinfo::UserInfoError;
use crate::xml::XmlError;

/// Result type alias for suseapi operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for suseapi.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Web Errors
    // ========================================================================
    #[error(transparent)]
    Scraper(#[from] ScraperError),

    #[error(transparent)]
    Bugzilla(#[from] BugzillaError),

    #[error(transparent)]
    Swamp(#[from] SwampError),

    #[error(transparent)]
    SrInfo(#[from] SrInfoError),

    // ========================================================================
    // Directory Errors
    // ========================================================================
    #[error(transparent)]
    UserInfo(#[from] UserInfoError),

    #[error(transparent)]
    Presence(#[from] PresenceError),

    // ========================================================================
    // Data Errors
    // ========================================================================
    #[error(transparent)]
    Maintained(#[from] MaintainedError),

    #[error(transparent)]
    Xml(#[from] XmlError),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether retrying the same operation later may succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Scraper(e) => e.is_recoverable(),
            Error::Bugzilla(e) => e.is_connection_error(),
            Error::Swamp(e) => e.is_recoverable(),
            Error::SrInfo(SrInfoError::Http(e)) => e.is_recoverable(),
            Error::UserInfo(UserInfoError::Connection { .. }) => true,
            Error::Presence(_) => true,
            _ => false,
        }
    }
}

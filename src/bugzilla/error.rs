//! Error types for the Bugzilla client.
//!
//! Every Bugzilla error carries a human readable message and, when known,
//! the id of the bug it relates to. The display form is
//! `"<kind description>: <message>[: <bug id>]"`.

use thiserror::Error;

use crate::browser::ScraperError;

/// Result type alias for Bugzilla operations.
pub type BugzillaResult<T> = Result<T, BugzillaError>;

fn bug_suffix(bug_id: &Option<String>) -> String {
    match bug_id {
        Some(id) => format!(": {}", id),
        None => String::new(),
    }
}

/// Error type for Bugzilla operations.
#[derive(Error, Debug)]
pub enum BugzillaError {
    // ========================================================================
    // Bug Errors
    // ========================================================================

    /// Anything Bugzilla reported that has no dedicated variant.
    #[error("Generic error: {error}{}", bug_suffix(.bug_id))]
    Generic { error: String, bug_id: Option<String> },

    /// The bug exists but the session may not see it.
    #[error("Access not permitted: {error}{}", bug_suffix(.bug_id))]
    NotPermitted { error: String, bug_id: Option<String> },

    #[error("Bug was not found: {error}{}", bug_suffix(.bug_id))]
    NotFound { error: String, bug_id: Option<String> },

    #[error("Bug Id is invalid: {error}{}", bug_suffix(.bug_id))]
    InvalidBugId { error: String, bug_id: Option<String> },

    /// Search results exceeded the server limit.
    #[error("Search returned too many entries: {error}{}", bug_suffix(.bug_id))]
    BuglistTooLarge { error: String, bug_id: Option<String> },

    // ========================================================================
    // Connection Errors
    // ========================================================================

    #[error("Connection related error: {error}{}", bug_suffix(.bug_id))]
    Connection { error: String, bug_id: Option<String> },

    #[error("Login has failed: {error}{}", bug_suffix(.bug_id))]
    LoginFailed { error: String, bug_id: Option<String> },

    #[error("Error while updating bug: {error}{}", bug_suffix(.bug_id))]
    UpdateError { error: String, bug_id: Option<String> },

    /// Transport or navigation failure in the underlying scraper.
    #[error(transparent)]
    Scraper(#[from] ScraperError),
}

impl BugzillaError {
    pub fn generic(error: impl Into<String>) -> Self {
        Self::Generic {
            error: error.into(),
            bug_id: None,
        }
    }

    pub fn not_permitted(error: impl Into<String>, bug_id: Option<String>) -> Self {
        Self::NotPermitted {
            error: error.into(),
            bug_id,
        }
    }

    pub fn not_found(error: impl Into<String>, bug_id: Option<String>) -> Self {
        Self::NotFound {
            error: error.into(),
            bug_id,
        }
    }

    pub fn invalid_bug_id(error: impl Into<String>, bug_id: Option<String>) -> Self {
        Self::InvalidBugId {
            error: error.into(),
            bug_id,
        }
    }

    pub fn buglist_too_large(error: impl Into<String>) -> Self {
        Self::BuglistTooLarge {
            error: error.into(),
            bug_id: None,
        }
    }

    pub fn login_failed(error: impl Into<String>) -> Self {
        Self::LoginFailed {
            error: error.into(),
            bug_id: None,
        }
    }

    pub fn update_error(error: impl Into<String>) -> Self {
        Self::UpdateError {
            error: error.into(),
            bug_id: None,
        }
    }

    /// Description of the error kind, the leading part of the message.
    pub fn kind_description(&self) -> &'static str {
        match self {
            Self::Generic { .. } => "Generic error",
            Self::NotPermitted { .. } => "Access not permitted",
            Self::NotFound { .. } => "Bug was not found",
            Self::InvalidBugId { .. } => "Bug Id is invalid",
            Self::BuglistTooLarge { .. } => "Search returned too many entries",
            Self::Connection { .. } => "Connection related error",
            Self::LoginFailed { .. } => "Login has failed",
            Self::UpdateError { .. } => "Error while updating bug",
            Self::Scraper(_) => "Web scraper error",
        }
    }

    /// Bug the error relates to, if known
    pub fn bug_id(&self) -> Option<&str> {
        match self {
            Self::Generic { bug_id, .. }
            | Self::NotPermitted { bug_id, .. }
            | Self::NotFound { bug_id, .. }
            | Self::InvalidBugId { bug_id, .. }
            | Self::BuglistTooLarge { bug_id, .. }
            | Self::Connection { bug_id, .. }
            | Self::LoginFailed { bug_id, .. }
            | Self::UpdateError { bug_id, .. } => bug_id.as_deref(),
            Self::Scraper(_) => None,
        }
    }

    /// Check if the error comes from talking to the server rather than from
    /// the bug data
    pub fn is_connection_error(&self) -> bool {
        match self {
            Self::Connection { .. } | Self::LoginFailed { .. } | Self::UpdateError { .. } => true,
            Self::Scraper(err) => err.is_transport(),
            _ => false,
        }
    }

    /// Check if the error is an access problem that a fresh login may fix
    pub fn is_not_permitted(&self) -> bool {
        matches!(self, Self::NotPermitted { .. })
    }
}

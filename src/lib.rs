//! # suseapi - Clients for SUSE internal services
//!
//! Async helpers for the web services used by the SUSE maintenance and L3
//! teams. Most of them have no proper API, so the clients scrape web pages,
//! speak SOAP or a plain text TCP protocol.
//!
//! ## Components
//!
//! - **Browser**: a small web scraper with cookie handling and HTML form
//!   filling, used by the other web clients
//! - **Bugzilla**: login (SSO or HTTP auth), bug export, searches, updates
//! - **SWAMP**: the maintenance workflow tracker, over SOAP and its web UI
//! - **UserInfo**: user and department lookups in the LDAP directory
//! - **Presence**: absence reports from the presence service
//! - **SrInfo**: support request status and details
//! - **Maintained**: parser for product maintained data files
//! - **Products**: codestream naming helpers
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        suseapi CLI                            │
//! └──────────────────────────────────────────────────────────────┘
//!          │                  │                    │
//!          ▼                  ▼                    ▼
//! ┌─────────────────┐ ┌────────────────┐ ┌─────────────────────┐
//! │ Bugzilla / Web  │ │  SWAMP (SOAP)  │ │ UserInfo / Presence │
//! │     SWAMP       │ │    SrInfo      │ │   (LDAP / TCP)      │
//! └─────────────────┘ └────────────────┘ └─────────────────────┘
//!          │                  │                    │
//!          ▼                  ▼                    ▼
//! ┌─────────────────┐ ┌────────────────┐ ┌─────────────────────┐
//! │   WebScraper    │ │    reqwest     │ │      TtlCache       │
//! └─────────────────┘ └────────────────┘ └─────────────────────┘
//! ```
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use suseapi::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let mut bugzilla = Bugzilla::new("user", "password")?;
//!     bugzilla.login().await?;
//!
//!     if let Some(bug) = bugzilla.get_bug(123456).await? {
//!         println!("{}", bug.field("short_desc").unwrap_or_default());
//!     }
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

/// User agent sent when the caller does not configure one.
pub const USER_AGENT: &str = concat!("suseapi/", env!("CARGO_PKG_VERSION"));

// Re-export commonly used items in prelude
pub mod prelude {
    //! Convenient re-exports of commonly used types.

    // Error handling
    pub use crate::error::{Error, Result};

    // Web clients
    pub use crate::browser::{Form, FormSelector, Page, SessionCookie, WebScraper};
    pub use crate::bugzilla::{Bug, BugUpdate, Bugzilla, BugzillaError, LoginMode};
    pub use crate::srinfo::{ServiceRequest, SrInfo};
    pub use crate::swamp::{SoapValue, Swamp, WebSwamp};

    // Directory services
    pub use crate::presence::{Absence, Presence};
    pub use crate::userinfo::{Directory, UserInfo};

    // Data files
    pub use crate::maintained::MaintainedData;
    pub use crate::products::{codestream_base, codestream_name};

    // Caching
    pub use crate::cache::TtlCache;
}

// ============================================================================
// Core Modules
// ============================================================================

/// Error types and result aliases for suseapi operations.
pub mod error;

/// Configuration file loading.
pub mod config;

/// Time-limited cache shared by the directory clients.
pub mod cache;

/// Minimal XML tree parser.
pub mod xml;

pub mod timestamp;

// ============================================================================
// Web Clients
// ============================================================================

/// Web scraping session with cookies and form handling.
pub mod browser;

/// Bugzilla client.
///
/// Logs in either through the SSO form or with HTTP authentication and
/// reads bugs through the XML export.
pub mod bugzilla;

/// SWAMP workflow tracker clients.
pub mod swamp;

pub mod srinfo;

// ============================================================================
// Directory Services
// ============================================================================

/// LDAP user lookups.
pub mod userinfo;

pub mod presence;

// ============================================================================
// Product Data
// ============================================================================

pub mod maintained;
pub mod products;

pub use error::{Error, Result};

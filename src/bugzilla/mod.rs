//! Bugzilla access.
//!
//! Data is loaded from the XML export and the Atom search feed, updates go
//! through the HTML edit form. See [`Bugzilla`] for the login flavours.

mod bug;
mod client;
mod error;
mod update;

pub use bug::{Attachment, Bug, Comment};
pub use client::{
    Bugzilla, BugzillaBuilder, LoginMode, ACCESS_COOKIES_KEY, DEFAULT_API_BUGZILLA_URL,
    DEFAULT_BUGZILLA_URL,
};
pub use error::{BugzillaError, BugzillaResult};
pub use update::{update_whiteboard, BugUpdate, WHITEBOARD_FIELD};

/// Replace control characters Bugzilla leaks into its XML output.
///
/// They are not allowed in XML 1.0 and make the parser reject the whole
/// document.
pub fn escape_xml_text(data: &str) -> String {
    data.replace('\u{08}', "^H")
        .replace('\u{13}', "^S")
        .replace('\u{01}', "^A")
        .replace('\u{07}', "^G")
}

//! Directory backends for user lookups.

use std::collections::BTreeMap;
use std::fmt::Debug;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for directory operations.
pub type UserInfoResult<T> = Result<T, UserInfoError>;

/// Error type for directory lookups.
#[derive(Error, Debug)]
pub enum UserInfoError {
    /// Could not reach the directory server.
    #[error("Failed to connect to LDAP server '{server}': {message}")]
    Connection { server: String, message: String },

    /// The server rejected the search.
    #[error("LDAP search failed: {0}")]
    Search(String),
}

/// One search result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub dn: String,
    pub attrs: BTreeMap<String, Vec<String>>,
}

impl DirectoryEntry {
    /// First value of an attribute
    pub fn first(&self, attr: &str) -> Option<&str> {
        self.attrs
            .get(attr)
            .and_then(|values| values.first())
            .map(String::as_str)
    }
}

/// A directory that can be searched with LDAP filters.
///
/// Searches always cover the whole subtree below `base`.
#[async_trait]
pub trait Directory: Send + Sync + Debug {
    async fn search(
        &self,
        base: &str,
        filter: &str,
        attrs: &[&str],
    ) -> UserInfoResult<Vec<DirectoryEntry>>;
}

/// Escape a value for use inside an LDAP filter (RFC 4515).
pub fn escape_filter_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '*' => escaped.push_str("\\2a"),
            '(' => escaped.push_str("\\28"),
            ')' => escaped.push_str("\\29"),
            '\\' => escaped.push_str("\\5c"),
            '\0' => escaped.push_str("\\00"),
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(feature = "ldap")]
pub use self::ldap::LdapDirectory;

#[cfg(feature = "ldap")]
mod ldap {
    use std::time::Duration;

    use async_trait::async_trait;
    use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Scope, SearchEntry};
    use parking_lot::Mutex;
    use tracing::debug;

    use super::{Directory, DirectoryEntry, UserInfoError, UserInfoResult};

    /// Directory backed by an LDAP server.
    ///
    /// The connection is opened on first use and shared afterwards.
    pub struct LdapDirectory {
        server: String,
        timeout: Duration,
        handle: Mutex<Option<Ldap>>,
    }

    impl std::fmt::Debug for LdapDirectory {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("LdapDirectory")
                .field("server", &self.server)
                .field("timeout", &self.timeout)
                .finish()
        }
    }

    impl LdapDirectory {
        /// Directory for an `ldap://` or `ldaps://` URL
        pub fn new(server: impl Into<String>) -> Self {
            Self {
                server: server.into(),
                timeout: Duration::from_secs(10),
                handle: Mutex::new(None),
            }
        }

        /// Set the connect timeout
        pub fn timeout(mut self, timeout: Duration) -> Self {
            self.timeout = timeout;
            self
        }

        async fn connection(&self) -> UserInfoResult<Ldap> {
            let cached = self.handle.lock().clone();
            if let Some(ldap) = cached {
                return Ok(ldap);
            }

            debug!("Connecting to {}", self.server);
            let settings = LdapConnSettings::new().set_conn_timeout(self.timeout);
            let (conn, ldap) = LdapConnAsync::with_settings(settings, &self.server)
                .await
                .map_err(|e| UserInfoError::Connection {
                    server: self.server.clone(),
                    message: e.to_string(),
                })?;
            ldap3::drive!(conn);

            *self.handle.lock() = Some(ldap.clone());
            Ok(ldap)
        }
    }

    #[async_trait]
    impl Directory for LdapDirectory {
        async fn search(
            &self,
            base: &str,
            filter: &str,
            attrs: &[&str],
        ) -> UserInfoResult<Vec<DirectoryEntry>> {
            let mut ldap = self.connection().await?;
            let (entries, _) = ldap
                .search(base, Scope::Subtree, filter, attrs.to_vec())
                .await
                .and_then(|result| result.success())
                .map_err(|e| UserInfoError::Search(e.to_string()))?;

            Ok(entries
                .into_iter()
                .map(SearchEntry::construct)
                .map(|entry| DirectoryEntry {
                    dn: entry.dn,
                    attrs: entry.attrs.into_iter().collect(),
                })
                .collect())
        }
    }
}

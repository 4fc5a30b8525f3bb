//! User and department lookups in the company directory.
//!
//! User names come in several flavours (bare login, `@suse.com` or
//! `@novell.com` mail, full name), so lookups try a fixed list of filters
//! and take the first one that matches anything.

use tracing::debug;

mod directory;

pub use directory::{
    escape_filter_value, Directory, DirectoryEntry, UserInfoError, UserInfoResult,
};

#[cfg(feature = "ldap")]
pub use directory::LdapDirectory;

use crate::cache::TtlCache;

/// Filters tried in order by [`UserInfo::search_uid`]; `{0}` is the user.
pub const SEARCHES: &[&str] = &[
    "(mail={0}@novell.com)",
    "(mail={0}@suse.com)",
    "(uid={0})",
    "(cn={0})",
];

/// Attributes returned when the caller does not ask for specific ones.
pub const DEFAULT_ATTRIBUTES: &[&str] = &["cn", "mail", "ou", "sn", "givenName"];

const DEPARTMENT_FIXUPS: &[(&str, &str)] = &[
    ("Business Support Nurenburg", "Business Support Nürnberg"),
    ("L3 Maintenance", "L3/Maintenance"),
];

/// Directory lookups with department caching.
#[derive(Debug)]
pub struct UserInfo<D: Directory> {
    directory: D,
    base: String,
    cache: TtlCache<String>,
}

impl<D: Directory> UserInfo<D> {
    /// Search below `base` in `directory`
    pub fn new(directory: D, base: impl Into<String>) -> Self {
        Self {
            directory,
            base: base.into(),
            cache: TtlCache::new("userinfo-"),
        }
    }

    /// Use a custom cache (e.g. with a different TTL)
    pub fn with_cache(mut self, cache: TtlCache<String>) -> Self {
        self.cache = cache;
        self
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn cache(&self) -> &TtlCache<String> {
        &self.cache
    }

    /// Find a user trying mail, uid and common name in turn.
    ///
    /// `attrs` defaults to [`DEFAULT_ATTRIBUTES`].
    pub async fn search_uid(
        &self,
        uid: &str,
        attrs: Option<&[&str]>,
    ) -> UserInfoResult<Vec<DirectoryEntry>> {
        let attrs = attrs.unwrap_or(DEFAULT_ATTRIBUTES);
        let value = escape_filter_value(uid);

        for search in SEARCHES {
            let filter = search.replace("{0}", &value);
            debug!("LDAP search {}", filter);
            let result = self.directory.search(&self.base, &filter, attrs).await?;
            if !result.is_empty() {
                return Ok(result);
            }
        }
        Ok(Vec::new())
    }

    /// Search on a single attribute
    pub async fn search_by(
        &self,
        attr: &str,
        value: &str,
        attrs: Option<&[&str]>,
    ) -> UserInfoResult<Vec<DirectoryEntry>> {
        let filter = format!("({}={})", attr, escape_filter_value(value));
        debug!("LDAP search {}", filter);
        self.directory
            .search(&self.base, &filter, attrs.unwrap_or(DEFAULT_ATTRIBUTES))
            .await
    }

    /// Correct department names that are misspelled in the directory
    pub fn fixup_department(name: &str) -> String {
        DEPARTMENT_FIXUPS
            .iter()
            .find(|(wrong, _)| *wrong == name)
            .map(|(_, right)| right.to_string())
            .unwrap_or_else(|| name.to_string())
    }

    /// Department of a user given by login or company mail address.
    ///
    /// Addresses outside the company are reported as `External` and users
    /// without a department as `N/A`; neither answer is cached.
    pub async fn get_department(&self, user: &str) -> UserInfoResult<String> {
        if let Some(department) = self.cache.get(user) {
            return Ok(department);
        }

        let department = if user == "security-team@suse.de" {
            "Security team".to_string()
        } else {
            let username = if !user.contains('@') {
                user
            } else if let Some(name) = user.strip_suffix("@suse.com") {
                name
            } else if let Some(name) = user.strip_suffix("@novell.com") {
                name
            } else {
                return Ok("External".to_string());
            };

            let entries = self.search_uid(username, None).await?;
            match entries.first().and_then(|entry| entry.first("ou")) {
                Some(ou) => Self::fixup_department(ou),
                None => return Ok("N/A".to_string()),
            }
        };

        self.cache.set(user, department.clone());
        Ok(department)
    }
}

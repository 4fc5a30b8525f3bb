//! Session cookie storage.
//!
//! [`CookieJar`] plugs into reqwest as its cookie provider and, unlike
//! reqwest's own jar, lets callers export and re-import the stored cookies.
//! That is how a logged-in Bugzilla session is kept around between client
//! instances.

use parking_lot::RwLock;
use reqwest::cookie::CookieStore;
use reqwest::header::HeaderValue;
use serde::{Deserialize, Serialize};
use url::Url;

/// A single cookie as stored in the jar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    /// Domain without leading dot, lowercase
    pub domain: String,
    /// Only sent to exactly `domain` when set (no `Domain` attribute given)
    pub host_only: bool,
    pub path: String,
    pub secure: bool,
}

impl SessionCookie {
    /// Create a host-only cookie for `domain` and `path`
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        domain: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: domain.into().to_ascii_lowercase(),
            host_only: true,
            path: path.into(),
            secure: false,
        }
    }

    /// Parse a `Set-Cookie` header received from `url`.
    ///
    /// Returns the cookie and whether the header asks for its removal
    /// (`Max-Age` of zero or less).
    pub fn parse(header: &str, url: &Url) -> Option<(Self, bool)> {
        let mut parts = header.split(';');
        let (name, value) = parts.next()?.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        let host = url.host_str()?.to_ascii_lowercase();
        let mut cookie = SessionCookie {
            name: name.to_string(),
            value: value.trim().trim_matches('"').to_string(),
            domain: host.clone(),
            host_only: true,
            path: default_path(url),
            secure: false,
        };
        let mut expired = false;

        for attribute in parts {
            let (key, val) = match attribute.split_once('=') {
                Some((key, val)) => (key.trim(), val.trim()),
                None => (attribute.trim(), ""),
            };
            match key.to_ascii_lowercase().as_str() {
                "domain" => {
                    let domain = val.trim_start_matches('.').to_ascii_lowercase();
                    if !domain.is_empty() {
                        // Refuse cookies for unrelated domains.
                        if host != domain && !host.ends_with(&format!(".{}", domain)) {
                            return None;
                        }
                        cookie.domain = domain;
                        cookie.host_only = false;
                    }
                }
                "path" if val.starts_with('/') => cookie.path = val.to_string(),
                "secure" => cookie.secure = true,
                "max-age" => {
                    if val.parse::<i64>().map(|age| age <= 0).unwrap_or(false) {
                        expired = true;
                    }
                }
                _ => {}
            }
        }

        Some((cookie, expired))
    }

    /// Whether this cookie should be sent with a request to `url`
    pub fn matches(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();

        let domain_ok = if self.host_only {
            host == self.domain
        } else {
            host == self.domain || host.ends_with(&format!(".{}", self.domain))
        };
        if !domain_ok {
            return false;
        }

        if self.secure && url.scheme() != "https" {
            return false;
        }

        let path = url.path();
        path == self.path
            || (path.starts_with(&self.path)
                && (self.path.ends_with('/') || path[self.path.len()..].starts_with('/')))
    }

    fn same_slot(&self, other: &SessionCookie) -> bool {
        self.name == other.name && self.domain == other.domain && self.path == other.path
    }
}

fn default_path(url: &Url) -> String {
    let path = url.path();
    match path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => path[..idx].to_string(),
    }
}

/// Thread-safe cookie jar usable as a reqwest cookie provider.
#[derive(Debug, Default)]
pub struct CookieJar {
    cookies: RwLock<Vec<SessionCookie>>,
}

impl CookieJar {
    /// Create an empty jar
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a cookie, replacing one with the same name, domain and path
    pub fn insert(&self, cookie: SessionCookie) {
        let mut cookies = self.cookies.write();
        cookies.retain(|existing| !existing.same_slot(&cookie));
        cookies.push(cookie);
    }

    /// Store several cookies
    pub fn extend(&self, cookies: impl IntoIterator<Item = SessionCookie>) {
        for cookie in cookies {
            self.insert(cookie);
        }
    }

    /// Snapshot of all stored cookies
    pub fn all(&self) -> Vec<SessionCookie> {
        self.cookies.read().clone()
    }

    /// Cookies that would be sent to `url`
    pub fn matching(&self, url: &Url) -> Vec<SessionCookie> {
        self.cookies
            .read()
            .iter()
            .filter(|cookie| cookie.matches(url))
            .cloned()
            .collect()
    }

    /// Drop all cookies
    pub fn clear(&self) {
        self.cookies.write().clear();
    }

    pub fn len(&self) -> usize {
        self.cookies.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.read().is_empty()
    }
}

impl CookieStore for CookieJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        for header in cookie_headers {
            let Ok(header) = header.to_str() else {
                continue;
            };
            if let Some((cookie, expired)) = SessionCookie::parse(header, url) {
                if expired {
                    self.cookies
                        .write()
                        .retain(|existing| !existing.same_slot(&cookie));
                } else {
                    self.insert(cookie);
                }
            }
        }
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        let header = self
            .matching(url)
            .iter()
            .map(|cookie| format!("{}={}", cookie.name, cookie.value))
            .collect::<Vec<_>>()
            .join("; ");
        if header.is_empty() {
            None
        } else {
            HeaderValue::from_str(&header).ok()
        }
    }
}

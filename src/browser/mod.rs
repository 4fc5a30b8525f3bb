//! Stateful web scraper.
//!
//! [`WebScraper`] is a tiny browser: it owns an HTTP client with a cookie
//! jar, remembers the last loaded [`Page`] and lets callers pick forms and
//! links from it, fill them in and submit them. All service clients that
//! talk to HTML front ends (Bugzilla, web SWAMP) are built on top of it.
//!
//! # Example
//!
//! ```rust,ignore
//! use suseapi::browser::{FormSelector, WebScraper};
//!
//! let mut scraper = WebScraper::new("user", "secret", "https://example.net/app")?;
//! scraper.get("login").await?;
//! let mut form = scraper.select_form(FormSelector::Name("loginform"))?;
//! form.set("username", "user")?;
//! let page = scraper.submit(&form).await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder};
use tracing::debug;
use url::Url;

pub mod cookies;
pub mod error;
pub mod form;
pub mod html;

pub use cookies::{CookieJar, SessionCookie};
pub use error::{ScraperError, ScraperResult};
pub use form::{Control, ControlKind, Form};
pub use html::{Link, Paragraph};

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// A loaded page.
#[derive(Debug, Clone)]
pub struct Page {
    /// Final URL after redirects
    pub url: Url,
    pub status: u16,
    /// Raw `Content-Type` header, empty when absent
    pub content_type: String,
    pub body: String,
}

impl Page {
    /// Whether the page was served as HTML.
    pub fn is_html(&self) -> bool {
        let mime = self
            .content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        mime == "text/html" || mime == "application/xhtml+xml"
    }

    pub fn forms(&self) -> Vec<Form> {
        html::parse_forms(&self.body)
    }

    pub fn links(&self) -> Vec<Link> {
        html::parse_links(&self.body)
    }

    pub fn paragraphs(&self) -> Vec<Paragraph> {
        html::parse_paragraphs(&self.body)
    }

    pub fn scripts(&self) -> Vec<String> {
        html::parse_scripts(&self.body)
    }

    /// First link whose text equals `text`.
    pub fn find_link(&self, text: &str) -> Option<Link> {
        self.links().into_iter().find(|link| link.text == text)
    }

    /// Resolve a (possibly relative) reference against the page URL.
    pub fn resolve(&self, reference: &str) -> ScraperResult<Url> {
        self.url
            .join(reference)
            .map_err(|e| ScraperError::InvalidUrl {
                url: reference.to_string(),
                message: e.to_string(),
            })
    }
}

/// How to pick a form from the current page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormSelector<'a> {
    /// Match the `name` attribute (or `id` when unnamed)
    Name(&'a str),
    /// Zero based position in the document
    Index(usize),
}

/// Builder for [`WebScraper`].
#[derive(Debug, Clone)]
pub struct WebScraperBuilder {
    user: String,
    password: String,
    base: String,
    user_agent: Option<String>,
    timeout: Duration,
    action_suffix: String,
    basic_auth: Option<(String, String)>,
}

impl WebScraperBuilder {
    /// Create a builder for the given credentials and base URL
    pub fn new(
        user: impl Into<String>,
        password: impl Into<String>,
        base: impl Into<String>,
    ) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
            base: base.into(),
            user_agent: None,
            timeout: DEFAULT_TIMEOUT,
            action_suffix: String::new(),
            basic_auth: None,
        }
    }

    /// Send a `User-Agent` header
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Same as [`user_agent`](Self::user_agent) but accepts an optional value
    pub fn maybe_user_agent(mut self, user_agent: Option<String>) -> Self {
        self.user_agent = user_agent;
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Suffix appended to relative actions (Bugzilla uses `.cgi`)
    pub fn action_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.action_suffix = suffix.into();
        self
    }

    /// Authenticate every request with HTTP basic credentials
    pub fn basic_auth(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.basic_auth = Some((user.into(), password.into()));
        self
    }

    /// Build the scraper
    pub fn build(self) -> ScraperResult<WebScraper> {
        let cookies = Arc::new(CookieJar::new());

        let mut builder = Client::builder()
            .timeout(self.timeout)
            .cookie_provider(Arc::clone(&cookies));

        if let Some(ref user_agent) = self.user_agent {
            builder = builder.user_agent(user_agent);
        }

        let client = builder
            .build()
            .map_err(|e| ScraperError::ClientBuild(e.to_string()))?;

        Ok(WebScraper {
            anonymous: self.user.is_empty(),
            base: self.base.trim_end_matches('/').to_string(),
            user: self.user,
            password: self.password,
            client,
            cookies,
            page: None,
            timeout: self.timeout,
            action_suffix: self.action_suffix,
            basic_auth: self.basic_auth,
        })
    }
}

/// Browser emulation on top of reqwest.
#[derive(Debug)]
pub struct WebScraper {
    base: String,
    user: String,
    password: String,
    anonymous: bool,
    client: Client,
    cookies: Arc<CookieJar>,
    page: Option<Arc<Page>>,
    timeout: Duration,
    action_suffix: String,
    basic_auth: Option<(String, String)>,
}

impl WebScraper {
    /// Create a scraper with default options
    pub fn new(
        user: impl Into<String>,
        password: impl Into<String>,
        base: impl Into<String>,
    ) -> ScraperResult<Self> {
        WebScraperBuilder::new(user, password, base).build()
    }

    /// Create a builder
    pub fn builder(
        user: impl Into<String>,
        password: impl Into<String>,
        base: impl Into<String>,
    ) -> WebScraperBuilder {
        WebScraperBuilder::new(user, password, base)
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn set_base(&mut self, base: impl Into<String>) {
        self.base = base.into().trim_end_matches('/').to_string();
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    /// True when no user name was given
    pub fn is_anonymous(&self) -> bool {
        self.anonymous
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Start sending HTTP basic credentials with every request
    pub fn set_basic_auth(&mut self, user: impl Into<String>, password: impl Into<String>) {
        self.basic_auth = Some((user.into(), password.into()));
    }

    /// Full URL for an action
    pub fn request_url(&self, action: &str) -> String {
        if action.starts_with("http://") || action.starts_with("https://") {
            action.to_string()
        } else {
            format!(
                "{}/{}{}",
                self.base,
                action.trim_start_matches('/'),
                self.action_suffix
            )
        }
    }

    /// The last loaded page
    pub fn page(&self) -> ScraperResult<Arc<Page>> {
        self.page.clone().ok_or(ScraperError::NoPage)
    }

    /// Whether the last loaded page is HTML
    pub fn viewing_html(&self) -> bool {
        self.page.as_ref().map(|page| page.is_html()).unwrap_or(false)
    }

    /// Load an action with GET
    pub async fn get(&mut self, action: &str) -> ScraperResult<Arc<Page>> {
        let url = self.request_url(action);
        let request = self.client.get(&url);
        self.load("GET", request, &url).await
    }

    /// Send form encoded `params` to an action with POST
    pub async fn post<K, V>(&mut self, action: &str, params: &[(K, V)]) -> ScraperResult<Arc<Page>>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let url = self.request_url(action);
        let pairs: Vec<(&str, &str)> = params
            .iter()
            .map(|(key, value)| (key.as_ref(), value.as_ref()))
            .collect();
        let request = self.client.post(&url).form(&pairs);
        self.load("POST", request, &url).await
    }

    /// Load an action: POST when parameters are given, GET otherwise
    pub async fn request(
        &mut self,
        action: &str,
        params: Option<&[(String, String)]>,
    ) -> ScraperResult<Arc<Page>> {
        match params {
            Some(params) => self.post(action, params).await,
            None => self.get(action).await,
        }
    }

    /// Load an absolute URL with GET
    pub async fn open(&mut self, url: Url) -> ScraperResult<Arc<Page>> {
        let target = url.to_string();
        let request = self.client.get(url);
        self.load("GET", request, &target).await
    }

    /// Forms on the current page
    pub fn forms(&self) -> ScraperResult<Vec<Form>> {
        Ok(self.page()?.forms())
    }

    /// Pick a form from the current page
    pub fn select_form(&self, selector: FormSelector<'_>) -> ScraperResult<Form> {
        let forms = self.forms()?;
        let found = match selector {
            FormSelector::Index(index) => forms.into_iter().nth(index),
            FormSelector::Name(name) => forms.into_iter().find(|form| {
                form.name.as_deref() == Some(name)
                    || (form.name.is_none() && form.id.as_deref() == Some(name))
            }),
        };
        found.ok_or_else(|| {
            ScraperError::FormNotFound(match selector {
                FormSelector::Index(index) => format!("#{}", index),
                FormSelector::Name(name) => name.to_string(),
            })
        })
    }

    /// Find a link on the current page by its text
    pub fn find_link(&self, text: &str) -> ScraperResult<Link> {
        self.page()?
            .find_link(text)
            .ok_or_else(|| ScraperError::LinkNotFound(text.to_string()))
    }

    /// Follow a link on the current page
    pub async fn follow_link(&mut self, text: &str) -> ScraperResult<Arc<Page>> {
        let link = self.find_link(text)?;
        let url = self.page()?.resolve(&link.href)?;
        self.open(url).await
    }

    /// Submit a form taken from the current page
    pub async fn submit(&mut self, form: &Form) -> ScraperResult<Arc<Page>> {
        let page = self.page()?;
        let mut url = page.resolve(&form.action)?;
        let pairs = form.successful_pairs();

        if form.method == "POST" {
            let target = url.to_string();
            let request = self.client.post(url).form(&pairs);
            self.load("POST", request, &target).await
        } else {
            url.set_fragment(None);
            url.query_pairs_mut().clear().extend_pairs(pairs.iter());
            let target = url.to_string();
            let request = self.client.get(url);
            self.load("GET", request, &target).await
        }
    }

    /// Import cookies (e.g. a saved login session)
    pub fn set_cookies(&self, cookies: impl IntoIterator<Item = SessionCookie>) {
        self.cookies.extend(cookies);
    }

    /// Export all cookies
    pub fn get_cookies(&self) -> Vec<SessionCookie> {
        self.cookies.all()
    }

    async fn load(
        &mut self,
        method: &str,
        request: RequestBuilder,
        url: &str,
    ) -> ScraperResult<Arc<Page>> {
        let request = match self.basic_auth {
            Some((ref user, ref password)) => request.basic_auth(user, Some(password)),
            None => request,
        };
        let timeout_secs = self.timeout.as_secs();

        debug!("{} {}", method, url);

        let response = request
            .send()
            .await
            .map_err(|e| ScraperError::from_reqwest(e, url, timeout_secs))?;

        let status = response.status();
        let final_url = response.url().clone();

        if !status.is_success() {
            return Err(ScraperError::Http {
                status: status.as_u16(),
                url: final_url.to_string(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let body = response
            .text()
            .await
            .map_err(|e| ScraperError::from_reqwest(e, url, timeout_secs))?;

        debug!("Loaded {} ({} bytes, {})", final_url, body.len(), content_type);

        let page = Arc::new(Page {
            url: final_url,
            status: status.as_u16(),
            content_type,
            body,
        });
        self.page = Some(Arc::clone(&page));
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(content_type: &str, body: &str) -> Page {
        Page {
            url: Url::parse("https://example.net/app/index.cgi").unwrap(),
            status: 200,
            content_type: content_type.to_string(),
            body: body.to_string(),
        }
    }

    #[test]
    fn test_request_url() {
        let scraper = WebScraper::builder("", "", "https://bugzilla.example.net/")
            .action_suffix(".cgi")
            .build()
            .unwrap();
        assert_eq!(
            scraper.request_url("show_bug"),
            "https://bugzilla.example.net/show_bug.cgi"
        );
        assert_eq!(
            scraper.request_url("https://other.example.net/x"),
            "https://other.example.net/x"
        );
        assert!(scraper.is_anonymous());
    }

    #[test]
    fn test_page_is_html() {
        assert!(page("text/html; charset=UTF-8", "").is_html());
        assert!(page("application/xhtml+xml", "").is_html());
        assert!(!page("text/xml", "").is_html());
        assert!(!page("", "").is_html());
    }

    #[test]
    fn test_page_resolve() {
        let page = page("text/html", "");
        assert_eq!(
            page.resolve("/nidp/app").unwrap().as_str(),
            "https://example.net/nidp/app"
        );
        assert_eq!(
            page.resolve("show_bug.cgi?id=1").unwrap().as_str(),
            "https://example.net/app/show_bug.cgi?id=1"
        );
    }

    #[test]
    fn test_no_page_yet() {
        let scraper = WebScraper::new("user", "pass", "http://example.net").unwrap();
        assert!(!scraper.is_anonymous());
        assert!(!scraper.viewing_html());
        assert!(matches!(scraper.page(), Err(ScraperError::NoPage)));
        assert!(matches!(
            scraper.select_form(FormSelector::Index(0)),
            Err(ScraperError::NoPage)
        ));
    }
}

//! Bugzilla client.
//!
//! Bugs are read through the XML export (`show_bug.cgi?ctype=xml`) and the
//! Atom search feed, and written by filling in the HTML edit form. Two login
//! flavours exist:
//!
//! - [`LoginMode::Sso`]: the public instance sits behind an access manager
//!   whose login pages rely on JavaScript; we replay what the browser would
//!   do (submit the auto-post form, fill in credentials, follow the
//!   `top.location.href` redirects).
//! - [`LoginMode::HttpAuth`]: the API instance takes HTTP basic credentials
//!   on every request, so logging in only verifies that they work.

use std::time::Duration;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{error, info};

use super::bug::Bug;
use super::error::{BugzillaError, BugzillaResult};
use super::update::BugUpdate;
use super::escape_xml_text;
use crate::browser::{
    Form, FormSelector, Page, ScraperResult, SessionCookie, WebScraper, DEFAULT_TIMEOUT,
};
use crate::cache::TtlCache;
use crate::xml::{self, Element, XmlError};

/// Public Bugzilla instance
pub const DEFAULT_BUGZILLA_URL: &str = "https://bugzilla.novell.com";

/// Bugzilla instance accepting HTTP authentication
pub const DEFAULT_API_BUGZILLA_URL: &str = "https://apibugzilla.novell.com";

/// Cache key for the session cookies of a logged-in client
pub const ACCESS_COOKIES_KEY: &str = "bugzilla-access-cookies";

/// Text of the logout link shown to logged-in users (non-breaking space)
const LOGOUT_LINK_TEXT: &str = "Log\u{a0}out";

const INTERNAL_ERROR_MARKER: &str = "Bugzilla has suffered an internal error.";

static SR_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[(\d+)\]").expect("Invalid SR id regex"));

/// How the client authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginMode {
    /// Emulated single sign-on through the access manager
    Sso,
    /// HTTP basic authentication on every request
    HttpAuth,
}

/// Builder for [`Bugzilla`].
#[derive(Debug, Clone)]
pub struct BugzillaBuilder {
    user: String,
    password: String,
    base: String,
    user_agent: Option<String>,
    timeout: Duration,
    mode: LoginMode,
}

impl BugzillaBuilder {
    fn new(user: impl Into<String>, password: impl Into<String>, mode: LoginMode) -> Self {
        let base = match mode {
            LoginMode::Sso => DEFAULT_BUGZILLA_URL,
            LoginMode::HttpAuth => DEFAULT_API_BUGZILLA_URL,
        };
        Self {
            user: user.into(),
            password: password.into(),
            base: base.to_string(),
            user_agent: None,
            timeout: DEFAULT_TIMEOUT,
            mode,
        }
    }

    /// Set the server URL
    pub fn base(mut self, base: impl Into<String>) -> Self {
        self.base = base.into();
        self
    }

    /// Set the user agent string
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

    /// Build the client
    pub fn build(self) -> BugzillaResult<Bugzilla> {
        let mut scraper = WebScraper::builder(&self.user, &self.password, &self.base)
            .maybe_user_agent(self.user_agent)
            .timeout(self.timeout)
            .action_suffix(".cgi")
            .build()?;

        if self.mode == LoginMode::HttpAuth {
            // Anonymous access goes through the public instance.
            if scraper.is_anonymous() && self.base.contains("novell.com") {
                scraper.set_base(DEFAULT_BUGZILLA_URL);
            } else {
                scraper.set_basic_auth(&self.user, &self.password);
            }
        }

        Ok(Bugzilla {
            scraper,
            mode: self.mode,
        })
    }
}

/// Client for a Bugzilla instance.
#[derive(Debug)]
pub struct Bugzilla {
    scraper: WebScraper,
    mode: LoginMode,
}

impl Bugzilla {
    /// Client for the public instance with SSO login
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> BugzillaResult<Self> {
        Self::builder(user, password).build()
    }

    /// Builder for an SSO client
    pub fn builder(user: impl Into<String>, password: impl Into<String>) -> BugzillaBuilder {
        BugzillaBuilder::new(user, password, LoginMode::Sso)
    }

    /// Builder for an HTTP authentication client (API instance by default)
    pub fn api(user: impl Into<String>, password: impl Into<String>) -> BugzillaBuilder {
        BugzillaBuilder::new(user, password, LoginMode::HttpAuth)
    }

    pub fn mode(&self) -> LoginMode {
        self.mode
    }

    pub fn base(&self) -> &str {
        self.scraper.base()
    }

    pub fn is_anonymous(&self) -> bool {
        self.scraper.is_anonymous()
    }

    /// The underlying scraper
    pub fn scraper(&self) -> &WebScraper {
        &self.scraper
    }

    pub fn get_cookies(&self) -> Vec<SessionCookie> {
        self.scraper.get_cookies()
    }

    pub fn set_cookies(&self, cookies: impl IntoIterator<Item = SessionCookie>) {
        self.scraper.set_cookies(cookies)
    }

    async fn load_login_page(&mut self) -> BugzillaResult<bool> {
        info!("Getting login page");
        self.scraper
            .post("index", &[("GoAheadAndLogIn", "1")])
            .await?;

        if !self.scraper.viewing_html() {
            return Err(BugzillaError::login_failed(
                "Failed to load bugzilla login form",
            ));
        }

        let logged_in = self.scraper.find_link(LOGOUT_LINK_TEXT).is_ok();
        if logged_in {
            info!("Already logged in");
        }
        Ok(logged_in)
    }

    /// Check whether the session is logged in
    pub async fn check_login(&mut self) -> BugzillaResult<bool> {
        self.load_login_page().await
    }

    /// Log in using the configured [`LoginMode`]
    pub async fn login(&mut self) -> BugzillaResult<()> {
        match self.mode {
            LoginMode::Sso => self.login_sso().await,
            LoginMode::HttpAuth => {
                if self.load_login_page().await? {
                    Ok(())
                } else {
                    Err(BugzillaError::login_failed("Failed to login to bugzilla"))
                }
            }
        }
    }

    async fn login_sso(&mut self) -> BugzillaResult<()> {
        if self.check_login().await? {
            return Ok(());
        }

        // The login page auto-posts a form with JavaScript.
        let form = self.login_form()?;
        self.scraper.submit(&form).await?;

        let mut form = self.login_form()?;
        let user = self.scraper.user().to_string();
        let password = self.scraper.password().to_string();
        fill_credentials(&mut form, &user, &password)
            .map_err(|_| BugzillaError::update_error("Failed to parse HTML for login!"))?;

        info!("Doing login");
        let mut page = self.scraper.submit(&form).await?;

        if let Some(paragraph) = page
            .paragraphs()
            .into_iter()
            .find(|p| p.class.as_deref() == Some("error"))
        {
            return Err(BugzillaError::login_failed(paragraph.text));
        }

        // Emulate the JavaScript redirects.
        for target in script_redirects(&page) {
            let url = page.resolve(&target)?;
            page = self.scraper.open(url).await?;
        }

        if !self.check_login().await? {
            return Err(BugzillaError::login_failed(
                "Failed to verify login after successful login",
            ));
        }
        Ok(())
    }

    fn login_form(&self) -> BugzillaResult<Form> {
        self.scraper
            .select_form(FormSelector::Index(0))
            .map_err(|_| BugzillaError::update_error("Failed to parse HTML for login!"))
    }

    /// Reuse a cached session or log in and cache it.
    ///
    /// Anonymous clients never log in.
    pub async fn connect_cached(&mut self, cache: &TtlCache<Vec<SessionCookie>>) -> BugzillaResult<()> {
        if self.is_anonymous() {
            return Ok(());
        }

        match cache.get(ACCESS_COOKIES_KEY) {
            Some(cookies) => self.set_cookies(cookies),
            None => {
                self.login().await?;
                cache.set(ACCESS_COOKIES_KEY, self.get_cookies());
            }
        }
        Ok(())
    }

    /// Handle a body that failed to parse as XML.
    ///
    /// Known failure pages become errors; anything else is logged and the
    /// caller returns an empty result.
    fn handle_parse_error(&self, bug_id: &str, data: &str, err: &XmlError) -> BugzillaResult<()> {
        if data.contains("Buglist Too Large") {
            return Err(BugzillaError::buglist_too_large("Buglist too large"));
        }

        if data.contains(INTERNAL_ERROR_MARKER) {
            return Err(BugzillaError::generic(INTERNAL_ERROR_MARKER));
        }

        if data.is_empty() {
            return Err(BugzillaError::generic(
                "Received empty response from Bugzilla.",
            ));
        }

        log_parse_error(bug_id, data, err);
        Ok(())
    }

    /// Load bugs by id.
    ///
    /// With `permissive` set, bugs that fail to load are logged and skipped.
    /// With `retry` set, a permission error on a logged-in session triggers a
    /// fresh login and one more attempt.
    pub async fn get_bugs(
        &mut self,
        ids: &[u32],
        retry: bool,
        permissive: bool,
    ) -> BugzillaResult<Vec<Bug>> {
        match self.fetch_bugs(ids, permissive).await {
            Err(err) if err.is_not_permitted() && retry && !self.is_anonymous() => {
                error!("{} - login and retry", err);
                self.login().await?;
                self.fetch_bugs(ids, permissive).await
            }
            result => result,
        }
    }

    async fn fetch_bugs(&mut self, ids: &[u32], permissive: bool) -> BugzillaResult<Vec<Bug>> {
        let mut params: Vec<(String, String)> = ids
            .iter()
            .map(|id| ("id".to_string(), id.to_string()))
            .collect();
        params.push(("ctype".to_string(), "xml".to_string()));
        params.push(("excludefield".to_string(), "attachmentdata".to_string()));

        let page = self.scraper.post("show_bug", &params).await?;
        let data = escape_xml_text(&page.body);

        let root = match parse_document(&data, "bugzilla") {
            Ok(root) => root,
            Err(err) => {
                let joined = ids
                    .iter()
                    .map(u32::to_string)
                    .collect::<Vec<_>>()
                    .join(",");
                self.handle_parse_error(&joined, &data, &err)?;
                return Ok(Vec::new());
            }
        };

        let anonymous = self.is_anonymous();
        let mut bugs = Vec::new();
        for element in root.children_named("bug") {
            match Bug::from_element(element, anonymous) {
                Ok(bug) => bugs.push(bug),
                Err(err) if permissive => error!("{}", err),
                Err(err) => return Err(err),
            }
        }
        Ok(bugs)
    }

    /// Load a single bug, `None` when nothing came back
    pub async fn get_bug(&mut self, id: u32) -> BugzillaResult<Option<Bug>> {
        self.get_bug_with_retry(id, true).await
    }

    pub async fn get_bug_with_retry(&mut self, id: u32, retry: bool) -> BugzillaResult<Option<Bug>> {
        Ok(self.get_bugs(&[id], retry, false).await?.into_iter().next())
    }

    /// Run a search and return the matching bug ids.
    pub async fn do_search(&mut self, params: &[(&str, &str)]) -> BugzillaResult<Vec<u32>> {
        let mut request = vec![("ctype", "atom")];
        request.extend_from_slice(params);
        info!("Doing bugzilla search: {:?}", request);

        let page = self.scraper.post("buglist", &request).await?;
        let data = escape_xml_text(&page.body);

        let root = match parse_document(&data, "feed") {
            Ok(root) => root,
            Err(err) => {
                self.handle_parse_error("recent", &data, &err)?;
                return Ok(Vec::new());
            }
        };

        Ok(root
            .children_named("entry")
            .filter_map(|entry| entry.child_text("id"))
            .filter_map(|id| match bug_id_from_url(id) {
                Some(id) => Some(id),
                None => {
                    error!("Unexpected bug id in search feed: {}", id);
                    None
                }
            })
            .collect())
    }

    /// Bugs changed since `since`
    pub async fn get_recent_bugs(&mut self, since: DateTime<Utc>) -> BugzillaResult<Vec<u32>> {
        let from = since.format("%Y-%m-%d %H:%M:%S +0000").to_string();
        self.do_search(&[("chfieldto", "Now"), ("chfieldfrom", from.as_str())])
            .await
    }

    /// Bugs with `openL3` in the whiteboard
    pub async fn get_openl3_bugs(&mut self) -> BugzillaResult<Vec<u32>> {
        self.do_search(&[
            ("status_whiteboard_type", "allwordssubstr"),
            ("query_format", "advanced"),
            ("status_whiteboard", "openL3"),
        ])
        .await
    }

    /// Open bugs with `L3:` in the summary
    pub async fn get_l3_summary_bugs(&mut self) -> BugzillaResult<Vec<u32>> {
        self.do_search(&[
            ("short_desc", "L3:"),
            ("query_format", "advanced"),
            ("bug_status", "NEW"),
            ("bug_status", "ASSIGNED"),
            ("bug_status", "NEEDINFO"),
            ("bug_status", "REOPENED"),
            ("short_desc_type", "allwordssubstr"),
        ])
        .await
    }

    /// Support request numbers linked from the bug page.
    ///
    /// They only appear inside the URL-encoded query of the "Report View"
    /// link.
    pub async fn get_sr(&mut self, id: u32) -> BugzillaResult<Vec<u64>> {
        info!("Loading bug page for {}", id);
        let page = self.load_bug_page(id).await?;

        let Some(link) = page.find_link("Report View") else {
            return Ok(Vec::new());
        };

        let Some(part) = link.href.split("%26").find(|part| part.starts_with("lsMSRID")) else {
            return Ok(Vec::new());
        };

        Ok(SR_REGEX
            .captures_iter(part)
            .filter_map(|caps| caps[1].parse().ok())
            .collect())
    }

    async fn load_bug_page(&mut self, id: u32) -> BugzillaResult<std::sync::Arc<Page>> {
        let page = self
            .scraper
            .post("show_bug", &[("id", id.to_string())])
            .await?;
        if !page.is_html() {
            return Err(BugzillaError::update_error("Failed to load bugzilla form"));
        }
        Ok(page)
    }

    /// Apply `update` to a bug through its edit form
    pub async fn update_bug(&mut self, id: u32, update: &BugUpdate) -> BugzillaResult<()> {
        self.update_bug_with(id, update, |_| Ok(false)).await
    }

    /// Apply `update` plus arbitrary form edits done by `callback`.
    ///
    /// The callback returns whether it changed anything. Nothing is
    /// submitted when no change was made.
    pub async fn update_bug_with<F>(
        &mut self,
        id: u32,
        update: &BugUpdate,
        callback: F,
    ) -> BugzillaResult<()>
    where
        F: FnOnce(&mut Form) -> ScraperResult<bool>,
    {
        if self.is_anonymous() {
            return Err(BugzillaError::update_error("No updates in anonymous mode!"));
        }

        info!("Loading bug form for {}", id);
        let page = self
            .scraper
            .post("show_bug", &[("id", id.to_string())])
            .await?;
        if page.body.contains("You are not authorized to access bug") {
            return Err(BugzillaError::not_permitted(
                format!("You are not authorized to access bug #{}.", id),
                None,
            ));
        }
        if !page.is_html() {
            return Err(BugzillaError::update_error("Failed to load bugzilla form"));
        }

        let mut form = self
            .scraper
            .select_form(FormSelector::Name("changeform"))
            .map_err(|_| BugzillaError::update_error("Failed to parse HTML to update bug!"))?;

        let mut changes = update.apply_fields(&mut form)?;
        changes |= callback(&mut form)?;
        changes |= update.apply_whiteboard(&mut form)?;

        if !changes {
            return Ok(());
        }

        let result = self.scraper.submit(&form).await?;
        if result.body.contains("Mid-air collision!") {
            return Err(BugzillaError::update_error("Mid-air collision!"));
        }
        if !result.body.contains("Changes submitted for") {
            return Err(BugzillaError::update_error(
                "Unknown error while submitting form",
            ));
        }
        Ok(())
    }
}

fn fill_credentials(form: &mut Form, user: &str, password: &str) -> ScraperResult<()> {
    form.set("Ecom_User_ID", user)?;
    form.set("Ecom_Password", password)
}

/// Targets of `top.location.href='...'` lines in the page scripts
fn script_redirects(page: &Page) -> Vec<String> {
    page.scripts()
        .iter()
        .flat_map(|script| script.lines())
        .map(str::trim)
        .filter(|line| line.starts_with("top.location.href="))
        .filter_map(|line| line.split('\'').nth(1))
        .map(String::from)
        .collect()
}

fn parse_document(data: &str, root_name: &str) -> Result<Element, XmlError> {
    let root = xml::parse(data)?;
    if root.name != root_name {
        return Err(XmlError::Syntax {
            position: 0,
            message: format!("unexpected root element <{}>", root.name),
        });
    }
    Ok(root)
}

fn log_parse_error(bug_id: &str, data: &str, err: &XmlError) {
    if data.starts_with("<!DOCTYPE html") {
        error!("Got HTML instead of XML from bugzilla for bug {}", bug_id);
    } else {
        error!(
            "Failed to parse XML response from bugzilla for bug {}: {}",
            bug_id, err
        );
    }
}

/// Bug id from an Atom entry id such as `https://host/show_bug.cgi?id=123`
fn bug_id_from_url(url: &str) -> Option<u32> {
    let (_, id) = url.split_once("?id=")?;
    id.trim().parse().ok()
}

//! Integration tests for the Bugzilla client.
//!
//! Uses wiremock to stand in for the Bugzilla server and the SSO login pages.

use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use suseapi::browser::SessionCookie;
use suseapi::bugzilla::{BugUpdate, Bugzilla, BugzillaError, LoginMode, ACCESS_COOKIES_KEY};
use suseapi::cache::TtlCache;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BUG_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes" ?>
<!DOCTYPE bugzilla SYSTEM "https://bugzilla.example.com/bugzilla.dtd">
<bugzilla version="3.2.1" urlbase="https://bugzilla.example.com/">
  <bug>
    <bug_id>42</bug_id>
    <creation_ts>2013-01-02 10:11 +0000</creation_ts>
    <short_desc>L3: kernel oops on boot</short_desc>
    <bug_status>NEW</bug_status>
    <status_whiteboard>openL3</status_whiteboard>
    <cc>one@example.com</cc>
    <long_desc isprivate="0">
      <who name="Jane">jane@example.com</who>
      <bug_when>2013-01-02 10:11:00 +0000</bug_when>
      <thetext>Oops.</thetext>
    </long_desc>
  </bug>
  <bug error="NotFound">
    <bug_id>43</bug_id>
  </bug>
</bugzilla>
"#;

const LOGGED_IN: &str = r#"<html><body>
<a href="index.cgi?logout=1">Log&nbsp;out</a>
</body></html>"#;

const NOT_LOGGED_IN: &str = r#"<html><body>
<form action="/sso/start" method="post">
  <input type="hidden" name="target" value="bugzilla">
</form>
</body></html>"#;

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/html")
}

fn xml(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/xml")
}

/// Number of requests the mock server received for `endpoint`
async fn hits(server: &MockServer, endpoint: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == endpoint)
        .count()
}

/// Serve a permission error for the first bug request and the bug afterwards
async fn mount_not_permitted_once(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/show_bug.cgi"))
        .respond_with(xml(NOT_PERMITTED_XML))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/show_bug.cgi"))
        .respond_with(xml(SINGLE_BUG_XML))
        .with_priority(2)
        .mount(server)
        .await;
}

const SINGLE_BUG_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes" ?>
<bugzilla version="3.2.1">
  <bug>
    <bug_id>42</bug_id>
    <short_desc>L3: kernel oops on boot</short_desc>
  </bug>
</bugzilla>
"#;

const NOT_PERMITTED_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes" ?>
<bugzilla version="3.2.1">
  <bug error="NotPermitted">
    <bug_id>42</bug_id>
  </bug>
</bugzilla>
"#;

fn anonymous(server: &MockServer) -> Bugzilla {
    Bugzilla::builder("", "")
        .base(server.uri())
        .build()
        .unwrap()
}

// =============================================================================
// BUG LOADING
// =============================================================================

#[tokio::test]
async fn test_get_bugs_permissive() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/show_bug.cgi"))
        .and(body_string_contains("ctype=xml"))
        .respond_with(xml(BUG_XML))
        .mount(&server)
        .await;

    let mut client = anonymous(&server);
    let bugs = client.get_bugs(&[42, 43], true, true).await.unwrap();

    assert_eq!(bugs.len(), 1);
    let bug = &bugs[0];
    assert_eq!(bug.bug_id, "42");
    assert_eq!(bug.field("short_desc"), Some("L3: kernel oops on boot"));
    assert_eq!(bug.field("bug_status"), Some("NEW"));
    assert_eq!(bug.cc_list, vec!["one@example.com".to_string()]);
    assert_eq!(bug.comments.len(), 1);
    assert!(bug.anonymous);
}

#[tokio::test]
async fn test_get_bugs_strict_reports_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/show_bug.cgi"))
        .respond_with(xml(BUG_XML))
        .mount(&server)
        .await;

    let mut client = anonymous(&server);
    let err = client.get_bugs(&[42, 43], false, false).await.unwrap_err();

    assert!(matches!(err, BugzillaError::NotFound { .. }));
    assert_eq!(err.bug_id(), Some("43"));
}

#[tokio::test]
async fn test_get_bug_control_characters() {
    let server = MockServer::start().await;
    let body = "<bugzilla><bug><bug_id>7</bug_id>\
        <short_desc>bell\u{07} here</short_desc></bug></bugzilla>";
    Mock::given(method("POST"))
        .and(path("/show_bug.cgi"))
        .respond_with(xml(body))
        .mount(&server)
        .await;

    let mut client = anonymous(&server);
    let bug = client.get_bug(7).await.unwrap().unwrap();
    assert_eq!(bug.field("short_desc"), Some("bell^G here"));
}

#[tokio::test]
async fn test_buglist_too_large() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/show_bug.cgi"))
        .respond_with(html(
            "<!DOCTYPE html><html><body><h1>Buglist Too Large</h1></body></html>",
        ))
        .mount(&server)
        .await;

    let mut client = anonymous(&server);
    let err = client.get_bug(1).await.unwrap_err();
    assert!(matches!(err, BugzillaError::BuglistTooLarge { .. }));
}

#[tokio::test]
async fn test_internal_error_page() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/show_bug.cgi"))
        .respond_with(html(
            "<html><body><p>Bugzilla has suffered an internal error.</p><br></body></html>",
        ))
        .mount(&server)
        .await;

    let mut client = anonymous(&server);
    let err = client.get_bug(1).await.unwrap_err();
    assert!(matches!(err, BugzillaError::Generic { .. }));
}

#[tokio::test]
async fn test_unparsable_page_yields_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/show_bug.cgi"))
        .respond_with(html("<html><body><p>Maintenance<br></body></html>"))
        .mount(&server)
        .await;

    let mut client = anonymous(&server);
    assert_eq!(client.get_bug(1).await.unwrap(), None);
}

#[tokio::test]
async fn test_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/show_bug.cgi"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let mut client = anonymous(&server);
    let err = client.get_bug(1).await.unwrap_err();
    assert!(err.is_connection_error());
}

#[tokio::test]
async fn test_not_permitted_logs_in_and_retries_once() {
    let server = MockServer::start().await;
    mount_not_permitted_once(&server).await;
    Mock::given(method("POST"))
        .and(path("/index.cgi"))
        .and(body_string_contains("GoAheadAndLogIn=1"))
        .respond_with(html(LOGGED_IN))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = Bugzilla::api("user", "pass")
        .base(server.uri())
        .build()
        .unwrap();
    let bug = client.get_bug(42).await.unwrap().unwrap();

    assert_eq!(bug.bug_id, "42");
    assert!(!bug.anonymous);
    assert_eq!(hits(&server, "/show_bug.cgi").await, 2);
    assert_eq!(hits(&server, "/index.cgi").await, 1);
}

#[tokio::test]
async fn test_not_permitted_without_retry() {
    let server = MockServer::start().await;
    mount_not_permitted_once(&server).await;

    let mut client = Bugzilla::api("user", "pass")
        .base(server.uri())
        .build()
        .unwrap();
    let err = client.get_bug_with_retry(42, false).await.unwrap_err();

    assert!(err.is_not_permitted());
    assert_eq!(err.bug_id(), Some("42"));
    assert_eq!(hits(&server, "/show_bug.cgi").await, 1);
    assert_eq!(hits(&server, "/index.cgi").await, 0);
}

#[tokio::test]
async fn test_not_permitted_anonymous_does_not_login() {
    let server = MockServer::start().await;
    mount_not_permitted_once(&server).await;

    let mut client = anonymous(&server);
    let err = client.get_bug(42).await.unwrap_err();

    assert!(err.is_not_permitted());
    assert_eq!(hits(&server, "/show_bug.cgi").await, 1);
    assert_eq!(hits(&server, "/index.cgi").await, 0);
}

// =============================================================================
// SEARCHES
// =============================================================================

#[tokio::test]
async fn test_do_search() {
    let server = MockServer::start().await;
    let feed = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Bugzilla</title>
  <entry><id>https://bugzilla.example.com/show_bug.cgi?id=100</id></entry>
  <entry><id>https://bugzilla.example.com/show_bug.cgi?id=200</id></entry>
  <entry><id>https://bugzilla.example.com/broken</id></entry>
</feed>"#;
    Mock::given(method("POST"))
        .and(path("/buglist.cgi"))
        .and(body_string_contains("ctype=atom"))
        .and(body_string_contains("status_whiteboard=openL3"))
        .respond_with(xml(feed))
        .mount(&server)
        .await;

    let mut client = anonymous(&server);
    assert_eq!(client.get_openl3_bugs().await.unwrap(), vec![100, 200]);
}

#[tokio::test]
async fn test_get_recent_bugs() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/buglist.cgi"))
        .and(body_string_contains("ctype=atom"))
        .and(body_string_contains("chfieldto=Now"))
        .and(body_string_contains("chfieldfrom=2013-01-02+03%3A04%3A05+%2B0000"))
        .respond_with(xml(
            r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <entry><id>https://bugzilla.example.com/show_bug.cgi?id=7</id></entry>
</feed>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = anonymous(&server);
    let since = Utc.with_ymd_and_hms(2013, 1, 2, 3, 4, 5).unwrap();
    assert_eq!(client.get_recent_bugs(since).await.unwrap(), vec![7]);
}

#[tokio::test]
async fn test_get_l3_summary_bugs() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/buglist.cgi"))
        .and(body_string_contains("short_desc=L3%3A"))
        .and(body_string_contains("query_format=advanced"))
        .and(body_string_contains(
            "bug_status=NEW&bug_status=ASSIGNED&bug_status=NEEDINFO&bug_status=REOPENED",
        ))
        .and(body_string_contains("short_desc_type=allwordssubstr"))
        .respond_with(xml(r#"<feed xmlns="http://www.w3.org/2005/Atom"></feed>"#))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = anonymous(&server);
    assert!(client.get_l3_summary_bugs().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_get_sr() {
    let server = MockServer::start().await;
    let page = r#"<html><body>
<a href="https://reports.example.com/view?q=a%26lsMSRID%3D[1234567890][1234567891]%26b=c">Report View</a>
</body></html>"#;
    Mock::given(method("POST"))
        .and(path("/show_bug.cgi"))
        .respond_with(html(page))
        .mount(&server)
        .await;

    let mut client = anonymous(&server);
    assert_eq!(
        client.get_sr(42).await.unwrap(),
        vec![1234567890, 1234567891]
    );
}

#[tokio::test]
async fn test_get_sr_without_link() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/show_bug.cgi"))
        .respond_with(html("<html><body>nothing</body></html>"))
        .mount(&server)
        .await;

    let mut client = anonymous(&server);
    assert!(client.get_sr(42).await.unwrap().is_empty());
}

// =============================================================================
// LOGIN
// =============================================================================

#[tokio::test]
async fn test_check_login_non_html() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/index.cgi"))
        .respond_with(xml("<bugzilla/>"))
        .mount(&server)
        .await;

    let mut client = anonymous(&server);
    let err = client.check_login().await.unwrap_err();
    assert!(matches!(err, BugzillaError::LoginFailed { .. }));
    assert!(err.is_connection_error());
    assert_eq!(
        err.to_string(),
        "Login has failed: Failed to load bugzilla login form"
    );
}

#[tokio::test]
async fn test_connect_cached_reuses_cookies() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/index.cgi"))
        .respond_with(html(LOGGED_IN))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/show_bug.cgi"))
        .and(header("cookie", "Bugzilla_logincookie=cached"))
        .respond_with(xml(SINGLE_BUG_XML))
        .expect(1)
        .mount(&server)
        .await;

    let cache = TtlCache::new("bugzilla-");
    cache.set(
        ACCESS_COOKIES_KEY,
        vec![SessionCookie::new(
            "Bugzilla_logincookie",
            "cached",
            "127.0.0.1",
            "/",
        )],
    );

    let mut client = Bugzilla::api("user", "pass")
        .base(server.uri())
        .build()
        .unwrap();
    client.connect_cached(&cache).await.unwrap();

    let cookies = client.get_cookies();
    assert_eq!(cookies.len(), 1);
    assert_eq!(cookies[0].value, "cached");
    assert!(client.get_bug_with_retry(42, false).await.unwrap().is_some());
}

#[tokio::test]
async fn test_connect_cached_logs_in_and_stores_cookies() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/index.cgi"))
        .respond_with(
            html(LOGGED_IN).insert_header("set-cookie", "Bugzilla_logincookie=fresh; Path=/"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let cache = TtlCache::new("bugzilla-");
    let mut client = Bugzilla::api("user", "pass")
        .base(server.uri())
        .build()
        .unwrap();
    client.connect_cached(&cache).await.unwrap();

    let stored = cache.get(ACCESS_COOKIES_KEY).unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].name, "Bugzilla_logincookie");
    assert_eq!(stored[0].value, "fresh");
}

#[tokio::test]
async fn test_connect_cached_anonymous() {
    let server = MockServer::start().await;
    let cache = TtlCache::new("bugzilla-");

    let mut client = anonymous(&server);
    client.connect_cached(&cache).await.unwrap();
    assert!(cache.is_empty());
    assert_eq!(hits(&server, "/index.cgi").await, 0);
}

#[tokio::test]
async fn test_http_auth_login() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/index.cgi"))
        .and(header("authorization", "Basic dXNlcjpwYXNz"))
        .respond_with(html(LOGGED_IN))
        .mount(&server)
        .await;

    let mut client = Bugzilla::api("user", "pass")
        .base(server.uri())
        .build()
        .unwrap();
    assert_eq!(client.mode(), LoginMode::HttpAuth);
    client.login().await.unwrap();
}

#[tokio::test]
async fn test_http_auth_login_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/index.cgi"))
        .respond_with(html("<html><body>Welcome, guest</body></html>"))
        .mount(&server)
        .await;

    let mut client = Bugzilla::api("user", "wrong")
        .base(server.uri())
        .build()
        .unwrap();
    let err = client.login().await.unwrap_err();
    assert!(matches!(err, BugzillaError::LoginFailed { .. }));
}

async fn mount_sso_pages(server: &MockServer, login_result: &str) {
    Mock::given(method("POST"))
        .and(path("/index.cgi"))
        .respond_with(html(NOT_LOGGED_IN))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/index.cgi"))
        .respond_with(html(LOGGED_IN))
        .with_priority(2)
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/sso/start"))
        .and(body_string_contains("target=bugzilla"))
        .respond_with(html(
            r#"<form name="IDPLogin" action="/sso/login" method="post">
<input type="text" name="Ecom_User_ID">
<input type="password" name="Ecom_Password">
<input type="submit" value="Login">
</form>"#,
        ))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/sso/login"))
        .and(body_string_contains("Ecom_User_ID=jdoe"))
        .and(body_string_contains("Ecom_Password=secret"))
        .respond_with(html(login_result))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_sso_login() {
    let server = MockServer::start().await;
    mount_sso_pages(
        &server,
        "<html><script>\ntop.location.href='/bugzilla/done';\n</script></html>",
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/bugzilla/done"))
        .respond_with(html("<html>done</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = Bugzilla::builder("jdoe", "secret")
        .base(server.uri())
        .build()
        .unwrap();
    client.login().await.unwrap();
}

#[tokio::test]
async fn test_sso_login_error_message() {
    let server = MockServer::start().await;
    mount_sso_pages(
        &server,
        r#"<html><p class="error">Login failed, please try again.</p></html>"#,
    )
    .await;

    let mut client = Bugzilla::builder("jdoe", "secret")
        .base(server.uri())
        .build()
        .unwrap();
    let err = client.login().await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Login has failed: Login failed, please try again."
    );
}

// =============================================================================
// UPDATES
// =============================================================================

const CHANGE_FORM: &str = r#"<html><body>
<form name="changeform" method="post" action="process_bug.cgi">
  <input type="hidden" name="id" value="42">
  <input name="status_whiteboard" value="">
  <input type="checkbox" name="addselfcc" checked>
  <select name="priority">
    <option value="P3 - Medium" selected>P3 - Medium</option>
    <option value="P1 - Urgent">P1 - Urgent</option>
  </select>
  <input type="submit" id="commit" value="Commit">
</form>
</body></html>"#;

async fn logged_in_client(server: &MockServer) -> Bugzilla {
    Bugzilla::api("user", "pass")
        .base(server.uri())
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_update_bug() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/show_bug.cgi"))
        .respond_with(html(CHANGE_FORM))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/process_bug.cgi"))
        .and(body_string_contains("openL3"))
        .and(body_string_contains("priority=P1+-+Urgent"))
        .respond_with(html("<html>Changes submitted for bug 42</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = logged_in_client(&server).await;
    let update = BugUpdate::new()
        .set("priority", "P1 - Urgent")
        .whiteboard_add("openL3");
    client.update_bug(42, &update).await.unwrap();
}

#[tokio::test]
async fn test_update_bug_with_callback() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/show_bug.cgi"))
        .respond_with(html(CHANGE_FORM))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/process_bug.cgi"))
        .and(body_string_contains("priority=P1+-+Urgent"))
        .and(body_string_contains("id=42"))
        .respond_with(html("<html>Changes submitted for bug 42</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = logged_in_client(&server).await;
    client
        .update_bug_with(42, &BugUpdate::new(), |form| {
            form.set("priority", "P1 - Urgent")?;
            Ok(true)
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_update_rejects_unknown_option() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/show_bug.cgi"))
        .respond_with(html(CHANGE_FORM))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/process_bug.cgi"))
        .respond_with(html("<html>Changes submitted for bug 42</html>"))
        .expect(0)
        .mount(&server)
        .await;

    let mut client = logged_in_client(&server).await;
    let update = BugUpdate::new().set("priority", "P9 - Someday");
    assert!(client.update_bug(42, &update).await.is_err());
}

#[tokio::test]
async fn test_update_without_changes_is_not_submitted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/show_bug.cgi"))
        .respond_with(html(CHANGE_FORM))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/process_bug.cgi"))
        .respond_with(html("<html>Changes submitted for bug 42</html>"))
        .expect(0)
        .mount(&server)
        .await;

    let mut client = logged_in_client(&server).await;
    let update = BugUpdate::new().whiteboard_remove("closedL3");
    client.update_bug(42, &update).await.unwrap();
}

#[tokio::test]
async fn test_update_mid_air_collision() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/show_bug.cgi"))
        .respond_with(html(CHANGE_FORM))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/process_bug.cgi"))
        .respond_with(html("<html><h1>Mid-air collision!</h1></html>"))
        .mount(&server)
        .await;

    let mut client = logged_in_client(&server).await;
    let update = BugUpdate::new().whiteboard_add("openL3");
    let err = client.update_bug(42, &update).await.unwrap_err();
    assert_eq!(err.to_string(), "Error while updating bug: Mid-air collision!");
}

#[tokio::test]
async fn test_update_not_authorized() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/show_bug.cgi"))
        .respond_with(html(
            "<html>You are not authorized to access bug #42.</html>",
        ))
        .mount(&server)
        .await;

    let mut client = logged_in_client(&server).await;
    let err = client
        .update_bug(42, &BugUpdate::new().whiteboard_add("x"))
        .await
        .unwrap_err();
    assert!(err.is_not_permitted());
}

#[tokio::test]
async fn test_anonymous_update_refused() {
    let server = MockServer::start().await;
    let mut client = anonymous(&server);
    let err = client
        .update_bug(42, &BugUpdate::new().whiteboard_add("x"))
        .await
        .unwrap_err();
    assert!(matches!(err, BugzillaError::UpdateError { .. }));
}

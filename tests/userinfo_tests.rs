//! Integration tests for user lookups against an in-memory directory.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use suseapi::userinfo::{Directory, DirectoryEntry, UserInfo, UserInfoError, UserInfoResult};

type Searches = Arc<Mutex<Vec<(String, String, Vec<String>)>>>;

/// Answers filters from a fixed table and records every search.
#[derive(Debug, Default)]
struct MockDirectory {
    entries: Vec<(String, DirectoryEntry)>,
    searches: Searches,
    fail: bool,
}

impl MockDirectory {
    fn with(mut self, filter: &str, ou: &str) -> Self {
        let mut attrs = BTreeMap::new();
        attrs.insert("ou".to_string(), vec![ou.to_string()]);
        attrs.insert("cn".to_string(), vec!["Jane Doe".to_string()]);
        self.entries.push((
            filter.to_string(),
            DirectoryEntry {
                dn: "uid=jdoe,o=Novell".to_string(),
                attrs,
            },
        ));
        self
    }

    fn recorder(&self) -> Searches {
        Arc::clone(&self.searches)
    }
}

fn filters(searches: &Searches) -> Vec<String> {
    searches.lock().iter().map(|s| s.1.clone()).collect()
}

#[async_trait]
impl Directory for MockDirectory {
    async fn search(
        &self,
        base: &str,
        filter: &str,
        attrs: &[&str],
    ) -> UserInfoResult<Vec<DirectoryEntry>> {
        self.searches.lock().push((
            base.to_string(),
            filter.to_string(),
            attrs.iter().map(|a| a.to_string()).collect(),
        ));
        if self.fail {
            return Err(UserInfoError::Connection {
                server: "ldap://localhost".to_string(),
                message: "refused".to_string(),
            });
        }
        Ok(self
            .entries
            .iter()
            .filter(|(f, _)| f == filter)
            .map(|(_, e)| e.clone())
            .collect())
    }
}

#[tokio::test]
async fn test_search_uid_fallback_order() {
    let directory = MockDirectory::default().with("(uid=jdoe)", "QA");
    let searches = directory.recorder();
    let info = UserInfo::new(directory, "o=Novell");

    let result = info.search_uid("jdoe", None).await.unwrap();
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].first("cn"), Some("Jane Doe"));
    assert_eq!(
        filters(&searches),
        vec![
            "(mail=jdoe@novell.com)",
            "(mail=jdoe@suse.com)",
            "(uid=jdoe)",
        ]
    );

    let (base, _, attrs) = searches.lock()[0].clone();
    assert_eq!(base, "o=Novell");
    assert_eq!(attrs, vec!["cn", "mail", "ou", "sn", "givenName"]);
}

#[tokio::test]
async fn test_search_uid_tries_all_filters() {
    let directory = MockDirectory::default();
    let searches = directory.recorder();
    let info = UserInfo::new(directory, "o=Novell");

    assert!(info.search_uid("ghost", Some(&["mail"])).await.unwrap().is_empty());
    assert_eq!(filters(&searches).len(), 4);
    assert_eq!(filters(&searches)[3], "(cn=ghost)");
    assert_eq!(searches.lock()[3].2, vec!["mail"]);
}

#[tokio::test]
async fn test_search_filters_are_escaped() {
    let directory = MockDirectory::default();
    let searches = directory.recorder();
    let info = UserInfo::new(directory, "o=Novell");

    info.search_by("cn", "*)(uid=*", Some(&["cn"])).await.unwrap();
    assert_eq!(filters(&searches), vec!["(cn=\\2a\\29\\28uid=\\2a)"]);
}

#[tokio::test]
async fn test_department_lookup_is_cached() {
    let directory = MockDirectory::default().with("(mail=jdoe@suse.com)", "L3 Maintenance");
    let info = UserInfo::new(directory, "o=Novell");

    assert_eq!(
        info.get_department("jdoe@suse.com").await.unwrap(),
        "L3/Maintenance"
    );
    assert_eq!(
        info.get_department("jdoe@suse.com").await.unwrap(),
        "L3/Maintenance"
    );
    assert_eq!(info.cache().len(), 1);
}

#[tokio::test]
async fn test_department_strips_novell_domain() {
    let directory = MockDirectory::default().with("(uid=jdoe)", "Business Support Nurenburg");
    let info = UserInfo::new(directory, "o=Novell");

    assert_eq!(
        info.get_department("jdoe@novell.com").await.unwrap(),
        "Business Support Nürnberg"
    );
}

#[tokio::test]
async fn test_department_not_cached_when_missing() {
    let info = UserInfo::new(MockDirectory::default(), "o=Novell");

    assert_eq!(info.get_department("ghost").await.unwrap(), "N/A");
    assert_eq!(
        info.get_department("someone@example.org").await.unwrap(),
        "External"
    );
    assert!(info.cache().is_empty());
}

#[tokio::test]
async fn test_directory_errors_propagate() {
    let directory = MockDirectory {
        fail: true,
        ..Default::default()
    };
    let info = UserInfo::new(directory, "o=Novell");

    let err = info.get_department("jdoe").await.unwrap_err();
    assert!(err.to_string().contains("ldap://localhost"));
    assert!(info.cache().is_empty());
}

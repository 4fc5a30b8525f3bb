//! Bug data parsed from Bugzilla's XML export.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::error::{BugzillaError, BugzillaResult};
use crate::timestamp::parse_timestamp;
use crate::xml::Element;

/// A comment (`long_desc`) on a bug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Author; empty when loaded anonymously and hidden by the server
    pub who: String,
    pub bug_when: Option<DateTime<Utc>>,
    pub thetext: String,
}

/// Attachment metadata (attachment data itself is never requested).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub attachid: String,
    pub desc: String,
    pub date: Option<DateTime<Utc>>,
    pub filename: String,
    #[serde(rename = "type")]
    pub content_type: String,
    pub size: String,
    pub attacher: String,
    pub ispatch: bool,
    pub isobsolete: bool,
}

/// A single bug.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Bug {
    pub bug_id: String,
    pub cc_list: Vec<String>,
    pub groups: Vec<String>,
    pub comments: Vec<Comment>,
    pub attachments: Vec<Attachment>,
    pub aliases: Vec<String>,
    pub creation_ts: Option<DateTime<Utc>>,
    pub delta_ts: Option<DateTime<Utc>>,
    /// Loaded without a login
    pub anonymous: bool,
    /// Every other leaf element, in document order
    pub fields: IndexMap<String, String>,
}

impl Bug {
    /// Build a bug from a `<bug>` element.
    ///
    /// An `error` attribute on the element is turned into the matching
    /// [`BugzillaError`].
    pub fn from_element(element: &Element, anonymous: bool) -> BugzillaResult<Self> {
        if let Some(error) = element.attr("error") {
            let bug_id = element.child_text("bug_id").map(String::from);
            return Err(match error {
                "NotPermitted" => BugzillaError::not_permitted(error, bug_id),
                "NotFound" => BugzillaError::not_found(error, bug_id),
                "InvalidBugId" => BugzillaError::invalid_bug_id(error, bug_id),
                _ => BugzillaError::generic(error),
            });
        }

        let mut bug = Bug {
            anonymous,
            ..Default::default()
        };

        for child in &element.children {
            bug.process_element(child)?;
        }

        Ok(bug)
    }

    fn process_element(&mut self, element: &Element) -> BugzillaResult<()> {
        let text = element.text.clone();
        match element.name.as_str() {
            "cc" => self.cc_list.push(text),
            "alias" => self.aliases.push(text),
            "group" => self.groups.push(text),
            "creation_ts" => self.creation_ts = parse_timestamp(&text),
            "delta_ts" => self.delta_ts = parse_timestamp(&text),
            "bug_id" if element.is_leaf() => self.bug_id = text,
            _ if element.is_leaf() => {
                self.fields.insert(element.name.clone(), text);
            }
            "long_desc" => self.process_comment(element)?,
            "attachment" => self.attachments.push(Attachment::from_element(element)),
            _ => {}
        }
        Ok(())
    }

    fn process_comment(&mut self, element: &Element) -> BugzillaResult<()> {
        let bug_id = Some(self.bug_id.clone()).filter(|id| !id.is_empty());

        let who = match element.child_text("who") {
            Some(who) => who.to_string(),
            None if self.anonymous => String::new(),
            None => {
                return Err(BugzillaError::not_permitted(
                    "Could not load author from bugzilla",
                    bug_id,
                ))
            }
        };

        let bug_when = match element.child_text("bug_when") {
            Some(when) => parse_timestamp(when),
            None if self.anonymous => None,
            None => {
                return Err(BugzillaError::not_permitted(
                    "Could not load time of change from bugzilla",
                    bug_id,
                ))
            }
        };

        self.comments.push(Comment {
            who,
            bug_when,
            thetext: element.child_text("thetext").unwrap_or_default().to_string(),
        });
        Ok(())
    }

    /// Value of a leaf field (`bug_id` included)
    pub fn field(&self, name: &str) -> Option<&str> {
        if name == "bug_id" {
            return Some(self.bug_id.as_str());
        }
        self.fields.get(name).map(String::as_str)
    }

    /// Whether a field exists and is not empty
    pub fn has_nonempty(&self, name: &str) -> bool {
        self.field(name).map(|value| !value.is_empty()).unwrap_or(false)
    }
}

impl Attachment {
    fn from_element(element: &Element) -> Self {
        let text = |name: &str| element.child_text(name).unwrap_or_default().to_string();
        Self {
            attachid: text("attachid"),
            desc: text("desc"),
            date: element.child_text("date").and_then(parse_timestamp),
            filename: text("filename"),
            content_type: text("type"),
            size: text("size"),
            attacher: text("attacher"),
            ispatch: element.attr("ispatch") == Some("1"),
            isobsolete: element.attr("isobsolete") == Some("1"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml;

    const BUG: &str = r#"<bug>
        <bug_id>123</bug_id>
        <creation_ts>2013-01-02 10:11 +0000</creation_ts>
        <short_desc>L3: something broke</short_desc>
        <delta_ts>2013-01-03 11:12:13 +0100</delta_ts>
        <status_whiteboard></status_whiteboard>
        <cc>one@example.com</cc>
        <cc>two@example.com</cc>
        <group>novellonly</group>
        <long_desc isprivate="0">
          <who name="John">john@example.com</who>
          <bug_when>2013-01-02 10:11:00 +0000</bug_when>
          <thetext>It broke.</thetext>
        </long_desc>
        <attachment isobsolete="0" ispatch="1" isprivate="0">
          <attachid>42</attachid>
          <date>2013-01-02 10:12 +0000</date>
          <desc>fix</desc>
          <filename>fix.patch</filename>
          <type>text/plain</type>
          <size>100</size>
          <attacher>john@example.com</attacher>
        </attachment>
    </bug>"#;

    #[test]
    fn test_parse_bug() {
        let element = xml::parse(BUG).unwrap();
        let bug = Bug::from_element(&element, false).unwrap();
        assert_eq!(bug.bug_id, "123");
        assert_eq!(bug.field("short_desc"), Some("L3: something broke"));
        assert!(bug.has_nonempty("short_desc"));
        assert!(!bug.has_nonempty("status_whiteboard"));
        assert!(!bug.has_nonempty("missing"));
        assert_eq!(bug.cc_list, vec!["one@example.com", "two@example.com"]);
        assert_eq!(bug.groups, vec!["novellonly"]);
        assert!(bug.creation_ts.is_some());
        assert_eq!(
            bug.delta_ts.unwrap().to_rfc3339(),
            "2013-01-03T10:12:13+00:00"
        );
        assert_eq!(bug.comments.len(), 1);
        assert_eq!(bug.comments[0].who, "john@example.com");
        assert_eq!(bug.comments[0].thetext, "It broke.");
        assert_eq!(bug.attachments.len(), 1);
        assert!(bug.attachments[0].ispatch);
        assert!(!bug.attachments[0].isobsolete);
        assert_eq!(bug.attachments[0].content_type, "text/plain");
    }

    #[test]
    fn test_error_attribute() {
        let element =
            xml::parse(r#"<bug error="NotPermitted"><bug_id>99</bug_id></bug>"#).unwrap();
        let err = Bug::from_element(&element, false).unwrap_err();
        assert!(matches!(err, BugzillaError::NotPermitted { .. }));
        assert_eq!(err.bug_id(), Some("99"));

        let element = xml::parse(r#"<bug error="Strange"/>"#).unwrap();
        let err = Bug::from_element(&element, false).unwrap_err();
        assert_eq!(err.to_string(), "Generic error: Strange");
    }

    #[test]
    fn test_hidden_author() {
        let data = r#"<bug><bug_id>7</bug_id>
            <long_desc><thetext>hidden</thetext></long_desc></bug>"#;
        let element = xml::parse(data).unwrap();

        let err = Bug::from_element(&element, false).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Access not permitted: Could not load author from bugzilla: 7"
        );

        let bug = Bug::from_element(&element, true).unwrap();
        assert_eq!(bug.comments[0].who, "");
        assert_eq!(bug.comments[0].bug_when, None);
    }
}

//! Regex based HTML extraction.
//!
//! Just enough HTML understanding to drive the pages we scrape: forms and
//! their controls, links, paragraphs and inline scripts. The pages are old
//! and often not well-formed, so everything here is tolerant: unclosed forms
//! run to the next form or the end of the document, and attribute values may
//! be quoted either way or not at all.

use once_cell::sync::Lazy;
use regex::Regex;

use super::form::{Control, ControlKind, Form};

static FORM_OPEN_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<form\b([^>]*)>").expect("Invalid form regex"));

static FORM_CLOSE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</form\s*>").expect("Invalid form close regex"));

static CONTROL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<(input|select|textarea|button)\b([^>]*)>").expect("Invalid control regex")
});

static SELECT_CLOSE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</select\s*>").expect("Invalid select close regex"));

static TEXTAREA_CLOSE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</textarea\s*>").expect("Invalid textarea close regex"));

static OPTION_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<option\b([^>]*)>([^<]*)").expect("Invalid option regex"));

static ATTR_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([a-zA-Z_:][-a-zA-Z0-9_:.]*)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+)))?"#)
        .expect("Invalid attribute regex")
});

static LINK_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<a\b([^>]*)>(.*?)</a\s*>").expect("Invalid link regex"));

static PARAGRAPH_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<p\b([^>]*)>(.*?)</p\s*>").expect("Invalid paragraph regex"));

static SCRIPT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>(.*?)</script\s*>").expect("Invalid script regex")
});

static TAG_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("Invalid tag regex"));

static ENTITY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z]+);").expect("Invalid entity regex")
});

/// A hyperlink found on a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// Decoded `href` attribute
    pub href: String,
    /// Link text with tags stripped and entities decoded
    pub text: String,
}

/// A paragraph found on a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paragraph {
    pub class: Option<String>,
    pub text: String,
}

/// Decode the handful of entities that appear in practice plus numeric ones.
pub fn decode_entities(text: &str) -> String {
    ENTITY_REGEX
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let entity = &caps[1];
            let decoded = if let Some(hex) = entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = entity.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                match entity {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some('\u{a0}'),
                    _ => None,
                }
            };
            decoded
                .map(String::from)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Remove tags, decode entities and collapse ASCII whitespace.
pub fn strip_tags(html: &str) -> String {
    let text = TAG_REGEX.replace_all(html, "");
    let decoded = decode_entities(&text);
    decoded
        .split(|c: char| c.is_ascii_whitespace())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse an attribute string into lowercase names and decoded values.
pub fn parse_attributes(attrs: &str) -> Vec<(String, String)> {
    ATTR_REGEX
        .captures_iter(attrs)
        .map(|caps| {
            let name = caps[1].to_ascii_lowercase();
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| decode_entities(m.as_str()))
                .unwrap_or_default();
            (name, value)
        })
        .collect()
}

fn attr<'a>(attrs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

fn has_attr(attrs: &[(String, String)], name: &str) -> bool {
    attrs.iter().any(|(key, _)| key == name)
}

/// Extract all forms, in document order.
pub fn parse_forms(html: &str) -> Vec<Form> {
    let opens: Vec<_> = FORM_OPEN_REGEX.captures_iter(html).collect();
    let mut forms = Vec::with_capacity(opens.len());

    for (idx, caps) in opens.iter().enumerate() {
        let whole = caps.get(0).map(|m| m.end()).unwrap_or(0);
        let next_open = opens
            .get(idx + 1)
            .and_then(|next| next.get(0))
            .map(|m| m.start())
            .unwrap_or(html.len());
        let end = FORM_CLOSE_REGEX
            .find(&html[whole..])
            .map(|m| whole + m.start())
            .filter(|end| *end <= next_open)
            .unwrap_or(next_open);

        let attrs = parse_attributes(&caps[1]);
        let mut form = Form::new(
            attr(&attrs, "name").map(String::from),
            attr(&attrs, "id").map(String::from),
            attr(&attrs, "action").unwrap_or_default(),
            attr(&attrs, "method").unwrap_or("GET"),
        );
        form.controls = parse_controls(&html[whole..end]);
        forms.push(form);
    }

    forms
}

/// Extract the controls contained in a form body.
pub fn parse_controls(body: &str) -> Vec<Control> {
    let mut controls = Vec::new();

    for caps in CONTROL_REGEX.captures_iter(body) {
        let tag = caps[1].to_ascii_lowercase();
        let attrs = parse_attributes(&caps[2]);
        let Some(name) = attr(&attrs, "name").filter(|n| !n.is_empty()) else {
            continue;
        };
        let after = caps.get(0).map(|m| m.end()).unwrap_or(body.len());
        let disabled = has_attr(&attrs, "disabled");

        let control = match tag.as_str() {
            "input" => {
                let kind = ControlKind::from_input_type(attr(&attrs, "type").unwrap_or("text"));
                let value = attr(&attrs, "value");
                match kind {
                    ControlKind::Checkbox | ControlKind::Radio => {
                        let on_value = value.unwrap_or("on").to_string();
                        let values = if has_attr(&attrs, "checked") {
                            vec![on_value.clone()]
                        } else {
                            Vec::new()
                        };
                        Control::new(name, kind, values).with_options(vec![on_value])
                    }
                    _ => Control::new(name, kind, vec![value.unwrap_or_default().to_string()]),
                }
            }
            "button" => {
                let kind = match attr(&attrs, "type").map(str::to_ascii_lowercase).as_deref() {
                    Some("reset") | Some("button") => ControlKind::Other("button".to_string()),
                    _ => ControlKind::Submit,
                };
                Control::new(name, kind, vec![attr(&attrs, "value").unwrap_or_default().to_string()])
            }
            "textarea" => {
                let end = TEXTAREA_CLOSE_REGEX
                    .find(&body[after..])
                    .map(|m| after + m.start())
                    .unwrap_or(body.len());
                let text = decode_entities(&body[after..end]);
                // A single leading newline right after the tag is not content.
                let text = text
                    .strip_prefix("\r\n")
                    .or_else(|| text.strip_prefix('\n'))
                    .unwrap_or(&text)
                    .to_string();
                Control::new(name, ControlKind::Textarea, vec![text])
            }
            _ => {
                let end = SELECT_CLOSE_REGEX
                    .find(&body[after..])
                    .map(|m| after + m.start())
                    .unwrap_or(body.len());
                let multiple = has_attr(&attrs, "multiple");
                let mut options = Vec::new();
                let mut selected = Vec::new();
                for option in OPTION_REGEX.captures_iter(&body[after..end]) {
                    let option_attrs = parse_attributes(&option[1]);
                    let value = attr(&option_attrs, "value")
                        .map(String::from)
                        .unwrap_or_else(|| strip_tags(&option[2]));
                    if has_attr(&option_attrs, "selected") {
                        selected.push(value.clone());
                    }
                    options.push(value);
                }
                if !multiple {
                    selected.truncate(1);
                    if selected.is_empty() {
                        selected.extend(options.first().cloned());
                    }
                }
                Control::new(name, ControlKind::Select { multiple }, selected).with_options(options)
            }
        };

        controls.push(control.disabled(disabled));
    }

    controls
}

/// Extract all links, in document order.
pub fn parse_links(html: &str) -> Vec<Link> {
    LINK_REGEX
        .captures_iter(html)
        .filter_map(|caps| {
            let attrs = parse_attributes(&caps[1]);
            let href = attr(&attrs, "href")?.to_string();
            Some(Link {
                href,
                text: strip_tags(&caps[2]),
            })
        })
        .collect()
}

/// Extract all paragraphs with their class attribute.
pub fn parse_paragraphs(html: &str) -> Vec<Paragraph> {
    PARAGRAPH_REGEX
        .captures_iter(html)
        .map(|caps| {
            let attrs = parse_attributes(&caps[1]);
            Paragraph {
                class: attr(&attrs, "class").map(String::from),
                text: strip_tags(&caps[2]),
            }
        })
        .collect()
}

/// Bodies of all inline `<script>` elements.
pub fn parse_scripts(html: &str) -> Vec<String> {
    SCRIPT_REGEX
        .captures_iter(html)
        .map(|caps| caps[1].to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("Log&nbsp;out"), "Log\u{a0}out");
        assert_eq!(decode_entities("a &amp; b &#60; &#x3E;"), "a & b < >");
        assert_eq!(decode_entities("&unknown;"), "&unknown;");
    }

    #[test]
    fn test_strip_tags() {
        assert_eq!(strip_tags("<b>Hello</b>\n   <i>world</i>"), "Hello world");
    }

    #[test]
    fn test_parse_attributes_quoting() {
        let attrs = parse_attributes(r#"name="a" id='b' action=/x.cgi checked"#);
        assert_eq!(attr(&attrs, "name"), Some("a"));
        assert_eq!(attr(&attrs, "id"), Some("b"));
        assert_eq!(attr(&attrs, "action"), Some("/x.cgi"));
        assert!(has_attr(&attrs, "checked"));
    }

    #[test]
    fn test_parse_form_controls() {
        let html = r#"
            <form name="changeform" method="post" action="process_bug.cgi">
              <input type="hidden" name="id" value="42">
              <input name="status_whiteboard" value="openL3 foo">
              <input type="checkbox" name="addselfcc" checked>
              <select name="bug_status">
                <option value="NEW">NEW</option>
                <option value="ASSIGNED" selected>ASSIGNED</option>
              </select>
              <textarea name="comment">
hello &amp; bye</textarea>
              <input type="submit" name="commit" value="Commit">
            </form>"#;
        let forms = parse_forms(html);
        assert_eq!(forms.len(), 1);
        let form = &forms[0];
        assert_eq!(form.name.as_deref(), Some("changeform"));
        assert_eq!(form.method, "POST");
        assert_eq!(form.get("id"), Some("42"));
        assert_eq!(form.get("status_whiteboard"), Some("openL3 foo"));
        assert_eq!(form.get("addselfcc"), Some("on"));
        assert_eq!(form.get("bug_status"), Some("ASSIGNED"));
        assert_eq!(form.get("comment"), Some("hello & bye"));
    }

    #[test]
    fn test_unclosed_forms_are_split() {
        let html = r#"<form name="a"><input name="x" value="1"><form name="b"><input name="y">"#;
        let forms = parse_forms(html);
        assert_eq!(forms.len(), 2);
        assert!(forms[0].control("x").is_some());
        assert!(forms[0].control("y").is_none());
        assert!(forms[1].control("y").is_some());
    }

    #[test]
    fn test_select_defaults_to_first_option() {
        let controls = parse_controls(r#"<select name="s"><option>one<option>two</select>"#);
        assert_eq!(controls[0].values, vec!["one".to_string()]);
    }

    #[test]
    fn test_parse_links() {
        let links = parse_links(r#"<a href="index.cgi?logout=1&amp;x=y">Log&nbsp;out</a> <a name="top">x</a>"#);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].href, "index.cgi?logout=1&x=y");
        assert_eq!(links[0].text, "Log\u{a0}out");
    }

    #[test]
    fn test_parse_paragraphs_and_scripts() {
        let html = r#"<p class="error">Bad password</p><p>ok</p>
            <script type="text/javascript">
              top.location.href='/bugzilla/index.cgi';
            </script>"#;
        let paragraphs = parse_paragraphs(html);
        assert_eq!(paragraphs[0].class.as_deref(), Some("error"));
        assert_eq!(paragraphs[0].text, "Bad password");
        assert_eq!(paragraphs[1].class, None);
        let scripts = parse_scripts(html);
        assert_eq!(scripts.len(), 1);
        assert!(scripts[0].contains("top.location.href="));
    }
}

//! SOAP 1.1 RPC/encoded marshaling for the SWAMP Axis service.
//!
//! Only the small subset SWAMP uses is covered: strings, ints, Apache
//! `Map`s (`<item><key/><value/></item>`), arrays and nil. Responses may
//! use Axis `multiRef` indirection (`href="#id0"`), which is resolved while
//! decoding.

use std::fmt::Write as _;

use indexmap::IndexMap;
use quick_xml::escape::escape;
use serde::{Deserialize, Serialize};

use super::error::{SwampError, SwampResult};
use crate::xml::{self, Element};

/// Namespace of the SWAMP service operations.
pub const SWAMP_NAMESPACE: &str = "urn:swamp";

const ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
const ENCODING_NS: &str = "http://schemas.xmlsoap.org/soap/encoding/";

/// A value passed to or returned from a SOAP call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SoapValue {
    Null,
    Int(i64),
    Text(String),
    Map(IndexMap<String, SoapValue>),
    List(Vec<SoapValue>),
}

impl SoapValue {
    /// Textual form of scalar values; `None` for maps and lists.
    pub fn as_text(&self) -> Option<String> {
        match self {
            SoapValue::Null => Some(String::new()),
            SoapValue::Int(value) => Some(value.to_string()),
            SoapValue::Text(text) => Some(text.clone()),
            SoapValue::Map(_) | SoapValue::List(_) => None,
        }
    }

    /// Null or empty text, which Axis returns for empty maps
    pub fn is_empty(&self) -> bool {
        match self {
            SoapValue::Null => true,
            SoapValue::Text(text) => text.is_empty(),
            SoapValue::Map(map) => map.is_empty(),
            SoapValue::List(list) => list.is_empty(),
            SoapValue::Int(_) => false,
        }
    }

    fn write(&self, out: &mut String, tag: &str) {
        match self {
            SoapValue::Null => {
                let _ = write!(out, "<{} xsi:nil=\"true\"/>", tag);
            }
            SoapValue::Int(value) => {
                let _ = write!(out, "<{0} xsi:type=\"xsd:int\">{1}</{0}>", tag, value);
            }
            SoapValue::Text(text) => {
                let _ = write!(
                    out,
                    "<{0} xsi:type=\"xsd:string\">{1}</{0}>",
                    tag,
                    escape(text.as_str())
                );
            }
            SoapValue::Map(map) => {
                let _ = write!(out, "<{} xsi:type=\"apachesoap:Map\">", tag);
                for (key, value) in map {
                    out.push_str("<item>");
                    SoapValue::Text(key.clone()).write(out, "key");
                    value.write(out, "value");
                    out.push_str("</item>");
                }
                let _ = write!(out, "</{}>", tag);
            }
            SoapValue::List(items) => {
                let _ = write!(
                    out,
                    "<{} xsi:type=\"soapenc:Array\" soapenc:arrayType=\"xsd:anyType[{}]\">",
                    tag,
                    items.len()
                );
                for item in items {
                    item.write(out, "item");
                }
                let _ = write!(out, "</{}>", tag);
            }
        }
    }
}

impl From<&str> for SoapValue {
    fn from(value: &str) -> Self {
        SoapValue::Text(value.to_string())
    }
}

impl From<String> for SoapValue {
    fn from(value: String) -> Self {
        SoapValue::Text(value)
    }
}

impl From<u32> for SoapValue {
    fn from(value: u32) -> Self {
        SoapValue::Int(i64::from(value))
    }
}

/// Render an RPC request envelope; arguments become `in0..inN`.
pub fn build_envelope(method: &str, args: &[SoapValue]) -> String {
    let mut out = String::with_capacity(512);
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>");
    let _ = write!(
        out,
        "<soapenv:Envelope xmlns:soapenv=\"{}\" xmlns:soapenc=\"{}\" \
         xmlns:xsd=\"http://www.w3.org/2001/XMLSchema\" \
         xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" \
         xmlns:apachesoap=\"http://xml.apache.org/xml-soap\">",
        ENVELOPE_NS, ENCODING_NS
    );
    out.push_str("<soapenv:Body>");
    let _ = write!(
        out,
        "<ns1:{} soapenv:encodingStyle=\"{}\" xmlns:ns1=\"{}\">",
        method, ENCODING_NS, SWAMP_NAMESPACE
    );
    for (idx, arg) in args.iter().enumerate() {
        arg.write(&mut out, &format!("in{}", idx));
    }
    let _ = write!(out, "</ns1:{}>", method);
    out.push_str("</soapenv:Body></soapenv:Envelope>");
    out
}

/// Decode a response envelope into the returned value.
///
/// A `Fault` body becomes [`SwampError::Fault`]; an empty response element
/// (void operations) decodes to [`SoapValue::Null`].
pub fn parse_response(body: &str) -> SwampResult<SoapValue> {
    let envelope = xml::parse(body)?;
    if envelope.name != "Envelope" {
        return Err(SwampError::unexpected(format!(
            "root element is <{}>",
            envelope.name
        )));
    }

    let body = envelope
        .child("Body")
        .ok_or_else(|| SwampError::unexpected("missing SOAP body"))?;
    let response = body
        .children
        .first()
        .ok_or_else(|| SwampError::unexpected("empty SOAP body"))?;

    if response.name == "Fault" {
        return Err(SwampError::Fault {
            code: response.child_text("faultcode").unwrap_or_default().to_string(),
            message: response
                .child_text("faultstring")
                .unwrap_or_default()
                .to_string(),
        });
    }

    let decoder = Decoder { body };
    match response.children.first() {
        Some(value) => Ok(decoder.decode(value, 0)),
        None => Ok(SoapValue::Null),
    }
}

/// Looks up `multiRef` targets while decoding.
struct Decoder<'a> {
    body: &'a Element,
}

/// Guard against reference cycles in malformed responses.
const MAX_DEPTH: usize = 64;

impl Decoder<'_> {
    fn resolve<'b>(&'b self, element: &'b Element) -> &'b Element {
        element
            .attr("href")
            .and_then(|href| href.strip_prefix('#'))
            .and_then(|id| {
                self.body
                    .children
                    .iter()
                    .find(|candidate| candidate.attr("id") == Some(id))
            })
            .unwrap_or(element)
    }

    fn decode(&self, element: &Element, depth: usize) -> SoapValue {
        if depth > MAX_DEPTH {
            return SoapValue::Null;
        }
        let element = self.resolve(element);

        if element.attr("nil") == Some("true") {
            return SoapValue::Null;
        }

        let xsi_type = element
            .attr("type")
            .map(|t| t.rsplit(':').next().unwrap_or(t))
            .unwrap_or_default();

        match xsi_type {
            "Map" => return SoapValue::Map(self.decode_map(element, depth)),
            "Array" => {
                return SoapValue::List(
                    element
                        .children
                        .iter()
                        .map(|child| self.decode(child, depth + 1))
                        .collect(),
                )
            }
            "int" | "long" | "short" => {
                if let Ok(value) = element.text.trim().parse() {
                    return SoapValue::Int(value);
                }
            }
            _ => {}
        }

        if element.is_leaf() {
            return SoapValue::Text(element.text.clone());
        }

        let looks_like_map = element
            .children
            .iter()
            .all(|child| child.name == "item" && child.child("key").is_some());
        if looks_like_map {
            SoapValue::Map(self.decode_map(element, depth))
        } else {
            SoapValue::List(
                element
                    .children
                    .iter()
                    .map(|child| self.decode(child, depth + 1))
                    .collect(),
            )
        }
    }

    fn decode_map(&self, element: &Element, depth: usize) -> IndexMap<String, SoapValue> {
        element
            .children_named("item")
            .map(|item| {
                let item = self.resolve(item);
                let key = item
                    .child("key")
                    .map(|key| self.decode(key, depth + 1))
                    .and_then(|key| key.as_text())
                    .unwrap_or_default();
                let value = item
                    .child("value")
                    .map(|value| self.decode(value, depth + 1))
                    .unwrap_or(SoapValue::Null);
                (key, value)
            })
            .collect()
    }
}

/// Build an Apache `Map` from string pairs.
pub fn dict_to_map(dict: &IndexMap<String, String>) -> SoapValue {
    SoapValue::Map(
        dict.iter()
            .map(|(key, value)| (key.clone(), SoapValue::Text(value.clone())))
            .collect(),
    )
}

/// Flatten an Apache `Map` of scalars into string pairs.
pub fn map_to_dict(value: SoapValue) -> SwampResult<IndexMap<String, String>> {
    match value {
        SoapValue::Map(map) => map
            .into_iter()
            .map(|(key, value)| {
                value
                    .as_text()
                    .map(|text| (key.clone(), text))
                    .ok_or_else(|| {
                        SwampError::unexpected(format!("nested value for key '{}'", key))
                    })
            })
            .collect(),
        other if other.is_empty() => Ok(IndexMap::new()),
        other => Err(SwampError::unexpected(format!(
            "expected a map, got {:?}",
            other
        ))),
    }
}

/// Planned update list: workflow id to its attributes.
pub type PuList = IndexMap<String, IndexMap<String, String>>;

/// Convert a map of maps as returned by the planned update calls.
pub fn convert_pu_list(value: SoapValue) -> SwampResult<PuList> {
    match value {
        SoapValue::Map(map) => map
            .into_iter()
            .map(|(key, value)| Ok((key, map_to_dict(value)?)))
            .collect(),
        other if other.is_empty() => Ok(PuList::new()),
        other => Err(SwampError::unexpected(format!(
            "expected a planned update list, got {:?}",
            other
        ))),
    }
}

/// Strings from an array result.
pub fn string_list(value: SoapValue) -> SwampResult<Vec<String>> {
    match value {
        SoapValue::List(items) => items
            .into_iter()
            .map(|item| {
                item.as_text()
                    .ok_or_else(|| SwampError::unexpected("nested value in string list"))
            })
            .collect(),
        other if other.is_empty() => Ok(Vec::new()),
        other => Ok(other.as_text().into_iter().collect()),
    }
}

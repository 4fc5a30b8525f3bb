//! Support request information service.
//!
//! `GET <server>srstatus/<id>/` returns the status as plain text,
//! `GET <server>srinfo/<id>/` a flat XML record:
//!
//! ```xml
//! <sr>
//!   <id><![CDATA[1234567890]]></id>
//!   <status><![CDATA[Solution Provided]]></status>
//!   <created>2013-01-01 21:22:23</created>
//! </sr>
//! ```

use std::time::Duration;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::browser::ScraperError;
use crate::timestamp::parse_timestamp;
use crate::xml::{self, XmlError};

/// Default SR information server
pub const SRINFO_SERVER: &str = "http://kueue.hwlab.suse.de:8080/";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Body returned for unknown SR numbers
const NO_SR_NUMBER: &str = "No SR number";

/// Result type alias for SR lookups.
pub type SrInfoResult<T> = Result<T, SrInfoError>;

/// Error type for SR lookups.
#[derive(Error, Debug)]
pub enum SrInfoError {
    #[error(transparent)]
    Http(#[from] ScraperError),

    #[error("Failed to parse SR information: {0}")]
    Xml(#[from] XmlError),
}

/// A support request record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRequest {
    pub created: Option<DateTime<Utc>>,
    pub lastupdate: Option<DateTime<Utc>>,
    /// All other non-empty fields, in document order
    pub fields: IndexMap<String, String>,
}

impl ServiceRequest {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Parse the XML record
    pub fn parse(data: &str) -> SrInfoResult<Self> {
        let root = xml::parse(data)?;
        let mut record = ServiceRequest::default();

        for item in &root.children {
            if item.text.is_empty() {
                continue;
            }
            match item.name.as_str() {
                "created" => record.created = parse_timestamp(&item.text),
                "lastupdate" => record.lastupdate = parse_timestamp(&item.text),
                _ => {
                    record.fields.insert(item.name.clone(), item.text.clone());
                }
            }
        }

        Ok(record)
    }
}

/// Client for the SR information service.
#[derive(Debug)]
pub struct SrInfo {
    server: String,
    timeout: Duration,
    client: Client,
}

impl SrInfo {
    /// Client for the default server
    pub fn new() -> SrInfoResult<Self> {
        Self::with_server(SRINFO_SERVER, crate::USER_AGENT)
    }

    /// Client for `server` (with trailing slash) sending `user_agent`
    pub fn with_server(server: impl Into<String>, user_agent: &str) -> SrInfoResult<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .user_agent(user_agent)
            .build()
            .map_err(|e| ScraperError::ClientBuild(e.to_string()))?;
        Ok(Self {
            server: server.into(),
            timeout: DEFAULT_TIMEOUT,
            client,
        })
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    async fn req(&self, operation: &str, srid: u64) -> SrInfoResult<String> {
        let url = format!("{}{}/{}/", self.server, operation, srid);
        debug!("Fetching {}", url);
        let timeout_secs = self.timeout.as_secs();

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ScraperError::from_reqwest(e, &url, timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScraperError::Http {
                status: status.as_u16(),
                url,
            }
            .into());
        }

        Ok(response
            .text()
            .await
            .map_err(|e| ScraperError::from_reqwest(e, &url, timeout_secs))?)
    }

    /// SR status as reported by the server
    pub async fn get_status(&self, srid: u64) -> SrInfoResult<String> {
        self.req("srstatus", srid).await
    }

    /// SR details, `None` for unknown SR numbers
    pub async fn get_info(&self, srid: u64) -> SrInfoResult<Option<ServiceRequest>> {
        let data = self.req("srinfo", srid).await?;
        if data == NO_SR_NUMBER {
            return Ok(None);
        }
        ServiceRequest::parse(&data).map(Some)
    }
}

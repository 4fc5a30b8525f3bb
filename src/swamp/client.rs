//! SOAP client for the SWAMP service.
//!
//! Every authenticated operation takes the user name and password as its
//! last two positional arguments; [`Swamp::call_auth`] appends them.

use std::time::Duration;

use indexmap::IndexMap;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::debug;

use super::error::{SwampError, SwampResult};
use super::soap::{
    build_envelope, convert_pu_list, dict_to_map, map_to_dict, parse_response, string_list,
    PuList, SoapValue,
};
use crate::browser::ScraperError;

/// SWAMP SOAP endpoint
pub const SWAMP_URL: &str = "http://swamp.suse.de:8080/axis/services/swamp";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Builder for [`Swamp`].
#[derive(Debug, Clone)]
pub struct SwampBuilder {
    user: String,
    password: String,
    url: String,
    timeout: Duration,
    user_agent: Option<String>,
}

impl SwampBuilder {
    /// Set the endpoint URL
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent string
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Build the client
    pub fn build(self) -> SwampResult<Swamp> {
        let mut builder = Client::builder().timeout(self.timeout);
        if let Some(ref user_agent) = self.user_agent {
            builder = builder.user_agent(user_agent);
        }
        let client = builder
            .build()
            .map_err(|e| ScraperError::ClientBuild(e.to_string()))?;

        Ok(Swamp {
            user: self.user,
            password: self.password,
            url: self.url,
            timeout: self.timeout,
            client,
        })
    }
}

/// SWAMP SOAP client.
#[derive(Debug)]
pub struct Swamp {
    user: String,
    password: String,
    url: String,
    timeout: Duration,
    client: Client,
}

impl Swamp {
    /// Client for the default endpoint
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> SwampResult<Self> {
        Self::builder(user, password).build()
    }

    pub fn builder(user: impl Into<String>, password: impl Into<String>) -> SwampBuilder {
        SwampBuilder {
            user: user.into(),
            password: password.into(),
            url: SWAMP_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: None,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Invoke an operation with positional arguments.
    pub async fn call(&self, method: &str, args: Vec<SoapValue>) -> SwampResult<SoapValue> {
        debug!("SWAMP call {}", method);
        let envelope = build_envelope(method, &args);

        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "text/xml; charset=utf-8")
            .header("SOAPAction", "\"\"")
            .body(envelope)
            .send()
            .await
            .map_err(|e| ScraperError::from_reqwest(e, &self.url, self.timeout.as_secs()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ScraperError::from_reqwest(e, &self.url, self.timeout.as_secs()))?;

        // Axis reports faults with status 500, so the body is decoded first.
        match parse_response(&body) {
            Ok(value) if status.is_success() => Ok(value),
            Ok(_) => Err(SwampError::Http {
                status: status.as_u16(),
            }),
            Err(err @ SwampError::Fault { .. }) => Err(err),
            Err(_) if !status.is_success() => Err(SwampError::Http {
                status: status.as_u16(),
            }),
            Err(err) => Err(err),
        }
    }

    /// Invoke an operation with the credentials appended.
    pub async fn call_auth(&self, method: &str, mut args: Vec<SoapValue>) -> SwampResult<SoapValue> {
        args.push(SoapValue::Text(self.user.clone()));
        args.push(SoapValue::Text(self.password.clone()));
        self.call(method, args).await
    }

    fn text(value: SoapValue) -> SwampResult<String> {
        value
            .as_text()
            .ok_or_else(|| SwampError::unexpected("expected a scalar value"))
    }

    /// Online documentation of one method
    pub async fn get_method_doc(&self, name: &str) -> SwampResult<String> {
        Self::text(self.call("getMethodDoc", vec![name.into()]).await?)
    }

    /// Online documentation of all methods
    pub async fn get_all_docs(&self) -> SwampResult<IndexMap<String, String>> {
        map_to_dict(self.call("getAllDocs", Vec::new()).await?)
    }

    /// Verify the credentials; SWAMP has no session, so any authenticated
    /// call does.
    pub async fn login(&self) -> SwampResult<()> {
        self.do_get_property("SWAMP_VERSION").await.map(|_| ())
    }

    pub async fn do_get_property(&self, name: &str) -> SwampResult<String> {
        Self::text(self.call_auth("doGetProperty", vec![name.into()]).await?)
    }

    /// Workflow properties
    pub async fn get_workflow_info(&self, wfid: u32) -> SwampResult<IndexMap<String, String>> {
        map_to_dict(self.call_auth("getWorkflowInfo", vec![wfid.into()]).await?)
    }

    /// All data paths of a workflow
    pub async fn do_get_all_data_paths(&self, wfid: u32) -> SwampResult<Vec<String>> {
        string_list(self.call_auth("doGetAllDataPaths", vec![wfid.into()]).await?)
    }

    /// A single data bit
    pub async fn do_get_data(&self, wfid: u32, path: &str) -> SwampResult<String> {
        Self::text(
            self.call_auth("doGetData", vec![wfid.into(), path.into()])
                .await?,
        )
    }

    /// All data bits of a workflow
    pub async fn do_get_all_data(&self, wfid: u32) -> SwampResult<IndexMap<String, String>> {
        let data = self.call_auth("doGetAllData", vec![wfid.into()]).await?;
        if data.is_empty() {
            return Ok(IndexMap::new());
        }
        map_to_dict(data)
    }

    /// Get a data bit, preferring the complete data set.
    ///
    /// Fetching everything costs the same as fetching a single bit, so the
    /// single bit call is only used when the path is missing from it.
    pub async fn get_data_bit(&self, wfid: u32, path: &str) -> SwampResult<String> {
        let mut all = self.do_get_all_data(wfid).await?;
        match all.swap_remove(path) {
            Some(value) => Ok(value),
            None => self.do_get_data(wfid, path).await,
        }
    }

    /// Set a data bit
    pub async fn do_send_data(&self, wfid: u32, path: &str, value: &str) -> SwampResult<()> {
        self.call_auth("doSendData", vec![wfid.into(), path.into(), value.into()])
            .await
            .map(|_| ())
    }

    /// Send an event to a workflow
    pub async fn do_send_event(&self, wfid: u32, event: &str) -> SwampResult<()> {
        self.call_auth("doSendEvent", vec![wfid.into(), event.into()])
            .await
            .map(|_| ())
    }

    /// Active items of the planned update list
    pub async fn do_get_planned_update_list(&self) -> SwampResult<PuList> {
        convert_pu_list(self.call_auth("doGetPlannedUpdateList", Vec::new()).await?)
    }

    /// A single planned update item
    pub async fn do_get_planned_update_item(
        &self,
        wfid: u32,
    ) -> SwampResult<IndexMap<String, String>> {
        map_to_dict(
            self.call_auth("doGetPlannedUpdateItem", vec![wfid.into()])
                .await?,
        )
    }

    /// Planned update items matching all criteria
    pub async fn do_search_planned_update_list(
        &self,
        criteria: &IndexMap<String, String>,
    ) -> SwampResult<PuList> {
        convert_pu_list(
            self.call_auth("doSearchPlannedUpdateList", vec![dict_to_map(criteria)])
                .await?,
        )
    }

    /// Add an item to the planned update list
    pub async fn do_add_pu_list_item(
        &self,
        data: &IndexMap<String, String>,
    ) -> SwampResult<SoapValue> {
        self.call_auth("doAddPUListItem", vec![dict_to_map(data)])
            .await
    }

    /// Deactivate a planned update item
    pub async fn do_remove_pu_list_item(&self, wfid: u32) -> SwampResult<()> {
        self.call_auth("doRemovePUListItem", vec![wfid.into()])
            .await
            .map(|_| ())
    }

    /// Modify packages, bug ids or L3 ids of a planned update item
    pub async fn do_modify_pu_list_item(
        &self,
        wfid: u32,
        data: &IndexMap<String, String>,
    ) -> SwampResult<SoapValue> {
        let mut data = data.clone();
        data.insert("id".to_string(), wfid.to_string());
        self.call_auth("doModifyPUListItem", vec![dict_to_map(&data)])
            .await
    }

    /// Ids of workflows matching the filter
    pub async fn get_workflow_id_list(
        &self,
        filter: &IndexMap<String, String>,
    ) -> SwampResult<Vec<String>> {
        string_list(
            self.call_auth("getWorkflowIdList", vec![dict_to_map(filter)])
                .await?,
        )
    }
}

//! SWAMP web interface.
//!
//! Creating maintenance workflows is only possible through the HTML front
//! end, which is driven here with the [`WebScraper`].

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::info;

use super::error::{SwampError, SwampResult};
use crate::browser::{FormSelector, WebScraper};

/// Web SWAMP base URL
pub const WEB_SWAMP_URL: &str = "https://swamp.suse.de/webswamp/swamp";

pub const FIELD_ADDITIONAL_BUGZILLA: &str = "laufzettelset.bugzilla.additional_ids";
pub const FIELD_PACKAGES: &str = "laufzettelset.packages";
pub const FIELD_DATE: &str = "laufzettelset.duedate_release";
pub const FIELD_MAINTAINER: &str = "laufzettelset.roles.maintainer";

const CREATE_ACTION: &str =
    "eventSubmit_doStartBugzillaIssue/true/action/workflows.MaintenanceTracker.MaintenanceActions";

static SWAMP_NEW_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"New Maintenance Issue started, ID: MaintenanceTracker-([0-9]+)")
        .expect("Invalid workflow id regex")
});

fn field(name: &str) -> String {
    format!("field_{}", name)
}

/// Scraper for the SWAMP web interface.
#[derive(Debug)]
pub struct WebSwamp {
    scraper: WebScraper,
}

impl WebSwamp {
    /// Client for the default instance
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> SwampResult<Self> {
        Self::with_base(user, password, WEB_SWAMP_URL)
    }

    pub fn with_base(
        user: impl Into<String>,
        password: impl Into<String>,
        base: impl Into<String>,
    ) -> SwampResult<Self> {
        Ok(Self {
            scraper: WebScraper::new(user, password, base)?,
        })
    }

    pub fn scraper(&self) -> &WebScraper {
        &self.scraper
    }

    /// Log in through the login form
    pub async fn login(&mut self) -> SwampResult<()> {
        self.scraper.get("").await?;

        let mut form = self.scraper.select_form(FormSelector::Name("loginform"))?;
        let user = self.scraper.user().to_string();
        let password = self.scraper.password().to_string();
        form.set("username", user)?;
        form.set("password", password)?;

        let page = self.scraper.submit(&form).await?;
        if !page.body.contains("Logout") {
            return Err(SwampError::web("Failed to login!"));
        }
        Ok(())
    }

    /// Start a maintenance workflow for `main_bug` and return its id.
    pub async fn create(
        &mut self,
        main_bug: u32,
        extra_bugs: &[u32],
        packages: &[String],
        maintainer: Option<&str>,
    ) -> SwampResult<u32> {
        info!("Creating maintenance workflow for bug {}", main_bug);
        let page = self
            .scraper
            .post(CREATE_ACTION, &[("bugid", main_bug.to_string())])
            .await?;

        if !page.body.contains("Success") {
            return Err(SwampError::web("Failed to create workflow!"));
        }

        let ids: Vec<&str> = SWAMP_NEW_REGEX
            .captures_iter(&page.body)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
            .collect();
        let wfid = match ids.as_slice() {
            [id] => id
                .parse::<u32>()
                .map_err(|_| SwampError::web("Failed to parse workflow ID!"))?,
            _ => return Err(SwampError::web("Failed to parse workflow ID!")),
        };

        let mut form = self.scraper.select_form(FormSelector::Name("dataedit"))?;
        let extra = extra_bugs
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(",");
        form.set(&field(FIELD_ADDITIONAL_BUGZILLA), extra)?;
        form.set(&field(FIELD_PACKAGES), packages.join(","))?;
        if let Some(maintainer) = maintainer {
            form.set(&field(FIELD_MAINTAINER), maintainer)?;
        }
        self.scraper.submit(&form).await?;

        Ok(wfid)
    }

    /// Change workflow attributes
    pub async fn edit(&mut self, wfid: u32, release_date: Option<NaiveDate>) -> SwampResult<()> {
        self.scraper
            .get(&format!(
                "template/DisplayWorkflow.vm/workflowid/{}/dataedit/true",
                wfid
            ))
            .await?;

        let mut form = self.scraper.select_form(FormSelector::Name("dataedit"))?;
        if let Some(date) = release_date {
            form.set(&field(FIELD_DATE), date.format("%Y-%m-%d").to_string())?;
        }
        self.scraper.submit(&form).await?;
        Ok(())
    }
}

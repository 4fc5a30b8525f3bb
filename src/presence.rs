//! Absence lookups in the presence service.
//!
//! The service listens on TCP port 9874. A client connects, optionally sends
//! the login name followed by a newline and reads a plain text report until
//! the server closes the connection. Each person's record looks like:
//!
//! ```text
//! ------------------------------------------------------------
//! Name       : Jane Doe
//! Login      : jdoe
//! Absence    : Fri 2013-10-25 - Mon 2013-10-28
//!              Fri 2013-11-11
//! ------------------------------------------------------------
//! ```

use std::time::Duration;

use chrono::{Datelike, NaiveDate, Weekday};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{error, warn};

use crate::cache::TtlCache;

/// Port of the presence service
pub const PRESENCE_PORT: u16 = 9874;

/// Timeout for connecting and reading
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

const DATE_PATTERN: &str = r"\w{3} (\d{4})-(\d{2})-(\d{2})";

static DATE_RANGE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"\s{0} - {0}\s*$", DATE_PATTERN)).expect("Invalid date range regex")
});

static DATE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"\s{}\s*$", DATE_PATTERN)).expect("Invalid date regex"));

static ABSENCE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(Absent|Vacation|Absence)\s*:\s").expect("Invalid absence regex")
});

static SEPARATOR_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-+\s*$").expect("Invalid separator regex"));

/// Result type alias for presence queries.
pub type PresenceResult<T> = Result<T, PresenceError>;

/// Failure talking to one presence host.
#[derive(Error, Debug)]
#[error("Presence error on {host}: {message}")]
pub struct PresenceError {
    pub host: String,
    pub message: String,
}

impl PresenceError {
    fn new(host: &str, message: impl ToString) -> Self {
        Self {
            host: host.to_string(),
            message: message.to_string(),
        }
    }
}

/// A period of absence, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Absence {
    pub from: NaiveDate,
    pub till: NaiveDate,
}

impl Absence {
    pub fn contains(&self, when: NaiveDate) -> bool {
        self.from <= when && when <= self.till
    }

    /// Days between the first and the last day
    pub fn length_days(&self) -> i64 {
        (self.till - self.from).num_days()
    }
}

/// A presence server to query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceHost {
    pub host: String,
    pub port: u16,
    /// Do not send the login name, the server reports everyone
    pub no_send: bool,
}

impl PresenceHost {
    pub fn new(host: impl Into<String>, no_send: bool) -> Self {
        Self {
            host: host.into(),
            port: PRESENCE_PORT,
            no_send,
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

/// Move `when` off a weekend, stepping `step` days at a time (1 forward,
/// -1 backward).
pub fn trim_weekends(mut when: NaiveDate, step: i64) -> NaiveDate {
    while matches!(when.weekday(), Weekday::Sat | Weekday::Sun) {
        match when.checked_add_signed(chrono::Duration::days(step)) {
            Some(next) => when = next,
            None => break,
        }
    }
    when
}

fn captured_date(caps: &regex::Captures<'_>, first: usize) -> Option<NaiveDate> {
    let year = caps.get(first)?.as_str().parse().ok()?;
    let month = caps.get(first + 1)?.as_str().parse().ok()?;
    let day = caps.get(first + 2)?.as_str().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Extract absences of `who` from a presence report.
pub fn parse_presence(data: &str, who: &str) -> Vec<Absence> {
    #[derive(PartialEq)]
    enum State {
        Outside,
        Record,
        Absences,
    }

    let login = match Regex::new(&format!(r"^Login\s*:\s*({})\s*$", regex::escape(who))) {
        Ok(login) => login,
        Err(_) => return Vec::new(),
    };

    let mut absences = Vec::new();
    let mut state = State::Outside;

    for line in data.lines() {
        let line = line.trim_end();

        if login.is_match(line) {
            state = State::Record;
        }
        if SEPARATOR_REGEX.is_match(line) {
            state = State::Outside;
        }
        if state == State::Record && ABSENCE_REGEX.is_match(line) {
            state = State::Absences;
        }
        if state != State::Absences {
            continue;
        }

        let range = if let Some(caps) = DATE_RANGE_REGEX.captures(line) {
            captured_date(&caps, 1).zip(captured_date(&caps, 4))
        } else if let Some(caps) = DATE_REGEX.captures(line) {
            captured_date(&caps, 1).map(|date| (date, date))
        } else {
            None
        };

        match range {
            Some((from, till)) => absences.push(Absence {
                from: trim_weekends(from, 1),
                till: trim_weekends(till, -1),
            }),
            None => error!("unparsable absence data for {}: {}", who, line),
        }
    }

    absences
}

/// Presence client with per-person caching.
#[derive(Debug)]
pub struct Presence {
    hosts: Vec<PresenceHost>,
    timeout: Duration,
    cache: TtlCache<Vec<Absence>>,
}

impl Default for Presence {
    fn default() -> Self {
        Self::new()
    }
}

impl Presence {
    /// Client for the company presence servers
    pub fn new() -> Self {
        Self::with_hosts(vec![
            PresenceHost::new("present.suse.de", false),
            PresenceHost::new("bolzano.suse.de", true),
        ])
    }

    pub fn with_hosts(hosts: Vec<PresenceHost>) -> Self {
        Self {
            hosts,
            timeout: DEFAULT_TIMEOUT,
            cache: TtlCache::new("presence-"),
        }
    }

    /// Set the connect and read timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn hosts(&self) -> &[PresenceHost] {
        &self.hosts
    }

    pub fn cache(&self) -> &TtlCache<Vec<Absence>> {
        &self.cache
    }

    /// Query a single host.
    pub async fn query_host(&self, host: &PresenceHost, who: &str) -> PresenceResult<Vec<Absence>> {
        // The login is sent as a single protocol line
        if !host.no_send && who.chars().any(char::is_control) {
            return Err(PresenceError::new(
                &host.host,
                format!("invalid login name {:?}", who),
            ));
        }

        let address = (host.host.as_str(), host.port);
        let mut stream = timeout(self.timeout, TcpStream::connect(address))
            .await
            .map_err(|_| PresenceError::new(&host.host, "timed out"))?
            .map_err(|e| PresenceError::new(&host.host, e))?;

        if !host.no_send {
            stream
                .write_all(format!("{}\n", who).as_bytes())
                .await
                .map_err(|e| PresenceError::new(&host.host, e))?;
        }

        let mut raw = Vec::new();
        timeout(self.timeout, stream.read_to_end(&mut raw))
            .await
            .map_err(|_| PresenceError::new(&host.host, "timed out"))?
            .map_err(|e| PresenceError::new(&host.host, e))?;
        let _ = stream.shutdown().await;

        let data = String::from_utf8(raw)
            .map_err(|e| PresenceError::new(&host.host, e))?;
        Ok(parse_presence(&data, who))
    }

    /// All absences of a person.
    ///
    /// Served from the cache while fresh. When a host fails, the last known
    /// (possibly stale) data is returned, or whatever the hosts queried so
    /// far reported.
    pub async fn get_presence_data(&self, person: &str) -> Vec<Absence> {
        if let Some(absences) = self.cache.get(person) {
            return absences;
        }

        let mut absences = Vec::new();
        for host in &self.hosts {
            match self.query_host(host, person).await {
                Ok(found) => absences.extend(found),
                Err(err) => {
                    warn!("could not get presence data: {}", err);
                    return self.cache.get_stale(person).unwrap_or(absences);
                }
            }
        }

        self.cache.set(person, absences.clone());
        absences
    }

    /// The absence covering `when`, ignoring absences shorter than
    /// `threshold_days`.
    pub async fn is_absent(
        &self,
        person: &str,
        when: NaiveDate,
        threshold_days: i64,
    ) -> Option<Absence> {
        self.get_presence_data(person)
            .await
            .into_iter()
            .find(|absence| absence.contains(when) && absence.length_days() >= threshold_days)
    }
}

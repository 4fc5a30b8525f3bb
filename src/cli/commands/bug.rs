//! Bug tracking commands: `bug`, `sr-status` and `sr-info`.

use super::CommandContext;
use anyhow::{Context, Result};
use clap::Parser;
use std::time::Duration;
use suseapi::bugzilla::{Bug, Bugzilla};
use suseapi::srinfo::{ServiceRequest, SrInfo, SRINFO_SERVER};

/// Arguments for the bug command
#[derive(Parser, Debug, Clone)]
pub struct BugArgs {
    /// Bug numbers
    #[arg(required = true)]
    pub ids: Vec<u32>,

    /// Use HTTP authentication against the API instance
    #[arg(long)]
    pub api: bool,

    /// Also list support requests referenced by the bugs
    #[arg(long)]
    pub sr: bool,
}

/// Arguments for the sr-status command
#[derive(Parser, Debug, Clone)]
pub struct SrStatusArgs {
    /// Support request number
    pub id: u64,
}

/// Arguments for the sr-info command
#[derive(Parser, Debug, Clone)]
pub struct SrInfoArgs {
    /// Support request number
    pub id: u64,
}

fn bugzilla(ctx: &CommandContext, api: bool) -> Result<Bugzilla> {
    let settings = &ctx.config.bugzilla;
    let mut builder = if api {
        Bugzilla::api(&settings.user, &settings.password)
    } else {
        Bugzilla::builder(&settings.user, &settings.password)
    };
    if let Some(base) = &settings.base {
        builder = builder.base(base);
    }
    if let Some(timeout) = settings.timeout {
        builder = builder.timeout(Duration::from_secs(timeout));
    }
    builder
        .user_agent(ctx.user_agent())
        .build()
        .context("Failed to create Bugzilla client")
}

fn bug_lines(bugs: &[Bug]) -> Vec<String> {
    bugs.iter()
        .map(|bug| {
            format!(
                "{} [{}] {}",
                bug.bug_id,
                bug.field("bug_status").unwrap_or("?"),
                bug.field("short_desc").unwrap_or_default()
            )
        })
        .collect()
}

impl BugArgs {
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let mut client = bugzilla(ctx, self.api)?;
        ctx.output.debug(&format!("Using {}", client.base()));

        let bugs = client.get_bugs(&self.ids, true, true).await?;
        ctx.output.emit(&bugs, |bugs| bug_lines(bugs))?;

        if self.sr {
            for id in &self.ids {
                let srs = client.get_sr(*id).await?;
                ctx.output.emit(&srs, |srs| {
                    srs.iter().map(|sr| format!("{}: SR {}", id, sr)).collect()
                })?;
            }
        }

        Ok(if bugs.len() == self.ids.len() { 0 } else { 1 })
    }
}

fn srinfo(ctx: &CommandContext) -> Result<SrInfo> {
    let server = ctx
        .config
        .srinfo
        .server
        .clone()
        .unwrap_or_else(|| SRINFO_SERVER.to_string());
    SrInfo::with_server(server, &ctx.user_agent()).context("Failed to create SR info client")
}

fn record_lines(record: &ServiceRequest) -> Vec<String> {
    let mut lines: Vec<String> = record
        .fields
        .iter()
        .map(|(key, value)| format!("{}: {}", key, value))
        .collect();
    if let Some(created) = record.created {
        lines.push(format!("created: {}", created));
    }
    if let Some(updated) = record.lastupdate {
        lines.push(format!("lastupdate: {}", updated));
    }
    lines
}

impl SrStatusArgs {
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let status = srinfo(ctx)?.get_status(self.id).await?;
        ctx.output.emit(&status, |status| vec![status.clone()])?;
        Ok(0)
    }
}

impl SrInfoArgs {
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        match srinfo(ctx)?.get_info(self.id).await? {
            Some(record) => {
                ctx.output.emit(&record, record_lines)?;
                Ok(0)
            }
            None => {
                ctx.output.error(&format!("No such SR: {}", self.id));
                Ok(1)
            }
        }
    }
}

//! Directory commands: `lookup-user`, `department` and `absence`.

use super::CommandContext;
use anyhow::Result;
use chrono::NaiveDate;
use clap::Parser;
use suseapi::presence::{Absence, Presence};
use suseapi::userinfo::{Directory, DirectoryEntry, UserInfo};
#[cfg(not(feature = "ldap"))]
use suseapi::userinfo::{UserInfoError, UserInfoResult};

/// Search type that tries mail, uid and common name in turn
pub const SMART_UID: &str = "smart-uid";

/// Arguments for the lookup-user command
#[derive(Parser, Debug, Clone)]
pub struct LookupUserArgs {
    /// Attribute to search by
    #[arg(long, default_value = SMART_UID)]
    pub by: String,

    /// Value to search for
    pub value: String,
}

/// Arguments for the department command
#[derive(Parser, Debug, Clone)]
pub struct DepartmentArgs {
    /// Login name or company mail address
    pub user: String,
}

/// Arguments for the absence command
#[derive(Parser, Debug, Clone)]
pub struct AbsenceArgs {
    /// Login name
    pub user: String,

    /// Only report the absence covering this date (YYYY-MM-DD)
    #[arg(long)]
    pub on: Option<NaiveDate>,

    /// Ignore absences shorter than this many days
    #[arg(long, default_value = "0")]
    pub threshold: i64,
}

#[cfg(feature = "ldap")]
type CliDirectory = suseapi::userinfo::LdapDirectory;

#[cfg(not(feature = "ldap"))]
type CliDirectory = Unavailable;

/// Stand-in directory for builds without the `ldap` feature.
#[cfg(not(feature = "ldap"))]
#[derive(Debug)]
pub struct Unavailable {
    server: String,
}

#[cfg(not(feature = "ldap"))]
#[async_trait::async_trait]
impl Directory for Unavailable {
    async fn search(
        &self,
        _base: &str,
        _filter: &str,
        _attrs: &[&str],
    ) -> UserInfoResult<Vec<DirectoryEntry>> {
        Err(UserInfoError::Connection {
            server: self.server.clone(),
            message: "LDAP support is not built in, rebuild with the `ldap` feature".to_string(),
        })
    }
}

fn user_info(ctx: &CommandContext) -> UserInfo<CliDirectory> {
    #[cfg(feature = "ldap")]
    let directory = suseapi::userinfo::LdapDirectory::new(ctx.config.ldap.server.clone());
    #[cfg(not(feature = "ldap"))]
    let directory = Unavailable {
        server: ctx.config.ldap.server.clone(),
    };
    UserInfo::new(directory, ctx.config.ldap.base.clone())
}

fn entry_lines(entries: &[DirectoryEntry]) -> Vec<String> {
    let mut lines = Vec::new();
    for entry in entries {
        lines.push(format!("dn: {}", entry.dn));
        for (attr, values) in &entry.attrs {
            for value in values {
                lines.push(format!("{}: {}", attr, value));
            }
        }
        lines.push(String::new());
    }
    lines
}

async fn lookup<D: Directory>(
    info: &UserInfo<D>,
    args: &LookupUserArgs,
) -> Result<Vec<DirectoryEntry>> {
    // Empty attribute list asks the server for everything
    let all: &[&str] = &[];
    let entries = if args.by == SMART_UID {
        info.search_uid(&args.value, Some(all)).await?
    } else {
        info.search_by(&args.by, &args.value, Some(all)).await?
    };
    Ok(entries)
}

impl LookupUserArgs {
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let info = user_info(ctx);
        ctx.output
            .debug(&format!("Searching {} by {}", info.base(), self.by));

        let entries = lookup(&info, self).await?;
        ctx.output.emit(&entries, |entries| entry_lines(entries))?;
        Ok(if entries.is_empty() { 1 } else { 0 })
    }
}

impl DepartmentArgs {
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let info = user_info(ctx);
        let department = info.get_department(&self.user).await?;
        ctx.output
            .emit(&department, |department| vec![department.clone()])?;
        Ok(0)
    }
}

fn absence_lines(absences: &[Absence]) -> Vec<String> {
    absences
        .iter()
        .map(|absence| format!("{} - {}", absence.from, absence.till))
        .collect()
}

impl AbsenceArgs {
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let presence = Presence::new();

        let absences: Vec<Absence> = match self.on {
            Some(when) => presence
                .is_absent(&self.user, when, self.threshold)
                .await
                .into_iter()
                .collect(),
            None => presence.get_presence_data(&self.user).await,
        };

        ctx.output.emit(&absences, |absences| absence_lines(absences))?;
        Ok(0)
    }
}

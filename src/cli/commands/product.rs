//! Product data commands: `maintained` and `codestream`.

use super::CommandContext;
use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use suseapi::maintained::MaintainedData;
use suseapi::products::{codestream_base, codestream_name};

/// Arguments for the maintained command
#[derive(Parser, Debug, Clone)]
pub struct MaintainedArgs {
    /// Maintained data file
    pub file: PathBuf,

    /// Print the package list as well
    #[arg(long)]
    pub packages: bool,
}

/// Arguments for the codestream command
#[derive(Parser, Debug, Clone)]
pub struct CodestreamArgs {
    /// Product or codestream names
    #[arg(required = true)]
    pub names: Vec<String>,
}

#[derive(Debug, Serialize)]
struct MaintainedReport<'a> {
    maintained: bool,
    #[serde(flatten)]
    data: &'a MaintainedData,
}

impl MaintainedArgs {
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let data = MaintainedData::load(&self.file)
            .with_context(|| format!("Failed to load {}", self.file.display()))?;

        let report = MaintainedReport {
            maintained: data.is_maintained(),
            data: &data,
        };
        ctx.output.emit(&report, |report| {
            let mut lines: Vec<String> = report
                .data
                .data
                .iter()
                .map(|(key, value)| format!("{}: {}", key, value))
                .collect();
            lines.push(format!("Maintained: {}", report.maintained));
            if self.packages {
                lines.extend(report.data.packages.iter().cloned());
            }
            lines
        })?;

        Ok(0)
    }
}

#[derive(Debug, Serialize)]
struct Codestream {
    name: String,
    base: String,
}

impl CodestreamArgs {
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let streams: Vec<Codestream> = self
            .names
            .iter()
            .map(|name| {
                let name = codestream_name(name);
                let base = codestream_base(&name).to_string();
                Codestream { name, base }
            })
            .collect();

        ctx.output.emit(&streams, |streams| {
            streams
                .iter()
                .map(|stream| format!("{} ({})", stream.name, stream.base))
                .collect()
        })?;
        Ok(0)
    }
}

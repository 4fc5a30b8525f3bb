//! CLI module for suseapi
//!
//! This module provides the command-line interface for suseapi,
//! including argument parsing and subcommand handling.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// suseapi - Query SUSE internal services
#[derive(Parser, Debug, Clone)]
#[command(name = "suseapi")]
#[command(author = "suseapi Contributors")]
#[command(version)]
#[command(about = "Query SUSE internal services", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Output format
    #[arg(long, global = true, default_value = "human")]
    pub output: OutputFormat,

    /// Path to configuration file
    #[arg(short = 'c', long, global = true, env = "SUSEAPI_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Output format for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text
    #[default]
    Human,
    /// JSON output for scripting
    Json,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Look up a user in the LDAP directory
    #[command(name = "lookup-user")]
    LookupUser(commands::user::LookupUserArgs),

    /// Show the department of a user
    Department(commands::user::DepartmentArgs),

    /// List absences of a user
    Absence(commands::user::AbsenceArgs),

    /// Show bugs from Bugzilla
    Bug(commands::bug::BugArgs),

    /// Show the status of a support request
    #[command(name = "sr-status")]
    SrStatus(commands::bug::SrStatusArgs),

    /// Show details of a support request
    #[command(name = "sr-info")]
    SrInfo(commands::bug::SrInfoArgs),

    /// Parse a maintained data file
    Maintained(commands::product::MaintainedArgs),

    /// Normalize codestream names
    Codestream(commands::product::CodestreamArgs),
}

impl Commands {
    /// Whether the command cannot run without a configuration file
    pub fn needs_config(&self) -> bool {
        matches!(
            self,
            Commands::LookupUser(_) | Commands::Department(_) | Commands::Bug(_)
        )
    }
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Get the effective verbosity level (0-3)
    pub fn verbosity(&self) -> u8 {
        self.verbose.min(3)
    }

    /// Check if JSON output is requested
    pub fn is_json(&self) -> bool {
        matches!(self.output, OutputFormat::Json)
    }
}

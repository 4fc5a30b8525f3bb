//! Subcommands module for the suseapi CLI
//!
//! This module contains all the subcommand implementations.

pub mod bug;
pub mod product;
pub mod user;

use crate::cli::output::OutputFormatter;
use suseapi::config::Config;

/// Common context shared between commands
pub struct CommandContext {
    /// Configuration
    pub config: Config,
    /// Output formatter
    pub output: OutputFormatter,
}

impl CommandContext {
    /// Create a new command context from CLI arguments
    pub fn new(cli: &crate::cli::Cli, config: Config) -> Self {
        Self {
            config,
            output: OutputFormatter::new(cli.is_json(), cli.verbosity()),
        }
    }

    /// User agent for HTTP clients
    pub fn user_agent(&self) -> String {
        self.config
            .user_agent
            .clone()
            .unwrap_or_else(|| suseapi::USER_AGENT.to_string())
    }
}

//! Output handling for the suseapi CLI
//!
//! Results are printed either as plain text lines or as pretty JSON.

use anyhow::Result;
use serde::Serialize;
use std::io::{self, Write};

/// Output writer shared by all commands
#[derive(Debug, Clone)]
pub struct OutputFormatter {
    json_mode: bool,
    verbosity: u8,
}

impl OutputFormatter {
    pub fn new(json_mode: bool, verbosity: u8) -> Self {
        Self {
            json_mode,
            verbosity,
        }
    }

    /// Print `value` as JSON, or the lines produced by `human` otherwise
    pub fn emit<T, F>(&self, value: &T, human: F) -> Result<()>
    where
        T: Serialize + ?Sized,
        F: FnOnce(&T) -> Vec<String>,
    {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        if self.json_mode {
            serde_json::to_writer_pretty(&mut out, value)?;
            writeln!(out)?;
        } else {
            for line in human(value) {
                writeln!(out, "{}", line)?;
            }
        }
        out.flush()?;
        Ok(())
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        eprintln!("Error: {}", message);
    }

    /// Print a debug message (only with -vv)
    pub fn debug(&self, message: &str) {
        if self.verbosity >= 2 && !self.json_mode {
            eprintln!("{}", message);
        }
    }
}

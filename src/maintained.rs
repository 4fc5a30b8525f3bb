//! Parser for product "maintained data" files.
//!
//! The file is a block of `Key: value` lines followed by a
//! `Packages on CD:` marker and one package name per line.

use std::io::BufRead;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const PACKAGES_MARKER: &str = "Packages on CD:";

/// Result type alias for maintained data parsing.
pub type MaintainedResult<T> = Result<T, MaintainedError>;

#[derive(Error, Debug)]
pub enum MaintainedError {
    /// A header line that is neither `key: value` nor `key:`.
    #[error("Invalid line {line}: {content}")]
    Parse { line: usize, content: String },

    #[error("Failed to read maintained data: {0}")]
    Io(#[from] std::io::Error),
}

/// Parsed maintained data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintainedData {
    pub data: IndexMap<String, String>,
    pub packages: Vec<String>,
}

impl MaintainedData {
    /// Parse from a string
    pub fn parse(content: &str) -> MaintainedResult<Self> {
        Self::from_reader(content.as_bytes())
    }

    /// Parse a file
    pub fn load(path: impl AsRef<Path>) -> MaintainedResult<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    /// Parse line by line from a reader
    pub fn from_reader(reader: impl BufRead) -> MaintainedResult<Self> {
        let mut result = MaintainedData::default();
        let mut package_list = false;

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if package_list {
                result.packages.push(line.to_string());
            } else if line == PACKAGES_MARKER {
                package_list = true;
            } else if let Some(key) = line.strip_suffix(':') {
                result.data.insert(key.to_string(), String::new());
            } else {
                let (key, value) = line.split_once(": ").ok_or_else(|| MaintainedError::Parse {
                    line: idx + 1,
                    content: line.to_string(),
                })?;
                result.data.insert(key.to_string(), value.to_string());
            }
        }

        Ok(result)
    }

    /// Value of a header field, empty when missing
    pub fn get(&self, key: &str) -> &str {
        self.data.get(key).map(String::as_str).unwrap_or_default()
    }

    /// Whether the product receives maintenance updates
    pub fn is_maintained(&self) -> bool {
        let distribution = self.get("Distribution");
        let distribution_string = self.get("Distributionstring");

        self.get("ProductType") == "maintained"
            && distribution_string != "res"
            && !distribution_string.starts_with("RES")
            && !distribution.contains("-beta-")
            && !distribution.contains("sle11-hwrefresh10a")
            && !distribution.contains("sle11-pl11b")
            && !distribution_string.contains("openSUSE")
    }
}

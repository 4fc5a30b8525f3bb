//! Configuration module for suseapi
//!
//! Settings come from an Xdefaults-like file named `suseapi` found in the
//! XDG configuration directories (or given explicitly), followed by
//! environment variable overrides:
//!
//! ```text
//! ! comments start with an exclamation mark
//! ldap.server: ldap://pan.suse.de
//! ldap.base: o=Novell
//! bugzilla.user: jdoe
//! ```

use anyhow::{bail, Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the configuration file inside the XDG directories
pub const CONFIG_NAME: &str = "suseapi";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ldap: LdapConfig,
    pub bugzilla: BugzillaConfig,
    pub srinfo: SrInfoConfig,
    pub swamp: SwampConfig,

    /// User agent sent by HTTP clients
    pub user_agent: Option<String>,

    /// Every key found in the file, including unknown ones
    pub raw: IndexMap<String, String>,
}

/// Directory server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LdapConfig {
    pub server: String,
    pub base: String,
}

impl Default for LdapConfig {
    fn default() -> Self {
        Self {
            server: "ldap://pan.suse.de".to_string(),
            base: "o=Novell".to_string(),
        }
    }
}

/// Bugzilla credentials and endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BugzillaConfig {
    pub user: String,
    pub password: String,
    pub base: Option<String>,
    /// Request timeout in seconds
    pub timeout: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SrInfoConfig {
    pub server: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SwampConfig {
    pub url: Option<String>,
    pub user: String,
    pub password: String,
}

/// Parse Xdefaults-like `key: value` lines.
///
/// Blank lines and lines starting with `!` or `#` are skipped. A line
/// without a colon yields its trimmed text as key with an empty value.
pub fn parse_xdefaults(content: &str) -> IndexMap<String, String> {
    let mut result = IndexMap::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('!') || line.starts_with('#') {
            continue;
        }
        let (key, value) = line.split_once(':').unwrap_or((line, ""));
        result.insert(key.trim().to_string(), value.trim().to_string());
    }
    result
}

impl Config {
    /// Load configuration from the first file found
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let path = Self::get_config_paths(config_path)
            .into_iter()
            .find(|path| path.is_file());

        let Some(path) = path else {
            bail!("Missing config file");
        };

        let mut config = Self::from_file(&path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Get the list of configuration file paths to check
    fn get_config_paths(explicit_path: Option<&PathBuf>) -> Vec<PathBuf> {
        let mut paths = Vec::new();

        // Explicit path takes priority
        if let Some(path) = explicit_path {
            paths.push(path.clone());
            return paths;
        }

        // User config ($XDG_CONFIG_HOME)
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join(CONFIG_NAME));
        }

        // System-wide config
        let system_dirs =
            std::env::var("XDG_CONFIG_DIRS").unwrap_or_else(|_| "/etc/xdg".to_string());
        paths.extend(
            system_dirs
                .split(':')
                .filter(|dir| !dir.is_empty())
                .map(|dir| Path::new(dir).join(CONFIG_NAME)),
        );

        paths
    }

    /// Load a single file, without environment overrides
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_str(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Build configuration from file content
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        let raw = parse_xdefaults(content);
        let mut config = Config::default();

        for (key, value) in &raw {
            match key.as_str() {
                "ldap.server" => config.ldap.server = value.clone(),
                "ldap.base" => config.ldap.base = value.clone(),
                "bugzilla.user" => config.bugzilla.user = value.clone(),
                "bugzilla.password" => config.bugzilla.password = value.clone(),
                "bugzilla.base" => config.bugzilla.base = Some(value.clone()),
                "bugzilla.timeout" => {
                    config.bugzilla.timeout = Some(
                        value
                            .parse()
                            .with_context(|| format!("Invalid bugzilla.timeout: {}", value))?,
                    )
                }
                "srinfo.server" => config.srinfo.server = Some(value.clone()),
                "swamp.url" => config.swamp.url = Some(value.clone()),
                "swamp.user" => config.swamp.user = value.clone(),
                "swamp.password" => config.swamp.password = value.clone(),
                "useragent" => config.user_agent = Some(value.clone()),
                _ => {}
            }
        }

        config.raw = raw;
        Ok(config)
    }

    /// Raw value of any key in the file
    pub fn get(&self, key: &str) -> Option<&str> {
        self.raw.get(key).map(String::as_str)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(server) = std::env::var("SUSEAPI_LDAP_SERVER") {
            self.ldap.server = server;
        }

        if let Ok(base) = std::env::var("SUSEAPI_LDAP_BASE") {
            self.ldap.base = base;
        }

        if let Ok(user) = std::env::var("SUSEAPI_BUGZILLA_USER") {
            self.bugzilla.user = user;
        }

        if let Ok(password) = std::env::var("SUSEAPI_BUGZILLA_PASSWORD") {
            self.bugzilla.password = password;
        }

        if let Ok(agent) = std::env::var("SUSEAPI_USER_AGENT") {
            self.user_agent = Some(agent);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    fn test_parse_xdefaults() {
        let parsed = parse_xdefaults(
            "! comment\n# other comment\n\nldap.server :  ldap://example.com:389 \nflag\n",
        );
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed["ldap.server"], "ldap://example.com:389");
        assert_eq!(parsed["flag"], "");
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.ldap.server, "ldap://pan.suse.de");
        assert_eq!(config.ldap.base, "o=Novell");
        assert!(config.bugzilla.user.is_empty());
        assert!(config.user_agent.is_none());
    }

    #[test]
    fn test_from_str() {
        let config = Config::from_str(
            "bugzilla.user: jdoe\nbugzilla.timeout: 30\nuseragent: test/1.0\ncustom.key: x\n",
        )
        .unwrap();
        assert_eq!(config.bugzilla.user, "jdoe");
        assert_eq!(config.bugzilla.timeout, Some(30));
        assert_eq!(config.user_agent.as_deref(), Some("test/1.0"));
        assert_eq!(config.get("custom.key"), Some("x"));
    }

    #[test]
    fn test_invalid_timeout() {
        assert!(Config::from_str("bugzilla.timeout: soon").is_err());
    }

    #[test]
    #[serial]
    fn test_load_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "ldap.base: o=Example").unwrap();

        let config = Config::load(Some(&file.path().to_path_buf())).unwrap();
        assert_eq!(config.ldap.base, "o=Example");
    }

    #[test]
    #[serial]
    fn test_load_missing() {
        let path = PathBuf::from("/nonexistent/suseapi");
        let err = Config::load(Some(&path)).unwrap_err();
        assert_eq!(err.to_string(), "Missing config file");
    }

    #[test]
    #[serial]
    fn test_env_override() {
        std::env::set_var("SUSEAPI_BUGZILLA_USER", "override");
        let mut config = Config::default();
        config.apply_env_overrides();
        assert_eq!(config.bugzilla.user, "override");
        std::env::remove_var("SUSEAPI_BUGZILLA_USER");
    }
}

//! Configuration management for Roster.
//!
//! Loads configuration from ${ROSTER_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable that overrides `store.url`.
pub const STORE_URL_ENV: &str = "ROSTER_STORE_URL";

/// Environment variable consulted when the local identity canister id is not configured.
pub const IDENTITY_CANISTER_ENV: &str = "INTERNET_IDENTITY_CANISTER_ID";

/// Public identity provider used for the `ic` network.
const IC_IDENTITY_PROVIDER_URL: &str = "https://identity.ic0.app/#authorize";

/// Identity provider of a local replica; the canister id is appended.
const LOCAL_IDENTITY_PROVIDER_BASE: &str = "http://localhost:4943/?canisterId=";

pub mod paths {
    //! Path resolution for Roster configuration and data files.
    //!
    //! ROSTER_HOME resolution order:
    //! 1. ROSTER_HOME environment variable (if set)
    //! 2. ~/.config/roster (default)

    use std::path::PathBuf;

    /// Returns the Roster home directory.
    pub fn roster_home() -> PathBuf {
        if let Ok(home) = std::env::var("ROSTER_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("roster")
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        roster_home().join("config.toml")
    }

    /// Returns the path to the cached sign-in credentials.
    pub fn session_path() -> PathBuf {
        roster_home().join("session.json")
    }
}

/// Which identity provider deployment to sign in against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// A local replica (development).
    #[default]
    Local,
    /// The public network.
    Ic,
}

/// Remote record store settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Base URL of the record store API.
    pub url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: Config::DEFAULT_STORE_URL.to_string(),
            timeout_secs: Config::DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl StoreConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Identity provider settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    pub network: Network,
    /// Explicit provider URL; wins over `network`.
    pub provider_url: Option<String>,
    /// Identity provider canister id on a local replica.
    pub canister_id: Option<String>,
    /// Seconds to wait for the browser login to complete.
    pub login_timeout_secs: u64,
    /// Loopback callback port; 0 picks a random high port.
    pub callback_port: u16,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            network: Network::Local,
            provider_url: None,
            canister_id: None,
            login_timeout_secs: Config::DEFAULT_LOGIN_TIMEOUT_SECS,
            callback_port: 0,
        }
    }
}

impl IdentityConfig {
    pub fn login_timeout(&self) -> Duration {
        Duration::from_secs(self.login_timeout_secs)
    }

    /// Resolves the identity provider URL, reading the canister id from the
    /// environment when needed.
    pub fn provider_url(&self) -> Result<String> {
        self.provider_url_with(std::env::var(IDENTITY_CANISTER_ENV).ok())
    }

    /// Resolves the identity provider URL given the environment's canister id.
    pub fn provider_url_with(&self, env_canister_id: Option<String>) -> Result<String> {
        if let Some(url) = self.provider_url.as_deref().filter(|u| !u.trim().is_empty()) {
            return Ok(url.to_string());
        }

        match self.network {
            Network::Ic => Ok(IC_IDENTITY_PROVIDER_URL.to_string()),
            Network::Local => {
                let canister_id = self
                    .canister_id
                    .clone()
                    .or(env_canister_id)
                    .filter(|id| !id.trim().is_empty())
                    .with_context(|| {
                        format!(
                            "No identity canister configured. Set identity.canister_id or {IDENTITY_CANISTER_ENV}."
                        )
                    })?;
                Ok(format!("{LOCAL_IDENTITY_PROVIDER_BASE}{canister_id}"))
            }
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive.
    pub level: String,
    /// Log file name, relative to ROSTER_HOME.
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            file: None,
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub identity: IdentityConfig,
    pub logging: LoggingConfig,
}

fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

impl Config {
    const DEFAULT_STORE_URL: &str = "http://127.0.0.1:4943/api";
    const DEFAULT_TIMEOUT_SECS: u64 = 30;
    const DEFAULT_LOGIN_TIMEOUT_SECS: u64 = 120;

    /// Loads configuration from the default config path.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Applies environment overrides on top of file values.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(STORE_URL_ENV)
            && !url.trim().is_empty()
        {
            self.store.url = url;
        }
        self
    }

    /// Creates a new config file with the commented template.
    ///
    /// Fails if the file already exists.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, default_config_template())
    }

    fn write_config(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nonexistent.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.store.url, "http://127.0.0.1:4943/api");
        assert_eq!(config.identity.login_timeout_secs, 120);
    }

    #[test]
    fn test_load_partial_config_merges_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(
            &config_path,
            "[store]\nurl = \"https://records.example\"\n\n[identity]\nnetwork = \"ic\"\n",
        )
        .unwrap();

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.store.url, "https://records.example");
        assert_eq!(config.store.timeout_secs, 30);
        assert_eq!(config.identity.network, Network::Ic);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_load_invalid_toml_reports_path() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "store = [").unwrap();

        let err = Config::load_from(&config_path).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse config"));
    }

    #[test]
    fn test_template_parses_to_defaults() {
        let parsed: Config = toml::from_str(default_config_template()).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn test_init_creates_config_and_refuses_overwrite() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("subdir").join("config.toml");

        Config::init(&config_path).unwrap();
        assert!(config_path.exists());

        let err = Config::init(&config_path).unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn test_provider_url_resolution() {
        let mut identity = IdentityConfig::default();
        assert!(identity.provider_url_with(None).is_err());
        assert_eq!(
            identity.provider_url_with(Some("rdmx6".to_string())).unwrap(),
            "http://localhost:4943/?canisterId=rdmx6"
        );

        identity.canister_id = Some("be2us".to_string());
        assert_eq!(
            identity.provider_url_with(Some("rdmx6".to_string())).unwrap(),
            "http://localhost:4943/?canisterId=be2us"
        );

        identity.network = Network::Ic;
        identity.canister_id = None;
        assert_eq!(
            identity.provider_url_with(None).unwrap(),
            "https://identity.ic0.app/#authorize"
        );

        identity.provider_url = Some("https://login.example/auth".to_string());
        assert_eq!(
            identity.provider_url_with(None).unwrap(),
            "https://login.example/auth"
        );
    }
}

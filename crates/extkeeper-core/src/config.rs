//! Updater configuration.
//!
//! Loaded from a TOML file, then overridden from the environment. Every key
//! has a default so an absent file is a valid configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, UpdaterError};

/// Default marketplace endpoints.
pub mod endpoints {
    pub const MARKET_BASE_URL: &str =
        "https://raw.githubusercontent.com/extkeeper/extension-index";
    pub const MARKET_BRANCH: &str = "main";
    pub const USER_AGENT: &str = "extkeeper-updater";
}

/// Environment variable names.
pub mod env_vars {
    pub const INSTALL_ROOT: &str = "EXTKEEPER_INSTALL_ROOT";
    pub const INTERVAL_HOURS: &str = "EXTKEEPER_INTERVAL_HOURS";
    pub const PROXY: &str = "EXTKEEPER_PROXY";
    pub const TEST_MODE: &str = "EXTKEEPER_TEST_MODE";
    pub const MARKET_URL: &str = "EXTKEEPER_MARKET_URL";
    pub const LOG_JSON: &str = "EXTKEEPER_LOG_JSON";
}

/// Default configuration file name, resolved against the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "extkeeper.toml";

/// Marketplace connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketConfig {
    /// Raw-content base URL of the extension index
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Branch of the index to read from
    #[serde(default = "default_branch")]
    pub branch: String,

    /// Per-request timeout (seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_base_url() -> String {
    endpoints::MARKET_BASE_URL.to_string()
}
fn default_branch() -> String {
    endpoints::MARKET_BRANCH.to_string()
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_user_agent() -> String {
    endpoints::USER_AGENT.to_string()
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            branch: default_branch(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl MarketConfig {
    /// Request timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Top-level updater configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpdaterConfig {
    /// Directory holding one subdirectory per installed extension
    #[serde(default = "default_install_root")]
    pub install_root: PathBuf,

    /// Hours between scheduled checks (absent or 0 disables scheduling)
    #[serde(default)]
    pub interval_hours: Option<f64>,

    /// Proxy handed to the applier unchanged
    #[serde(default)]
    pub proxy_address: Option<String>,

    /// Dump the raw inventory to `diagnostics_path` on every run
    #[serde(default)]
    pub test_mode: bool,

    /// Where test mode writes the inventory dump
    #[serde(default = "default_diagnostics_path")]
    pub diagnostics_path: PathBuf,

    /// Sender ids allowed to run the manual update command
    #[serde(default)]
    pub admins: Vec<String>,

    /// Marketplace settings
    #[serde(default)]
    pub market: MarketConfig,
}

fn default_install_root() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".extkeeper")
        .join("extensions")
}

fn default_diagnostics_path() -> PathBuf {
    PathBuf::from("extkeeper-inventory.md")
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            install_root: default_install_root(),
            interval_hours: None,
            proxy_address: None,
            test_mode: false,
            diagnostics_path: default_diagnostics_path(),
            admins: Vec::new(),
            market: MarketConfig::default(),
        }
    }
}

impl UpdaterConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load a configuration file. A missing file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            UpdaterError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Load a configuration file, falling back to defaults when it is absent.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Apply `EXTKEEPER_*` environment overrides.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup (the environment in production).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(root) = lookup(env_vars::INSTALL_ROOT) {
            self.install_root = PathBuf::from(root);
        }
        if let Some(hours) = lookup(env_vars::INTERVAL_HOURS) {
            let hours = hours.trim().parse::<f64>().map_err(|_| {
                UpdaterError::Config(format!(
                    "{} must be a number, got '{}'",
                    env_vars::INTERVAL_HOURS,
                    hours
                ))
            })?;
            self.interval_hours = Some(hours);
        }
        if let Some(proxy) = lookup(env_vars::PROXY) {
            self.proxy_address = Some(proxy);
        }
        if let Some(flag) = lookup(env_vars::TEST_MODE) {
            let flag = flag.trim().to_ascii_lowercase();
            self.test_mode = matches!(flag.as_str(), "1" | "true" | "yes");
        }
        if let Some(url) = lookup(env_vars::MARKET_URL) {
            self.market.base_url = url;
        }
        Ok(())
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if let Some(hours) = self.interval_hours {
            if !hours.is_finite() || hours < 0.0 {
                return Err(UpdaterError::Config(format!(
                    "interval_hours must be a non-negative number, got {}",
                    hours
                )));
            }
            if Duration::try_from_secs_f64(hours * 3600.0).is_err() {
                return Err(UpdaterError::Config(format!(
                    "interval_hours is too large, got {}",
                    hours
                )));
            }
        }
        if let Some(proxy) = &self.proxy_address {
            if proxy.trim().is_empty() {
                return Err(UpdaterError::Config(
                    "proxy_address must not be empty when set".to_string(),
                ));
            }
            if !is_proxy_url(proxy) {
                return Err(UpdaterError::Config(format!(
                    "proxy_address must be a URL such as http://host:port, got '{}'",
                    proxy
                )));
            }
        }
        if self.market.timeout_secs == 0 {
            return Err(UpdaterError::Config(
                "market.timeout_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Scheduling period, `None` when scheduling is disabled.
    pub fn schedule_interval(&self) -> Option<Duration> {
        match self.interval_hours {
            Some(hours) if hours.is_finite() && hours > 0.0 => {
                Duration::try_from_secs_f64(hours * 3600.0).ok()
            }
            _ => None,
        }
    }

    /// Proxy as passed to the applier.
    pub fn proxy(&self) -> Option<&str> {
        self.proxy_address.as_deref()
    }
}

/// Proxy addresses take the form `http[s]://[user:pass@]host[:port]`.
fn is_proxy_url(proxy: &str) -> bool {
    let Some((scheme, rest)) = proxy.trim().split_once("://") else {
        return false;
    };
    let authority = rest.split('/').next().unwrap_or_default();
    let host = authority.rsplit('@').next().unwrap_or_default();
    let scheme_ok = matches!(scheme.to_ascii_lowercase().as_str(), "http" | "https");
    scheme_ok && !host.is_empty() && !rest.contains(char::is_whitespace)
}

//! Config file handling

use std::path::{Path, PathBuf};
use std::time::Duration;

use indexmap::IndexMap;
use tracing::debug;

use crate::client::{ClientOptions, DEFAULT_TIMEOUT};
use crate::errors::{Result, SpecPulseError};
use crate::request::USER_AGENT_STRING;

pub const CONFIG_DIR_ENV: &str = "SPECPULSE_CONFIG_DIR";
const CONFIG_FILE: &str = "config.toml";

/// specpulse configuration, read from the `[defaults]` table
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub config_file: PathBuf,
    pub timeout: Duration,
    /// Offer an https server over plain http when both are declared
    pub prefer_https: bool,
    pub user_agent: String,
    pub verify_ssl: bool,
    /// Extra headers sent with every call unless already set
    pub headers: IndexMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_file: Self::default_config_dir().join(CONFIG_FILE),
            timeout: DEFAULT_TIMEOUT,
            prefer_https: true,
            user_agent: USER_AGENT_STRING.to_string(),
            verify_ssl: true,
            headers: IndexMap::new(),
        }
    }
}

impl Config {
    /// Load configuration from `explicit`, or the default location.
    ///
    /// A missing file yields the defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let config_file = match explicit {
            Some(path) => path.to_path_buf(),
            None => Self::default_config_dir().join(CONFIG_FILE),
        };

        if !config_file.exists() {
            if explicit.is_some() {
                return Err(SpecPulseError::Config(format!(
                    "config file {} does not exist",
                    config_file.display()
                )));
            }
            return Ok(Self { config_file, ..Self::default() });
        }

        let content = std::fs::read_to_string(&config_file)
            .map_err(|e| SpecPulseError::Config(format!("Failed to read config: {}", e)))?;
        let mut config = Self::parse(&content)?;
        config.config_file = config_file;
        debug!(path = %config.config_file.display(), "Loaded config");
        Ok(config)
    }

    /// Parse the TOML text of a config file
    pub fn parse(content: &str) -> Result<Self> {
        let toml_value: toml::Value = toml::from_str(content)
            .map_err(|e| SpecPulseError::Config(format!("Invalid config TOML: {}", e)))?;

        let mut config = Self::default();
        let Some(defaults) = toml_value.get("defaults") else {
            return Ok(config);
        };

        if let Some(timeout) = defaults.get("timeout") {
            let secs = timeout
                .as_float()
                .or_else(|| timeout.as_integer().map(|i| i as f64))
                .ok_or_else(|| SpecPulseError::Config("defaults.timeout must be a positive number".to_string()))?;
            config.timeout = timeout_from_secs(secs, "defaults.timeout")?;
        }

        if let Some(prefer_https) = defaults.get("prefer_https").and_then(|v| v.as_bool()) {
            config.prefer_https = prefer_https;
        }

        if let Some(user_agent) = defaults.get("user_agent").and_then(|v| v.as_str()) {
            config.user_agent = user_agent.to_string();
        }

        if let Some(verify_ssl) = defaults.get("verify_ssl").and_then(|v| v.as_bool()) {
            config.verify_ssl = verify_ssl;
        }

        if let Some(headers) = defaults.get("headers").and_then(|v| v.as_table()) {
            for (name, value) in headers {
                let value = value.as_str().ok_or_else(|| {
                    SpecPulseError::Config(format!("defaults.headers.{} must be a string", name))
                })?;
                config.headers.insert(name.clone(), value.to_string());
            }
        }

        Ok(config)
    }

    /// Client settings, with an optional timeout override in seconds
    pub fn client_options(&self, timeout_override: Option<f64>) -> Result<ClientOptions> {
        let timeout = match timeout_override {
            Some(secs) => timeout_from_secs(secs, "--timeout")?,
            None => self.timeout,
        };
        Ok(ClientOptions {
            timeout,
            user_agent: self.user_agent.clone(),
            verify_ssl: self.verify_ssl,
        })
    }

    /// Get the default config directory
    fn default_config_dir() -> PathBuf {
        if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV).filter(|d| !d.is_empty()) {
            return PathBuf::from(dir);
        }
        dirs::config_dir()
            .map(|p| p.join("specpulse"))
            .unwrap_or_else(|| PathBuf::from(".specpulse"))
    }
}

fn timeout_from_secs(secs: f64, setting: &str) -> Result<Duration> {
    if secs.is_nan() || secs <= 0.0 {
        return Err(SpecPulseError::Config(format!("{} must be a positive number", setting)));
    }
    Duration::try_from_secs_f64(secs)
        .map_err(|_| SpecPulseError::Config(format!("{} of {} seconds is out of range", setting, secs)))
}

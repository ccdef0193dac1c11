#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::repositories::expense_api::DEFAULT_TIMEOUT_SECONDS;

pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const ENV_FILE_NAME: &str = ".env";
pub const DEFAULT_SSM_PARAMETER: &str = "/exptrac.backend.url";
pub const DEFAULT_SSM_REGION: &str = "ap-southeast-2";

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub expense_tracker: ExpenseTrackerConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub name: String,
    pub log_level: String,
    pub debug: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            log_level: "info".to_string(),
            debug: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExpenseTrackerConfig {
    pub enabled: bool,
    pub base_url: Option<String>,
    pub timeout_seconds: u64,
    pub ssm_parameter: Option<String>,
    pub ssm_region: String,
}

impl Default for ExpenseTrackerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: None,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            ssm_parameter: Some(DEFAULT_SSM_PARAMETER.to_string()),
            ssm_region: DEFAULT_SSM_REGION.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid server name: {0:?} (cannot be empty)")]
    InvalidServerName(String),
    #[error("Invalid log level: {0} (must be one of trace, debug, info, warn, error)")]
    InvalidLogLevel(String),
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid URL scheme: {0} (must be 'http' or 'https')")]
    InvalidScheme(String),
    #[error("Invalid timeout: {0} (must be between 1 and 300 seconds)")]
    InvalidTimeout(u64),
    #[error("Invalid SSM region: {0:?} (cannot be empty)")]
    InvalidRegion(String),
    #[error("Invalid boolean for {key}: {value}")]
    InvalidBool { key: String, value: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Config {
    /// Default configuration directory (`~/.toolbox-mcp`)
    #[inline]
    pub fn default_dir() -> Result<PathBuf, ConfigError> {
        dirs::home_dir()
            .map(|home| home.join(concat!(".", env!("CARGO_PKG_NAME"))))
            .or_else(|| dirs::config_dir().map(|dir| dir.join(env!("CARGO_PKG_NAME"))))
            .ok_or(ConfigError::DirectoryError)
    }

    /// Load `config.toml` from `config_dir`, then apply process environment
    /// overrides.
    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        Self::load_with_env(config_dir, |key| std::env::var(key).ok())
    }

    /// Export `KEY=value` lines from `.env` in the working directory, then
    /// from `config_dir`, into the process environment. Variables that are
    /// already set are left alone. Returns the files that were read.
    #[inline]
    pub fn load_env_files<P: AsRef<Path>>(config_dir: P) -> Result<Vec<PathBuf>> {
        let mut loaded = Vec::new();

        for dir in [Path::new("."), config_dir.as_ref()] {
            let path = dir.join(ENV_FILE_NAME);
            if !path.is_file() || loaded.contains(&path) {
                continue;
            }
            dotenvy::from_path(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            loaded.push(path);
        }

        Ok(loaded)
    }

    /// Like [`Config::load`], reading overrides through `lookup`
    #[inline]
    pub fn load_with_env<P, F>(config_dir: P, lookup: F) -> Result<Self>
    where
        P: AsRef<Path>,
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::load_file(config_dir)?;
        config
            .apply_env_overrides(lookup)
            .context("Invalid environment override")?;

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    /// Load `config.toml` without environment overrides or validation
    #[inline]
    pub fn load_file<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Ok(Self {
                base_dir: config_dir.as_ref().to_path_buf(),
                ..Self::default()
            });
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.base_dir = config_dir.as_ref().to_path_buf();

        Ok(config)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        let config_dir = self.get_base_dir();

        fs::create_dir_all(config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;

        let config_path = self.config_file_path();
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    /// Apply the environment variables recognised by the server:
    /// `SERVER_NAME`, `LOG_LEVEL`, `DEBUG` and `BASE_URL`.
    #[inline]
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(name) = lookup("SERVER_NAME") {
            self.server.name = name;
        }

        if let Some(level) = lookup("LOG_LEVEL") {
            self.server.log_level = level;
        }

        if let Some(debug) = lookup("DEBUG") {
            self.server.debug = parse_bool("DEBUG", &debug)?;
        }

        if let Some(base_url) = lookup("BASE_URL") {
            let base_url = base_url.trim();
            self.expense_tracker.base_url = (!base_url.is_empty()).then(|| base_url.to_string());
        }

        Ok(())
    }

    #[inline]
    pub fn get_base_dir(&self) -> &Path {
        &self.base_dir
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.get_base_dir().join(CONFIG_FILE_NAME)
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.expense_tracker.validate()?;
        Ok(())
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::InvalidServerName(self.name.clone()));
        }

        normalize_log_level(&self.log_level)?;
        Ok(())
    }

    /// `tracing` filter directive for this configuration
    pub fn filter_directive(&self) -> String {
        if self.debug {
            return "debug".to_string();
        }

        normalize_log_level(&self.log_level).unwrap_or_else(|_| "info".to_string())
    }

    pub fn set_name(&mut self, name: String) -> Result<(), ConfigError> {
        if name.trim().is_empty() {
            return Err(ConfigError::InvalidServerName(name));
        }
        self.name = name;
        Ok(())
    }

    pub fn set_log_level(&mut self, level: String) -> Result<(), ConfigError> {
        self.log_level = normalize_log_level(&level)?;
        Ok(())
    }
}

impl ExpenseTrackerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(base_url) = &self.base_url {
            validate_base_url(base_url)?;
        }

        if !(1..=300).contains(&self.timeout_seconds) {
            return Err(ConfigError::InvalidTimeout(self.timeout_seconds));
        }

        if self.ssm_parameter.is_some() && self.ssm_region.trim().is_empty() {
            return Err(ConfigError::InvalidRegion(self.ssm_region.clone()));
        }

        Ok(())
    }

    /// Configured base URL, if present and valid
    pub fn parsed_base_url(&self) -> Option<Url> {
        self.base_url
            .as_deref()
            .and_then(|url| validate_base_url(url).ok())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn set_base_url(&mut self, base_url: Option<String>) -> Result<(), ConfigError> {
        let base_url = base_url
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());

        if let Some(url) = &base_url {
            validate_base_url(url)?;
        }
        self.base_url = base_url;
        Ok(())
    }

    pub fn set_timeout_seconds(&mut self, timeout_seconds: u64) -> Result<(), ConfigError> {
        if !(1..=300).contains(&timeout_seconds) {
            return Err(ConfigError::InvalidTimeout(timeout_seconds));
        }
        self.timeout_seconds = timeout_seconds;
        Ok(())
    }
}

fn validate_base_url(base_url: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(base_url.trim()).map_err(|_| ConfigError::InvalidUrl(base_url.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidScheme(url.scheme().to_string()));
    }

    Ok(url)
}

/// Map a log level name (including the `WARNING`/`CRITICAL` spellings used by
/// other tooling) onto a `tracing` level name.
fn normalize_log_level(level: &str) -> Result<String, ConfigError> {
    let lowered = level.trim().to_ascii_lowercase();
    let normalized = match lowered.as_str() {
        "warning" => "warn",
        "critical" | "fatal" => "error",
        other => other,
    };

    if LOG_LEVELS.contains(&normalized) {
        Ok(normalized.to_string())
    } else {
        Err(ConfigError::InvalidLogLevel(level.to_string()))
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

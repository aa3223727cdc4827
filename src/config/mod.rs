//! Configuration management for fwsync
//!
//! This module handles loading, parsing, and validating configuration from
//! YAML files and environment variables.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config file: {0}")]
    FileRead(String),

    /// Config content could not be parsed
    #[error("Failed to parse config: {0}")]
    Parse(String),

    /// Config content is inconsistent
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Management-plane connection settings
    #[serde(default)]
    pub device: DeviceConfig,

    /// Sync engine settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileRead(e.to_string()))?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        // Expand ${VAR} references before parsing
        let expanded = expand_env_vars(yaml);
        serde_yaml::from_str(&expanded).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load configuration from environment variables with prefix FWSYNC_
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Ok(hostname) = std::env::var("FWSYNC_HOSTNAME") {
            config.device.hostname = hostname;
        }
        if let Ok(username) = std::env::var("FWSYNC_USERNAME") {
            config.device.username = username;
        }
        if let Ok(password) = std::env::var("FWSYNC_PASSWORD") {
            config.device.password = password;
        }
        if let Ok(api_key) = std::env::var("FWSYNC_API_KEY") {
            config.device.api_key = Some(api_key);
        }
        if let Ok(verify) = std::env::var("FWSYNC_VERIFY_TLS") {
            config.device.verify_tls = verify.parse().unwrap_or(true);
        }
        if let Ok(dry_run) = std::env::var("FWSYNC_DRY_RUN") {
            config.engine.dry_run = dry_run.parse().unwrap_or(false);
        }
        if let Ok(pool_size) = std::env::var("FWSYNC_POOL_SIZE") {
            config.engine.pool_size = pool_size
                .parse()
                .map_err(|_| ConfigError::Parse("Invalid pool size".to_string()))?;
        }
        if let Ok(retries) = std::env::var("FWSYNC_MAX_RETRIES") {
            config.engine.max_retries = retries
                .parse()
                .map_err(|_| ConfigError::Parse("Invalid retry count".to_string()))?;
        }
        if let Ok(level) = std::env::var("FWSYNC_LOG_LEVEL") {
            config.logging.level = level;
        }

        Ok(config)
    }

    /// Load configuration with the standard precedence:
    /// explicit path, then `./fwsync.yaml`, then environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default_path = Path::new("fwsync.yaml");
                if default_path.exists() {
                    Self::from_file(default_path)
                } else {
                    Self::from_env()
                }
            }
        }
    }

    /// Check the configuration is usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.pool_size == 0 {
            return Err(ConfigError::Invalid(
                "engine.pool_size must be at least 1".to_string(),
            ));
        }
        if !self.engine.dry_run && self.device.hostname.is_empty() {
            return Err(ConfigError::Invalid(
                "device.hostname is required outside dry-run mode".to_string(),
            ));
        }
        Ok(())
    }
}

/// Management-plane connection configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceConfig {
    /// Hostname or IP of the management plane. A full `http(s)://` URL is
    /// accepted verbatim; a bare hostname gets the https scheme.
    #[serde(default)]
    pub hostname: String,

    /// Username for basic authentication
    #[serde(default)]
    pub username: String,

    /// Password for basic authentication
    #[serde(default)]
    pub password: String,

    /// API key; takes precedence over username/password when set
    #[serde(default)]
    pub api_key: Option<String>,

    /// Whether to verify the management plane's TLS certificate
    #[serde(default = "default_verify_tls")]
    pub verify_tls: bool,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            hostname: String::new(),
            username: String::new(),
            password: String::new(),
            api_key: None,
            verify_tls: default_verify_tls(),
            timeout_secs: default_request_timeout(),
        }
    }
}

fn default_verify_tls() -> bool {
    true
}

fn default_request_timeout() -> u64 {
    30
}

/// Sync engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    /// Number of concurrent workers for bulk operations
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// Skip all mutating remote calls, reporting what would have happened
    #[serde(default)]
    pub dry_run: bool,

    /// Maximum attempts per remote operation
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Interval between commit-job status polls, in seconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Wall-clock budget for awaiting a commit job, in seconds
    #[serde(default = "default_job_timeout")]
    pub job_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pool_size: default_pool_size(),
            dry_run: false,
            max_retries: default_max_retries(),
            poll_interval_secs: default_poll_interval(),
            job_timeout_secs: default_job_timeout(),
        }
    }
}

fn default_pool_size() -> usize {
    10
}

fn default_max_retries() -> u32 {
    3
}

fn default_poll_interval() -> u64 {
    5
}

fn default_job_timeout() -> u64 {
    600
}

/// Retry executor configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetryConfig {
    /// Maximum attempts per remote operation
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Skip operations instead of executing them
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            dry_run: false,
        }
    }
}

impl EngineConfig {
    /// Retry settings derived from the engine settings
    pub fn retry(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.max_retries,
            dry_run: self.dry_run,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Expand `${VAR}` references from the environment, leaving unknown
/// variables untouched.
fn expand_env_vars(input: &str) -> String {
    let re = regex_lite::Regex::new(r"\$\{([^}]+)\}")
        .expect("Invalid regex pattern for environment variable expansion");

    re.replace_all(input, |caps: &regex_lite::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_else(|_| caps[0].to_string())
    })
    .into_owned()
}

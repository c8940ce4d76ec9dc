//! Configuration module for the eBay client and the code generator

use std::path::PathBuf;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Main settings
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub credentials: CredentialSettings,
    #[serde(default)]
    pub codegen: CodegenSettings,
}

/// Facade construction options
#[derive(Debug, Clone, Deserialize)]
pub struct ApiSettings {
    /// Application (client id) credential identifier
    pub application_credential_id: String,
    /// User credential identifier, required for authorization-code endpoints
    #[serde(default)]
    pub user_credential_id: Option<String>,
    #[serde(default)]
    pub use_sandbox: bool,
    /// eBay marketplace code, e.g. EBAY_US
    #[serde(default = "default_site_id")]
    pub site_id: String,
    /// Spread calls over the rate window instead of only counting them
    #[serde(default)]
    pub throttle: bool,
    /// Seconds; -1 means unbounded
    #[serde(default = "default_timeout")]
    pub timeout: f64,
    /// Items requested per page by paged operations
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

/// Static tokens for deployments without an OAuth broker
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CredentialSettings {
    pub application_token: Option<String>,
    pub user_token: Option<String>,
    /// Key pair used by the signing middleware
    pub key_pair_id: Option<String>,
}

/// Build-time pipeline options
#[derive(Debug, Clone, Deserialize)]
pub struct CodegenSettings {
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    /// Facade source file holding the anchored regions
    #[serde(default = "default_output")]
    pub output: PathBuf,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,
    /// Skip discovery and reuse the cached contracts
    #[serde(default)]
    pub offline: bool,
    /// External OpenAPI generator, invoked as `<command> <contract> <out_dir>`
    #[serde(default)]
    pub generator_command: Option<String>,
}

fn default_site_id() -> String {
    "EBAY_US".to_string()
}

fn default_timeout() -> f64 {
    60.0
}

fn default_page_size() -> u32 {
    200
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("contracts")
}

fn default_output() -> PathBuf {
    PathBuf::from("src/generated/mod.rs")
}

fn default_concurrency() -> usize {
    num_cpus::get() * 2
}

fn default_requests_per_second() -> u32 {
    4
}

impl Settings {
    /// Load configuration from files and environment variables
    ///
    /// Configuration priority (highest to lowest):
    /// 1. Environment variables (prefixed with EBAY_)
    /// 2. config/local.toml (gitignored)
    /// 3. config/default.toml
    pub fn load() -> Result<Self, ConfigError> {
        let config_dir = std::env::var("CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config"));

        let builder = Config::builder()
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            // EBAY_API__SITE_ID, EBAY_CODEGEN__OFFLINE, etc.
            .add_source(
                Environment::with_prefix("EBAY")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }
}

impl ApiSettings {
    /// Settings for an application with every other option at its default
    pub fn new(application_credential_id: impl Into<String>) -> Self {
        Self {
            application_credential_id: application_credential_id.into(),
            ..Self::default()
        }
    }

    /// Call timeout; `None` when unbounded
    pub fn timeout(&self) -> Option<Duration> {
        timeout_from_secs(self.timeout)
    }
}

/// Convert float seconds to an optional duration; negative means unbounded
pub fn timeout_from_secs(secs: f64) -> Option<Duration> {
    if secs < 0.0 || !secs.is_finite() {
        None
    } else {
        Some(Duration::from_secs_f64(secs))
    }
}

impl Default for ApiSettings {
    fn default() -> Self {
        ApiSettings {
            application_credential_id: String::new(),
            user_credential_id: None,
            use_sandbox: false,
            site_id: default_site_id(),
            throttle: false,
            timeout: default_timeout(),
            page_size: default_page_size(),
        }
    }
}

impl Default for CodegenSettings {
    fn default() -> Self {
        CodegenSettings {
            cache_dir: default_cache_dir(),
            output: default_output(),
            concurrency: default_concurrency(),
            requests_per_second: default_requests_per_second(),
            offline: false,
            generator_command: None,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            api: ApiSettings::default(),
            credentials: CredentialSettings::default(),
            codegen: CodegenSettings::default(),
        }
    }
}

use crate::platform::Platform;
use crate::ConfigError;
use serde::Deserialize;

/// Main configuration structure for Bounty-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    #[serde(default, rename = "platform")]
    pub platforms: Vec<PlatformEntry>,
}

impl Config {
    /// Platforms that are switched on, in configuration order
    pub fn enabled_platforms(&self) -> impl Iterator<Item = &PlatformEntry> {
        self.platforms.iter().filter(|entry| entry.enabled)
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Number of detail fetches between progress log lines
    #[serde(default = "default_detail_batch_size")]
    pub detail_batch_size: usize,

    /// Retries for 5xx responses and timeouts
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay between retries (milliseconds)
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Per-request timeout (seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Write the final artifact even when some detail fetches failed
    #[serde(default)]
    pub finalize_partial: bool,
}

fn default_detail_batch_size() -> usize {
    10
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    5000
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            detail_batch_size: default_detail_batch_size(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            finalize_partial: false,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Which backend stores progress and results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// One JSON file per record
    #[default]
    Files,

    /// One SQLite database holding every record
    Sqlite,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Directory for progress records and page fragments
    #[serde(default = "default_progress_dir")]
    pub progress_dir: String,

    /// Directory for final per-platform artifacts
    #[serde(default = "default_results_dir")]
    pub results_dir: String,

    #[serde(default)]
    pub storage_backend: StorageBackend,

    /// Path to the SQLite database file (sqlite backend only)
    #[serde(default)]
    pub database_path: Option<String>,
}

fn default_progress_dir() -> String {
    "./progress".to_string()
}

fn default_results_dir() -> String {
    "./programs".to_string()
}

/// One `[[platform]]` entry
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PlatformEntry {
    /// Platform name (hackerone, bugcrowd, yeswehack, intigriti)
    pub name: String,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Overrides the platform's API root
    #[serde(default)]
    pub base_url: Option<String>,

    /// Environment variable holding the basic-auth username
    #[serde(default)]
    pub username_env: Option<String>,

    /// Environment variable holding the basic-auth token
    #[serde(default)]
    pub token_env: Option<String>,
}

fn default_enabled() -> bool {
    true
}

impl PlatformEntry {
    /// Parses the platform name
    pub fn platform(&self) -> Result<Platform, ConfigError> {
        self.name.parse()
    }

    /// Configured API root, or the platform default
    pub fn base_url(&self) -> Result<String, ConfigError> {
        let platform = self.platform()?;
        Ok(self
            .base_url
            .clone()
            .unwrap_or_else(|| platform.default_base_url().to_string()))
    }

    /// Environment variables holding basic-auth credentials, if any
    ///
    /// Explicit `username-env`/`token-env` keys win over platform defaults.
    pub fn credential_env(&self) -> Result<Option<(String, String)>, ConfigError> {
        if let (Some(user), Some(token)) = (&self.username_env, &self.token_env) {
            return Ok(Some((user.clone(), token.clone())));
        }
        Ok(self
            .platform()?
            .default_credential_env()
            .map(|(user, token)| (user.to_string(), token.to_string())))
    }
}

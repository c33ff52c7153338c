//! Bounty-Harvest: a resumable bug-bounty program crawler
//!
//! This crate walks the public program listings of several bug-bounty
//! platforms, enriches every program with its detail record and writes one
//! consolidated JSON artifact per platform. Every page and every detail fetch
//! is checkpointed, so an interrupted crawl resumes where it stopped.

pub mod collection;
pub mod config;
pub mod crawler;
pub mod output;
pub mod platform;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Bounty-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transport error on {platform}: {source}")]
    Transport {
        platform: String,
        source: crawler::TransportError,
    },

    #[error("Malformed response on {platform} page {page}: missing '{container}'")]
    MalformedResponse {
        platform: String,
        page: u64,
        container: String,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::CrawlPhase,
        to: state::CrawlPhase,
    },

    #[error("Invalid crawl progress for {platform}: {message}")]
    InvalidProgress { platform: String, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Crawl task failed: {0}")]
    Task(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Unknown platform: {0}")]
    UnknownPlatform(String),

    #[error("Missing credential: environment variable {0} is not set")]
    MissingCredential(String),
}

/// Result type alias for Bounty-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use collection::{Item, Page, ResultCollection};
pub use config::Config;
pub use platform::{PageRequest, Platform, PlatformAdapter};
pub use state::{CrawlPhase, CrawlProgress};

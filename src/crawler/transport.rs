//! HTTP transport implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings
//! - Basic authentication for platforms that require it
//! - Retry logic for transient failures
//! - Error classification

use crate::config::{Config, PlatformEntry, UserAgentConfig};
use crate::platform::PageRequest;
use crate::{ConfigError, HarvestError};
use async_trait::async_trait;
use reqwest::{header, Client};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while fetching a JSON document
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("invalid JSON from {url}: {message}")]
    Decode { url: String, message: String },
}

impl TransportError {
    /// Returns true for failures worth retrying (5xx and timeouts)
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Status { status, .. } => *status >= 500,
            Self::Request { source, .. } => source.is_timeout() || source.is_connect(),
            Self::Decode { .. } => false,
        }
    }
}

/// Fetches JSON documents for the crawler
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, request: &PageRequest) -> Result<Value, TransportError>;
}

/// HTTP basic credentials
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub token: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            token: token.into(),
        }
    }

    /// Reads credentials from two environment variables
    pub fn from_env(username_var: &str, token_var: &str) -> Result<Self, ConfigError> {
        let read = |var: &str| {
            std::env::var(var)
                .ok()
                .filter(|value| !value.is_empty())
                .ok_or_else(|| ConfigError::MissingCredential(var.to_string()))
        };
        Ok(Self::new(read(username_var)?, read(token_var)?))
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// How often and how far apart failed requests are retried
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            delay: Duration::ZERO,
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Per-request timeout
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use bounty_harvest::config::UserAgentConfig;
/// use bounty_harvest::crawler::build_http_client;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     crawler_name: "BountyHarvest".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    // Format: CrawlerName/Version (+ContactURL; ContactEmail)
    let user_agent = format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    );

    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// reqwest-backed transport
pub struct HttpTransport {
    client: Client,
    credentials: Option<Credentials>,
    retry: RetryPolicy,
}

impl HttpTransport {
    pub fn new(client: Client, credentials: Option<Credentials>, retry: RetryPolicy) -> Self {
        Self {
            client,
            credentials,
            retry,
        }
    }

    /// Builds the transport for one configured platform
    ///
    /// Credentials are read from the environment variables the platform
    /// entry names; a platform that needs them fails if they are unset.
    pub fn from_config(config: &Config, entry: &PlatformEntry) -> Result<Self, HarvestError> {
        let client = build_http_client(
            &config.user_agent,
            Duration::from_secs(config.crawler.request_timeout_secs),
        )
        .map_err(|e| ConfigError::Validation(format!("Failed to build HTTP client: {}", e)))?;

        let credentials = match entry.credential_env()? {
            Some((username_var, token_var)) => {
                Some(Credentials::from_env(&username_var, &token_var)?)
            }
            None => None,
        };

        let retry = RetryPolicy {
            max_retries: config.crawler.max_retries,
            delay: Duration::from_millis(config.crawler.retry_delay_ms),
        };

        Ok(Self::new(client, credentials, retry))
    }

    async fn fetch_once(&self, request: &PageRequest) -> Result<Value, TransportError> {
        let url = request.to_string();
        let mut builder = self
            .client
            .get(&request.endpoint)
            .header(header::ACCEPT, "application/json");
        if !request.params.is_empty() {
            builder = builder.query(&request.params);
        }
        if let Some(credentials) = &self.credentials {
            builder = builder.basic_auth(&credentials.username, Some(&credentials.token));
        }

        let response = builder
            .send()
            .await
            .map_err(|source| TransportError::Request {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|source| TransportError::Request {
                url: url.clone(),
                source,
            })?;

        serde_json::from_str(&body).map_err(|e| TransportError::Decode {
            url,
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    /// Fetches a JSON document, retrying 5xx responses and timeouts
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | HTTP 2xx | Parse body as JSON |
    /// | HTTP 4xx | Immediate failure |
    /// | HTTP 5xx | Retry up to `max_retries` times |
    /// | Timeout / connect error | Retry up to `max_retries` times |
    /// | Invalid JSON | Immediate failure |
    async fn fetch(&self, request: &PageRequest) -> Result<Value, TransportError> {
        let mut attempt = 0;
        loop {
            match self.fetch_once(request).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.retry.max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        "{} (attempt {}/{}), retrying in {:?}",
                        e,
                        attempt,
                        self.retry.max_retries,
                        self.retry.delay
                    );
                    tokio::time::sleep(self.retry.delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

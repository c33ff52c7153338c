use crate::config::types::{
    Config, CrawlerConfig, OutputConfig, PlatformEntry, StorageBackend, UserAgentConfig,
};
use crate::ConfigError;
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    validate_platforms(&config.platforms)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.detail_batch_size < 1 {
        return Err(ConfigError::Validation(format!(
            "detail_batch_size must be >= 1, got {}",
            config.detail_batch_size
        )));
    }

    if config.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be <= 10, got {}",
            config.max_retries
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_secs must be >= 1, got {}",
            config.request_timeout_secs
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    // Validate contact URL
    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    // Validate contact email (basic validation)
    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.progress_dir.is_empty() {
        return Err(ConfigError::Validation(
            "progress_dir cannot be empty".to_string(),
        ));
    }

    if config.results_dir.is_empty() {
        return Err(ConfigError::Validation(
            "results_dir cannot be empty".to_string(),
        ));
    }

    // Progress records and final artifacts share file names
    if config.storage_backend == StorageBackend::Files
        && normalize_dir(&config.progress_dir) == normalize_dir(&config.results_dir)
    {
        return Err(ConfigError::Validation(
            "progress_dir and results_dir must differ".to_string(),
        ));
    }

    if config.storage_backend == StorageBackend::Sqlite
        && config.database_path.as_deref().map_or(true, str::is_empty)
    {
        return Err(ConfigError::Validation(
            "database_path is required for the sqlite storage backend".to_string(),
        ));
    }

    Ok(())
}

/// Validates platform entries
fn validate_platforms(entries: &[PlatformEntry]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for entry in entries {
        let platform = entry.platform()?;

        if !seen.insert(platform) {
            return Err(ConfigError::Validation(format!(
                "Platform '{}' is configured more than once",
                platform
            )));
        }

        if let Some(base_url) = &entry.base_url {
            let url = Url::parse(base_url).map_err(|e| {
                ConfigError::InvalidUrl(format!("Invalid base-url '{}': {}", base_url, e))
            })?;

            if url.scheme() != "https" && url.scheme() != "http" {
                return Err(ConfigError::Validation(format!(
                    "base-url '{}' must use http or https",
                    base_url
                )));
            }
        }

        if entry.username_env.is_some() != entry.token_env.is_some() {
            return Err(ConfigError::Validation(format!(
                "Platform '{}' must set both username-env and token-env, or neither",
                platform
            )));
        }
    }

    Ok(())
}

/// Resolves `.` and `..` lexically against the working directory
fn normalize_dir(dir: &str) -> PathBuf {
    let path = Path::new(dir);
    let absolute = match std::env::current_dir() {
        Ok(cwd) if path.is_relative() => cwd.join(path),
        _ => path.to_path_buf(),
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    // Basic email format check: must contain @ and have text on both sides
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    let local = parts[0];
    let domain = parts[1];

    if local.is_empty() || domain.is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    // Domain part should contain at least one dot
    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}

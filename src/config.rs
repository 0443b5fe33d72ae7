//! Configuration file parser for ~/.config/bufferlinks/config.toml.
//!
//! The config file is optional: a missing file yields `Config::default()`,
//! which polls the three link-roundup blogs the tool was written for.
//! Unknown keys are accepted but logged, since they are usually typos.
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// A feed to poll on every refresh.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeedSource {
    /// Display name, used in logs and errors.
    pub name: String,
    pub url: String,
    /// Keep only items whose title contains this marker (case-insensitive).
    /// `None` keeps every item.
    #[serde(default)]
    pub title_filter: Option<String>,
}

impl FeedSource {
    pub fn new(name: &str, url: &str, title_filter: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            title_filter: title_filter.map(str::to_string),
        }
    }

    /// Whether an item with this title passes the subscription filter.
    pub fn matches_title(&self, title: &str) -> bool {
        match &self.title_filter {
            Some(marker) => title.to_lowercase().contains(&marker.to_lowercase()),
            None => true,
        }
    }
}

/// Buffer API settings.
///
/// The access token is masked in `Debug` output.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// API access token (alternative to BUFFER_ACCESS_TOKEN env var).
    /// Env var takes precedence over config file.
    pub access_token: Option<String>,

    /// Only profiles on this service receive posts (e.g. "facebook").
    pub service: String,

    /// Override for the API base URL. Must be HTTPS except on localhost.
    pub base_url: Option<String>,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            service: "facebook".to_string(),
            base_url: None,
        }
    }
}

impl std::fmt::Debug for BufferConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferConfig")
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("service", &self.service)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl BufferConfig {
    /// Resolve the access token, preferring the BUFFER_ACCESS_TOKEN env var.
    pub fn resolve_token(&self) -> Option<secrecy::SecretString> {
        std::env::var("BUFFER_ACCESS_TOKEN")
            .ok()
            .filter(|token| !token.is_empty())
            .or_else(|| self.access_token.clone())
            .map(secrecy::SecretString::from)
    }
}

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Feeds polled on every refresh, in order.
    pub feeds: Vec<FeedSource>,

    /// Per-request timeout applied to the shared HTTP client.
    pub request_timeout_secs: u64,

    /// Refresh interval for `watch` in minutes. 0 = refresh once.
    pub refresh_interval_minutes: u64,

    pub buffer: BufferConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feeds: default_feeds(),
            request_timeout_secs: 30,
            refresh_interval_minutes: 0,
            buffer: BufferConfig::default(),
        }
    }
}

fn default_feeds() -> Vec<FeedSource> {
    vec![
        FeedSource::new(
            "Marginal Revolution",
            "http://feeds.feedburner.com/marginalrevolution?fmt=xml",
            Some("link"),
        ),
        FeedSource::new(
            "Slate Star Codex",
            "http://slatestarcodex.com/feed/",
            Some("link"),
        ),
        FeedSource::new("foreXiv", "http://blog.jessriedel.com/feed/", Some("link")),
    ]
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            let known_keys = [
                "feeds",
                "request_timeout_secs",
                "refresh_interval_minutes",
                "buffer",
            ];
            for key in raw.keys() {
                if !known_keys.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(
            path = %path.display(),
            feeds = config.feeds.len(),
            "Loaded configuration"
        );
        Ok(config)
    }
}

// ============================================================================
// Tests
// ============================================================================

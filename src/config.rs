//! Configuration file parser for ~/.config/feedpress/config.toml.
//!
//! The config file is optional. A missing file yields `Config::default()`,
//! which has no feeds and no keywords, so a run does nothing.
//! Unknown keys are accepted and logged as warnings.
//!
//! The pipeline never reads [`Config`] directly. It receives a
//! [`PipelineSettings`] built through the [`SettingsStore`] key-value view,
//! the same three keys the settings form exposes.
use crate::filter::KeywordSet;
use crate::rewrite::RewriteRule;
use secrecy::SecretString;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Newline-separated feed URLs.
pub const FEED_URLS_KEY: &str = "feed_urls";
/// Comma-separated keywords.
pub const KEYWORDS_KEY: &str = "keywords";
/// Category id assigned to published entries.
pub const CATEGORY_KEY: &str = "category";

pub const DEFAULT_CATEGORY: u64 = 1;
pub const DEFAULT_AUTHOR: u64 = 1;

/// Longest accepted schedule interval (one year).
pub const MAX_SCHEDULE_INTERVAL_MINUTES: u64 = 366 * 24 * 60;

/// Environment variable that overrides `repository.app_password`.
pub const APP_PASSWORD_ENV: &str = "FEEDPRESS_APP_PASSWORD";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Feed URLs, one per line.
    pub feed_urls: String,

    /// Comma-separated keywords; an item must contain at least one.
    pub keywords: String,

    /// Category id for published entries.
    pub category: u64,

    /// Author id for published entries.
    pub author: u64,

    /// Most-recent items taken from each feed per run.
    pub max_items_per_feed: usize,

    /// Timeout for each feed request, in seconds.
    pub fetch_timeout_secs: u64,

    /// User-Agent header sent with feed and image requests.
    pub user_agent: String,

    /// Allow feeds and images on localhost / private networks.
    pub allow_private_hosts: bool,

    /// Minutes between scheduled runs in daemon mode.
    pub schedule_interval_minutes: u64,

    /// Where entries are published.
    pub repository: RepositoryConfig,

    /// Replaces the built-in rewrite table when non-empty.
    pub rewrite_rules: Vec<RewriteRule>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feed_urls: String::new(),
            keywords: String::new(),
            category: DEFAULT_CATEGORY,
            author: DEFAULT_AUTHOR,
            max_items_per_feed: crate::feed::DEFAULT_MAX_ITEMS,
            fetch_timeout_secs: 30,
            user_agent: concat!("feedpress/", env!("CARGO_PKG_VERSION")).to_string(),
            allow_private_hosts: false,
            schedule_interval_minutes: 60,
            repository: RepositoryConfig::default(),
            rewrite_rules: Vec::new(),
        }
    }
}

/// `[repository]` table.
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Site root of the WordPress-compatible API, e.g. `https://blog.example.com`.
    pub site_url: Option<String>,
    pub username: Option<String>,
    /// Application password. `FEEDPRESS_APP_PASSWORD` takes precedence.
    pub app_password: Option<String>,
}

/// Mask app_password in Debug output to prevent secret leakage.
impl std::fmt::Debug for RepositoryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryConfig")
            .field("site_url", &self.site_url)
            .field("username", &self.username)
            .field(
                "app_password",
                &self.app_password.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl RepositoryConfig {
    /// Picks the password from the environment value if set, else from the file.
    pub fn resolve_password(&self, env_value: Option<String>) -> Option<SecretString> {
        env_value
            .filter(|v| !v.is_empty())
            .or_else(|| self.app_password.clone())
            .map(SecretString::from)
    }
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

        Self::parse(&content)
    }

    /// Time between scheduled runs, between one minute and one year.
    pub fn schedule_interval(&self) -> std::time::Duration {
        let minutes = self
            .schedule_interval_minutes
            .clamp(1, MAX_SCHEDULE_INTERVAL_MINUTES);
        std::time::Duration::from_secs(minutes.saturating_mul(60))
    }

    /// Per-request timeout for feeds, API calls and image downloads.
    pub fn fetch_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.fetch_timeout_secs.max(1))
    }

    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            let known_keys = [
                FEED_URLS_KEY,
                KEYWORDS_KEY,
                CATEGORY_KEY,
                "author",
                "max_items_per_feed",
                "fetch_timeout_secs",
                "user_agent",
                "allow_private_hosts",
                "schedule_interval_minutes",
                "repository",
                "rewrite_rules",
            ];
            for key in raw.keys() {
                if !known_keys.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(content)?;
        tracing::info!(
            feeds = config.feed_urls.lines().filter(|l| !l.trim().is_empty()).count(),
            category = config.category,
            "Loaded configuration"
        );
        Ok(config)
    }
}

// ============================================================================
// Settings Store
// ============================================================================

/// Key-value view over stored settings.
///
/// Values are text, as a settings form stores them; `default` is returned
/// for unknown or unset keys.
pub trait SettingsStore {
    fn get(&self, key: &str, default: &str) -> String;
}

impl SettingsStore for Config {
    fn get(&self, key: &str, default: &str) -> String {
        match key {
            FEED_URLS_KEY => self.feed_urls.clone(),
            KEYWORDS_KEY => self.keywords.clone(),
            CATEGORY_KEY => self.category.to_string(),
            _ => default.to_string(),
        }
    }
}

/// In-memory [`SettingsStore`].
#[derive(Debug, Clone, Default)]
pub struct MemorySettings {
    values: HashMap<String, String>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) -> &mut Self {
        self.values.insert(key.to_string(), value.into());
        self
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, key: &str, default: &str) -> String {
        self.values
            .get(key)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }
}

/// The parsed values one pipeline run works from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineSettings {
    pub feed_urls: Vec<String>,
    pub keywords: KeywordSet,
    pub category: u64,
}

impl PipelineSettings {
    /// Reads and parses the three pipeline keys.
    ///
    /// Blank feed lines are dropped. A category that is not a positive
    /// integer falls back to [`DEFAULT_CATEGORY`] with a warning.
    pub fn from_store(store: &dyn SettingsStore) -> Self {
        let feed_urls = store
            .get(FEED_URLS_KEY, "")
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();

        let keywords = KeywordSet::parse(&store.get(KEYWORDS_KEY, ""));

        let raw_category = store.get(CATEGORY_KEY, &DEFAULT_CATEGORY.to_string());
        let category = match raw_category.trim().parse::<u64>() {
            Ok(id) if id > 0 => id,
            _ => {
                tracing::warn!(value = %raw_category, "Invalid category setting, using default");
                DEFAULT_CATEGORY
            }
        };

        Self {
            feed_urls,
            keywords,
            category,
        }
    }

    /// No feeds or no keywords: the run has nothing to do.
    pub fn is_noop(&self) -> bool {
        self.feed_urls.is_empty() || self.keywords.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================

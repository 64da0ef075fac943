//! Configuration management for mediacat using the prefer crate.

use serde::{Deserialize, Serialize};

use crate::filters::DEFAULT_LIMIT;

/// User agent sent with catalog requests.
pub const USER_AGENT: &str = concat!("mediacat/", env!("CARGO_PKG_VERSION"));

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Catalog endpoint that filter queries are appended to.
    pub host: String,
    /// User agent for HTTP requests.
    pub user_agent: String,
    /// Request timeout in seconds.
    pub request_timeout: u64,
    /// Maximum number of cached pages (None = keep every page for the session).
    pub cache_capacity: Option<usize>,
    /// Page size used when the address carries no usable limit.
    pub default_limit: u32,
    /// Page sizes offered by the limit control.
    pub limit_options: Vec<u32>,
    /// Number of pages `fetch` follows by default.
    pub pages: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: "http://localhost:8000/".to_string(),
            user_agent: USER_AGENT.to_string(),
            request_timeout: 30,
            cache_capacity: None,
            default_limit: DEFAULT_LIMIT,
            limit_options: vec![20, 40],
            pages: 1,
        }
    }
}

impl Settings {
    /// Create settings pointing at a specific catalog host.
    pub fn with_host(host: &str) -> Self {
        Self {
            host: host.to_string(),
            ..Default::default()
        }
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Catalog endpoint.
    #[serde(default)]
    pub host: Option<String>,
    /// User agent string.
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Request timeout in seconds.
    #[serde(default)]
    pub request_timeout: Option<u64>,
    /// Maximum number of cached pages.
    #[serde(default)]
    pub cache_capacity: Option<usize>,
    /// Default page size.
    #[serde(default)]
    pub default_limit: Option<u32>,
    /// Page sizes offered by the limit control.
    #[serde(default)]
    pub limit_options: Option<Vec<u32>>,
    /// Number of pages to follow.
    #[serde(default)]
    pub pages: Option<usize>,
}

impl Config {
    /// Load configuration using prefer crate.
    /// Automatically discovers mediacat config files in standard locations.
    pub async fn load() -> Self {
        match prefer::load("mediacat").await {
            Ok(pref_config) => Config {
                host: pref_config.get("host").ok(),
                user_agent: pref_config.get("user_agent").ok(),
                request_timeout: pref_config.get("request_timeout").ok(),
                cache_capacity: pref_config.get("cache_capacity").ok(),
                default_limit: pref_config.get("default_limit").ok(),
                limit_options: pref_config.get("limit_options").ok(),
                pages: pref_config.get("pages").ok(),
            },
            Err(_) => {
                // No config file found, use defaults
                Self::default()
            }
        }
    }

    /// Apply configuration to settings.
    pub fn apply_to_settings(&self, settings: &mut Settings) {
        if let Some(ref host) = self.host {
            settings.host = host.clone();
        }
        if let Some(ref user_agent) = self.user_agent {
            settings.user_agent = user_agent.clone();
        }
        if let Some(timeout) = self.request_timeout {
            settings.request_timeout = timeout;
        }
        if let Some(capacity) = self.cache_capacity {
            settings.cache_capacity = Some(capacity);
        }
        if let Some(limit) = self.default_limit {
            settings.default_limit = limit;
        }
        if let Some(ref options) = self.limit_options {
            if !options.is_empty() {
                settings.limit_options = options.clone();
            }
        }
        if let Some(pages) = self.pages {
            settings.pages = pages.max(1);
        }
    }
}

/// Load settings from configuration (async version).
pub async fn load_settings() -> Settings {
    let config = Config::load().await;
    let mut settings = Settings::default();
    config.apply_to_settings(&mut settings);
    settings
}

//! Configuration management for helpdeskd.
//!
//! Loads settings from /etc/helpdesk/config.toml or uses defaults. Every
//! field has a serde default so a partial file is fine; a missing file means
//! an all-default config.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Config file path.
pub const CONFIG_PATH: &str = "/etc/helpdesk/config.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub limiter: LimiterConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address. Localhost only by default.
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "127.0.0.1:7870".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// Token-bucket admission settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimiterConfig {
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

fn default_max_tokens() -> u32 {
    10
}

fn default_window_secs() -> u64 {
    600
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            window_secs: default_window_secs(),
        }
    }
}

/// Answer cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_cache_capacity() -> usize {
    100
}

fn default_cache_ttl_secs() -> u64 {
    6 * 60 * 60
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}

/// Language model backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
    /// How long the backend keeps the model loaded after a request.
    #[serde(default = "default_keep_alive")]
    pub keep_alive: String,
}

fn default_llm_base_url() -> String {
    "http://127.0.0.1:11434".to_string()
}

fn default_llm_model() -> String {
    "qwen2.5:7b-instruct".to_string()
}

fn default_llm_timeout() -> u64 {
    120
}

fn default_keep_alive() -> String {
    "5m".to_string()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            timeout_secs: default_llm_timeout(),
            keep_alive: default_keep_alive(),
        }
    }
}

/// Web search tool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,
    /// Name of the environment variable holding the API key. Missing key
    /// means the tool serves placeholder results.
    #[serde(default = "default_search_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,
}

fn default_search_endpoint() -> String {
    "https://api.search.brave.com/res/v1/web/search".to_string()
}

fn default_search_api_key_env() -> String {
    "HELPDESK_SEARCH_API_KEY".to_string()
}

fn default_search_timeout() -> u64 {
    10
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: default_search_endpoint(),
            api_key_env: default_search_api_key_env(),
            timeout_secs: default_search_timeout(),
        }
    }
}

/// Page fetch tool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,
}

fn default_fetch_timeout() -> u64 {
    15
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout(),
        }
    }
}

impl Config {
    /// Load config from `path`, falling back to defaults when the file is
    /// missing or unreadable.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No config at {:?}, using defaults", path);
            return Ok(Self::default().normalized());
        }
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let config: Config = toml::from_str(&text)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;
        Ok(config.normalized())
    }

    /// Clamp nonsense values to workable minimums, warning as we go.
    fn normalized(mut self) -> Self {
        if self.limiter.max_tokens == 0 {
            warn!("limiter.max_tokens of 0 would deny everything, using 1");
            self.limiter.max_tokens = 1;
        }
        if self.limiter.window_secs == 0 {
            warn!("limiter.window_secs of 0 is invalid, using 1");
            self.limiter.window_secs = 1;
        }
        if self.cache.capacity == 0 {
            warn!("cache.capacity of 0 is invalid, using 1");
            self.cache.capacity = 1;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.limiter.max_tokens, 10);
        assert_eq!(config.limiter.window_secs, 600);
        assert_eq!(config.cache.capacity, 100);
        assert_eq!(config.cache.ttl_secs, 21_600);
        assert!(config.server.bind.starts_with("127.0.0.1"));
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = Config::load(Path::new("/nonexistent/helpdesk.toml")).unwrap();
        assert_eq!(config.cache.capacity, 100);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[limiter]\nmax_tokens = 3").unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.limiter.max_tokens, 3);
        assert_eq!(config.limiter.window_secs, 600);
        assert_eq!(config.llm.model, "qwen2.5:7b-instruct");
    }

    #[test]
    fn test_zero_values_are_normalized() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[limiter]\nmax_tokens = 0\nwindow_secs = 0").unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.limiter.max_tokens, 1);
        assert_eq!(config.limiter.window_secs, 1);
    }
}

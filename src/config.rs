use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// TMDB API key (required)
    pub tmdb_api_key: String,

    /// TMDB API base URL
    #[serde(default = "default_tmdb_api_url")]
    pub tmdb_api_url: String,

    /// Language passed to every TMDB query
    #[serde(default = "default_tmdb_language")]
    pub tmdb_language: String,

    /// Public TMDB site, used to build film links
    #[serde(default = "default_tmdb_site_url")]
    pub tmdb_site_url: String,

    /// JSON document holding every user's film list
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,

    /// Maximum outbound TMDB calls per window
    #[serde(default = "default_rate_limit_max_requests")]
    pub rate_limit_max_requests: usize,

    /// Rate limiter window length in milliseconds
    #[serde(default = "default_rate_limit_window_ms")]
    pub rate_limit_window_ms: u64,

    /// Transport-level timeout for TMDB calls
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// Contact named in the /help reply, e.g. a chat handle
    #[serde(default)]
    pub support_contact: Option<String>,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_tmdb_api_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_tmdb_language() -> String {
    "ru-RU".to_string()
}

fn default_tmdb_site_url() -> String {
    "https://www.themoviedb.org".to_string()
}

fn default_data_file() -> PathBuf {
    PathBuf::from("films.json")
}

fn default_rate_limit_max_requests() -> usize {
    8
}

fn default_rate_limit_window_ms() -> u64 {
    1000
}

fn default_http_timeout_secs() -> u64 {
    10
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// Builds a config with defaults for everything except the API key
    pub fn with_api_key(tmdb_api_key: impl Into<String>) -> Self {
        Self {
            tmdb_api_key: tmdb_api_key.into(),
            tmdb_api_url: default_tmdb_api_url(),
            tmdb_language: default_tmdb_language(),
            tmdb_site_url: default_tmdb_site_url(),
            data_file: default_data_file(),
            rate_limit_max_requests: default_rate_limit_max_requests(),
            rate_limit_window_ms: default_rate_limit_window_ms(),
            http_timeout_secs: default_http_timeout_secs(),
            support_contact: None,
            host: default_host(),
            port: default_port(),
        }
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_millis(self.rate_limit_window_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

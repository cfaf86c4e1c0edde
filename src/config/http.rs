use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Outbound HTTP client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HttpConfig {
    /// Base URL that relative work items are joined onto.
    /// TOML: `http.base_url`. Example: `https://mirror.example.org/files/`.
    #[serde(default)]
    pub base_url: Option<Url>,

    /// Optional upstream HTTP proxy. If set, used for the reqwest client.
    /// TOML: `http.proxy`. Example: `http://127.0.0.1:1080`.
    #[serde(default)]
    pub proxy: Option<Url>,

    /// Whole-request timeout in milliseconds.
    /// TOML: `http.timeout_ms`. Default: `30000`.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// TCP connect timeout in milliseconds.
    /// TOML: `http.connect_timeout_ms`. Default: `5000`.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// TOML: `http.user_agent`.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Aggregate request rate across all workers.
    /// TOML: `http.requests_per_second`. Default: `5`.
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,

    /// Allow HTTP/2 multiplexing; disabled forces HTTP/1 with `Connection: close`.
    /// TOML: `http.enable_multiplexing`. Default: `false`.
    #[serde(default)]
    pub enable_multiplexing: bool,
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            proxy: None,
            timeout_ms: default_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            user_agent: default_user_agent(),
            requests_per_second: default_requests_per_second(),
            enable_multiplexing: false,
        }
    }
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

fn default_user_agent() -> String {
    concat!("fetchline/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_requests_per_second() -> u32 {
    5
}

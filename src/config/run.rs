use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Worker pool, progress reporting and retry settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Number of concurrent workers; capped at the number of work items.
    /// TOML: `run.workers`. Default: `4`.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Delay between consecutive worker starts.
    /// TOML: `run.stagger_ms`. Default: `250`.
    #[serde(default = "default_stagger_ms")]
    pub stagger_ms: u64,

    /// TOML: `run.summary_interval_ms`. Default: `10000`.
    #[serde(default = "default_summary_interval_ms")]
    pub summary_interval_ms: u64,

    /// Zero attempts after this long with workers alive is reported as a stall.
    /// TOML: `run.stall_threshold_ms`. Default: `30000`.
    #[serde(default = "default_stall_threshold_ms")]
    pub stall_threshold_ms: u64,

    /// How long shutdown waits for workers before aborting them.
    /// TOML: `run.grace_period_ms`. Default: `2000`.
    #[serde(default = "default_grace_period_ms")]
    pub grace_period_ms: u64,

    /// Attempts per item before it is abandoned for this run.
    /// TOML: `run.max_attempts_per_item`. Default: `8`.
    #[serde(default = "default_max_attempts_per_item")]
    pub max_attempts_per_item: u32,

    /// Treat a 2xx body that is not valid JSON as a decode failure.
    /// TOML: `run.expect_json`. Default: `false`.
    #[serde(default)]
    pub expect_json: bool,

    /// TOML: `run.body_preview_chars`. Default: `2000`.
    #[serde(default = "default_body_preview_chars")]
    pub body_preview_chars: usize,

    #[serde(default)]
    pub backoff: BackoffConfig,
}

impl RunConfig {
    pub fn stagger(&self) -> Duration {
        Duration::from_millis(self.stagger_ms)
    }

    pub fn summary_interval(&self) -> Duration {
        Duration::from_millis(self.summary_interval_ms.max(1))
    }

    pub fn stall_threshold(&self) -> Duration {
        Duration::from_millis(self.stall_threshold_ms)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            stagger_ms: default_stagger_ms(),
            summary_interval_ms: default_summary_interval_ms(),
            stall_threshold_ms: default_stall_threshold_ms(),
            grace_period_ms: default_grace_period_ms(),
            max_attempts_per_item: default_max_attempts_per_item(),
            expect_json: false,
            body_preview_chars: default_body_preview_chars(),
            backoff: BackoffConfig::default(),
        }
    }
}

/// Exponential backoff parameters: `min(initial * factor^retries, max)`.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BackoffConfig {
    /// TOML: `run.backoff.initial_ms`. Default: `1000`.
    #[serde(default = "default_initial_ms")]
    pub initial_ms: u64,

    /// TOML: `run.backoff.factor`. Default: `2.0`.
    #[serde(default = "default_factor")]
    pub factor: f64,

    /// TOML: `run.backoff.max_ms`. Default: `60000`.
    #[serde(default = "default_max_ms")]
    pub max_ms: u64,
}

impl BackoffConfig {
    pub fn initial(&self) -> Duration {
        Duration::from_millis(self.initial_ms)
    }

    pub fn max(&self) -> Duration {
        Duration::from_millis(self.max_ms)
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_ms: default_initial_ms(),
            factor: default_factor(),
            max_ms: default_max_ms(),
        }
    }
}

fn default_workers() -> usize {
    4
}

fn default_stagger_ms() -> u64 {
    250
}

fn default_summary_interval_ms() -> u64 {
    10_000
}

fn default_stall_threshold_ms() -> u64 {
    30_000
}

fn default_grace_period_ms() -> u64 {
    2_000
}

fn default_max_attempts_per_item() -> u32 {
    8
}

fn default_body_preview_chars() -> usize {
    2_000
}

fn default_initial_ms() -> u64 {
    1_000
}

fn default_factor() -> f64 {
    2.0
}

fn default_max_ms() -> u64 {
    60_000
}

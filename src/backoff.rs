use std::time::Duration;

use crate::config::BackoffConfig;

/// Per-worker exponential backoff: `min(initial * factor^retries, max)`.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    factor: f64,
    max: Duration,
    delay: Duration,
    retries: u32,
}

impl Backoff {
    pub fn new(initial: Duration, factor: f64, max: Duration) -> Self {
        Self {
            initial,
            factor,
            max,
            delay: initial,
            retries: 0,
        }
    }

    /// Bumps the retry counter and returns the new delay.
    pub fn increase(&mut self) -> Duration {
        self.retries = self.retries.saturating_add(1);
        let exponent = i32::try_from(self.retries).unwrap_or(i32::MAX);
        let scaled = self.initial.as_secs_f64() * self.factor.powi(exponent);
        self.delay = if scaled.is_finite() && scaled < self.max.as_secs_f64() {
            Duration::from_secs_f64(scaled)
        } else {
            self.max
        };
        self.delay
    }

    pub fn reset(&mut self) {
        self.retries = 0;
        self.delay = self.initial;
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn is_backing_off(&self) -> bool {
        self.retries > 0
    }

    /// Current delay, stretched to a server-provided `Retry-After`, capped at `max`.
    pub fn delay_honoring(&self, retry_after: Option<Duration>) -> Duration {
        match retry_after {
            Some(wait) => self.delay.max(wait).min(self.max),
            None => self.delay,
        }
    }
}

impl From<BackoffConfig> for Backoff {
    fn from(cfg: BackoffConfig) -> Self {
        Self::new(cfg.initial(), cfg.factor, cfg.max())
    }
}

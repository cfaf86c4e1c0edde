mod basic;
mod http;
mod run;

pub use basic::BasicConfig;
pub use http::HttpConfig;
pub use run::{BackoffConfig, RunConfig};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::FetchlineError;

/// Application configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Logging and file locations (see `basic` table in fetchline.toml).
    #[serde(default)]
    pub basic: BasicConfig,

    /// Outbound HTTP client settings (see `http` table in fetchline.toml).
    #[serde(default)]
    pub http: HttpConfig,

    /// Worker pool and retry settings (see `run` table in fetchline.toml).
    #[serde(default)]
    pub run: RunConfig,
}

pub const DEFAULT_CONFIG_FILE: &str = "fetchline.toml";
const ENV_PREFIX: &str = "FETCHLINE_";

impl Config {
    /// Builds a Figment that merges defaults, an optional TOML file and `FETCHLINE_*` env vars.
    ///
    /// Nested keys use `__` in env names, e.g. `FETCHLINE_RUN__WORKERS=8`.
    pub fn figment(path: impl Into<PathBuf>) -> Figment {
        let path = path.into();
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));
        if path.is_file() {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Loads and validates configuration.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, FetchlineError> {
        let cfg: Self = Self::figment(path).extract()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), FetchlineError> {
        if self.run.workers == 0 {
            return Err(FetchlineError::InvalidConfig(
                "run.workers must be at least 1".to_string(),
            ));
        }
        if self.http.requests_per_second == 0 {
            return Err(FetchlineError::InvalidConfig(
                "http.requests_per_second must be at least 1".to_string(),
            ));
        }
        let backoff = &self.run.backoff;
        if backoff.factor < 1.0 || backoff.initial_ms == 0 || backoff.max_ms < backoff.initial_ms {
            return Err(FetchlineError::InvalidConfig(format!(
                "run.backoff must satisfy factor >= 1, initial_ms > 0, max_ms >= initial_ms (got {backoff:?})"
            )));
        }
        Ok(())
    }

    pub fn dedup_path(&self) -> PathBuf {
        self.basic.data_dir.join("finished.txt")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use std::time::Duration;

    #[test]
    fn defaults_apply_without_file() {
        Jail::expect_with(|_jail| {
            let cfg = Config::load("missing.toml").expect("defaults are valid");
            assert_eq!(cfg.run.workers, 4);
            assert_eq!(cfg.run.backoff.initial(), Duration::from_secs(1));
            assert_eq!(cfg.run.backoff.max(), Duration::from_secs(60));
            assert_eq!(cfg.run.grace_period(), Duration::from_secs(2));
            assert!(cfg.http.proxy.is_none());
            Ok(())
        });
    }

    #[test]
    fn toml_and_env_override_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "fetchline.toml",
                r#"
                [basic]
                loglevel = "debug"

                [run]
                workers = 2

                [run.backoff]
                factor = 3.0
                "#,
            )?;
            jail.set_env("FETCHLINE_RUN__WORKERS", "6");

            let cfg = Config::load(DEFAULT_CONFIG_FILE).expect("valid config");
            assert_eq!(cfg.basic.loglevel, "debug");
            assert_eq!(cfg.run.workers, 6);
            assert_eq!(cfg.run.backoff.factor, 3.0);
            Ok(())
        });
    }

    #[test]
    fn zero_workers_is_rejected() {
        Jail::expect_with(|jail| {
            jail.set_env("FETCHLINE_RUN__WORKERS", "0");
            let err = Config::load(DEFAULT_CONFIG_FILE).unwrap_err();
            assert!(matches!(err, FetchlineError::InvalidConfig(_)));
            Ok(())
        });
    }
}

use reqwest::StatusCode;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error as ThisError;

use super::IsRetryable;

#[derive(Debug, ThisError)]
pub enum FetchlineError {
    #[error("HTTP request error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Work item {item:?} does not resolve to an http(s) URL")]
    UnresolvableItem { item: String },

    #[error("Failed to persist to {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unexpected error: {0}")]
    UnexpectedError(String),
}

impl From<figment::Error> for FetchlineError {
    fn from(err: figment::Error) -> Self {
        FetchlineError::Config(Box::new(err))
    }
}

impl IsRetryable for FetchlineError {
    fn is_retryable(&self) -> bool {
        match self {
            FetchlineError::ReqwestError(_) => true,
            FetchlineError::UnexpectedError(_) => true,
            FetchlineError::UrlError(_) | FetchlineError::UnresolvableItem { .. } => false,
            _ => false,
        }
    }
}

/// Classification of one fetch attempt, driving the worker's next step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// 2xx with an acceptable body.
    Success { status: StatusCode, body: String },

    /// Not-found style answer; the item is finished and backoff resets.
    DefinitiveNegative { status: StatusCode },

    /// The server asked us to slow down.
    RateLimited {
        status: StatusCode,
        retry_after: Option<Duration>,
    },

    /// Any other non-2xx status.
    OtherStatus { status: StatusCode },

    /// Connect, timeout or proxy failure.
    TransientNetwork { message: String },

    /// The body could not be decoded as expected.
    ProtocolDecode { message: String },
}

impl Outcome {
    pub fn from_status(status: StatusCode, retry_after: Option<Duration>, body: String) -> Self {
        match status {
            s if s.is_success() => Outcome::Success { status: s, body },
            StatusCode::NOT_FOUND | StatusCode::GONE => Outcome::DefinitiveNegative { status },
            StatusCode::TOO_MANY_REQUESTS | StatusCode::SERVICE_UNAVAILABLE => {
                Outcome::RateLimited {
                    status,
                    retry_after,
                }
            }
            _ => Outcome::OtherStatus { status },
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Success { .. } => "success",
            Outcome::DefinitiveNegative { .. } => "not_found",
            Outcome::RateLimited { .. } => "rate_limited",
            Outcome::OtherStatus { .. } => "other_status",
            Outcome::TransientNetwork { .. } => "transient",
            Outcome::ProtocolDecode { .. } => "decode",
        }
    }
}

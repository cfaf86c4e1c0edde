use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::header::{CONNECTION, HeaderMap, HeaderValue, RETRY_AFTER};
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::Fetcher;
use crate::config::HttpConfig;
use crate::error::{FetchlineError, Outcome};

/// reqwest-backed fetcher sharing one client and one rate limiter across workers.
pub struct HttpFetcher {
    client: reqwest::Client,
    limiter: DefaultDirectRateLimiter,
    base_url: Option<Url>,
    expect_json: bool,
}

impl HttpFetcher {
    pub fn new(cfg: &HttpConfig, expect_json: bool) -> Result<Self, FetchlineError> {
        let mut headers = HeaderMap::new();
        let mut builder = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .connect_timeout(cfg.connect_timeout())
            .timeout(cfg.timeout());

        if let Some(proxy_url) = cfg.proxy.as_ref() {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url.as_str())?);
        }

        if !cfg.enable_multiplexing {
            headers.insert(CONNECTION, HeaderValue::from_static("close"));
            builder = builder
                .http1_only()
                .pool_max_idle_per_host(0)
                .pool_idle_timeout(Duration::from_secs(0));
        } else {
            builder = builder.http2_adaptive_window(true);
        }

        let client = builder.default_headers(headers).build()?;

        let rps = NonZeroU32::new(cfg.requests_per_second).ok_or_else(|| {
            FetchlineError::InvalidConfig("http.requests_per_second must be at least 1".to_string())
        })?;
        let limiter = RateLimiter::direct(Quota::per_second(rps));

        Ok(Self {
            client,
            limiter,
            base_url: cfg.base_url.clone(),
            expect_json,
        })
    }

    /// Absolute http(s) items are used as-is; anything else is joined onto `base_url`.
    pub fn resolve(&self, item: &str) -> Result<Url, FetchlineError> {
        let url = match Url::parse(item) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => match self.base_url.as_ref() {
                Some(base) => base.join(item)?,
                None => {
                    return Err(FetchlineError::UnresolvableItem {
                        item: item.to_owned(),
                    });
                }
            },
            Err(e) => return Err(e.into()),
        };
        match url.scheme() {
            "http" | "https" => Ok(url),
            _ => Err(FetchlineError::UnresolvableItem {
                item: item.to_owned(),
            }),
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, item: &str) -> Result<Outcome, FetchlineError> {
        let url = self.resolve(item)?;
        self.limiter.until_ready().await;

        let resp = match self.client.get(url.clone()).send().await {
            Ok(resp) => resp,
            Err(e) => {
                return Ok(Outcome::TransientNetwork {
                    message: e.to_string(),
                });
            }
        };

        let status = resp.status();
        let retry_after = parse_retry_after(resp.headers());
        let body = match resp.text().await {
            Ok(body) => body,
            Err(e) if e.is_timeout() || e.is_body() => {
                return Ok(Outcome::TransientNetwork {
                    message: e.to_string(),
                });
            }
            Err(e) => {
                return Ok(Outcome::ProtocolDecode {
                    message: e.to_string(),
                });
            }
        };
        debug!(%url, %status, bytes = body.len(), "Fetched");

        if status.is_success() && self.expect_json {
            if let Err(e) = serde_json::from_str::<serde_json::Value>(&body) {
                return Ok(Outcome::ProtocolDecode {
                    message: e.to_string(),
                });
            }
        }

        Ok(Outcome::from_status(status, retry_after, body))
    }
}

/// Only the delta-seconds form is honoured; HTTP-date values are ignored.
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher(base: Option<&str>) -> HttpFetcher {
        let cfg = HttpConfig {
            base_url: base.map(|b| Url::parse(b).unwrap()),
            ..HttpConfig::default()
        };
        HttpFetcher::new(&cfg, false).expect("client builds")
    }

    #[test]
    fn resolves_absolute_and_relative_items() {
        let with_base = fetcher(Some("https://mirror.test/files/"));
        assert_eq!(
            with_base.resolve("a/b.json").unwrap().as_str(),
            "https://mirror.test/files/a/b.json"
        );
        assert_eq!(
            with_base.resolve("http://other.test/x").unwrap().as_str(),
            "http://other.test/x"
        );

        let bare = fetcher(None);
        assert!(matches!(
            bare.resolve("abcde"),
            Err(FetchlineError::UnresolvableItem { .. })
        ));
        assert!(matches!(
            bare.resolve("ftp://host/file"),
            Err(FetchlineError::UnresolvableItem { .. })
        ));
    }

    #[test]
    fn retry_after_seconds_are_parsed() {
        let mut headers = HeaderMap::new();
        assert_eq!(parse_retry_after(&headers), None);
        headers.insert(RETRY_AFTER, HeaderValue::from_static(" 7 "));
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(7)));
        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(parse_retry_after(&headers), None);
    }
}

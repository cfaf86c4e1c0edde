mod client;

pub use client::HttpFetcher;

use async_trait::async_trait;

use crate::error::{FetchlineError, Outcome};

/// Performs one attempt for a work item and classifies the answer.
///
/// `Err` is reserved for failures outside the HTTP exchange itself, such as
/// an item that does not resolve to a URL.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, item: &str) -> Result<Outcome, FetchlineError>;
}

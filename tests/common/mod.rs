#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use fetchline::error::{FetchlineError, Outcome};
use fetchline::fetch::Fetcher;
use std::collections::VecDeque;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::SystemTime;
use tokio::net::TcpListener;
use tokio::time::Instant;
use url::Url;

/// Fresh directory under the system temp dir, unique per call.
pub fn unique_dir(tag: &str) -> PathBuf {
    static COUNTER: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(0);
    let mut hasher = DefaultHasher::new();
    SystemTime::now().hash(&mut hasher);
    std::process::id().hash(&mut hasher);
    COUNTER
        .fetch_add(1, std::sync::atomic::Ordering::Relaxed)
        .hash(&mut hasher);
    let dir = std::env::temp_dir().join(format!("fetchline_{tag}_{}", hasher.finish()));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

pub async fn spawn_test_server(app: Router) -> Url {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    let base = Url::parse(&format!("http://{}/", addr)).expect("valid base url");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server run");
    });

    base
}

/// Replays queued outcomes; once the script runs out, repeats `fallback`.
pub struct ScriptedFetcher {
    script: Mutex<VecDeque<Result<Outcome, FetchlineError>>>,
    fallback: Outcome,
    calls: Mutex<Vec<(String, Instant)>>,
}

impl ScriptedFetcher {
    pub fn new(script: Vec<Outcome>, fallback: Outcome) -> Self {
        Self::with_results(script.into_iter().map(Ok).collect(), fallback)
    }

    pub fn with_results(script: Vec<Result<Outcome, FetchlineError>>, fallback: Outcome) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(String, Instant)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, item: &str) -> Result<Outcome, FetchlineError> {
        self.calls
            .lock()
            .unwrap()
            .push((item.to_string(), Instant::now()));
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(self.fallback.clone()))
    }
}

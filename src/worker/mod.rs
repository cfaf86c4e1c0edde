mod progress;

pub use progress::{Counters, Progress};

use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::backoff::Backoff;
use crate::config::{BackoffConfig, RunConfig};
use crate::error::{FetchlineError, IsRetryable, Outcome};
use crate::fetch::Fetcher;
use crate::store::{DedupStore, ResultLog, WorkQueue};

const DECODE_PAUSE: Duration = Duration::from_millis(500);
const ERROR_PAUSE: Duration = Duration::from_secs(1);
const LOG_MESSAGE_CHARS: usize = 300;

#[derive(Debug, Clone, Copy)]
pub struct WorkerSettings {
    pub max_attempts_per_item: u32,
    pub backoff: BackoffConfig,
    pub decode_pause: Duration,
    pub error_pause: Duration,
}

impl From<&RunConfig> for WorkerSettings {
    fn from(run: &RunConfig) -> Self {
        Self {
            max_attempts_per_item: run.max_attempts_per_item.max(1),
            backoff: run.backoff,
            decode_pause: DECODE_PAUSE,
            error_pause: ERROR_PAUSE,
        }
    }
}

/// State shared by every worker of a run.
#[derive(Clone)]
pub struct SharedState {
    pub queue: Arc<WorkQueue>,
    pub dedup: Arc<DedupStore>,
    pub results: Arc<ResultLog>,
    pub fetcher: Arc<dyn Fetcher>,
    pub progress: Arc<Progress>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// The queue ran out of items.
    Drained,
    /// The stop signal was observed.
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct WorkerReport {
    pub index: usize,
    pub exit: WorkerExit,
    pub counters: Counters,
}

enum ItemExit {
    Finished,
    Abandoned,
    Cancelled,
}

pub struct Worker {
    index: usize,
    shared: SharedState,
    settings: WorkerSettings,
    backoff: Backoff,
    counters: Counters,
}

impl Worker {
    pub fn new(index: usize, shared: SharedState, settings: WorkerSettings) -> Self {
        Self {
            index,
            shared,
            settings,
            backoff: Backoff::from(settings.backoff),
            counters: Counters::default(),
        }
    }

    /// Takes items until the queue drains or `cancel` fires.
    pub async fn run(mut self, cancel: CancellationToken) -> WorkerReport {
        let exit = loop {
            if cancel.is_cancelled() {
                break WorkerExit::Cancelled;
            }

            let Some(item) = self.shared.queue.take() else {
                break WorkerExit::Drained;
            };

            if self.shared.dedup.contains(&item) {
                debug!(item, "Already finished; skipping");
                self.bump(|c| c.skipped += 1);
                continue;
            }

            match self.process(&item, &cancel).await {
                ItemExit::Finished | ItemExit::Abandoned => {}
                ItemExit::Cancelled => break WorkerExit::Cancelled,
            }
        };

        let status = match exit {
            WorkerExit::Drained => "done",
            WorkerExit::Cancelled => "stopped",
        };
        self.set_status(status);
        info!(
            ?exit,
            attempts = self.counters.attempts,
            successes = self.counters.successes,
            "Worker exiting"
        );

        WorkerReport {
            index: self.index,
            exit,
            counters: self.counters,
        }
    }

    async fn process(&mut self, item: &str, cancel: &CancellationToken) -> ItemExit {
        let mut attempts = 0u32;
        loop {
            if cancel.is_cancelled() {
                return ItemExit::Cancelled;
            }
            if attempts >= self.settings.max_attempts_per_item {
                warn!(item, attempts, "Giving up on item for this run");
                self.bump(|c| c.abandoned += 1);
                return ItemExit::Abandoned;
            }

            attempts += 1;
            self.set_status(format!("fetching {}", truncate(item, 80)));
            self.bump(|c| c.attempts += 1);

            let fetched = self.shared.fetcher.fetch(item).await;
            let pause = match fetched {
                Ok(Outcome::Success { status, body }) => {
                    if let Err(e) = self.shared.results.append(item, status, &body) {
                        error!(item, error = %e, "Failed to write result log entry");
                    }
                    self.finish(item);
                    self.backoff.reset();
                    self.bump(|c| c.successes += 1);
                    info!(item, %status, "Fetched");
                    return ItemExit::Finished;
                }
                Ok(Outcome::DefinitiveNegative { status }) => {
                    self.finish(item);
                    self.backoff.reset();
                    self.bump(|c| c.not_found += 1);
                    debug!(item, %status, "Not found");
                    return ItemExit::Finished;
                }
                Ok(Outcome::RateLimited {
                    status,
                    retry_after,
                }) => {
                    self.backoff.increase();
                    let delay = self.backoff.delay_honoring(retry_after);
                    warn!(
                        item,
                        %status,
                        retries = self.backoff.retries(),
                        delay_ms = delay.as_millis() as u64,
                        "Rate limited"
                    );
                    delay
                }
                Ok(Outcome::OtherStatus { status }) => {
                    if !self.backoff.is_backing_off() {
                        self.backoff.increase();
                    }
                    warn!(
                        item,
                        %status,
                        delay_ms = self.backoff.delay().as_millis() as u64,
                        "Unexpected status"
                    );
                    self.backoff.delay()
                }
                Ok(Outcome::TransientNetwork { message }) => {
                    let delay = self.backoff.increase();
                    warn!(
                        item,
                        error = %truncate(&message, LOG_MESSAGE_CHARS),
                        delay_ms = delay.as_millis() as u64,
                        "Network failure"
                    );
                    delay
                }
                Ok(Outcome::ProtocolDecode { message }) => {
                    warn!(
                        item,
                        error = %truncate(&message, LOG_MESSAGE_CHARS),
                        "Undecodable response"
                    );
                    self.settings.decode_pause
                }
                Err(e) if e.is_retryable() => {
                    error!(
                        item,
                        error = %truncate(&e.to_string(), LOG_MESSAGE_CHARS),
                        "Unexpected fetch error"
                    );
                    self.settings.error_pause
                }
                Err(e) => {
                    warn!(item, error = %e, "Skipping item that cannot be fetched");
                    self.bump(|c| c.abandoned += 1);
                    return ItemExit::Abandoned;
                }
            };

            self.bump(|c| c.failures += 1);
            if !self.pause(pause, cancel).await {
                return ItemExit::Cancelled;
            }
        }
    }

    /// Sleeps unless cancelled first. Returns `false` when the stop signal won.
    async fn pause(&self, delay: Duration, cancel: &CancellationToken) -> bool {
        if cancel.is_cancelled() {
            return false;
        }
        self.set_status(format!("backing off {:.1}s", delay.as_secs_f64()));
        tokio::select! {
            _ = cancel.cancelled() => false,
            _ = sleep(delay) => true,
        }
    }

    fn finish(&self, item: &str) {
        if let Err(e) = self.shared.dedup.add(item) {
            report_persistence_failure(item, &e);
        }
    }

    fn bump(&mut self, update: impl Fn(&mut Counters)) {
        update(&mut self.counters);
        self.shared.progress.record(update);
    }

    fn set_status(&self, status: impl Into<String>) {
        self.shared.progress.set_status(self.index, status);
    }
}

fn report_persistence_failure(item: &str, err: &FetchlineError) {
    error!(
        item,
        error = %err,
        "Finished item kept in memory only; it will be fetched again next run"
    );
}

fn truncate(s: &str, max_chars: usize) -> String {
    format!("{:.len$}", s, len = max_chars)
}

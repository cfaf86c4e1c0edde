use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior, interval, sleep, timeout_at};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info, info_span, warn};

use crate::config::Config;
use crate::error::FetchlineError;
use crate::fetch::Fetcher;
use crate::store::{DedupStore, ResultLog, WorkQueue, worklist};
use crate::worker::{Counters, Progress, SharedState, Worker, WorkerReport, WorkerSettings};

/// Summary of one run.
#[derive(Debug, Default)]
pub struct RunReport {
    pub items: usize,
    pub workers: usize,
    pub totals: Counters,
    pub exits: Vec<WorkerReport>,
    /// Workers that panicked or had to be aborted after the grace period.
    pub stragglers: Vec<usize>,
    pub elapsed: Duration,
}

pub struct Coordinator {
    cfg: Config,
    fetcher: Arc<dyn Fetcher>,
}

impl Coordinator {
    pub fn new(cfg: Config, fetcher: Arc<dyn Fetcher>) -> Self {
        Self { cfg, fetcher }
    }

    /// Runs the work list to completion, or until `cancel` fires and the grace period passes.
    pub async fn run(&self, cancel: CancellationToken) -> Result<RunReport, FetchlineError> {
        let started = Instant::now();
        let run = &self.cfg.run;

        let items = worklist::load(&self.cfg.basic.work_list)?;
        if items.is_empty() {
            info!(
                path = %self.cfg.basic.work_list.display(),
                "0 work items loaded; nothing to do"
            );
            return Ok(RunReport::default());
        }

        let dedup = Arc::new(DedupStore::open(self.cfg.dedup_path())?);
        let item_count = items.len();
        let worker_count = run.workers.min(item_count);
        let progress = Arc::new(Progress::new(worker_count));
        let shared = SharedState {
            queue: Arc::new(WorkQueue::new(items)),
            dedup,
            results: Arc::new(ResultLog::new(
                self.cfg.basic.data_dir.clone(),
                run.body_preview_chars,
            )),
            fetcher: self.fetcher.clone(),
            progress: progress.clone(),
        };
        let settings = WorkerSettings::from(run);

        info!(
            items = item_count,
            workers = worker_count,
            already_finished = shared.dedup.len(),
            "Starting run"
        );

        let mut set = JoinSet::new();
        let mut pending: BTreeSet<usize> = BTreeSet::new();
        for index in 0..worker_count {
            let worker = Worker::new(index, shared.clone(), settings);
            let token = cancel.clone();
            let stagger = run.stagger() * u32::try_from(index).unwrap_or(u32::MAX);
            pending.insert(index);
            set.spawn(
                async move {
                    if !stagger.is_zero() {
                        tokio::select! {
                            _ = token.cancelled() => {}
                            _ = sleep(stagger) => {}
                        }
                    }
                    worker.run(token).await
                }
                .instrument(info_span!("worker", worker = index)),
            );
        }

        let mut exits = Vec::with_capacity(worker_count);
        let mut summary = interval(run.summary_interval());
        summary.set_missed_tick_behavior(MissedTickBehavior::Delay);
        summary.tick().await;
        let stall_check = sleep(run.stall_threshold());
        tokio::pin!(stall_check);
        let mut stall_checked = false;
        let mut stopping = false;

        loop {
            tokio::select! {
                joined = set.join_next() => match joined {
                    Some(joined) => collect(joined, &mut pending, &mut exits),
                    None => break,
                },
                _ = summary.tick() => {
                    log_summary(started.elapsed(), &progress, &shared.queue);
                }
                _ = &mut stall_check, if !stall_checked => {
                    stall_checked = true;
                    if progress.snapshot().attempts == 0 && !set.is_empty() {
                        warn!(
                            alive = set.len(),
                            statuses = ?progress.statuses(),
                            "No attempts since start; workers appear stalled"
                        );
                    }
                }
                _ = cancel.cancelled(), if !stopping => {
                    stopping = true;
                    break;
                }
            }
        }

        if stopping {
            info!(
                grace_ms = run.grace_period().as_millis() as u64,
                "Stop requested; waiting for workers"
            );
            let deadline = Instant::now() + run.grace_period();
            loop {
                match timeout_at(deadline, set.join_next()).await {
                    Ok(Some(joined)) => collect(joined, &mut pending, &mut exits),
                    Ok(None) => break,
                    Err(_) => {
                        warn!(
                            workers = ?pending,
                            "Workers did not exit within the grace period; aborting"
                        );
                        set.abort_all();
                        break;
                    }
                }
            }
        }

        let totals = progress.snapshot();
        exits.sort_by_key(|r| r.index);
        let report = RunReport {
            items: item_count,
            workers: worker_count,
            totals,
            exits,
            stragglers: pending.into_iter().collect(),
            elapsed: started.elapsed(),
        };

        log_summary(report.elapsed, &progress, &shared.queue);
        if !report.stragglers.is_empty() {
            warn!(workers = ?report.stragglers, "Some workers did not exit cleanly");
        }
        Ok(report)
    }
}

fn collect(
    joined: Result<WorkerReport, tokio::task::JoinError>,
    pending: &mut BTreeSet<usize>,
    exits: &mut Vec<WorkerReport>,
) {
    match joined {
        Ok(report) => {
            pending.remove(&report.index);
            exits.push(report);
        }
        Err(e) => {
            error!("A worker task panicked or failed to join: {:?}", e);
        }
    }
}

fn log_summary(elapsed: Duration, progress: &Progress, queue: &WorkQueue) {
    let counters = progress.snapshot();
    let secs = elapsed.as_secs_f64();
    let rate = if secs > 0.0 {
        counters.attempts as f64 / secs
    } else {
        0.0
    };
    info!(
        elapsed_s = secs,
        attempts = counters.attempts,
        successes = counters.successes,
        not_found = counters.not_found,
        failures = counters.failures,
        skipped = counters.skipped,
        remaining = queue.remaining(),
        rate_per_s = rate,
        statuses = ?progress.statuses(),
        "Progress"
    );
}

use std::sync::{Mutex, MutexGuard};

/// Attempt and outcome counts, kept per worker and in aggregate.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Counters {
    pub attempts: u64,
    pub successes: u64,
    pub not_found: u64,
    pub failures: u64,
    pub skipped: u64,
    pub abandoned: u64,
}

impl Counters {
    pub fn merge(&mut self, other: &Counters) {
        self.attempts += other.attempts;
        self.successes += other.successes;
        self.not_found += other.not_found;
        self.failures += other.failures;
        self.skipped += other.skipped;
        self.abandoned += other.abandoned;
    }
}

/// Aggregate counters plus one textual status per worker, read by the coordinator.
#[derive(Debug)]
pub struct Progress {
    counters: Mutex<Counters>,
    statuses: Mutex<Vec<String>>,
}

impl Progress {
    pub fn new(workers: usize) -> Self {
        Self {
            counters: Mutex::new(Counters::default()),
            statuses: Mutex::new(vec!["idle".to_string(); workers]),
        }
    }

    pub fn record(&self, update: impl FnOnce(&mut Counters)) {
        update(&mut relock(&self.counters));
    }

    pub fn snapshot(&self) -> Counters {
        *relock(&self.counters)
    }

    pub fn set_status(&self, worker: usize, status: impl Into<String>) {
        if let Some(slot) = relock(&self.statuses).get_mut(worker) {
            *slot = status.into();
        }
    }

    pub fn statuses(&self) -> Vec<String> {
        relock(&self.statuses).clone()
    }
}

fn relock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

use crate::error::FetchlineError;

const HEADER: &str = "# fetchline: finished work items - one per line";

/// Persistent set of finished work items.
///
/// `add` records the item in memory before touching the file, so a failed
/// write still keeps the item out of this run.
#[derive(Debug)]
pub struct DedupStore {
    path: PathBuf,
    inner: Mutex<Inner>,
}

#[derive(Debug)]
struct Inner {
    seen: HashSet<String>,
    file: Option<File>,
}

impl DedupStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, FetchlineError> {
        let path = path.into();
        let contents = super::read_or_create(&path, HEADER)?;
        let seen: HashSet<String> = super::entries(&contents).map(str::to_owned).collect();
        info!(path = %path.display(), loaded = seen.len(), "Dedup store opened");

        let file = OpenOptions::new().append(true).open(&path)?;
        Ok(Self {
            path,
            inner: Mutex::new(Inner {
                seen,
                file: Some(file),
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, item: &str) -> bool {
        self.lock().seen.contains(item)
    }

    pub fn len(&self) -> usize {
        self.lock().seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Records `item`. Returns `Ok(false)` when it was already present.
    ///
    /// On a write failure the item stays in memory and the error is returned
    /// as [`FetchlineError::Persistence`]; the next `add` reopens the file.
    pub fn add(&self, item: &str) -> Result<bool, FetchlineError> {
        let mut inner = self.lock();
        if !inner.seen.insert(item.to_owned()) {
            return Ok(false);
        }

        let written = self.append_durably(&mut inner.file, item);

        match written {
            Ok(()) => {
                debug!(item, "Recorded finished item");
                Ok(true)
            }
            Err(source) => {
                inner.file = None;
                Err(FetchlineError::Persistence {
                    path: self.path.clone(),
                    source,
                })
            }
        }
    }

    fn append_durably(&self, slot: &mut Option<File>, item: &str) -> std::io::Result<()> {
        let file = match slot.take() {
            Some(file) => file,
            None => OpenOptions::new().append(true).open(&self.path)?,
        };
        append_line(slot.insert(file), item)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A panic while holding the lock cannot leave the set half-updated.
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn append_line(file: &mut File, item: &str) -> std::io::Result<()> {
    writeln!(file, "{item}")?;
    file.sync_data()
}

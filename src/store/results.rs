use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::error::FetchlineError;

/// Dated, append-only log of successful fetches.
#[derive(Debug)]
pub struct ResultLog {
    dir: PathBuf,
    preview_chars: usize,
    write_lock: Mutex<()>,
}

impl ResultLog {
    pub fn new(dir: impl Into<PathBuf>, preview_chars: usize) -> Self {
        Self {
            dir: dir.into(),
            preview_chars,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path_for(&self, at: DateTime<Utc>) -> PathBuf {
        self.dir
            .join(format!("results-{}.log", at.format("%Y-%m-%d")))
    }

    pub fn append(&self, item: &str, status: StatusCode, body: &str) -> Result<PathBuf, FetchlineError> {
        self.append_at(Utc::now(), item, status, body)
    }

    pub fn append_at(
        &self,
        at: DateTime<Utc>,
        item: &str,
        status: StatusCode,
        body: &str,
    ) -> Result<PathBuf, FetchlineError> {
        let path = self.path_for(at);
        let entry = format!(
            "[{}] {} status={}\n{:.len$}\n---\n",
            at.to_rfc3339(),
            item,
            status.as_u16(),
            body,
            len = self.preview_chars
        );

        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let persist = |source| FetchlineError::Persistence {
            path: path.clone(),
            source,
        };
        fs::create_dir_all(&self.dir).map_err(persist)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(persist)?;
        file.write_all(entry.as_bytes()).map_err(persist)?;
        file.sync_data().map_err(persist)?;
        Ok(path)
    }
}

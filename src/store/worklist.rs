use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

use crate::error::FetchlineError;

const HEADER: &str = "# fetchline work list - one URL per line";

/// Loads the work list, creating an empty one with a header when missing.
/// Duplicate entries keep their first position.
pub fn load(path: &Path) -> Result<Vec<String>, FetchlineError> {
    let contents = super::read_or_create(path, HEADER)?;
    let mut seen = HashSet::new();
    let items: Vec<String> = super::entries(&contents)
        .filter(|entry| seen.insert(*entry))
        .map(str::to_owned)
        .collect();
    info!(path = %path.display(), items = items.len(), "Work list loaded");
    Ok(items)
}

/// Shared cursor over the loaded work items.
#[derive(Debug)]
pub struct WorkQueue {
    items: Vec<String>,
    cursor: Mutex<usize>,
}

impl WorkQueue {
    pub fn new(items: Vec<String>) -> Self {
        Self {
            items,
            cursor: Mutex::new(0),
        }
    }

    /// Hands out each item exactly once across all callers.
    pub fn take(&self) -> Option<String> {
        let mut cursor = self
            .cursor
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let item = self.items.get(*cursor)?.clone();
        *cursor += 1;
        Some(item)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn remaining(&self) -> usize {
        let cursor = *self
            .cursor
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        self.items.len().saturating_sub(cursor)
    }
}

//! Line-delimited files backing a run: the work list, the finished-item
//! store and the dated result logs.

pub mod dedup;
pub mod results;
pub mod worklist;

pub use dedup::DedupStore;
pub use results::ResultLog;
pub use worklist::WorkQueue;

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

/// Yields trimmed entries, skipping blank lines and `#` comments.
pub(crate) fn entries(contents: &str) -> impl Iterator<Item = &str> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
}

/// Reads `path`, creating it (and its parent directory) with `header` when missing.
pub(crate) fn read_or_create(path: &Path, header: &str) -> io::Result<String> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(contents),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            let mut file = OpenOptions::new().create_new(true).write(true).open(path)?;
            writeln!(file, "{header}")?;
            Ok(String::new())
        }
        Err(err) => Err(err),
    }
}

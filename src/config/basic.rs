use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Basic (core) configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BasicConfig {
    /// Log level for tracing subscriber initialization (e.g., "error", "warn", "info", "debug", "trace").
    /// TOML: `basic.loglevel`. Default: `info`.
    #[serde(default = "default_loglevel")]
    pub loglevel: String,

    /// Directory holding the finished-items file and the dated result logs.
    /// TOML: `basic.data_dir`. Default: `data`.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Line-delimited work list, one URL (or path under `http.base_url`) per line.
    /// TOML: `basic.work_list`. Default: `worklist.txt`.
    #[serde(default = "default_work_list")]
    pub work_list: PathBuf,
}

impl Default for BasicConfig {
    fn default() -> Self {
        Self {
            loglevel: default_loglevel(),
            data_dir: default_data_dir(),
            work_list: default_work_list(),
        }
    }
}

fn default_loglevel() -> String {
    "info".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_work_list() -> PathBuf {
    PathBuf::from("worklist.txt")
}

// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::path::PathBuf;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeConfig {
    pub journal_path: PathBuf,
    /// After replay, write recovered state back to the primary store and
    /// trim the journal.
    pub trim_on_start: bool,
    /// Print the Prometheus exposition on exit.
    pub dump_metrics: bool,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            journal_path: PathBuf::from("mds.journal"),
            trim_on_start: false,
            dump_metrics: false,
        }
    }
}

impl NodeConfig {
    /// Defaults overridden by `MDS_JOURNAL_PATH`, `MDS_TRIM_ON_START` and
    /// `MDS_DUMP_METRICS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();
        if let Some(path) = lookup("MDS_JOURNAL_PATH") {
            cfg.journal_path = PathBuf::from(path);
        }
        if let Some(v) = lookup("MDS_TRIM_ON_START") {
            cfg.trim_on_start = parse_flag(&v);
        }
        if let Some(v) = lookup("MDS_DUMP_METRICS") {
            cfg.dump_metrics = parse_flag(&v);
        }
        cfg
    }
}

fn parse_flag(v: &str) -> bool {
    matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

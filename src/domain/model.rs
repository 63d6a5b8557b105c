use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One person read from the input file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub first_name: String,
    pub last_name: String,
}

impl Record {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }
}

/// 一個 chunk：最多 chunk_size 筆記錄，作為 sink 的提交單位
pub type Chunk = Vec<Record>;

/// 大寫轉換規則
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum CaseMapping {
    /// Only `a-z` are mapped; every other character passes through.
    #[default]
    Ascii,
    /// Full Unicode uppercase mapping (locale independent).
    Unicode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Idle,
    Running,
    Completed,
    Failed,
}

/// Counters owned by the runner for the duration of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunState {
    pub chunk_index: usize,
    pub chunks_committed: usize,
    pub records_read: u64,
    pub records_written: u64,
}

/// Final report of a run, printable as JSON.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub job_name: String,
    pub run_id: Option<String>,
    pub status: RunStatus,
    pub chunk_size: usize,
    pub chunks_committed: usize,
    pub records_read: u64,
    pub records_written: u64,
    pub lines_skipped: u64,
    pub failed_chunk: Option<usize>,
    pub failed_line: Option<u64>,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
}

//! Types for the job module.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

use crate::resolver::ResultReference;

/// Everything the external unit needs for one run. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobParameters {
    pub job_id: String,
    /// Staged input file.
    pub input_path: PathBuf,
    /// Fixed reference resource (e.g. the nail frame image).
    pub auxiliary_path: PathBuf,
    /// Identifier under which the unit publishes its artifact.
    pub output_id: String,
}

impl JobParameters {
    /// Builds parameters with a fresh job id and output identifier.
    pub fn generate(input_path: PathBuf, auxiliary_path: PathBuf) -> Self {
        Self {
            job_id: Uuid::new_v4().to_string(),
            input_path,
            auxiliary_path,
            output_id: format!("out-{}", Uuid::new_v4().simple()),
        }
    }
}

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Why a job ended up in [`JobState::Failed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The upload could not be persisted; nothing was dispatched.
    Staging,
    /// The external unit could not be launched.
    Spawn,
    /// The unit ran and exited unsuccessfully. `None` when killed by a signal.
    AbnormalExit { code: Option<i32> },
    /// The wall-clock limit elapsed and the unit was killed.
    Timeout,
    /// The job was cancelled and the unit was killed.
    Cancelled,
}

impl FailureReason {
    /// Label used for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Staging => "staging",
            Self::Spawn => "spawn",
            Self::AbnormalExit { .. } => "abnormal_exit",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Bounded stderr capture. Once full, the oldest bytes are evicted so the
/// buffer always holds the most recent output.
#[derive(Debug, Clone)]
pub struct StderrLog {
    buf: VecDeque<u8>,
    capacity: usize,
    total_bytes: u64,
}

impl StderrLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: VecDeque::with_capacity(capacity.min(8 * 1024)),
            capacity,
            total_bytes: 0,
        }
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.total_bytes += chunk.len() as u64;

        if self.capacity == 0 {
            return;
        }

        // Only the tail of an oversized chunk can survive.
        let chunk = if chunk.len() > self.capacity {
            &chunk[chunk.len() - self.capacity..]
        } else {
            chunk
        };

        let overflow = (self.buf.len() + chunk.len()).saturating_sub(self.capacity);
        self.buf.drain(..overflow);
        self.buf.extend(chunk);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes ever pushed, including evicted ones.
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn truncated(&self) -> bool {
        self.total_bytes > self.buf.len() as u64
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.buf.iter().copied().collect()
    }

    /// Retained output decoded lossily.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.bytes()).into_owned()
    }

    /// Retained output without the leading partial line that eviction may
    /// have cut in half. Without eviction this equals `to_string_lossy`.
    pub fn complete_lines_lossy(&self) -> String {
        let text = self.to_string_lossy();
        if !self.truncated() {
            return text;
        }
        match text.find('\n') {
            Some(end) => text[end + 1..].to_string(),
            None => String::new(),
        }
    }
}

/// One submission's end-to-end attempt.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: String,
    pub parameters: JobParameters,
    pub(crate) state: JobState,
    pub exit_code: Option<i32>,
    pub stdout_bytes: u64,
    pub stderr_log: StderrLog,
    pub result: Option<ResultReference>,
    pub failure: Option<FailureReason>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(parameters: JobParameters, max_stderr_bytes: usize) -> Self {
        Self {
            id: parameters.job_id.clone(),
            parameters,
            state: JobState::Pending,
            exit_code: None,
            stdout_bytes: 0,
            stderr_log: StderrLog::new(max_stderr_bytes),
            result: None,
            failure: None,
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn state(&self) -> JobState {
        self.state
    }
}

//! Types for the orchestrator module.

use std::path::PathBuf;
use std::time::Duration;

use crate::config::Config;
use crate::error::JobError;
use crate::job::Job;
use crate::resolver::ResultReference;
use crate::staging::StagedFile;

/// One uploaded image as received from the caller.
#[derive(Debug, Clone)]
pub struct Submission {
    pub bytes: Vec<u8>,
    pub original_name: String,
    pub content_type: Option<String>,
}

impl Submission {
    pub fn new(
        bytes: impl Into<Vec<u8>>,
        original_name: impl Into<String>,
        content_type: Option<String>,
    ) -> Self {
        Self {
            bytes: bytes.into(),
            original_name: original_name.into(),
            content_type,
        }
    }
}

/// Per-job knobs taken from configuration.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub auxiliary_path: PathBuf,
    pub max_stderr_bytes: usize,
    pub max_upload_bytes: usize,
    pub timeout: Option<Duration>,
    pub retain_inputs: bool,
}

impl OrchestratorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            auxiliary_path: config.worker.auxiliary_path.clone(),
            max_stderr_bytes: config.worker.max_stderr_bytes,
            max_upload_bytes: config.staging.max_upload_bytes,
            timeout: config.worker.timeout(),
            retain_inputs: config.staging.retain_inputs,
        }
    }
}

/// Successful submission.
#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub job_id: String,
    pub result: ResultReference,
    pub duration_ms: u64,
}

/// Full record of one submission, for callers that need more than the
/// outcome (tests, diagnostics).
#[derive(Debug)]
pub struct JobReport {
    /// `None` when the submission failed before a job existed.
    pub job: Option<Job>,
    pub staged: Option<StagedFile>,
    pub result: Result<ResultReference, JobError>,
    pub duration_ms: u64,
}

impl JobReport {
    pub fn into_outcome(self) -> Result<JobOutcome, JobError> {
        let job_id = self.job.map(|j| j.id).unwrap_or_default();
        let duration_ms = self.duration_ms;
        self.result.map(|result| JobOutcome {
            job_id,
            result,
            duration_ms,
        })
    }
}

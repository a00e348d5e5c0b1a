//! Maps terminal jobs to caller-facing outcomes.

use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, warn};

use super::publisher::ArtifactPublisher;
use super::redact::{redactor_for, Redactor};
use super::types::ResultReference;
use crate::error::JobError;
use crate::job::{FailureReason, Job, JobState};

pub struct ResultResolver {
    publisher: Arc<dyn ArtifactPublisher>,
    redactor: Redactor,
}

impl ResultResolver {
    pub fn new(publisher: Arc<dyn ArtifactPublisher>, redactor: Redactor) -> Self {
        Self {
            publisher,
            redactor,
        }
    }

    /// Builds a resolver whose redactor masks the staging directory, the
    /// auxiliary resource and the worker program.
    pub fn with_sensitive_paths(
        publisher: Arc<dyn ArtifactPublisher>,
        max_excerpt: usize,
        staging_dir: PathBuf,
        auxiliary_path: PathBuf,
        worker_program: PathBuf,
    ) -> Self {
        let redactor = redactor_for(
            max_excerpt,
            [
                (staging_dir, "<staging>"),
                (auxiliary_path, "<auxiliary>"),
                (worker_program, "<worker>"),
            ],
        );
        Self::new(publisher, redactor)
    }

    pub fn publisher_name(&self) -> &str {
        self.publisher.name()
    }

    /// Succeeded jobs are published; failed jobs become redacted errors.
    pub async fn resolve(&self, job: &Job) -> Result<ResultReference, JobError> {
        match job.state() {
            JobState::Succeeded => self.publisher.publish(&job.parameters).await.map_err(|e| {
                error!(job_id = %job.id, error = %e, "Failed to publish artifact");
                JobError::publish()
            }),
            JobState::Failed => Err(self.failure_error(job)),
            state => {
                // Resolution runs only after the tracker finished.
                warn!(job_id = %job.id, state = %state, "Resolving a job that is not terminal");
                Err(JobError::cancelled())
            }
        }
    }

    pub fn failure_error(&self, job: &Job) -> JobError {
        match &job.failure {
            Some(FailureReason::Staging) => JobError::io(),
            Some(FailureReason::Spawn) => JobError::spawn(),
            Some(FailureReason::Timeout) => JobError::timeout(),
            Some(FailureReason::Cancelled) => JobError::cancelled(),
            Some(FailureReason::AbnormalExit { code }) => {
                let input = job.parameters.input_path.to_string_lossy();
                let excerpt = self.redactor.excerpt(
                    &job.stderr_log.complete_lines_lossy(),
                    &[
                        input.as_ref(),
                        job.id.as_str(),
                        job.parameters.output_id.as_str(),
                    ],
                );
                JobError::abnormal_exit(*code, &excerpt)
            }
            None => JobError::abnormal_exit(job.exit_code, ""),
        }
    }
}

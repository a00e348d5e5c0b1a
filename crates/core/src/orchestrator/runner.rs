//! Submission pipeline.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{error, info, warn};

use super::types::{JobOutcome, JobReport, OrchestratorSettings, Submission};
use super::validate::validate_submission;
use crate::error::JobError;
use crate::job::{FailureReason, Job, JobParameters, JobTracker};
use crate::metrics::{self, JOBS_IN_FLIGHT, STAGED_BYTES_TOTAL};
use crate::resolver::ResultResolver;
use crate::staging::StagingStore;
use crate::worker::WorkerInvoker;

/// Runs submissions end to end.
///
/// Cheap to share behind an `Arc`; every submission gets its own job and
/// tracker, so concurrent calls never observe each other.
pub struct JobOrchestrator {
    settings: OrchestratorSettings,
    staging: Arc<StagingStore>,
    invoker: Arc<dyn WorkerInvoker>,
    resolver: ResultResolver,
}

impl JobOrchestrator {
    pub fn new(
        settings: OrchestratorSettings,
        staging: Arc<StagingStore>,
        invoker: Arc<dyn WorkerInvoker>,
        resolver: ResultResolver,
    ) -> Self {
        Self {
            settings,
            staging,
            invoker,
            resolver,
        }
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    pub fn staging(&self) -> &StagingStore {
        &self.staging
    }

    pub async fn submit(&self, submission: Submission) -> Result<JobOutcome, JobError> {
        self.run(submission, None).await.into_outcome()
    }

    /// Like [`submit`](Self::submit), but flipping `cancel` to `true` kills
    /// the worker and fails the job with `Cancelled`.
    pub async fn submit_with_cancel(
        &self,
        submission: Submission,
        cancel: watch::Receiver<bool>,
    ) -> Result<JobOutcome, JobError> {
        self.run(submission, Some(cancel)).await.into_outcome()
    }

    /// Runs the submission on its own task so that it always reaches a
    /// terminal state. Dropping the returned future (a client that went
    /// away) cancels the job: the worker is killed, the job fails with
    /// `Cancelled`, and input retention still applies.
    pub async fn submit_cancel_on_drop(
        self: &Arc<Self>,
        submission: Submission,
    ) -> Result<JobOutcome, JobError> {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let _cancel = CancelOnDrop(cancel_tx);

        let orchestrator = Arc::clone(self);
        let task = tokio::spawn(async move {
            orchestrator.submit_with_cancel(submission, cancel_rx).await
        });

        match task.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => {
                warn!(error = %e, "Submission task aborted");
                Err(JobError::cancelled())
            }
        }
    }

    /// Runs one submission and returns everything that was produced along
    /// the way. Any failure short-circuits the remaining steps.
    pub async fn run(
        &self,
        submission: Submission,
        cancel: Option<watch::Receiver<bool>>,
    ) -> JobReport {
        let started = Instant::now();
        let _in_flight = InFlightGuard::new();

        let report = self.execute(submission, cancel, started).await;

        let outcome = match &report.result {
            Ok(_) => "succeeded",
            Err(e) => e.code.as_str(),
        };
        metrics::record_outcome(outcome, started.elapsed().as_secs_f64());

        match (&report.job, &report.result) {
            (Some(job), Ok(reference)) => info!(
                job_id = %job.id,
                result = %reference,
                duration_ms = report.duration_ms,
                "Job succeeded"
            ),
            (Some(job), Err(e)) => warn!(
                job_id = %job.id,
                code = %e.code,
                exit_code = ?job.exit_code,
                duration_ms = report.duration_ms,
                "Job failed"
            ),
            (None, Err(e)) => info!(code = %e.code, "Submission rejected"),
            (None, Ok(_)) => {}
        }

        report
    }

    async fn execute(
        &self,
        submission: Submission,
        cancel: Option<watch::Receiver<bool>>,
        started: Instant,
    ) -> JobReport {
        if let Err(e) = validate_submission(
            &submission.bytes,
            submission.content_type.as_deref(),
            self.settings.max_upload_bytes,
        ) {
            return JobReport {
                job: None,
                staged: None,
                result: Err(e),
                duration_ms: started.elapsed().as_millis() as u64,
            };
        }

        let Submission {
            bytes,
            original_name,
            ..
        } = submission;

        let staged = match self.staging.stage(&bytes, &original_name).await {
            Ok(staged) => staged,
            Err(e) => {
                // The job exists only to record the failure; it has no input.
                let params =
                    JobParameters::generate(PathBuf::new(), self.settings.auxiliary_path.clone());
                let mut tracker =
                    JobTracker::new(Job::new(params, self.settings.max_stderr_bytes));
                error!(job_id = %tracker.job().id, error = %e, "Failed to stage upload");
                tracker.fail(FailureReason::Staging);
                let result = Err(self.resolver.failure_error(tracker.job()));
                return JobReport {
                    job: Some(tracker.into_job()),
                    staged: None,
                    result,
                    duration_ms: started.elapsed().as_millis() as u64,
                };
            }
        };
        drop(bytes);
        STAGED_BYTES_TOTAL.inc_by(staged.size_bytes);

        let params = JobParameters::generate(
            staged.path.clone(),
            self.settings.auxiliary_path.clone(),
        );
        let mut tracker = JobTracker::new(Job::new(params, self.settings.max_stderr_bytes));
        info!(
            job_id = %tracker.job().id,
            staged = %staged.name,
            size = staged.size_bytes,
            invoker = self.invoker.name(),
            "Job created"
        );

        let cancelled_early = cancel.as_ref().is_some_and(|rx| *rx.borrow());
        if cancelled_early {
            info!(job_id = %tracker.job().id, "Job cancelled before the worker started");
            tracker.fail(FailureReason::Cancelled);
        } else {
            self.start_and_drive(&mut tracker, cancel).await;
        }

        let result = self.resolver.resolve(tracker.job()).await;
        if let Ok(reference) = &result {
            tracker.record_result(reference.clone());
        }

        if !self.settings.retain_inputs {
            match self.staging.remove(&staged).await {
                Ok(()) => {}
                Err(e) => warn!(
                    job_id = %tracker.job().id,
                    error = %e,
                    "Failed to remove staged input"
                ),
            }
        }

        JobReport {
            job: Some(tracker.into_job()),
            staged: Some(staged),
            result,
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }

    async fn start_and_drive(
        &self,
        tracker: &mut JobTracker,
        cancel: Option<watch::Receiver<bool>>,
    ) {
        match self.invoker.invoke(&tracker.job().parameters).await {
            Ok(handle) => {
                tracker.mark_running();
                tracker.drive(handle, self.settings.timeout, cancel).await;
            }
            Err(e) => {
                error!(job_id = %tracker.job().id, error = %e, "Failed to start worker");
                tracker.fail(FailureReason::Spawn);
            }
        }
    }
}

/// Flips the cancellation flag when the waiting side goes away.
struct CancelOnDrop(watch::Sender<bool>);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.send_replace(true);
    }
}

/// Keeps the in-flight gauge balanced even if the submission future is
/// dropped mid-way.
struct InFlightGuard;

impl InFlightGuard {
    fn new() -> Self {
        JOBS_IN_FLIGHT.inc();
        Self
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        JOBS_IN_FLIGHT.dec();
    }
}

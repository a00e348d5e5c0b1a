//! Drives a job from a worker handle to a terminal state.

use chrono::Utc;
use std::future::pending;
use tokio::sync::watch;
use tokio::time::{sleep_until, Duration, Instant};
use tracing::{debug, info, warn};

use super::types::{FailureReason, Job, JobState};
use crate::metrics::STDERR_BYTES_TOTAL;
use crate::resolver::ResultReference;
use crate::worker::{JobHandle, WorkerEvent};

/// Sole owner of a job's state transitions.
#[derive(Debug)]
pub struct JobTracker {
    job: Job,
}

impl JobTracker {
    pub fn new(job: Job) -> Self {
        Self { job }
    }

    pub fn job(&self) -> &Job {
        &self.job
    }

    pub fn into_job(self) -> Job {
        self.job
    }

    pub fn state(&self) -> JobState {
        self.job.state
    }

    /// Pending -> Running, once the invoker accepted the spawn.
    pub fn mark_running(&mut self) -> bool {
        if self.job.state != JobState::Pending {
            warn!(
                job_id = %self.job.id,
                state = %self.job.state,
                "Ignoring start of a job that is not pending"
            );
            return false;
        }
        self.transition(JobState::Running, None);
        true
    }

    /// Moves a non-terminal job to Failed.
    pub fn fail(&mut self, reason: FailureReason) -> bool {
        if self.job.state.is_terminal() {
            warn!(
                job_id = %self.job.id,
                state = %self.job.state,
                reason = reason.label(),
                "Ignoring failure of a finished job"
            );
            return false;
        }
        self.transition(JobState::Failed, Some(reason));
        true
    }

    /// Consumes one worker event.
    pub fn apply(&mut self, event: WorkerEvent) {
        if self.job.state != JobState::Running {
            warn!(
                job_id = %self.job.id,
                state = %self.job.state,
                event = event_kind(&event),
                "Ignoring worker event outside of running state"
            );
            return;
        }

        match event {
            WorkerEvent::Stdout(chunk) => {
                self.job.stdout_bytes += chunk.len() as u64;
                for line in String::from_utf8_lossy(&chunk).lines() {
                    debug!(job_id = %self.job.id, "worker: {}", line);
                }
            }
            WorkerEvent::Stderr(chunk) => {
                STDERR_BYTES_TOTAL.inc_by(chunk.len() as u64);
                self.job.stderr_log.push(&chunk);
            }
            WorkerEvent::Exited(exit) => {
                self.job.exit_code = exit.code;
                if exit.success() {
                    self.transition(JobState::Succeeded, None);
                } else {
                    self.transition(
                        JobState::Failed,
                        Some(FailureReason::AbnormalExit { code: exit.code }),
                    );
                }
            }
        }
    }

    /// Attaches the caller-facing reference of a succeeded job.
    pub fn record_result(&mut self, reference: ResultReference) -> bool {
        if self.job.state != JobState::Succeeded {
            warn!(
                job_id = %self.job.id,
                state = %self.job.state,
                "Ignoring result for a job that did not succeed"
            );
            return false;
        }
        self.job.result = Some(reference);
        true
    }

    /// Consumes `handle` until the unit has exited.
    ///
    /// When `limit` elapses or `cancel` flips to `true` the unit is killed,
    /// the remaining events are drained until `Exited` (so the child is
    /// reaped) and the job fails with `Timeout` or `Cancelled`.
    pub async fn drive(
        &mut self,
        mut handle: JobHandle,
        limit: Option<Duration>,
        mut cancel: Option<watch::Receiver<bool>>,
    ) {
        let deadline = limit.map(|d| Instant::now() + d);
        let mut stop: Option<FailureReason> = None;

        loop {
            let event = if stop.is_some() {
                handle.next_event().await
            } else {
                tokio::select! {
                    event = handle.next_event() => event,
                    _ = wait_deadline(deadline) => {
                        warn!(job_id = %self.job.id, limit = ?limit, "Job timed out, killing worker");
                        handle.kill();
                        stop = Some(FailureReason::Timeout);
                        continue;
                    }
                    _ = wait_cancelled(&mut cancel) => {
                        info!(job_id = %self.job.id, "Job cancelled, killing worker");
                        handle.kill();
                        stop = Some(FailureReason::Cancelled);
                        continue;
                    }
                }
            };

            match event {
                Some(WorkerEvent::Exited(exit)) => {
                    match stop.take() {
                        Some(reason) => {
                            self.job.exit_code = exit.code;
                            self.fail(reason);
                        }
                        None => self.apply(WorkerEvent::Exited(exit)),
                    }
                    break;
                }
                Some(event) => self.apply(event),
                None => {
                    warn!(job_id = %self.job.id, "Worker event stream ended without exit status");
                    self.fail(stop.take().unwrap_or(FailureReason::AbnormalExit { code: None }));
                    break;
                }
            }
        }
    }

    fn transition(&mut self, to: JobState, failure: Option<FailureReason>) {
        debug!(job_id = %self.job.id, from = %self.job.state, to = %to, "Job transition");
        self.job.state = to;
        if failure.is_some() {
            self.job.failure = failure;
        }
        if to.is_terminal() {
            self.job.finished_at = Some(Utc::now());
        }
    }
}

fn event_kind(event: &WorkerEvent) -> &'static str {
    match event {
        WorkerEvent::Stdout(_) => "stdout",
        WorkerEvent::Stderr(_) => "stderr",
        WorkerEvent::Exited(_) => "exited",
    }
}

async fn wait_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => pending().await,
    }
}

async fn wait_cancelled(cancel: &mut Option<watch::Receiver<bool>>) {
    match cancel {
        // A dropped sender can no longer cancel.
        Some(rx) => {
            if rx.wait_for(|cancelled| *cancelled).await.is_err() {
                pending::<()>().await;
            }
        }
        None => pending().await,
    }
}

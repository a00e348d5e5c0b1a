//! Child-process invoker.

use async_trait::async_trait;
use futures::future::join_all;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

use super::error::WorkerError;
use super::handle::JobHandle;
use super::traits::WorkerInvoker;
use super::types::{ExitInfo, WorkerEvent};
use crate::config::WorkerConfig;
use crate::job::JobParameters;

/// Read buffer for each output pipe.
const READ_CHUNK_BYTES: usize = 8 * 1024;

/// Buffered events between the pipe readers and the consumer.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// How long to wait, in total, for both pipes to close after the unit
/// exited. A descendant that left its group while holding a pipe open must
/// not stall the `Exited` event.
const PIPE_DRAIN_GRACE: Duration = Duration::from_secs(5);

/// Runs the unit as a child process of this server.
#[derive(Debug, Clone)]
pub struct ProcessInvoker {
    program: PathBuf,
    leading_args: Vec<String>,
    verbosity_flag: String,
}

impl ProcessInvoker {
    pub fn new(config: &WorkerConfig) -> Self {
        Self {
            program: config.program.clone(),
            leading_args: config.leading_args.clone(),
            verbosity_flag: config.verbosity_flag.clone(),
        }
    }

    /// Builds the argument list: leading args, then the positional contract.
    pub fn build_args(&self, params: &JobParameters) -> Vec<OsString> {
        let mut args: Vec<OsString> = self.leading_args.iter().map(OsString::from).collect();
        args.extend([
            params.input_path.clone().into_os_string(),
            params.auxiliary_path.clone().into_os_string(),
            OsString::from(&params.output_id),
            OsString::from(&self.verbosity_flag),
        ]);
        args
    }

    /// Startup sanity check: explicit program paths and the auxiliary
    /// resource must exist. Bare program names are resolved via `PATH` at
    /// spawn time and are not checked.
    pub async fn validate(&self, auxiliary_path: &std::path::Path) -> Result<(), WorkerError> {
        if self.program.components().count() > 1
            && !tokio::fs::try_exists(&self.program).await.unwrap_or(false)
        {
            return Err(WorkerError::ProgramNotFound {
                program: self.program.clone(),
            });
        }

        if !tokio::fs::try_exists(auxiliary_path).await.unwrap_or(false) {
            return Err(WorkerError::AuxiliaryMissing {
                path: auxiliary_path.to_path_buf(),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl WorkerInvoker for ProcessInvoker {
    fn name(&self) -> &str {
        "process"
    }

    async fn invoke(&self, params: &JobParameters) -> Result<JobHandle, WorkerError> {
        let mut command = Command::new(&self.program);
        command
            .args(self.build_args(params))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // The unit leads its own group so that anything it forks can be
        // killed along with it.
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command
            .spawn()
            .map_err(|e| WorkerError::from_spawn(&self.program, e))?;

        let pid = child.id();
        info!(job_id = %params.job_id, pid = ?pid, "Worker spawned");

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (kill_tx, kill_rx) = oneshot::channel();

        let readers = [
            spawn_reader(child.stdout.take(), tx.clone(), WorkerEvent::Stdout),
            spawn_reader(child.stderr.take(), tx.clone(), WorkerEvent::Stderr),
        ];

        tokio::spawn(supervise(child, tx, kill_rx, readers, params.job_id.clone()));

        Ok(JobHandle::new(pid, rx, kill_tx))
    }
}

/// Forwards raw chunks from one pipe. Keeps draining after the consumer is
/// gone so the child never blocks on a full pipe.
fn spawn_reader<R>(
    pipe: Option<R>,
    tx: mpsc::Sender<WorkerEvent>,
    wrap: fn(Vec<u8>) -> WorkerEvent,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let Some(mut pipe) = pipe else {
            return;
        };
        let mut buf = vec![0u8; READ_CHUNK_BYTES];
        let mut consumer_alive = true;

        loop {
            match pipe.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    if consumer_alive && tx.send(wrap(buf[..n].to_vec())).await.is_err() {
                        consumer_alive = false;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Worker pipe read failed");
                    break;
                }
            }
        }
    })
}

/// Waits for the child (or kills it on request), reaps it, lets the readers
/// finish and then emits the single `Exited` event.
///
/// A kill goes to the whole process group, and so does the cleanup after a
/// normal exit.
async fn supervise(
    mut child: Child,
    tx: mpsc::Sender<WorkerEvent>,
    mut kill_rx: oneshot::Receiver<()>,
    readers: [JoinHandle<()>; 2],
    job_id: String,
) {
    let group = child.id();

    let (status, killed) = tokio::select! {
        status = child.wait() => (status, false),
        _ = &mut kill_rx => {
            debug!(job_id = %job_id, "Kill requested for worker");
            if let Err(e) = kill_group(group) {
                debug!(job_id = %job_id, error = %e, "Worker group already gone when killed");
            }
            if let Err(e) = child.start_kill() {
                debug!(job_id = %job_id, error = %e, "Worker already gone when killed");
            }
            (child.wait().await, true)
        }
    };

    // Whatever the unit left running in its group would otherwise outlive
    // the job and could hold the pipes open.
    if !killed && kill_group(group).is_ok() {
        debug!(job_id = %job_id, "Killed processes left behind by worker");
    }

    let aborts: Vec<_> = readers.iter().map(|r| r.abort_handle()).collect();
    if timeout(PIPE_DRAIN_GRACE, join_all(readers)).await.is_err() {
        warn!(job_id = %job_id, "Worker output pipes still open after exit, abandoning them");
        for abort in aborts {
            abort.abort();
        }
    }

    let exit = match status {
        Ok(status) => ExitInfo::from_status(status, killed),
        Err(e) => {
            warn!(job_id = %job_id, error = %e, "Failed to reap worker");
            ExitInfo {
                killed,
                ..Default::default()
            }
        }
    };

    info!(
        job_id = %job_id,
        code = ?exit.code,
        signal = ?exit.signal,
        killed = exit.killed,
        "Worker exited"
    );

    let _ = tx.send(WorkerEvent::Exited(exit)).await;
}

/// Sends `SIGKILL` to every process in the unit's group.
#[cfg(unix)]
fn kill_group(group: Option<u32>) -> std::io::Result<()> {
    let Some(pgid) = group.and_then(|id| libc::pid_t::try_from(id).ok()) else {
        return Err(std::io::ErrorKind::NotFound.into());
    };
    // Safety: killpg only sends a signal and takes no pointers.
    if unsafe { libc::killpg(pgid, libc::SIGKILL) } == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn kill_group(_group: Option<u32>) -> std::io::Result<()> {
    Err(std::io::ErrorKind::Unsupported.into())
}

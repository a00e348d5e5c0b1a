//! Mock worker invoker for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, RwLock};

use crate::job::JobParameters;
use crate::worker::{ExitInfo, JobHandle, WorkerError, WorkerEvent, WorkerInvoker};

/// Signal number reported for killed mock runs.
const SIGKILL: i32 = 9;

/// What the next invocations do.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Emit the events, then exit with `code`.
    Exit { events: Vec<WorkerEvent>, code: i32 },
    /// Emit the events, then run until killed.
    Hang { events: Vec<WorkerEvent> },
    /// Refuse to launch.
    SpawnFailure,
}

impl MockBehavior {
    pub fn success() -> Self {
        Self::Exit {
            events: vec![WorkerEvent::Stdout(b"done\n".to_vec())],
            code: 0,
        }
    }

    pub fn exit(code: i32, stderr: &str) -> Self {
        Self::Exit {
            events: vec![WorkerEvent::Stderr(stderr.as_bytes().to_vec())],
            code,
        }
    }

    pub fn hang() -> Self {
        Self::Hang { events: Vec::new() }
    }
}

/// Mock implementation of the WorkerInvoker trait.
///
/// Records every invocation and replays the configured [`MockBehavior`].
#[derive(Debug, Clone)]
pub struct MockInvoker {
    behavior: Arc<RwLock<MockBehavior>>,
    invocations: Arc<RwLock<Vec<JobParameters>>>,
}

impl Default for MockInvoker {
    fn default() -> Self {
        Self::new()
    }
}

impl MockInvoker {
    /// Create a mock invoker whose runs succeed.
    pub fn new() -> Self {
        Self::with_behavior(MockBehavior::success())
    }

    pub fn with_behavior(behavior: MockBehavior) -> Self {
        Self {
            behavior: Arc::new(RwLock::new(behavior)),
            invocations: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn set_behavior(&self, behavior: MockBehavior) {
        *self.behavior.write().await = behavior;
    }

    /// Parameters of every accepted or refused invocation.
    pub async fn recorded_invocations(&self) -> Vec<JobParameters> {
        self.invocations.read().await.clone()
    }

    pub async fn invocation_count(&self) -> usize {
        self.invocations.read().await.len()
    }
}

#[async_trait]
impl WorkerInvoker for MockInvoker {
    fn name(&self) -> &str {
        "mock"
    }

    async fn invoke(&self, params: &JobParameters) -> Result<JobHandle, WorkerError> {
        self.invocations.write().await.push(params.clone());

        match self.behavior.read().await.clone() {
            MockBehavior::SpawnFailure => Err(WorkerError::ProgramNotFound {
                program: "mock-worker".into(),
            }),
            MockBehavior::Exit { mut events, code } => {
                events.push(WorkerEvent::Exited(ExitInfo::with_code(code)));
                Ok(scripted_handle(events, false))
            }
            MockBehavior::Hang { events } => Ok(scripted_handle(events, true)),
        }
    }
}

/// Builds a handle that replays `events`.
///
/// With `hang` the run stays alive after the events until killed. A kill at
/// any point ends the stream with a killed `Exited` event. Scripts that do
/// not hang must supply their own `Exited` event; without one the stream
/// simply ends.
pub fn scripted_handle(events: Vec<WorkerEvent>, hang: bool) -> JobHandle {
    let (tx, rx) = mpsc::channel(16);
    let (kill_tx, mut kill_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        let killed = ExitInfo {
            code: None,
            signal: Some(SIGKILL),
            killed: true,
        };

        for event in events {
            tokio::select! {
                biased;
                _ = &mut kill_rx => {
                    let _ = tx.send(WorkerEvent::Exited(killed)).await;
                    return;
                }
                sent = tx.send(event) => {
                    if sent.is_err() {
                        return;
                    }
                }
            }
        }

        if hang {
            let _ = kill_rx.await;
            let _ = tx.send(WorkerEvent::Exited(killed)).await;
        }
    });

    JobHandle::new(None, rx, kill_tx)
}

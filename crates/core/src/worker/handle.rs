//! Handle to one running unit.

use tokio::sync::{mpsc, oneshot};

use super::types::WorkerEvent;

/// Single-pass view of a running unit.
///
/// Dropping the handle kills the unit if it is still running.
#[derive(Debug)]
pub struct JobHandle {
    pid: Option<u32>,
    events: mpsc::Receiver<WorkerEvent>,
    kill_tx: Option<oneshot::Sender<()>>,
    finished: bool,
}

impl JobHandle {
    /// Wraps an event channel. The producer must end the stream with exactly
    /// one `Exited` event and terminate the unit when `kill_rx` fires or its
    /// sender is dropped.
    pub fn new(
        pid: Option<u32>,
        events: mpsc::Receiver<WorkerEvent>,
        kill_tx: oneshot::Sender<()>,
    ) -> Self {
        Self {
            pid,
            events,
            kill_tx: Some(kill_tx),
            finished: false,
        }
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Next event, or `None` once `Exited` has been delivered or the
    /// producer went away.
    pub async fn next_event(&mut self) -> Option<WorkerEvent> {
        if self.finished {
            return None;
        }
        let event = self.events.recv().await;
        if matches!(event, Some(WorkerEvent::Exited(_)) | None) {
            self.finished = true;
        }
        event
    }

    /// Requests termination. The stream still ends with `Exited`.
    pub fn kill(&mut self) {
        if let Some(tx) = self.kill_tx.take() {
            let _ = tx.send(());
        }
    }
}

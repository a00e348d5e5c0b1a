//! Types for the worker module.

/// Lifecycle event of a running unit.
///
/// Stdout and stderr chunks may interleave; `Exited` is always last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    Stdout(Vec<u8>),
    Stderr(Vec<u8>),
    Exited(ExitInfo),
}

/// How the unit terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExitInfo {
    /// Exit code, `None` when terminated by a signal.
    pub code: Option<i32>,
    /// Terminating signal on unix.
    pub signal: Option<i32>,
    /// Whether the invoker killed the unit on request.
    pub killed: bool,
}

impl ExitInfo {
    pub fn with_code(code: i32) -> Self {
        Self {
            code: Some(code),
            ..Default::default()
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    pub(crate) fn from_status(status: std::process::ExitStatus, killed: bool) -> Self {
        #[cfg(unix)]
        let signal = {
            use std::os::unix::process::ExitStatusExt;
            status.signal()
        };
        #[cfg(not(unix))]
        let signal = None;

        Self {
            code: status.code(),
            signal,
            killed,
        }
    }
}

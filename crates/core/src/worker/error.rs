//! Error types for the worker module.

use std::io::ErrorKind;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised before the external unit is running.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The program does not exist.
    #[error("Worker program not found: {}", .program.display())]
    ProgramNotFound { program: PathBuf },

    /// The program exists but may not be executed.
    #[error("Permission denied launching worker: {}", .program.display())]
    PermissionDenied { program: PathBuf },

    /// Any other launch failure.
    #[error("Failed to spawn worker {}", .program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The fixed auxiliary resource is missing.
    #[error("Auxiliary resource not found: {}", .path.display())]
    AuxiliaryMissing { path: PathBuf },
}

impl WorkerError {
    /// Classifies an error returned by `Command::spawn`.
    pub fn from_spawn(program: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let program = program.into();
        match source.kind() {
            ErrorKind::NotFound => Self::ProgramNotFound { program },
            ErrorKind::PermissionDenied => Self::PermissionDenied { program },
            _ => Self::Spawn { program, source },
        }
    }
}

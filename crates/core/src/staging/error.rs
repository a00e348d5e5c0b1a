//! Error types for the staging module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while staging an upload.
#[derive(Debug, Error)]
pub enum StagingError {
    /// The staging directory is missing, not a directory, or not writable.
    #[error("Staging directory unusable: {}", .path.display())]
    DirectoryUnusable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing or finalizing the staged file failed.
    #[error("Failed to stage file at {}", .path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file with the generated name already exists.
    #[error("Staged file already exists: {}", .path.display())]
    AlreadyExists { path: PathBuf },
}

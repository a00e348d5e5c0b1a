//! Filesystem-backed staging store.

use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use super::error::StagingError;
use super::sanitize::sanitize_filename;

/// Attempts at finding a free name before giving up. Only another process
/// writing into the same directory can make the first attempt collide.
const MAX_NAME_ATTEMPTS: usize = 8;

/// A fully written, uniquely named upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    /// Absolute or config-relative path of the staged file.
    pub path: PathBuf,
    /// Final file name (`{unix_millis}_{seq}_{sanitized}`).
    pub name: String,
    /// Sanitized form of the client-supplied name.
    pub sanitized_name: String,
    pub created_at: DateTime<Utc>,
    pub size_bytes: u64,
}

/// Persists uploads into a single flat directory.
#[derive(Debug)]
pub struct StagingStore {
    dir: PathBuf,
    sequence: AtomicU64,
}

impl StagingStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            sequence: AtomicU64::new(0),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Startup precondition: the staging directory exists (it is created if
    /// missing), is a directory, and accepts new files.
    pub async fn ensure_ready(&self) -> Result<(), StagingError> {
        let unusable = |source| StagingError::DirectoryUnusable {
            path: self.dir.clone(),
            source,
        };

        fs::create_dir_all(&self.dir).await.map_err(unusable)?;

        let meta = fs::metadata(&self.dir).await.map_err(unusable)?;
        if !meta.is_dir() {
            return Err(unusable(std::io::Error::other("not a directory")));
        }

        let probe = self
            .dir
            .join(format!(".weaver-probe-{}", std::process::id()));
        fs::write(&probe, b"").await.map_err(unusable)?;
        fs::remove_file(&probe).await.map_err(unusable)?;

        debug!(dir = %self.dir.display(), "Staging directory ready");
        Ok(())
    }

    /// Writes `bytes` under a fresh name derived from `original_name`.
    ///
    /// The content goes to a hidden `.partial` file first and is linked into
    /// place only after it has been synced, so readers never observe a
    /// partially written upload and an existing file is never replaced.
    pub async fn stage(
        &self,
        bytes: &[u8],
        original_name: &str,
    ) -> Result<StagedFile, StagingError> {
        let sanitized_name = sanitize_filename(original_name);

        for _ in 0..MAX_NAME_ATTEMPTS {
            let created_at = Utc::now();
            let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
            let name = format!(
                "{}_{:06}_{}",
                created_at.timestamp_millis(),
                seq,
                sanitized_name
            );
            let final_path = self.dir.join(&name);
            let partial_path = self.dir.join(format!(".{}.partial", name));

            match self.write_and_publish(&partial_path, &final_path, bytes).await {
                Ok(()) => {
                    debug!(name = %name, size = bytes.len(), "Staged upload");
                    return Ok(StagedFile {
                        path: final_path,
                        name,
                        sanitized_name,
                        created_at,
                        size_bytes: bytes.len() as u64,
                    });
                }
                Err(StagingError::AlreadyExists { path }) => {
                    warn!(path = %path.display(), "Staged name collision, picking a new name");
                    continue;
                }
                Err(e) => return Err(e),
            }
        }

        Err(StagingError::AlreadyExists {
            path: self.dir.clone(),
        })
    }

    /// Deletes a staged file. Missing files are not an error.
    pub async fn remove(&self, staged: &StagedFile) -> Result<(), StagingError> {
        match fs::remove_file(&staged.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StagingError::WriteFailed {
                path: staged.path.clone(),
                source,
            }),
        }
    }

    async fn write_and_publish(
        &self,
        partial_path: &Path,
        final_path: &Path,
        bytes: &[u8],
    ) -> Result<(), StagingError> {
        let result = async {
            write_synced(partial_path, bytes).await?;
            publish_without_overwrite(partial_path, final_path).await
        }
        .await;

        // The partial file is either already unlinked or must not linger.
        if let Err(e) = fs::remove_file(partial_path).await {
            if e.kind() != ErrorKind::NotFound {
                warn!(path = %partial_path.display(), error = %e, "Failed to remove partial upload");
            }
        }

        result
    }
}

async fn write_synced(path: &Path, bytes: &[u8]) -> Result<(), StagingError> {
    let write_failed = |source| StagingError::WriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
        .map_err(|e| match e.kind() {
            ErrorKind::AlreadyExists => StagingError::AlreadyExists {
                path: path.to_path_buf(),
            },
            _ => write_failed(e),
        })?;

    file.write_all(bytes).await.map_err(write_failed)?;
    file.flush().await.map_err(write_failed)?;
    file.sync_all().await.map_err(write_failed)?;
    Ok(())
}

/// Makes `partial` visible as `target`, failing if `target` exists.
///
/// A hard link is atomic and refuses to replace an existing entry. Filesystems
/// without hard links fall back to an existence check followed by rename.
async fn publish_without_overwrite(partial: &Path, target: &Path) -> Result<(), StagingError> {
    match fs::hard_link(partial, target).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(StagingError::AlreadyExists {
            path: target.to_path_buf(),
        }),
        Err(link_err) => {
            debug!(error = %link_err, "Hard link unavailable, falling back to rename");
            let exists = fs::try_exists(target)
                .await
                .map_err(|source| StagingError::WriteFailed {
                    path: target.to_path_buf(),
                    source,
                })?;
            if exists {
                return Err(StagingError::AlreadyExists {
                    path: target.to_path_buf(),
                });
            }
            fs::rename(partial, target)
                .await
                .map_err(|source| StagingError::WriteFailed {
                    path: target.to_path_buf(),
                    source,
                })
        }
    }
}

//! Staging store for uploaded inputs.
//!
//! Every submission is persisted here before a worker is spawned. Names are
//! built from the creation time, a process-wide sequence number and the
//! sanitized original filename, and files become visible only once fully
//! written.

mod error;
mod sanitize;
mod store;

pub use error::StagingError;
pub use sanitize::sanitize_filename;
pub use store::{StagedFile, StagingStore};

//! Worker invoker for the external transformation unit.
//!
//! The unit is an opaque program called with a fixed positional contract:
//!
//! ```text
//! program [leading_args...] <input_path> <auxiliary_path> <output_id> <verbosity_flag>
//! ```
//!
//! Exit code 0 means the artifact is available under `output_id`. The
//! invoker exposes the run as a [`JobHandle`], a finite ordered stream of
//! [`WorkerEvent`]s ending in exactly one [`WorkerEvent::Exited`].

mod error;
mod handle;
mod process;
mod traits;
mod types;

pub use error::WorkerError;
pub use handle::JobHandle;
pub use process::ProcessInvoker;
pub use traits::WorkerInvoker;
pub use types::{ExitInfo, WorkerEvent};

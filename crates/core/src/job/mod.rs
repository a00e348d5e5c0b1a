//! Job record and state machine.
//!
//! A job moves `Pending -> Running -> Succeeded | Failed`, or straight from
//! `Pending` to `Failed` when the unit cannot be launched. Terminal states are
//! absorbing: late events are logged and dropped.

mod tracker;
mod types;

pub use tracker::JobTracker;
pub use types::{FailureReason, Job, JobParameters, JobState, StderrLog};

//! Trait definitions for the worker module.

use async_trait::async_trait;

use super::error::WorkerError;
use super::handle::JobHandle;
use crate::job::JobParameters;

/// Launches the external transformation unit.
#[async_trait]
pub trait WorkerInvoker: Send + Sync {
    /// Returns the name of this invoker implementation.
    fn name(&self) -> &str;

    /// Starts one run. A returned handle means the unit is running; launch
    /// failures are reported here and produce no events.
    async fn invoke(&self, params: &JobParameters) -> Result<JobHandle, WorkerError>;
}

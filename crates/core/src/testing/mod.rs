//! Testing utilities and mock implementations.
//!
//! Provides a scripted [`WorkerInvoker`](crate::worker::WorkerInvoker) and a
//! recording [`ArtifactPublisher`](crate::resolver::ArtifactPublisher) so the
//! orchestrator can be exercised without launching real processes.
//!
//! # Example
//!
//! ```rust,ignore
//! use weaver_core::testing::{MockInvoker, MockPublisher};
//!
//! let invoker = MockInvoker::new();
//! invoker.set_behavior(MockBehavior::exit(1, "bad image")).await;
//!
//! // Use in JobOrchestrator...
//! ```

mod mock_invoker;
mod mock_publisher;

pub use mock_invoker::{scripted_handle, MockBehavior, MockInvoker};
pub use mock_publisher::MockPublisher;

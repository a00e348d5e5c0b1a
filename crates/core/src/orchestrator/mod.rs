//! Job orchestrator.
//!
//! The composition root of one submission: validate, stage, invoke, track,
//! resolve. Each call to [`JobOrchestrator::submit`] runs exactly one job and
//! shares nothing with other calls except the staging store's name sequence.
//!
//! # Example
//!
//! ```ignore
//! use weaver_core::orchestrator::{JobOrchestrator, OrchestratorSettings, Submission};
//!
//! let orchestrator = JobOrchestrator::new(settings, staging, invoker, resolver);
//! let outcome = orchestrator
//!     .submit(Submission::new(bytes, "cat photo.jpg", Some("image/jpeg".into())))
//!     .await?;
//! println!("result at {}", outcome.result);
//! ```

mod runner;
mod types;
mod validate;

pub use runner::JobOrchestrator;
pub use types::{JobOutcome, JobReport, OrchestratorSettings, Submission};
pub use validate::{detect_image_kind, validate_submission, ImageKind};

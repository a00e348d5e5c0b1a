//! Result resolution.
//!
//! Turns a terminal job into what the caller sees: a [`ResultReference`] for
//! a succeeded job (through an injectable [`ArtifactPublisher`]) or a
//! redacted [`JobError`](crate::JobError) for a failed one.

mod publisher;
mod redact;
mod resolve;
mod types;

pub use publisher::{ArtifactPublisher, PublishError, TemplatePublisher};
pub use redact::Redactor;
pub use resolve::ResultResolver;
pub use types::ResultReference;

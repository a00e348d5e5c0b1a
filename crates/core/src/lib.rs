pub mod config;
pub mod error;
pub mod job;
pub mod metrics;
pub mod orchestrator;
pub mod resolver;
pub mod staging;
pub mod testing;
pub mod worker;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, ResultConfig,
    ServerConfig, StagingConfig, WorkerConfig,
};
pub use error::{ErrorCode, JobError};
pub use job::{FailureReason, Job, JobParameters, JobState, JobTracker, StderrLog};
pub use orchestrator::{JobOrchestrator, JobOutcome, JobReport, OrchestratorSettings, Submission};
pub use resolver::{
    ArtifactPublisher, PublishError, Redactor, ResultReference, ResultResolver, TemplatePublisher,
};
pub use staging::{sanitize_filename, StagedFile, StagingError, StagingStore};
pub use worker::{ExitInfo, JobHandle, ProcessInvoker, WorkerError, WorkerEvent, WorkerInvoker};

//! Caller-facing job errors.
//!
//! Every failure of a submission surfaces as a [`JobError`] carrying a stable
//! [`ErrorCode`] and a message that is safe to show to the submitter: no raw
//! paths, identifiers or unfiltered worker output.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Stable, machine-readable failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Missing, oversized or non-image submission.
    ValidationFailure,
    /// The upload could not be staged.
    IoFailure,
    /// The external unit could not be launched.
    SpawnFailure,
    /// The external unit ran and exited unsuccessfully.
    AbnormalExit,
    /// The wall-clock limit elapsed.
    Timeout,
    /// The job was cancelled before finishing.
    Cancelled,
    /// The artifact was produced but could not be addressed.
    PublishFailure,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ValidationFailure => "validation_failure",
            Self::IoFailure => "io_failure",
            Self::SpawnFailure => "spawn_failure",
            Self::AbnormalExit => "abnormal_exit",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
            Self::PublishFailure => "publish_failure",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal failure of one submission.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{code}: {message}")]
pub struct JobError {
    pub code: ErrorCode,
    pub message: String,
}

impl JobError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationFailure, message)
    }

    pub fn io() -> Self {
        Self::new(ErrorCode::IoFailure, "The upload could not be stored")
    }

    pub fn spawn() -> Self {
        Self::new(
            ErrorCode::SpawnFailure,
            "The image processor could not be started",
        )
    }

    /// `excerpt` must already be redacted.
    pub fn abnormal_exit(code: Option<i32>, excerpt: &str) -> Self {
        let head = match code {
            Some(code) => format!("The image processor failed (exit code {})", code),
            None => "The image processor was terminated".to_string(),
        };
        let message = if excerpt.is_empty() {
            head
        } else {
            format!("{}: {}", head, excerpt)
        };
        Self::new(ErrorCode::AbnormalExit, message)
    }

    pub fn timeout() -> Self {
        Self::new(
            ErrorCode::Timeout,
            "The image processor took too long and was stopped",
        )
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorCode::Cancelled, "The job was cancelled")
    }

    pub fn publish() -> Self {
        Self::new(
            ErrorCode::PublishFailure,
            "The result could not be published",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_serialize_snake_case() {
        let json = serde_json::to_string(&ErrorCode::AbnormalExit).unwrap();
        assert_eq!(json, "\"abnormal_exit\"");
        assert_eq!(ErrorCode::IoFailure.to_string(), "io_failure");
    }

    #[test]
    fn test_abnormal_exit_message() {
        let err = JobError::abnormal_exit(Some(3), "bad header");
        assert_eq!(err.code, ErrorCode::AbnormalExit);
        assert_eq!(
            err.message,
            "The image processor failed (exit code 3): bad header"
        );

        let killed = JobError::abnormal_exit(None, "");
        assert_eq!(killed.message, "The image processor was terminated");
    }

    #[test]
    fn test_display_includes_code() {
        assert_eq!(
            JobError::timeout().to_string(),
            "timeout: The image processor took too long and was stopped"
        );
    }
}

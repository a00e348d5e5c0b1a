//! Job submission endpoint.

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use weaver_core::{ErrorCode, JobError, Submission};

use crate::state::AppState;

/// Multipart field carrying the uploaded image.
pub const IMAGE_FIELD: &str = "image";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitJobResponse {
    pub result_url: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// Error leaving the API, always rendered as `{error, code}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiError {
    fn new(status: StatusCode, code: &str, error: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorResponse {
                error: error.into(),
                code: code.to_string(),
            },
        }
    }

    fn bad_request(error: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            ErrorCode::ValidationFailure.as_str(),
            error,
        )
    }

    fn from_multipart(err: MultipartError) -> Self {
        let status = err.status();
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            Self::new(status, "payload_too_large", "The upload is too large")
        } else {
            debug!(error = %err.body_text(), "Malformed multipart body");
            Self::bad_request("The request body is not a valid multipart upload")
        }
    }
}

impl From<JobError> for ApiError {
    fn from(err: JobError) -> Self {
        Self::new(status_for(err.code), err.code.as_str(), err.message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// HTTP status for each job error code.
pub fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::ValidationFailure => StatusCode::BAD_REQUEST,
        ErrorCode::AbnormalExit => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorCode::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorCode::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCode::IoFailure | ErrorCode::SpawnFailure | ErrorCode::PublishFailure => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// POST /api/v1/jobs
///
/// Accepts exactly one `image` file field and answers once the job is
/// terminal. If the client disconnects first, the job is cancelled and
/// still finishes its bookkeeping in the background.
pub async fn submit_job(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<SubmitJobResponse>, ApiError> {
    let mut submission: Option<Submission> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(ApiError::from_multipart)?
    {
        let name = field.name().unwrap_or("").to_string();
        if name != IMAGE_FIELD {
            debug!(field = %name, "Ignoring unexpected multipart field");
            continue;
        }
        if submission.is_some() {
            return Err(ApiError::bad_request("Exactly one image must be provided"));
        }

        let original_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().map(|s| s.to_string());
        let bytes = field.bytes().await.map_err(ApiError::from_multipart)?;

        submission = Some(Submission::new(bytes.to_vec(), original_name, content_type));
    }

    let Some(submission) = submission else {
        return Err(ApiError::bad_request("No image was provided"));
    };

    match state.orchestrator().submit_cancel_on_drop(submission).await {
        Ok(outcome) => Ok(Json(SubmitJobResponse {
            result_url: outcome.result.to_string(),
        })),
        Err(e) => {
            warn!(code = %e.code, "Job submission failed");
            Err(e.into())
        }
    }
}

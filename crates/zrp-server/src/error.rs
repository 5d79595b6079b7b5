//! The §7 error taxonomy as one `ApiError` enum with an `IntoResponse`
//! impl producing the `{ "error", "code", "details"? }` envelope. Every
//! handler returns `Result<T, ApiError>`; `anyhow::Error` (and the two
//! workflow-layer error enums) collapse into this at the handler boundary,
//! mirroring the single error-mapping seam the teacher's handlers use.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;

use zrp_campaign::CampaignError;
use zrp_workflow::WorkflowError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("no valid session or API key presented")]
    Unauthorized,
    #[error("session idle timeout exceeded")]
    SessionTimeout,
    #[error("capability denied")]
    Forbidden,
    #[error("account locked")]
    AccountLocked,
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("rate limited")]
    RateLimited,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

impl ApiError {
    fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "VALIDATION",
            ApiError::Unauthorized => "UNAUTHORIZED",
            ApiError::SessionTimeout => "SESSION_TIMEOUT",
            ApiError::Forbidden => "FORBIDDEN",
            ApiError::AccountLocked => "ACCOUNT_LOCKED",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::RateLimited => "RATE_LIMITED",
            ApiError::Internal(_) => "INTERNAL",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized | ApiError::SessionTimeout => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden | ApiError::AccountLocked => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(err) = &self {
            let trace_id = zrp_schemas::new_trace_id();
            tracing::error!(trace_id = %trace_id, error = %err, "internal error");
        }
        let status = self.status();
        let body = ErrorBody {
            error: self.to_string(),
            code: self.code(),
            details: None,
        };
        (status, Json(body)).into_response()
    }
}

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::Validation(msg) => ApiError::Validation(msg),
            WorkflowError::NotFound(msg) => ApiError::NotFound(msg),
            WorkflowError::Conflict(msg) => ApiError::Conflict(msg),
            WorkflowError::Internal(err) => ApiError::Internal(err),
        }
    }
}

impl From<CampaignError> for ApiError {
    fn from(err: CampaignError) -> Self {
        match err {
            CampaignError::Validation(msg) => ApiError::Validation(msg),
            CampaignError::NotFound(msg) => ApiError::NotFound(msg),
            CampaignError::Conflict(msg) => ApiError::Conflict(msg),
            CampaignError::Internal(err) => ApiError::Internal(err),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

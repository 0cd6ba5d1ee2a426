use crate::connectors::RegistryError;
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use std::time::Duration;

/// A single check failed. Never escapes the run: it becomes a critical result.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum CheckExecutionError {
    #[error("check collaborator unavailable: {0}")]
    Unavailable(String),
    #[error("check failed: {0}")]
    Failed(String),
    #[error("invalid check response: {0}")]
    InvalidResponse(String),
    #[error("check timed out after {0:?}")]
    TimedOut(Duration),
}

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum InvalidScoreError {
    #[error("score is not a number")]
    NonNumeric,
    #[error("score {0} outside 0..=100")]
    OutOfRange(f64),
}

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum AutoFixError {
    #[error("auto-fix already in progress for {0}")]
    AlreadyInProgress(String),
    #[error("check {0} does not support auto-fix")]
    NotSupported(String),
    #[error("auto-fix for {check_id} failed: {reason}")]
    Failed { check_id: String, reason: String },
    #[error("auto-fix for {0} was cancelled")]
    Cancelled(String),
    #[error("auto-fix for {check_id} timed out after {after:?}")]
    TimedOut { check_id: String, after: Duration },
}

/// Run-level and consumer-facing errors.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("check registry unavailable: {0}")]
    RegistryUnavailable(#[from] RegistryError),
    #[error("unknown check: {0}")]
    UnknownCheck(String),
    #[error("no health report available yet")]
    NoReport { last_error: Option<String> },
    #[error(transparent)]
    AutoFix(#[from] AutoFixError),
}

impl ResponseError for EngineError {
    fn error_response(&self) -> HttpResponse {
        let mut body = json!({
            "status": "Error",
            "code": self.status_code().as_u16(),
            "message": self.to_string(),
        });
        if let EngineError::NoReport {
            last_error: Some(err),
        } = self
        {
            body["last_error"] = json!(err);
        }
        HttpResponse::build(self.status_code()).json(body)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::RegistryUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::UnknownCheck(_) => StatusCode::NOT_FOUND,
            Self::NoReport { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::AutoFix(AutoFixError::AlreadyInProgress(_)) => StatusCode::CONFLICT,
            Self::AutoFix(AutoFixError::NotSupported(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::AutoFix(AutoFixError::Failed { .. }) => StatusCode::BAD_GATEWAY,
            Self::AutoFix(AutoFixError::Cancelled(_)) => StatusCode::CONFLICT,
            Self::AutoFix(AutoFixError::TimedOut { .. }) => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

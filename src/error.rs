use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt::Display;

use crate::checklist::ChecklistError;
use crate::pipeline::PipelineError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized")
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "resource not found")
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn dependency<E: Display>(error: E) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, error.to_string())
    }

    pub fn internal<E: Display>(error: E) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status;
        let body = Json(ErrorResponse {
            error: self.message,
        });
        (status, body).into_response()
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl From<PipelineError> for AppError {
    fn from(value: PipelineError) -> Self {
        match value {
            PipelineError::CandidateNotFound => AppError::not_found(),
            PipelineError::NoNextStage(_) | PipelineError::UnknownStage(_) => {
                AppError::bad_request(value.to_string())
            }
            PipelineError::ConcurrentModification => AppError::conflict(value.to_string()),
            PipelineError::Store(err) => AppError::dependency(err),
        }
    }
}

impl From<ChecklistError> for AppError {
    fn from(value: ChecklistError) -> Self {
        match value {
            ChecklistError::CandidateNotFound
            | ChecklistError::DocumentNotFound
            | ChecklistError::NoAttachment => AppError::new(StatusCode::NOT_FOUND, value.to_string()),
            ChecklistError::UnknownStage(_) => AppError::bad_request(value.to_string()),
            ChecklistError::Storage(err) | ChecklistError::Store(err) => AppError::dependency(err),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        AppError::internal(value)
    }
}

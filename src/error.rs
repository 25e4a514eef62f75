//! Error handling

use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
    Json,
};
use serde_json::json;

use crate::engine::SpoofError;
use crate::models::InvalidControlRequest;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    // Request errors
    InvalidRequest(String),

    // Engine errors
    DriverFailure(String),
    Stopped,

    // Generic errors
    InternalError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg.as_str()),
            AppError::DriverFailure(msg) => (StatusCode::BAD_GATEWAY, msg.as_str()),
            AppError::Stopped => (StatusCode::SERVICE_UNAVAILABLE, "Spoofing has been stopped"),
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = Json(json!({
            "status": "error",
            "message": message,
        }));

        (status, body).into_response()
    }
}

impl From<InvalidControlRequest> for AppError {
    fn from(err: InvalidControlRequest) -> Self {
        AppError::InvalidRequest(err.0)
    }
}

impl From<SpoofError> for AppError {
    fn from(err: SpoofError) -> Self {
        match err {
            SpoofError::Driver(e) => AppError::DriverFailure(e.to_string()),
            SpoofError::Stopped => AppError::Stopped,
        }
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::InternalError(err.to_string())
    }
}

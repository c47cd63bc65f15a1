//! API Error Handling
//!
//! Structured error responses with HTTP status codes and request tracking.

use crate::errors::GameError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::error;

/// Top-level API error response with request tracking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub request_id: String,
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// NOT_FOUND, BAD_REQUEST, CONFLICT, INTERNAL_ERROR, ...
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug)]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub request_id: String,
    pub details: Option<serde_json::Value>,
}

#[derive(Debug)]
pub enum ApiErrorKind {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    InternalError(String),
}

impl ApiError {
    fn new(kind: ApiErrorKind, request_id: String) -> Self {
        Self {
            kind,
            request_id,
            details: None,
        }
    }

    pub fn not_found(request_id: String, message: String) -> Self {
        Self::new(ApiErrorKind::NotFound(message), request_id)
    }

    pub fn bad_request(request_id: String, message: String) -> Self {
        Self::new(ApiErrorKind::BadRequest(message), request_id)
    }

    pub fn conflict(request_id: String, message: String) -> Self {
        Self::new(ApiErrorKind::Conflict(message), request_id)
    }

    pub fn internal_error(request_id: String, message: String) -> Self {
        Self::new(ApiErrorKind::InternalError(message), request_id)
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Map a game error to its HTTP form. Storage details are logged, not
    /// returned to the client.
    pub fn from_game(request_id: String, err: GameError) -> Self {
        match err {
            GameError::UserNotFound(_) => Self::not_found(request_id, err.to_string()),
            GameError::InvalidBet(_) | GameError::InvalidUsername(_) => {
                Self::bad_request(request_id, err.to_string())
            }
            GameError::InsufficientBalance { required, available } => {
                Self::bad_request(request_id, err.to_string()).with_details(serde_json::json!({
                    "required": required,
                    "available": available,
                }))
            }
            GameError::NoActiveRound | GameError::DuplicateUser(_) => {
                Self::conflict(request_id, err.to_string())
            }
            GameError::BalanceOverflow(_)
            | GameError::Persistence(_)
            | GameError::Configuration(_) => {
                error!(request_id = %request_id, "Request failed: {}", err);
                Self::internal_error(request_id, "Internal server error".to_string())
            }
        }
    }

    fn status_and_code(&self) -> (StatusCode, &'static str, &str) {
        match &self.kind {
            ApiErrorKind::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiErrorKind::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiErrorKind::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiErrorKind::InternalError(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg)
            }
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (_, code, msg) = self.status_and_code();
        write!(f, "[{}] {}: {}", self.request_id, code, msg)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.status_and_code();

        let body = Json(ErrorResponse {
            request_id: self.request_id.clone(),
            error: ErrorBody {
                code: code.to_string(),
                message: message.to_string(),
                details: self.details.clone(),
            },
        });

        (status, body).into_response()
    }
}

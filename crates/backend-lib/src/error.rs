// crates/backend-lib/src/error.rs

//! Error taxonomy + Axum integration.
use authgate_common::ApiResponse;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::auth::AuthError;
use crate::validation::ValidationError;

/// Coarse error kinds surfaced to the request layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or weak input, user-correctable
    Validation,
    /// Bad credentials or a bad, expired or revoked token
    Authentication,
    /// Duplicate identifier
    Conflict,
    NotFound,
    RateLimited,
    /// Request is well formed but asks for nothing (e.g. empty update)
    Policy,
    Internal,
}

impl ErrorKind {
    pub fn status_code(self) -> StatusCode {
        match self {
            ErrorKind::Validation | ErrorKind::Policy => StatusCode::BAD_REQUEST,
            ErrorKind::Authentication => StatusCode::UNAUTHORIZED,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Code placed in the response envelope
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::Validation | ErrorKind::Policy => "BAD_REQUEST",
            ErrorKind::Authentication => "UNAUTHORIZED",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::RateLimited => "TOO_MANY_REQUESTS",
            ErrorKind::Internal => "INTERNAL_SERVER_ERROR",
        }
    }
}

/// Application error returned by handlers and middleware
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("invalid request body: {0}")]
    BadRequest(String),

    #[error("authorization header is required")]
    MissingToken,

    #[error("invalid authorization format")]
    MalformedAuthHeader,

    #[error("too many requests")]
    RateLimitExceeded,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Auth(e) => e.kind(),
            AppError::Validation(_) | AppError::BadRequest(_) => ErrorKind::Validation,
            AppError::MissingToken | AppError::MalformedAuthHeader => ErrorKind::Authentication,
            AppError::RateLimitExceeded => ErrorKind::RateLimited,
            AppError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        self.kind().status_code()
    }

    /// Message safe to hand to clients. Internal details stay in the logs.
    pub fn sanitized_message(&self) -> String {
        match self.kind() {
            ErrorKind::Internal => "An internal server error occurred".to_string(),
            _ => self.to_string(),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        if kind == ErrorKind::Internal {
            tracing::error!(error = %self, "request failed");
        }

        let body = ApiResponse::<()>::failure(kind.code(), self.sanitized_message());
        (kind.status_code(), Json(body)).into_response()
    }
}

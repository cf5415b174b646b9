// =========================
// tests/unit/error_tests.rs
// =========================
//! Unit tests for the error module
use authgate_backend::auth::{AuthError, OtpError};
use authgate_backend::error::{AppError, ErrorKind};
use authgate_backend::storage::StoreError;
use authgate_backend::validation::ValidationError;
use axum::{body::to_bytes, http::StatusCode, response::IntoResponse};

#[test]
fn test_app_error_display() {
    assert_eq!(
        AppError::from(AuthError::InvalidCredentials).to_string(),
        "wrong email or password"
    );
    assert_eq!(AppError::RateLimitExceeded.to_string(), "too many requests");
    assert_eq!(
        AppError::from(ValidationError::Required("email")).to_string(),
        "email is required"
    );
}

#[test]
fn test_app_error_status_codes() {
    let cases = [
        (AppError::from(AuthError::InvalidToken), StatusCode::UNAUTHORIZED),
        (AppError::MissingToken, StatusCode::UNAUTHORIZED),
        (AppError::MalformedAuthHeader, StatusCode::UNAUTHORIZED),
        (AppError::from(AuthError::DuplicateUsername), StatusCode::CONFLICT),
        (AppError::from(AuthError::UserNotFound), StatusCode::NOT_FOUND),
        (AppError::from(AuthError::NoFieldsToUpdate), StatusCode::BAD_REQUEST),
        (
            AppError::from(AuthError::Otp(OtpError::NotFound)),
            StatusCode::NOT_FOUND,
        ),
        (
            AppError::from(AuthError::Otp(OtpError::Expired)),
            StatusCode::BAD_REQUEST,
        ),
        (AppError::RateLimitExceeded, StatusCode::TOO_MANY_REQUESTS),
        (
            AppError::Internal("boom".to_string()),
            StatusCode::INTERNAL_SERVER_ERROR,
        ),
    ];

    for (error, status) in cases {
        assert_eq!(error.status_code(), status, "{error}");
    }
}

#[test]
fn test_store_errors_map_to_use_case_errors() {
    assert!(matches!(
        AuthError::from(StoreError::NotFound),
        AuthError::UserNotFound
    ));
    assert_eq!(
        AuthError::from(StoreError::NotFound).kind(),
        ErrorKind::NotFound
    );
}

#[test]
fn test_internal_details_are_hidden() {
    let error = AppError::Internal("disk on fire at /var/lib/authgate".to_string());
    assert_eq!(error.sanitized_message(), "An internal server error occurred");
}

#[tokio::test]
async fn test_error_response_envelope() {
    let response = AppError::from(AuthError::DuplicateEmail).into_response();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["status_code"], "CONFLICT");
    assert_eq!(body["error"]["message"], "email already registered");
    assert!(body.get("data").is_none());
}

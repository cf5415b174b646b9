// ================
// common/src/lib.rs
// ================
//! Common types and structures
//! used for communication between `authgate` clients and the server.
//! This module defines the request payloads, response payloads and the
//! JSON envelope every response is wrapped in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier assigned to a user by the user store
pub type UserId = u64;

/// Payload of `POST /api/user/register`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RegisterRequest {
    /// Display name
    pub full_name: String,
    /// Unique handle (min 3 chars)
    pub username: String,
    /// Unique login identifier
    pub email: String,
    /// Plaintext password, hashed before it reaches the store
    pub password: String,
}

/// Payload of `POST /api/user/login`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Payload of `POST /api/user/refresh`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Payload of `PUT /api/auth/profile`
///
/// Both fields are optional but at least one must be present.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Payload of `POST /api/user/forgot-password`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// Payload of `POST /api/user/reset-password`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ResetPasswordRequest {
    pub email: String,
    /// Six digit code issued by the forgot-password step
    pub otp: String,
    pub new_password: String,
}

/// Public view of a user. Never carries the password hash.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub id: UserId,
    pub full_name: String,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Response data of a successful login
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LoginResponse {
    pub username: String,
    pub email: String,
    pub access_token: String,
    pub refresh_token: String,
}

/// Response data of a successful refresh
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RefreshResponse {
    pub access_token: String,
}

/// Error details carried by a failed [`ApiResponse`]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorDetail {
    /// Machine readable code (e.g. `UNAUTHORIZED`)
    pub status_code: String,
    /// Human readable message
    pub message: String,
}

/// JSON envelope wrapping every response body
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

impl<T> ApiResponse<T> {
    /// Successful envelope with a status message and payload
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
            error: None,
        }
    }

    /// Failed envelope with an error code and message
    pub fn failure(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            data: None,
            error: Some(ErrorDetail {
                status_code: code.into(),
                message: message.into(),
            }),
        }
    }
}

/// Data of responses that only carry a message (logout, password reset)
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// ============================
// crates/backend-lib/src/handlers/user.rs
// ============================
//! HTTP handlers for the user and session endpoints.
//!
//! Each handler parses and shape-validates its payload, calls one
//! [`AuthSession`](crate::auth::AuthSession) use case and wraps the result
//! in the response envelope.
use authgate_common::{
    ApiResponse, ForgotPasswordRequest, LoginRequest, LoginResponse, MessageResponse,
    RefreshRequest, RefreshResponse, RegisterRequest, ResetPasswordRequest, UpdateProfileRequest,
    UserProfile,
};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use std::sync::Arc;

use crate::middleware::AuthenticatedUser;
use crate::validation;
use crate::{error::AppError, AppState};

type ApiResult<T> = Result<(StatusCode, Json<ApiResponse<T>>), AppError>;

fn ok<T>(status: StatusCode, message: &str, data: T) -> ApiResult<T> {
    Ok((status, Json(ApiResponse::success(message, data))))
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<UserProfile> {
    let Json(req) = payload?;
    let req = validation::validate_register(req)?;

    let profile = state.session.register(req).await?;
    ok(StatusCode::CREATED, "CREATED", profile)
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<LoginResponse> {
    let Json(req) = payload?;
    let req = validation::validate_login(req)?;

    let outcome = state.session.login(req, Utc::now()).await?;
    ok(
        StatusCode::OK,
        "OK",
        LoginResponse {
            username: outcome.profile.username,
            email: outcome.profile.email,
            access_token: outcome.access.token,
            refresh_token: outcome.refresh.token,
        },
    )
}

pub async fn refresh(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> ApiResult<RefreshResponse> {
    let Json(req) = payload?;
    let req = validation::validate_refresh(req)?;

    let access = state.session.refresh(&req.refresh_token, Utc::now())?;
    ok(
        StatusCode::OK,
        "OK",
        RefreshResponse {
            access_token: access.token,
        },
    )
}

pub async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> ApiResult<MessageResponse> {
    state.session.logout(&user.token, Utc::now())?;
    ok(StatusCode::OK, "OK", MessageResponse::new("logged out"))
}

pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> ApiResult<UserProfile> {
    let profile = state.session.profile(user.claims.subject_id).await?;
    ok(StatusCode::OK, "OK", profile)
}

pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    payload: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> ApiResult<UserProfile> {
    let Json(req) = payload?;
    let req = validation::validate_update_profile(req)?;

    let profile = state
        .session
        .update_profile(user.claims.subject_id, req)
        .await?;
    ok(StatusCode::OK, "OK", profile)
}

/// Always answers the same way so the response does not reveal whether the
/// email is registered.
pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ForgotPasswordRequest>, JsonRejection>,
) -> ApiResult<MessageResponse> {
    let Json(req) = payload?;
    let req = validation::validate_forgot_password(req)?;

    state.session.forgot_password(&req.email, Utc::now()).await?;
    ok(
        StatusCode::OK,
        "OK",
        MessageResponse::new("if the email is registered, a reset code has been sent"),
    )
}

pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ResetPasswordRequest>, JsonRejection>,
) -> ApiResult<MessageResponse> {
    let Json(req) = payload?;
    let req = validation::validate_reset_password(req)?;

    state.session.reset_password(req, Utc::now()).await?;
    ok(StatusCode::OK, "OK", MessageResponse::new("password has been reset"))
}

/// Liveness probe
pub async fn health() -> Json<MessageResponse> {
    Json(MessageResponse::new("ok"))
}

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use std::sync::Arc;

use crate::auth::AccessClaims;
use crate::{error::AppError, AppState};

/// Caller identity attached to requests that passed [`require_auth`]
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub claims: AccessClaims,
    /// The bearer token as presented, needed to revoke it on logout
    pub token: String,
}

/// Reject requests without a valid, unrevoked bearer access token
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&request)?.to_string();
    let claims = state.session.authenticate(&token, Utc::now())?;

    request
        .extensions_mut()
        .insert(AuthenticatedUser { claims, token });
    Ok(next.run(request).await)
}

/// Extract `<token>` from `Authorization: Bearer <token>`
pub fn bearer_token(request: &Request) -> Result<&str, AppError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .ok_or(AppError::MissingToken)?
        .to_str()
        .map_err(|_| AppError::MalformedAuthHeader)?;

    let mut parts = header.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => Ok(token),
        _ => Err(AppError::MalformedAuthHeader),
    }
}

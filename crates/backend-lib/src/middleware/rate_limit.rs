use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use crate::{error::AppError, AppState};

/// Rate limiter middleware: one bucket token per request
pub async fn rate_limit(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let client_id = client_id(&request);

    if !state.rate_limiter.allow(&client_id, Instant::now()) {
        tracing::warn!(%client_id, path = %request.uri().path(), "request rate limited");
        return Err(AppError::RateLimitExceeded);
    }

    Ok(next.run(request).await)
}

/// Identify the caller: the peer address when the server exposes it, else
/// the proxy headers, else a shared `unknown` bucket.
pub fn client_id(request: &Request) -> String {
    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }

    let headers = request.headers();
    if let Some(ip) = headers.get("x-real-ip").and_then(|h| h.to_str().ok()) {
        return ip.trim().to_string();
    }
    if let Some(first) = headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.split(',').next())
    {
        return first.trim().to_string();
    }

    "unknown".to_string()
}
